use crossbeam_channel::{at, never, Receiver};
use std::time::{Duration, Instant};

/// Re-armable one-shot countdown.
///
/// Arming replaces any earlier deadline, so repeated arming keeps pushing
/// the expiry back (debounce). The owner reacts to expiry either by polling
/// [`IdleTimer::expire`] or by selecting on [`IdleTimer::ticker`] and then
/// calling `expire`. The deadline check in `expire` rejects ticks from a
/// replaced arming, so one arming fires at most once.
pub struct IdleTimer {
    interval: Duration,
    deadline: Option<Instant>,
    ticker: Receiver<Instant>,
}

impl IdleTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            ticker: never(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Cancel any pending expiry and start a fresh countdown from `now`.
    pub fn arm(&mut self, now: Instant) {
        let deadline = now + self.interval;
        self.deadline = Some(deadline);
        self.ticker = at(deadline);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.ticker = never();
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Channel that delivers once when the current deadline passes.
    /// Never delivers while disarmed.
    pub fn ticker(&self) -> &Receiver<Instant> {
        &self.ticker
    }

    /// True exactly once per arming, on the first call at or after the
    /// deadline. Disarms the timer when it returns true.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_fires_once_after_interval() {
        let t0 = Instant::now();
        let mut timer = IdleTimer::new(500 * MS);
        assert!(!timer.is_armed());
        assert!(!timer.expire(t0 + 10_000 * MS));

        timer.arm(t0);
        assert!(!timer.expire(t0 + 499 * MS));
        assert!(timer.expire(t0 + 500 * MS));
        assert!(!timer.is_armed());
        assert!(!timer.expire(t0 + 900 * MS));
    }

    #[test]
    fn test_rearm_pushes_deadline_back() {
        let t0 = Instant::now();
        let mut timer = IdleTimer::new(500 * MS);
        timer.arm(t0);
        timer.arm(t0 + 400 * MS);
        assert!(!timer.expire(t0 + 600 * MS));
        assert_eq!(timer.deadline(), Some(t0 + 900 * MS));
        assert!(timer.expire(t0 + 900 * MS));
    }

    #[test]
    fn test_cancel_prevents_expiry() {
        let t0 = Instant::now();
        let mut timer = IdleTimer::new(500 * MS);
        timer.arm(t0);
        timer.cancel();
        assert!(!timer.expire(t0 + 2_000 * MS));
        assert!(timer.ticker().try_recv().is_err());
    }

    #[test]
    fn test_ticker_delivers_after_deadline() {
        let mut timer = IdleTimer::new(20 * MS);
        timer.arm(Instant::now());
        let fired = timer.ticker().recv_timeout(Duration::from_secs(2));
        assert!(fired.is_ok());
        assert!(timer.expire(Instant::now()));
    }

    #[test]
    fn test_stale_ticker_is_replaced() {
        let mut timer = IdleTimer::new(20 * MS);
        timer.arm(Instant::now());
        let stale = timer.ticker().clone();
        timer.arm(Instant::now() + Duration::from_secs(60));
        // The old channel still fires, but the timer refuses to expire early.
        let _ = stale.recv_timeout(Duration::from_secs(2));
        assert!(!timer.expire(Instant::now()));
        assert!(timer.ticker().try_recv().is_err());
    }
}

use crate::chord_table::Arrangement;
use crate::conductor::{EventFanout, PhraseConductor};
use crate::types::*;
use crossbeam_channel::{select, Receiver, Sender};
use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

/// The coordinator owns the [`PhraseConductor`] and is the only thread that
/// touches its state.
///
/// It waits on two sources at once: gesture frames from the input channel
/// and the conductor's idle timer. Each wake-up runs exactly one transition
/// to completion before the next is looked at, so a timer expiry can never
/// land in the middle of a sample update.
///
/// Output goes out as [`ConductorEvent`]s to every consumer channel
/// (logger, OSC, console...). An optional gesture log channel receives a
/// copy of every input frame for session recording.
pub struct Coordinator {
    input_rx: Receiver<GestureFrame>,
    gesture_log_tx: Option<Sender<GestureFrame>>,
    conductor: PhraseConductor<EventFanout, EventFanout>,
}

impl Coordinator {
    pub fn new(
        input_rx: Receiver<GestureFrame>,
        event_txs: Vec<Sender<ConductorEvent>>,
        gesture_log_tx: Option<Sender<GestureFrame>>,
        arrangement: Arrangement,
        clock: SessionClock,
    ) -> Result<Self, String> {
        let fanout = EventFanout::new(event_txs, clock);
        let conductor = PhraseConductor::new(arrangement, fanout.clone(), fanout)?;
        Ok(Self {
            input_rx,
            gesture_log_tx,
            conductor,
        })
    }

    /// Override the phrase release time (defaults to [`RELEASE_TIME`]).
    pub fn with_release_time(mut self, release: Duration) -> Self {
        self.conductor = self.conductor.with_release_time(release);
        self
    }

    /// Run until the input channel closes. Blocks the calling thread.
    /// A phrase still in progress at that point is allowed to end normally.
    pub fn run(&mut self) {
        info!(
            "Coordinator running (release time {} ms, {} chord regions)",
            self.conductor.timer().interval().as_millis(),
            self.conductor.chord_regions()
        );

        let mut sample_count: u64 = 0;
        let mut rejected: u64 = 0;

        loop {
            // Clone so the select borrows nothing from the conductor.
            let ticker = self.conductor.timer().ticker().clone();
            select! {
                recv(self.input_rx) -> msg => match msg {
                    Ok(frame) => {
                        if !self.conductor.supports_touches(frame.sample.touches) {
                            if rejected == 0 {
                                warn!(
                                    "Dropping samples with {} touches: no voicing in the chord table",
                                    frame.sample.touches
                                );
                            }
                            rejected += 1;
                            continue;
                        }
                        if let Some(ref tx) = self.gesture_log_tx {
                            let _ = tx.send(frame);
                        }
                        self.conductor.on_sample(&frame.sample, &frame.surface, Instant::now());
                        sample_count += 1;
                        if sample_count % 1000 == 0 {
                            debug!("Coordinator: {} samples processed", sample_count);
                            trace!("Latest: {}", frame.sample);
                        }
                    }
                    Err(_) => break,
                },
                recv(ticker) -> _ => {
                    self.conductor.on_idle_timeout(Instant::now());
                }
            }
        }

        // Input is gone: let the last phrase run out its release time.
        if self.conductor.timer().is_armed() {
            let _ = self.conductor.timer().ticker().recv();
            self.conductor.on_idle_timeout(Instant::now());
        }

        if rejected > 0 {
            warn!("Coordinator dropped {} unplayable samples", rejected);
        }
        info!(
            "Coordinator shutting down after {} samples, {} phrases",
            sample_count,
            self.conductor.phrases()
        );
    }
}

use crate::gesture::voicing;
use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

/// Highest sample rate the simulator will pace; one sample per millisecond.
pub const MAX_SAMPLE_RATE_HZ: u32 = 1000;

/// Generates scripted swipe gestures so the conductor can be exercised
/// without a touch screen.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<GestureFrame>,
    surface: SurfaceBounds,
    sample_rate_hz: u32,
}

/// Where the finger is and how many there are.
#[derive(Clone)]
struct SimState {
    position: Point,
    touches: u32,
}

impl Simulator {
    pub fn new(
        clock: SessionClock,
        tx: Sender<GestureFrame>,
        surface: SurfaceBounds,
        sample_rate_hz: u32,
    ) -> Self {
        Self {
            clock,
            tx,
            surface,
            sample_rate_hz: sample_rate_hz.clamp(1, MAX_SAMPLE_RATE_HZ),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Run the named demo ("basic", "chords" or "improv"), then return.
    /// Blocks the calling thread for the length of the script.
    pub fn run(&self, demo: &str) {
        let gestures = match demo {
            "basic" => basic_sequence(&self.surface),
            "chords" => chord_tour(&self.surface),
            "improv" => improv_sequence(&self.surface, 0x5eed),
            other => {
                warn!("Unknown demo {:?}, playing \"basic\"", other);
                basic_sequence(&self.surface)
            }
        };
        info!("Simulator starting {} demo ({} gestures)...", demo, gestures.len());
        self.play(&gestures);
        info!("Demo sequence complete.");
    }

    fn play(&self, gestures: &[Gesture]) {
        let mut state = SimState {
            position: Point::new(self.surface.width() / 2.0, self.surface.height() / 2.0),
            touches: 1,
        };
        let tick_us = 1_000_000 / self.sample_rate_hz as u64;
        for gesture in gestures {
            self.execute(gesture, &mut state, tick_us);
        }
    }

    fn execute(&self, gesture: &Gesture, state: &mut SimState, tick_us: u64) {
        match gesture {
            Gesture::Lift { ms } => {
                info!("  lift for {}ms", ms);
                thread::sleep(Duration::from_millis(*ms as u64));
            }

            Gesture::Touches { count } => {
                info!("  {} finger(s)", count);
                state.touches = *count;
            }

            Gesture::MoveTo { x, y } => {
                info!("  touch down at ({:.0}, {:.0})", x, y);
                state.position = Point::new(*x, *y);
            }

            Gesture::Stroke { dy, ms } => {
                info!("  stroke dy={:.0} over {}ms", dy, ms);
                let ticks = ticks_for(*ms, tick_us);
                let from = state.position.y;
                let secs = *ms as f64 / 1000.0;
                for i in 0..ticks {
                    // Mid-tick, so no sample reports zero velocity and
                    // back-to-back strokes read as a direction change.
                    let t = (i as f64 + 0.5) / ticks as f64;
                    state.position.y = from + dy * smoothstep(t);
                    let vy = dy * smoothstep_slope(t) / secs;
                    self.emit(state, Point::new(0.0, vy), tick_us);
                }
                state.position.y = from + dy;
            }

            Gesture::Wiggle { amplitude, rate_hz, ms } => {
                info!("  wiggle ±{:.0} at {}Hz for {}ms", amplitude, rate_hz, ms);
                let ticks = ticks_for(*ms, tick_us);
                let center = state.position.y;
                for i in 0..ticks {
                    let t_sec = (i as u64 * tick_us) as f64 / 1_000_000.0;
                    let phase = 2.0 * PI * rate_hz * t_sec;
                    state.position.y = center + amplitude * phase.sin();
                    let vy = amplitude * 2.0 * PI * rate_hz * phase.cos();
                    self.emit(state, Point::new(0.0, vy), tick_us);
                }
                state.position.y = center;
            }

            Gesture::Glide { to_x, ms } => {
                info!("  glide x {:.0} → {:.0} over {}ms", state.position.x, to_x, ms);
                let ticks = ticks_for(*ms, tick_us);
                let from = state.position.x;
                let secs = *ms as f64 / 1000.0;
                for i in 0..ticks {
                    let t = i as f64 / ticks as f64;
                    state.position.x = lerp(from, *to_x, t);
                    // Keep a slight downward drift so the direction is defined
                    let vx = (to_x - from) / secs;
                    self.emit(state, Point::new(vx, 20.0), tick_us);
                }
                state.position.x = *to_x;
            }
        }
    }

    /// Send one sample and wait one tick.
    fn emit(&self, state: &SimState, velocity: Point, tick_us: u64) {
        let sample = GestureSample::new(self.clock.now_us(), state.position, velocity, state.touches);
        let _ = self.tx.send(GestureFrame {
            sample,
            surface: self.surface,
        });
        thread::sleep(Duration::from_micros(tick_us));
    }
}

/// Most fingers the named demo puts down. Unknown names play "basic".
pub fn demo_max_touches(demo: &str) -> u32 {
    match demo {
        "chords" => CHORD_TOUR_MAX_TOUCHES,
        "improv" => IMPROV_MAX_TOUCHES,
        _ => 1,
    }
}

/// Chord table variants needed to voice every finger count of a demo.
pub fn demo_required_variants(demo: &str) -> usize {
    (1..=demo_max_touches(demo))
        .map(|touches| voicing(touches).0 + 1)
        .max()
        .unwrap_or(1)
}

const CHORD_TOUR_MAX_TOUCHES: u32 = 5;
const IMPROV_MAX_TOUCHES: u32 = 3;

// ─── Gesture types ──────────────────────────────────────────────────────────

enum Gesture {
    /// Finger(s) off the glass: no samples.
    Lift { ms: u32 },
    Touches { count: u32 },
    /// Put the finger down somewhere without emitting a sample.
    MoveTo { x: f64, y: f64 },
    /// One eased vertical swipe.
    Stroke { dy: f64, ms: u32 },
    /// Vertical back-and-forth around the current height.
    Wiggle { amplitude: f64, rate_hz: f64, ms: u32 },
    /// Horizontal slide across chord regions.
    Glide { to_x: f64, ms: u32 },
}

/// Up-and-down strokes in one place, then a second phrase lower down.
fn basic_sequence(s: &SurfaceBounds) -> Vec<Gesture> {
    let (w, h) = (s.width(), s.height());
    vec![
        Gesture::MoveTo { x: w * 0.1, y: h * 0.5 },
        Gesture::Stroke { dy: -h * 0.1, ms: 250 },
        Gesture::Stroke { dy: h * 0.1, ms: 250 },
        Gesture::Stroke { dy: -h * 0.1, ms: 250 },
        Gesture::Stroke { dy: h * 0.1, ms: 250 },
        Gesture::Lift { ms: 800 },
        Gesture::MoveTo { x: w * 0.6, y: h * 0.2 },
        Gesture::Wiggle { amplitude: h * 0.05, rate_hz: 3.0, ms: 1500 },
        Gesture::Lift { ms: 800 },
    ]
}

/// Walks every chord region with each finger count.
fn chord_tour(s: &SurfaceBounds) -> Vec<Gesture> {
    let (w, h) = (s.width(), s.height());
    let mut gestures = Vec::new();
    for touches in 1..=CHORD_TOUR_MAX_TOUCHES {
        gestures.push(Gesture::Touches { count: touches });
        gestures.push(Gesture::MoveTo { x: w * 0.05, y: h * 0.5 });
        gestures.push(Gesture::Wiggle { amplitude: h * 0.04, rate_hz: 2.5, ms: 800 });
        gestures.push(Gesture::Glide { to_x: w * 0.95, ms: 1200 });
        gestures.push(Gesture::Wiggle { amplitude: h * 0.04, rate_hz: 2.5, ms: 800 });
        gestures.push(Gesture::Lift { ms: 700 });
    }
    gestures
}

/// Pseudo-random phrases from a fixed seed: same seed, same performance.
fn improv_sequence(s: &SurfaceBounds, seed: u64) -> Vec<Gesture> {
    let (w, h) = (s.width(), s.height());
    let mut rng = Lcg(seed);
    let mut gestures = Vec::new();
    for _ in 0..8 {
        let touches = 1 + (rng.next_f64() * IMPROV_MAX_TOUCHES as f64) as u32;
        gestures.push(Gesture::Touches { count: touches.min(IMPROV_MAX_TOUCHES) });
        gestures.push(Gesture::MoveTo {
            x: w * rng.next_f64(),
            y: h * (0.1 + 0.8 * rng.next_f64()),
        });
        let strokes = 2 + (rng.next_f64() * 4.0) as usize;
        for k in 0..strokes {
            let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
            gestures.push(Gesture::Stroke {
                dy: sign * h * (0.03 + 0.07 * rng.next_f64()),
                ms: 120 + (rng.next_f64() * 300.0) as u32,
            });
        }
        if rng.next_f64() > 0.5 {
            gestures.push(Gesture::Glide { to_x: w * rng.next_f64(), ms: 400 });
        }
        gestures.push(Gesture::Lift { ms: 600 + (rng.next_f64() * 600.0) as u32 });
    }
    gestures
}

/// Small deterministic generator for the improv demo.
struct Lcg(u64);

impl Lcg {
    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

// ─── Math helpers ───────────────────────────────────────────────────────────

fn ticks_for(ms: u32, tick_us: u64) -> u64 {
    ((ms as u64 * 1000) / tick_us).max(1)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Smooth interpolation (ease in/out)
fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn smoothstep_slope(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    6.0 * t * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn surface() -> SurfaceBounds {
        SurfaceBounds::new(400.0, 600.0).unwrap()
    }

    #[test]
    fn test_stroke_velocity_follows_direction() {
        let (tx, rx) = unbounded();
        let sim = Simulator::new(SessionClock::new(), tx, surface(), 1000);
        sim.play(&[
            Gesture::MoveTo { x: 50.0, y: 300.0 },
            Gesture::Stroke { dy: -60.0, ms: 20 },
            Gesture::Stroke { dy: 60.0, ms: 20 },
        ]);
        let frames: Vec<GestureFrame> = rx.try_iter().collect();
        assert_eq!(frames.len(), 40);
        assert!(frames[..20].iter().all(|f| f.sample.velocity.y < 0.0));
        assert!(frames[20..].iter().all(|f| f.sample.velocity.y > 0.0));
        assert!(frames.iter().all(|f| f.sample.position.x == 50.0));
    }

    #[test]
    fn test_wiggle_changes_direction() {
        let (tx, rx) = unbounded();
        let sim = Simulator::new(SessionClock::new(), tx, surface(), 1000);
        sim.play(&[Gesture::Wiggle { amplitude: 10.0, rate_hz: 50.0, ms: 40 }]);
        let vys: Vec<f64> = rx.try_iter().map(|f| f.sample.velocity.y).collect();
        let flips = vys
            .windows(2)
            .filter(|w| (w[0] > 0.0 && w[1] < 0.0) || (w[0] < 0.0 && w[1] > 0.0))
            .count();
        assert!(flips >= 2, "flips={}", flips);
    }

    #[test]
    fn test_touch_count_carried_into_samples() {
        let (tx, rx) = unbounded();
        let sim = Simulator::new(SessionClock::new(), tx, surface(), 1000);
        sim.play(&[Gesture::Touches { count: 4 }, Gesture::Stroke { dy: 10.0, ms: 5 }]);
        assert!(rx.try_iter().all(|f| f.sample.touches == 4));
    }

    #[test]
    fn test_sample_rate_is_bounded() {
        let (tx, rx) = unbounded();
        let sim = Simulator::new(SessionClock::new(), tx, surface(), 2_000_000);
        assert_eq!(sim.sample_rate_hz(), MAX_SAMPLE_RATE_HZ);
        sim.play(&[Gesture::Stroke { dy: 10.0, ms: 5 }]);
        assert_eq!(rx.try_iter().count(), 5);

        let (tx, _rx) = unbounded();
        let sim = Simulator::new(SessionClock::new(), tx, surface(), 0);
        assert_eq!(sim.sample_rate_hz(), 1);
    }

    #[test]
    fn test_demo_variant_requirements() {
        assert_eq!(demo_required_variants("basic"), 1);
        assert_eq!(demo_required_variants("improv"), 3);
        assert_eq!(demo_required_variants("chords"), 5);
        assert_eq!(demo_required_variants("nonsense"), 1);
    }

    #[test]
    fn test_demos_stay_within_max_touches() {
        for demo in ["chords", "improv"] {
            let gestures = match demo {
                "chords" => chord_tour(&surface()),
                _ => improv_sequence(&surface(), 0x5eed),
            };
            for g in &gestures {
                if let Gesture::Touches { count } = g {
                    assert!(*count <= demo_max_touches(demo), "{}: {}", demo, count);
                }
            }
        }
    }

    #[test]
    fn test_improv_is_deterministic() {
        let a = improv_sequence(&surface(), 7).len();
        let b = improv_sequence(&surface(), 7).len();
        assert_eq!(a, b);
        let mut rng = Lcg(1);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}

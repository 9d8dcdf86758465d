use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

// ─── Gesture input from the view layer ──────────────────────────────────────

/// A point (or velocity vector) in surface-local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One pan-gesture callback from the touch surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    /// Microseconds since session start. Ordering is arrival order;
    /// the timestamp only paces recording and replay.
    pub timestamp_us: u64,
    /// Touch location, y grows downwards as on the view.
    pub position: Point,
    /// Pan velocity in points per second.
    pub velocity: Point,
    /// Number of fingers on the surface
    pub touches: u32,
}

impl GestureSample {
    pub fn new(timestamp_us: u64, position: Point, velocity: Point, touches: u32) -> Self {
        Self {
            timestamp_us,
            position,
            velocity,
            touches,
        }
    }
}

impl fmt::Display for GestureSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>10}µs  pos=({:>7.1},{:>7.1})  vel=({:>8.1},{:>8.1})  touches={}",
            self.timestamp_us,
            self.position.x,
            self.position.y,
            self.velocity.x,
            self.velocity.y,
            self.touches,
        )
    }
}

/// Size of the view that produced a sample. Both sides are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct SurfaceBounds {
    width: f64,
    height: f64,
}

/// Unchecked bounds as they appear in serialized input.
#[derive(Deserialize)]
struct RawBounds {
    width: f64,
    height: f64,
}

impl TryFrom<RawBounds> for SurfaceBounds {
    type Error = String;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        SurfaceBounds::new(raw.width, raw.height)
    }
}

impl SurfaceBounds {
    /// Rejects zero, negative and NaN dimensions; zone mapping divides by both.
    pub fn new(width: f64, height: f64) -> Result<Self, String> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(format!(
                "surface bounds must be positive, got {}x{}",
                width, height
            ));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// A sample together with the surface it was taken on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFrame {
    pub sample: GestureSample,
    pub surface: SurfaceBounds,
}

// ─── Compact serialization ──────────────────────────────────────────────────

/// Short-key representation for JSONL session files.
/// Field mapping: t=timestamp_us, x/y=position, vx/vy=velocity,
/// n=touches, w/h=surface bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactGesture {
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub n: u32,
    pub w: f64,
    pub h: f64,
}

impl From<&GestureFrame> for CompactGesture {
    fn from(g: &GestureFrame) -> Self {
        Self {
            t: g.sample.timestamp_us,
            x: g.sample.position.x,
            y: g.sample.position.y,
            vx: g.sample.velocity.x,
            vy: g.sample.velocity.y,
            n: g.sample.touches,
            w: g.surface.width(),
            h: g.surface.height(),
        }
    }
}

impl TryFrom<CompactGesture> for GestureFrame {
    type Error = String;

    fn try_from(c: CompactGesture) -> Result<Self, Self::Error> {
        Ok(Self {
            sample: GestureSample::new(c.t, Point::new(c.x, c.y), Point::new(c.vx, c.vy), c.n),
            surface: SurfaceBounds::new(c.w, c.h)?,
        })
    }
}

// ─── Conductor output ───────────────────────────────────────────────────────

/// Everything the conductor tells the outside world, timestamped for
/// logging and display. Serializes with an `"ev"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ev", rename_all = "snake_case")]
pub enum ConductorEvent {
    NoteOn { t: u64, note: i32 },
    ChordChanged { t: u64, chord: usize, variant: usize },
    PhraseEnded { t: u64 },
    Visualize { t: u64, x: f64, y: f64, velocity: f64 },
}

impl ConductorEvent {
    pub fn timestamp_us(&self) -> u64 {
        match *self {
            ConductorEvent::NoteOn { t, .. }
            | ConductorEvent::ChordChanged { t, .. }
            | ConductorEvent::PhraseEnded { t }
            | ConductorEvent::Visualize { t, .. } => t,
        }
    }
}

impl fmt::Display for ConductorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConductorEvent::NoteOn { t, note } => {
                write!(f, "t={:>10}µs  NOTE   {:>3} ({})", t, note, midi_note_name(*note))
            }
            ConductorEvent::ChordChanged { t, chord, variant } => {
                write!(f, "t={:>10}µs  CHORD  zone={} variant={}", t, chord, variant)
            }
            ConductorEvent::PhraseEnded { t } => write!(f, "t={:>10}µs  PHRASE END", t),
            ConductorEvent::Visualize { t, x, y, velocity } => write!(
                f,
                "t={:>10}µs  viz    ({:.1},{:.1}) v={:.2}",
                t, x, y, velocity
            ),
        }
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// MIDI note the middle octave zone is built on (E2).
pub const BASE_PITCH: i32 = 40;
/// Semitones added or removed by the high and low octave zones.
pub const OCTAVE_SPAN: i32 = 12;
/// Vertical velocity is divided by this before it goes to the visualizer.
pub const VELOCITY_SCALE: f64 = 16.0;
/// Quiet time after the last sample before a phrase ends.
pub const RELEASE_TIME: Duration = Duration::from_millis(500);
/// Horizontal bands on the surface: low, middle, high.
pub const OCTAVE_ZONES_COUNT: usize = 3;
pub const LOW_OCTAVE_ZONE: i32 = 0;
pub const HIGH_OCTAVE_ZONE: i32 = 2;
/// Touch count that selects the transposed-down "low" voicing.
pub const LOW_MODE_TOUCHES: u32 = 4;
/// Note the conductor reports before anything has been played.
pub const INITIAL_NOTE: i32 = 64;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name a MIDI note number, e.g. 40 → "E2", 60 → "C4".
pub fn midi_note_name(note: i32) -> String {
    let name = NOTE_NAMES[note.rem_euclid(12) as usize];
    let octave = note.div_euclid(12) - 1;
    format!("{}{}", name, octave)
}

use crate::chord_table::{Arrangement, ChordTable};
use crate::gesture::{touches_supported, GestureInterpreter};
use crate::idle_timer::IdleTimer;
use crate::sequence::SequencePattern;
use crate::types::*;
use crossbeam_channel::Sender;
use log::{debug, trace};
use std::time::{Duration, Instant};

// ─── Capabilities handed to the conductor ───────────────────────────────────

/// Receives the conductor's notifications (the view side).
pub trait Conductable {
    /// Chord zone changed, or a new phrase started.
    fn chord_changed(&mut self, chord_index: usize, variant: usize);
    /// The idle timer ran out; the phrase is over.
    fn phrase_ended(&mut self);
    /// Per-sample hint for animation. `velocity` is already scaled down.
    fn visualize_playing(&mut self, position: Point, velocity: f64);
}

/// Plays notes (the audio side).
pub trait NoteSink {
    fn note_on(&mut self, note: i32);
}

/// Broadcasts every notification and note as a timestamped
/// [`ConductorEvent`] to all consumer channels. Consumers that hung up are
/// skipped silently.
#[derive(Clone)]
pub struct EventFanout {
    txs: Vec<Sender<ConductorEvent>>,
    clock: SessionClock,
}

impl EventFanout {
    pub fn new(txs: Vec<Sender<ConductorEvent>>, clock: SessionClock) -> Self {
        Self { txs, clock }
    }

    fn emit(&self, event: ConductorEvent) {
        for tx in &self.txs {
            let _ = tx.send(event.clone());
        }
    }
}

impl Conductable for EventFanout {
    fn chord_changed(&mut self, chord_index: usize, variant: usize) {
        let t = self.clock.now_us();
        self.emit(ConductorEvent::ChordChanged {
            t,
            chord: chord_index,
            variant,
        });
    }

    fn phrase_ended(&mut self) {
        let t = self.clock.now_us();
        self.emit(ConductorEvent::PhraseEnded { t });
    }

    fn visualize_playing(&mut self, position: Point, velocity: f64) {
        let t = self.clock.now_us();
        self.emit(ConductorEvent::Visualize {
            t,
            x: position.x,
            y: position.y,
            velocity,
        });
    }
}

impl NoteSink for EventFanout {
    fn note_on(&mut self, note: i32) {
        let t = self.clock.now_us();
        self.emit(ConductorEvent::NoteOn { t, note });
    }
}

// ─── State ──────────────────────────────────────────────────────────────────

/// Everything the conductor remembers between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ConductorState {
    /// Set while waiting for the first sample of a phrase.
    pub trigger_enabled: bool,
    pub chord_index: usize,
    /// Unclamped; only 0 and 2 shift the octave.
    pub octave_index: i32,
    pub chord_variant: usize,
    pub transpose: i32,
    pub sequence_index: usize,
    pub current_note: i32,
    /// Only kept to spot a change of swipe direction.
    pub last_vertical_velocity: f64,
}

impl Default for ConductorState {
    fn default() -> Self {
        Self {
            trigger_enabled: true,
            chord_index: 0,
            octave_index: 0,
            chord_variant: 0,
            transpose: 0,
            sequence_index: 0,
            current_note: INITIAL_NOTE,
            last_vertical_velocity: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhrasePhase {
    /// No phrase; the next sample triggers a note.
    Idle,
    /// Phrase in progress, idle timer armed.
    Active,
}

// ─── Conductor ──────────────────────────────────────────────────────────────

/// The gesture state machine.
///
/// Two transitions mutate the state: [`on_sample`](Self::on_sample) for each
/// gesture callback and [`on_idle_timeout`](Self::on_idle_timeout) when the
/// release timer runs out. Both take `&mut self`; the owner decides which
/// thread runs them (see `Coordinator`), so they never interleave.
pub struct PhraseConductor<C: Conductable, N: NoteSink> {
    interpreter: GestureInterpreter,
    table: ChordTable,
    sequence: SequencePattern,
    timer: IdleTimer,
    state: ConductorState,
    observer: C,
    sink: N,
    notes_in_phrase: u32,
    phrases: u64,
}

impl<C: Conductable, N: NoteSink> PhraseConductor<C, N> {
    pub fn new(arrangement: Arrangement, observer: C, sink: N) -> Result<Self, String> {
        arrangement.validate()?;
        Ok(Self {
            interpreter: GestureInterpreter::new(arrangement.chord_table.chord_count()),
            table: arrangement.chord_table,
            sequence: arrangement.sequence,
            timer: IdleTimer::new(RELEASE_TIME),
            state: ConductorState::default(),
            observer,
            sink,
            notes_in_phrase: 0,
            phrases: 0,
        })
    }

    /// Override the quiet time that ends a phrase.
    pub fn with_release_time(mut self, release: Duration) -> Self {
        self.timer = IdleTimer::new(release);
        self
    }

    pub fn state(&self) -> &ConductorState {
        &self.state
    }

    pub fn phase(&self) -> PhrasePhase {
        if self.state.trigger_enabled {
            PhrasePhase::Idle
        } else {
            PhrasePhase::Active
        }
    }

    pub fn timer(&self) -> &IdleTimer {
        &self.timer
    }

    pub fn observer(&self) -> &C {
        &self.observer
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn chord_regions(&self) -> usize {
        self.interpreter.chord_regions()
    }

    /// Whether the chord table has a voicing for this many fingers.
    /// [`on_sample`](Self::on_sample) panics on samples where this is false.
    pub fn supports_touches(&self, touches: u32) -> bool {
        touches_supported(touches, self.table.variant_count())
    }

    /// Phrases completed so far.
    pub fn phrases(&self) -> u64 {
        self.phrases
    }

    pub fn on_sample(&mut self, sample: &GestureSample, surface: &SurfaceBounds, now: Instant) {
        // A sample that arrives after the deadline must not extend the
        // previous phrase.
        self.on_idle_timeout(now);

        trace!("sample {}", sample);
        let zones = self.interpreter.interpret(sample, surface);
        self.state.chord_variant = zones.variant;
        self.state.transpose = zones.transpose;

        if zones.chord_zone != self.state.chord_index {
            self.state.chord_index = zones.chord_zone;
            self.observer
                .chord_changed(self.state.chord_index, self.state.chord_variant);
        }
        if zones.octave_zone != self.state.octave_index {
            self.state.octave_index = zones.octave_zone;
        }

        let vy = sample.velocity.y;
        self.observer
            .visualize_playing(sample.position, vy / VELOCITY_SCALE);

        if self.state.trigger_enabled {
            self.play_next_note();
            self.state.trigger_enabled = false;
            self.observer
                .chord_changed(self.state.chord_index, self.state.chord_variant);
            debug!(
                "phrase {} start: chord={} variant={} octave={}",
                self.phrases + 1,
                self.state.chord_index,
                self.state.chord_variant,
                self.state.octave_index
            );
        }

        let last = self.state.last_vertical_velocity;
        if (vy > 0.0 && last < 0.0) || (vy < 0.0 && last > 0.0) {
            self.state.sequence_index += 1;
            self.play_next_note();
        }
        self.state.last_vertical_velocity = vy;

        self.timer.arm(now);
    }

    /// Ends the phrase if the release timer is due at `now`. Returns true
    /// when it did. Calling it early, late or twice is harmless.
    pub fn on_idle_timeout(&mut self, now: Instant) -> bool {
        if !self.timer.expire(now) {
            return false;
        }
        self.state.sequence_index = 0;
        self.state.trigger_enabled = true;
        self.phrases += 1;
        debug!(
            "phrase {} ended after {} notes",
            self.phrases, self.notes_in_phrase
        );
        self.notes_in_phrase = 0;
        self.observer.phrase_ended();
        true
    }

    fn play_next_note(&mut self) {
        if self.state.sequence_index >= self.sequence.len() {
            self.state.sequence_index = 0;
        }
        let octave = match self.state.octave_index {
            LOW_OCTAVE_ZONE => -OCTAVE_SPAN,
            HIGH_OCTAVE_ZONE => OCTAVE_SPAN,
            _ => 0,
        };
        let step = self.sequence.step(self.state.sequence_index);
        let offset = self
            .table
            .offset(self.state.chord_variant, self.state.chord_index, step);
        self.state.current_note = octave + BASE_PITCH + offset + self.state.transpose;
        self.notes_in_phrase += 1;
        trace!(
            "note {} ({}) seq={} step={}",
            self.state.current_note,
            midi_note_name(self.state.current_note),
            self.state.sequence_index,
            step
        );
        self.sink.note_on(self.state.current_note);
    }
}

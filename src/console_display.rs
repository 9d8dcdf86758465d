use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Running summary of what the conductor has done, as shown on screen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MonitorState {
    pub last_note: Option<i32>,
    pub chord: usize,
    pub variant: usize,
    pub notes: u64,
    pub phrases: u64,
    pub in_phrase: bool,
    pub position: Point,
    pub velocity: f64,
}

impl MonitorState {
    pub fn apply(&mut self, event: &ConductorEvent) {
        match *event {
            ConductorEvent::NoteOn { note, .. } => {
                self.last_note = Some(note);
                self.notes += 1;
                self.in_phrase = true;
            }
            ConductorEvent::ChordChanged { chord, variant, .. } => {
                self.chord = chord;
                self.variant = variant;
            }
            ConductorEvent::PhraseEnded { .. } => {
                self.phrases += 1;
                self.in_phrase = false;
            }
            ConductorEvent::Visualize { x, y, velocity, .. } => {
                self.position = Point::new(x, y);
                self.velocity = velocity;
            }
        }
    }
}

/// Renders a live ASCII dashboard of the conductor output.
pub struct ConsoleDisplay {
    rx: Receiver<ConductorEvent>,
    chord_regions: usize,
    /// Redraw every n-th visualization event; notes and phrase ends always redraw.
    redraw_every: u64,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<ConductorEvent>, chord_regions: usize, redraw_every: u64) -> Self {
        Self {
            rx,
            chord_regions,
            redraw_every: redraw_every.max(1),
        }
    }

    pub fn run(&self) {
        let mut state = MonitorState::default();
        let mut viz_count: u64 = 0;
        let mut stdout = io::stdout();

        for event in self.rx.iter() {
            state.apply(&event);
            if let ConductorEvent::Visualize { .. } = event {
                viz_count += 1;
                if viz_count % self.redraw_every != 0 {
                    continue;
                }
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            print!("{}", render(&state, self.chord_regions));
            let _ = stdout.flush();
        }
    }
}

pub fn render(state: &MonitorState, chord_regions: usize) -> String {
    let note = match state.last_note {
        Some(n) => format!("{:>3} {:<4}", n, midi_note_name(n)),
        None => "---     ".to_string(),
    };
    let mut out = String::new();
    out.push_str("╔══════════════════════════════════════════╗\n");
    out.push_str("║  SWIPE CONDUCTOR — Live Monitor          ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!(
        "║  Phrase: {:<8} ({} done){}║\n",
        if state.in_phrase { "playing" } else { "idle" },
        state.phrases,
        pad(24, &format!("{}", state.phrases))
    ));
    out.push_str(&format!("║  Note:   {}  ({} played){}║\n", note, state.notes, pad(21, &state.notes.to_string())));
    out.push_str(&format!("║  Chord:  {}  variant {}{}║\n",
        zone_strip(state.chord, chord_regions),
        state.variant,
        pad(23 - chord_regions.min(20), "")));
    out.push_str(&format!("║  Swipe:  {}          ║\n", velocity_bar(state.velocity, 21)));
    out.push_str("╚══════════════════════════════════════════╝\n");
    out
}

fn pad(width: usize, used: &str) -> String {
    " ".repeat(width.saturating_sub(used.chars().count()))
}

/// `[··█·]` with the active zone filled.
fn zone_strip(active: usize, regions: usize) -> String {
    let cells: String = (0..regions)
        .map(|i| if i == active { '█' } else { '·' })
        .collect();
    format!("[{}]", cells)
}

/// Centered bar: left of center for upward swipes, right for downward.
fn velocity_bar(velocity: f64, width: usize) -> String {
    let half = width / 2;
    let reach = ((velocity.abs() / 100.0).min(1.0) * half as f64).round() as usize;
    let mut cells = vec!['─'; width];
    cells[half] = '┼';
    for i in 1..=reach {
        if velocity < 0.0 {
            cells[half - i] = '◀';
        } else {
            cells[half + i] = '▶';
        }
    }
    cells.into_iter().collect()
}

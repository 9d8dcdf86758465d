//! Gesture interpretation: raw pan samples → discrete musical selections.
//!
//! The surface is divided into vertical chord regions (left to right) and
//! horizontal octave bands (top to bottom). Finger count picks the voicing.

use crate::types::*;

/// What a single sample selects. Pure function of the sample and surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpretation {
    /// Always in `0..chord_regions`.
    pub chord_zone: usize,
    /// Not clamped: a touch on or past the bottom edge yields
    /// `OCTAVE_ZONES_COUNT`, one above the top edge yields -1.
    pub octave_zone: i32,
    pub variant: usize,
    /// -1 in four-finger low mode, otherwise 0.
    pub transpose: i32,
}

/// Maps samples into chord zone, octave zone and voicing.
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    chord_regions: usize,
    octave_zones: usize,
}

impl GestureInterpreter {
    pub fn new(chord_regions: usize) -> Self {
        assert!(chord_regions > 0, "need at least one chord region");
        Self {
            chord_regions,
            octave_zones: OCTAVE_ZONES_COUNT,
        }
    }

    pub fn chord_regions(&self) -> usize {
        self.chord_regions
    }

    pub fn interpret(&self, sample: &GestureSample, surface: &SurfaceBounds) -> Interpretation {
        let (variant, transpose) = voicing(sample.touches);
        Interpretation {
            chord_zone: self.chord_zone(sample.position.x, surface.width()),
            octave_zone: self.octave_zone(sample.position.y, surface.height()),
            variant,
            transpose,
        }
    }

    /// Clamped to the outermost regions so a drag past either edge keeps
    /// playing the edge chord.
    pub fn chord_zone(&self, x: f64, width: f64) -> usize {
        debug_assert!(width > 0.0, "surface width must be positive");
        let zone = ((x / width) * self.chord_regions as f64).floor();
        if zone <= 0.0 || zone.is_nan() {
            0
        } else {
            (zone as usize).min(self.chord_regions - 1)
        }
    }

    pub fn octave_zone(&self, y: f64, height: f64) -> i32 {
        debug_assert!(height > 0.0, "surface height must be positive");
        ((y / height) * self.octave_zones as f64).floor() as i32
    }
}

/// Finger count → (variant, transpose).
pub fn voicing(touches: u32) -> (usize, i32) {
    if touches == LOW_MODE_TOUCHES {
        (0, -1)
    } else {
        (touches.saturating_sub(1) as usize, 0)
    }
}

/// Whether a table with `variant_count` voicings can play `touches` fingers.
pub fn touches_supported(touches: u32, variant_count: usize) -> bool {
    voicing(touches).0 < variant_count
}

use crate::sequence::{default_sequence, SequencePattern};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Precomputed voicings: variant → chord → scale step → semitone offset.
///
/// The table is rectangular. Every variant holds the same number of chords
/// (one per horizontal chord region) and every chord the same number of
/// scale steps. Lookups outside those bounds are bugs in the caller and panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Vec<i32>>>", into = "Vec<Vec<Vec<i32>>>")]
pub struct ChordTable {
    variants: Vec<Vec<Vec<i32>>>,
    chords: usize,
    steps: usize,
}

impl ChordTable {
    pub fn new(variants: Vec<Vec<Vec<i32>>>) -> Result<Self, String> {
        let chords = variants.first().map(|v| v.len()).unwrap_or(0);
        let steps = variants
            .first()
            .and_then(|v| v.first())
            .map(|c| c.len())
            .unwrap_or(0);
        if chords == 0 || steps == 0 {
            return Err("chord table needs at least one variant, chord and step".into());
        }
        for (vi, variant) in variants.iter().enumerate() {
            if variant.len() != chords {
                return Err(format!(
                    "variant {} has {} chords, expected {}",
                    vi,
                    variant.len(),
                    chords
                ));
            }
            for (ci, chord) in variant.iter().enumerate() {
                if chord.len() != steps {
                    return Err(format!(
                        "variant {} chord {} has {} steps, expected {}",
                        vi,
                        ci,
                        chord.len(),
                        steps
                    ));
                }
            }
        }
        Ok(Self {
            variants,
            chords,
            steps,
        })
    }

    /// Semitone offset of `step` in `chord` voiced as `variant`.
    pub fn offset(&self, variant: usize, chord: usize, step: usize) -> i32 {
        assert!(
            variant < self.variants.len() && chord < self.chords && step < self.steps,
            "chord table lookup out of range: [{}][{}][{}] in {}x{}x{} table",
            variant,
            chord,
            step,
            self.variants.len(),
            self.chords,
            self.steps,
        );
        self.variants[variant][chord][step]
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Number of chord regions across the surface.
    pub fn chord_count(&self) -> usize {
        self.chords
    }

    pub fn step_count(&self) -> usize {
        self.steps
    }
}

impl TryFrom<Vec<Vec<Vec<i32>>>> for ChordTable {
    type Error = String;

    fn try_from(variants: Vec<Vec<Vec<i32>>>) -> Result<Self, Self::Error> {
        ChordTable::new(variants)
    }
}

impl From<ChordTable> for Vec<Vec<Vec<i32>>> {
    fn from(table: ChordTable) -> Self {
        table.variants
    }
}

/// A playable setup: which chords sit where, and in what order their
/// steps are walked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrangement {
    pub name: String,
    pub chord_table: ChordTable,
    pub sequence: SequencePattern,
}

impl Arrangement {
    /// Every pattern step must address a column of the table.
    pub fn validate(&self) -> Result<(), String> {
        if self.sequence.max_step() >= self.chord_table.step_count() {
            return Err(format!(
                "sequence step {} exceeds chord table width {}",
                self.sequence.max_step(),
                self.chord_table.step_count()
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let arrangement: Arrangement =
            serde_json::from_str(json).map_err(|e| format!("parse arrangement: {}", e))?;
        arrangement.validate()?;
        Ok(arrangement)
    }
}

/// Load an arrangement from a JSON file.
pub fn load_arrangement(path: &Path) -> Result<Arrangement, String> {
    let json = fs::read_to_string(path).map_err(|e| format!("read {:?}: {}", path, e))?;
    Arrangement::from_json(&json)
}

// Chord qualities as four ascending scale steps.
const MAJOR_TRIAD: [i32; 4] = [0, 4, 7, 12];
const MINOR_TRIAD: [i32; 4] = [0, 3, 7, 12];
const MAJOR_SEVENTH: [i32; 4] = [0, 4, 7, 11];
const MINOR_SEVENTH: [i32; 4] = [0, 3, 7, 10];
const DOMINANT_SEVENTH: [i32; 4] = [0, 4, 7, 10];
const SUS_FOUR: [i32; 4] = [0, 5, 7, 12];
const MAJOR_ADD_NINE: [i32; 4] = [0, 4, 7, 14];
const MINOR_ADD_NINE: [i32; 4] = [0, 3, 7, 14];
const OPEN_FIFTHS: [i32; 4] = [0, 7, 12, 19];

fn voice(root: i32, quality: [i32; 4]) -> Vec<i32> {
    quality.iter().map(|s| root + s).collect()
}

/// I – vi – IV – V in E, left to right across the surface.
///
/// Variants follow the finger count: one finger plays plain triads, two
/// fingers sevenths, three fingers suspended fourths, five fingers open
/// fifths. Four fingers reuse variant 0 a semitone down, so variant 3
/// (add-nine) is only reachable from custom arrangements.
pub fn default_arrangement() -> Arrangement {
    // Roots above the base pitch: I=0, vi=9, IV=5, V=7
    let triads = vec![
        voice(0, MAJOR_TRIAD),
        voice(9, MINOR_TRIAD),
        voice(5, MAJOR_TRIAD),
        voice(7, MAJOR_TRIAD),
    ];
    let sevenths = vec![
        voice(0, MAJOR_SEVENTH),
        voice(9, MINOR_SEVENTH),
        voice(5, MAJOR_SEVENTH),
        voice(7, DOMINANT_SEVENTH),
    ];
    let suspended = vec![
        voice(0, SUS_FOUR),
        voice(9, SUS_FOUR),
        voice(5, SUS_FOUR),
        voice(7, SUS_FOUR),
    ];
    let add_nine = vec![
        voice(0, MAJOR_ADD_NINE),
        voice(9, MINOR_ADD_NINE),
        voice(5, MAJOR_ADD_NINE),
        voice(7, MAJOR_ADD_NINE),
    ];
    let fifths = vec![
        voice(0, OPEN_FIFTHS),
        voice(9, OPEN_FIFTHS),
        voice(5, OPEN_FIFTHS),
        voice(7, OPEN_FIFTHS),
    ];

    Arrangement {
        name: "E major I-vi-IV-V".to_string(),
        // The shape above is rectangular by construction.
        chord_table: ChordTable {
            chords: triads.len(),
            steps: MAJOR_TRIAD.len(),
            variants: vec![triads, sevenths, suspended, add_nine, fifths],
        },
        sequence: default_sequence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_arrangement_shape() {
        let a = default_arrangement();
        assert_eq!(a.chord_table.variant_count(), 5);
        assert_eq!(a.chord_table.chord_count(), 4);
        assert_eq!(a.chord_table.step_count(), 4);
        assert!(a.validate().is_ok());
        // Round-trips through its own validating constructor
        let rebuilt: Vec<Vec<Vec<i32>>> = a.chord_table.clone().into();
        assert_eq!(ChordTable::new(rebuilt).unwrap(), a.chord_table);
    }

    #[test]
    fn test_default_tonic_root_is_zero() {
        let a = default_arrangement();
        assert_eq!(a.chord_table.offset(0, 0, 0), 0);
        // vi chord (C#m) third step: 9 + 7
        assert_eq!(a.chord_table.offset(0, 1, 2), 16);
        // V7 in the seventh variant: 7 + 10
        assert_eq!(a.chord_table.offset(1, 3, 3), 17);
    }

    #[test]
    fn test_ragged_table_rejected() {
        let err = ChordTable::new(vec![vec![vec![0, 4], vec![0]]]).unwrap_err();
        assert!(err.contains("chord 1"), "got: {}", err);
        let err = ChordTable::new(vec![vec![vec![0]], vec![vec![0], vec![1]]]).unwrap_err();
        assert!(err.contains("variant 1"), "got: {}", err);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(ChordTable::new(vec![]).is_err());
        assert!(ChordTable::new(vec![vec![]]).is_err());
        assert!(ChordTable::new(vec![vec![vec![]]]).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_lookup_out_of_range_panics() {
        let a = default_arrangement();
        a.chord_table.offset(5, 0, 0);
    }

    #[test]
    fn test_arrangement_from_json() {
        let json = r#"{
            "name": "two chords",
            "chord_table": [[[0, 4, 7], [5, 9, 12]]],
            "sequence": [0, 2, 1]
        }"#;
        let a = Arrangement::from_json(json).unwrap();
        assert_eq!(a.name, "two chords");
        assert_eq!(a.chord_table.chord_count(), 2);
        assert_eq!(a.sequence.len(), 3);
    }

    #[test]
    fn test_arrangement_sequence_wider_than_table() {
        let json = r#"{
            "name": "too wide",
            "chord_table": [[[0, 4, 7]]],
            "sequence": [0, 3]
        }"#;
        let err = Arrangement::from_json(json).unwrap_err();
        assert!(err.contains("exceeds"), "got: {}", err);
    }

    #[test]
    fn test_arrangement_bad_table_in_json() {
        let json = r#"{"name": "x", "chord_table": [[[0, 4], [0]]], "sequence": [0]}"#;
        assert!(Arrangement::from_json(json).is_err());
    }
}

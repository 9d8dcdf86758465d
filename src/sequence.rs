use serde::{Deserialize, Serialize};

/// Cyclic walk through a chord's scale steps. Each change of swipe
/// direction moves one position along it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct SequencePattern {
    steps: Vec<usize>,
}

impl SequencePattern {
    pub fn new(steps: Vec<usize>) -> Result<Self, String> {
        if steps.is_empty() {
            return Err("sequence pattern needs at least one step".into());
        }
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the pattern holds no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Scale step at a position, wrapping past the end.
    pub fn step(&self, index: usize) -> usize {
        self.steps[index % self.steps.len()]
    }

    pub fn max_step(&self) -> usize {
        self.steps.iter().copied().max().unwrap_or(0)
    }

    pub fn steps(&self) -> &[usize] {
        &self.steps
    }
}

impl TryFrom<Vec<usize>> for SequencePattern {
    type Error = String;

    fn try_from(steps: Vec<usize>) -> Result<Self, Self::Error> {
        SequencePattern::new(steps)
    }
}

impl From<SequencePattern> for Vec<usize> {
    fn from(p: SequencePattern) -> Self {
        p.steps
    }
}

/// Root, second, third, second, fourth, third, root, second.
pub fn default_sequence() -> SequencePattern {
    SequencePattern {
        steps: vec![0, 1, 2, 1, 3, 2, 0, 1],
    }
}

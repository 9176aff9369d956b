use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::parser::{Certainty, Direction};
use crate::runtime::Value;

/// A named value together with everything FigLang remembers about it
///
/// The history always holds at least one entry and its last entry is the
/// current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    value: Value,
    history: Vec<Value>,
    /// Certainty attached by the last assignment
    pub certainty: Certainty,
    /// Clamps applied after every assignment, in declaration order
    pub limits: Vec<(Direction, Value)>,
    /// `described_as`, `measured_in`, `owned_by`
    pub annotations: BTreeMap<String, String>,
}

impl Variable {
    /// Creates a variable whose history starts with `value`
    pub fn new(value: Value) -> Self {
        Self::with_certainty(value, Certainty::Definitely)
    }

    /// Creates a variable carrying a certainty qualifier
    pub fn with_certainty(value: Value, certainty: Certainty) -> Self {
        Variable {
            history: vec![value.clone()],
            value,
            certainty,
            limits: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Every value the variable has held, oldest first
    pub fn history(&self) -> &[Value] {
        &self.history
    }

    /// Number of reassignments since creation
    pub fn change_count(&self) -> usize {
        self.history.len() - 1
    }

    /// Stores a new value and returns the old one
    ///
    /// The value is recorded, then clamped by the limits; the last history
    /// entry is kept equal to the clamped value.
    pub fn set(&mut self, value: Value, certainty: Certainty) -> Value {
        self.history.push(value.clone());
        let old = std::mem::replace(&mut self.value, value);
        self.certainty = certainty;
        self.apply_limits();
        old
    }

    /// Replaces the limits; they clamp later assignments only
    pub fn set_limits(&mut self, limits: Vec<(Direction, Value)>) {
        self.limits = limits;
    }

    fn apply_limits(&mut self) {
        for (direction, bound) in &self.limits {
            let out_of_range = match (direction, self.value.ordering(bound)) {
                (Direction::Below, Some(Ordering::Less)) => true,
                (Direction::Above, Some(Ordering::Greater)) => true,
                _ => false,
            };
            if out_of_range {
                self.value = bound.clone();
            }
        }
        if let Some(last) = self.history.last_mut() {
            *last = self.value.clone();
        }
    }

    /// Value before the last assignment, or the current one if never
    /// reassigned
    pub fn previous(&self) -> &Value {
        if self.history.len() >= 2 {
            &self.history[self.history.len() - 2]
        } else {
            &self.value
        }
    }

    /// Largest number ever held, or the current value if none was numeric
    pub fn highest(&self) -> Value {
        self.numeric_extreme(Ordering::Greater)
    }

    /// Smallest number ever held, or the current value if none was numeric
    pub fn lowest(&self) -> Value {
        self.numeric_extreme(Ordering::Less)
    }

    fn numeric_extreme(&self, wanted: Ordering) -> Value {
        self.history
            .iter()
            .filter(|v| v.is_number())
            .fold(None::<&Value>, |best, v| match best {
                Some(b) if v.ordering(b) != Some(wanted) => Some(b),
                _ => Some(v),
            })
            .cloned()
            .unwrap_or_else(|| self.value.clone())
    }

    /// Last value strictly greater than the one before
    pub fn is_going_up(&self) -> bool {
        self.last_step() == Some(Ordering::Greater)
    }

    /// Last value strictly smaller than the one before
    pub fn is_going_down(&self) -> bool {
        self.last_step() == Some(Ordering::Less)
    }

    /// Last two history entries differ
    pub fn has_changed(&self) -> bool {
        match self.history.as_slice() {
            [.., before, last] => before != last,
            _ => false,
        }
    }

    fn last_step(&self) -> Option<Ordering> {
        match self.history.as_slice() {
            [.., before, last] => last.ordering(before),
            _ => None,
        }
    }
}

//! Greeting policy: time-of-day salutation and the session greeted-set.

use std::collections::HashSet;

/// Label used for faces that do not match the enrolled identity.
pub const UNKNOWN_LABEL: &str = "unknown person";

/// Salutation for an hour of day (0–23). Bands are half-open:
/// [5,12) morning, [12,18) afternoon, [18,22) evening, night otherwise.
pub fn greeting_word(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        18..=21 => "Good evening",
        _ => "Good night",
    }
}

/// Session-scoped record of identity labels already greeted.
///
/// Grows monotonically: a label enters the set at most once and is never
/// removed for the lifetime of the session. `should_greet` has no side
/// effect; the caller records the greeting explicitly after issuing it.
#[derive(Debug, Default)]
pub struct GreetingLedger {
    greeted: HashSet<String>,
}

impl GreetingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `label` has not been greeted this session.
    pub fn should_greet(&self, label: &str) -> bool {
        !self.greeted.contains(label)
    }

    /// Mark `label` as greeted.
    pub fn record(&mut self, label: &str) {
        self.greeted.insert(label.to_string());
    }

    pub fn len(&self) -> usize {
        self.greeted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.greeted.is_empty()
    }
}

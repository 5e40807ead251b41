//! Testing utilities for the combat engine.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedRolls` for dice that come up exactly as scripted
//! - Assertion helpers for checking the event log

use crate::dice::RollSource;
use crate::events::EventLog;
use std::collections::VecDeque;

/// A roll source that replays scripted die results.
///
/// Each die takes the next scripted value. Once the script runs out every
/// die shows the fallback. Values are clamped to the faces of the die being
/// rolled, so a scripted 20 on a d6 reads as 6.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    /// Results still to come, in order.
    queue: VecDeque<u32>,
    /// Result once the queue is empty.
    fallback: u32,
    /// Number of dice rolled so far.
    drawn: usize,
}

impl ScriptedRolls {
    /// Script the given results, falling back to 1 afterwards.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback: 1,
            drawn: 0,
        }
    }

    /// Every die shows the same value.
    pub fn constant(value: u32) -> Self {
        Self::new([]).with_fallback(value)
    }

    pub fn with_fallback(mut self, value: u32) -> Self {
        self.fallback = value;
        self
    }

    /// Queue another result after the scripted ones.
    pub fn then(mut self, value: u32) -> Self {
        self.queue.push_back(value);
        self
    }

    /// Scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl RollSource for ScriptedRolls {
    fn roll_die(&mut self, faces: u32) -> u32 {
        self.drawn += 1;
        let value = self.queue.pop_front().unwrap_or(self.fallback);
        value.clamp(1, faces.max(1))
    }
}

/// Assert that some logged message contains `needle`.
pub fn assert_logged(log: &EventLog, needle: &str) {
    assert!(
        log.messages().any(|m| m.contains(needle)),
        "expected a message containing {needle:?}, log was:\n{log}"
    );
}

/// Assert that no logged message contains `needle`.
pub fn assert_not_logged(log: &EventLog, needle: &str) {
    assert!(
        !log.messages().any(|m| m.contains(needle)),
        "unexpected message containing {needle:?}, log was:\n{log}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSink;

    #[test]
    fn test_scripted_rolls_replay_in_order() {
        let mut rolls = ScriptedRolls::new([3, 5]).then(2);
        assert_eq!(rolls.remaining(), 3);
        assert_eq!(rolls.roll_die(6), 3);
        assert_eq!(rolls.roll_die(6), 5);
        assert_eq!(rolls.roll_die(6), 2);
        assert_eq!(rolls.roll_die(6), 1);
        assert_eq!(rolls.drawn(), 4);
        assert_eq!(rolls.remaining(), 0);
    }

    #[test]
    fn test_scripted_rolls_clamp_to_faces() {
        let mut rolls = ScriptedRolls::new([20, 0]).with_fallback(9);
        assert_eq!(rolls.roll_die(6), 6);
        assert_eq!(rolls.roll_die(6), 1);
        assert_eq!(rolls.roll_die(8), 8);
        assert_eq!(rolls.roll_die(20), 9);
        assert_eq!(rolls.roll_die(0), 1);
    }

    #[test]
    fn test_constant_rolls() {
        let mut rolls = ScriptedRolls::constant(4);
        assert!((0..10).all(|_| rolls.roll_die(20) == 4));
    }

    #[test]
    fn test_log_assertions() {
        let mut log = EventLog::new();
        log.log("Kobold attacks Bandit");
        assert_logged(&log, "attacks");
        assert_not_logged(&log, "casts");
    }

    #[test]
    #[should_panic(expected = "expected a message")]
    fn test_assert_logged_panics_when_missing() {
        assert_logged(&EventLog::new(), "anything");
    }
}

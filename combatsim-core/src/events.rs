//! Narrative event sinks.
//!
//! Everything that happens during an action is reported as a plain message.
//! The encounter loop tells the sink when a new round begins so that a
//! [`EventLog`] can stamp each message with its round.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Receives narrative messages.
pub trait EventSink {
    fn log(&mut self, message: &str);

    /// Called by the encounter loop before the first action of each round.
    fn begin_round(&mut self, _round: u32) {}
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn log(&mut self, message: &str) {
        (**self).log(message);
    }

    fn begin_round(&mut self, round: u32) {
        (**self).begin_round(round);
    }
}

/// One message, stamped with the round it happened in (0 before round one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub round: u32,
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:: {}", self.round, self.message)
    }
}

/// An in-memory log of every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    round: u32,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Serialize the log for storage or replay comparison.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}

impl EventSink for EventLog {
    fn log(&mut self, message: &str) {
        self.events.push(Event {
            round: self.round,
            message: message.to_string(),
        });
    }

    fn begin_round(&mut self, round: u32) {
        self.round = round;
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log(&mut self, _message: &str) {}
}

//! Two-axis shake classifier.
//! A front/back jerk (Z dominant) deletes a word, a side-to-side jerk
//! (X dominant) restores it. The gravity-aligned Y axis is ignored.

use serde::Serialize;
use tracing::trace;

use crate::sensor::MotionSample;

/// Default trigger level in g, tuned on handsets.
pub const DEFAULT_THRESHOLD: f64 = 1.2;
pub const DEFAULT_DEBOUNCE_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureEvent {
    None,
    Delete, // delete word at cursor
    Redo,   // restore last deleted word
}

impl GestureEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureEvent::None => "none",
            GestureEvent::Delete => "delete",
            GestureEvent::Redo => "redo",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, GestureEvent::None)
    }
}

/// Owns the debounce timestamp and the tuning constants. One instance per
/// sample stream; not meant to be shared between threads.
#[derive(Debug, Clone)]
pub struct Classifier {
    threshold: f64,
    debounce_window_ms: i64,
    last_event_ms: i64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_DEBOUNCE_MS)
    }
}

impl Classifier {
    pub fn new(threshold: f64, debounce_window_ms: i64) -> Self {
        Self {
            threshold,
            debounce_window_ms,
            last_event_ms: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn debounce_window_ms(&self) -> i64 {
        self.debounce_window_ms
    }

    /// Timestamp of the last accepted gesture, 0 before the first one.
    pub fn last_event_ms(&self) -> i64 {
        self.last_event_ms
    }

    pub fn reset(&mut self) {
        self.last_event_ms = 0;
    }

    /// Classify one accelerometer sample.
    /// Only a returned `Delete` or `Redo` moves the debounce timestamp.
    pub fn classify(&mut self, sample: &MotionSample) -> GestureEvent {
        // A NaN here would compare false everywhere, but an infinite axis
        // would fire and then hold the debounce gate shut
        if !sample.is_finite() {
            trace!(ts = sample.timestamp_ms, "ignoring non-finite sample");
            return GestureEvent::None;
        }

        let (nx, _, nz) = sample.normalized();
        let abs_x = nx.abs();
        let abs_z = nz.abs();

        if sample.timestamp_ms.saturating_sub(self.last_event_ms) < self.debounce_window_ms {
            return GestureEvent::None;
        }

        // Z is checked first, but equal magnitudes match neither branch
        let event = if abs_z > self.threshold && abs_z > abs_x {
            GestureEvent::Delete
        } else if abs_x > self.threshold && abs_x > abs_z {
            GestureEvent::Redo
        } else {
            GestureEvent::None
        };

        if !event.is_none() {
            self.last_event_ms = sample.timestamp_ms;
        }

        event
    }
}

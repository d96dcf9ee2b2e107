//! Binds a classifier to a shared edit buffer.

use std::io::{BufRead, Read};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::{EditOutcome, TextBufferState, WordBuffer};
use crate::detector::{Classifier, GestureEvent};
use crate::error::EditError;
use crate::sensor::MotionSample;

/// The buffer is mutated from the gesture loop and from keystroke input, so
/// every access goes through one lock.
pub type SharedBuffer = Arc<Mutex<WordBuffer>>;

pub fn shared_buffer(buffer: WordBuffer) -> SharedBuffer {
    Arc::new(Mutex::new(buffer))
}

/// Longest client edit line accepted, newline excluded.
pub const MAX_EDIT_LINE_BYTES: usize = 64 * 1024;

/// Result of routing one gesture to the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub gesture: GestureEvent,
    pub outcome: EditOutcome,
    pub state: TextBufferState,
}

pub struct Session {
    classifier: Classifier,
    buffer: SharedBuffer,
}

impl Session {
    pub fn new(classifier: Classifier, buffer: SharedBuffer) -> Self {
        Self { classifier, buffer }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn buffer(&self) -> SharedBuffer {
        Arc::clone(&self.buffer)
    }

    pub fn snapshot(&self) -> TextBufferState {
        self.buffer
            .lock()
            .expect("word buffer lock poisoned")
            .state()
            .clone()
    }

    /// Keystroke path into the same buffer the gestures edit.
    pub fn set_value(
        &self,
        text: impl Into<String>,
        cursor: usize,
        selection_end: usize,
    ) -> Result<(), EditError> {
        let mut guard = self.buffer.lock().expect("word buffer lock poisoned");
        guard.set_value(text, cursor, selection_end)
    }

    /// Classify one sample and apply the resulting gesture, if any.
    pub fn handle_sample(&mut self, sample: &MotionSample) -> Option<Dispatch> {
        let gesture = self.classifier.classify(sample);
        if gesture.is_none() {
            return None;
        }

        let mut guard = self.buffer.lock().expect("word buffer lock poisoned");
        let outcome = guard.apply(gesture);
        let state = guard.state().clone();
        drop(guard);

        debug!(
            gesture = gesture.as_str(),
            ts = sample.timestamp_ms,
            changed = !outcome.is_unchanged(),
            "gesture dispatched"
        );
        Some(Dispatch {
            gesture,
            outcome,
            state,
        })
    }

    /// Drain `rx` until every sender is gone, handing each dispatch to
    /// `on_dispatch`. Returns the number of gestures dispatched.
    pub fn run<F>(&mut self, rx: mpsc::Receiver<MotionSample>, mut on_dispatch: F) -> u64
    where
        F: FnMut(&Dispatch),
    {
        let mut dispatched = 0u64;
        while let Ok(sample) = rx.recv() {
            if let Some(dispatch) = self.handle_sample(&sample) {
                dispatched += 1;
                on_dispatch(&dispatch);
            }
        }
        info!(dispatched, "sample source closed");
        dispatched
    }
}

/// Apply `TextBufferState` JSON lines from a text-input client to `buffer`.
///
/// Blank and malformed lines are skipped, and out-of-range edits are
/// rejected without touching the buffer. Reading stops at end of input, on
/// an I/O error, or at a line longer than [`MAX_EDIT_LINE_BYTES`].
///
/// Returns the number of edits applied.
pub fn apply_client_edits<R: BufRead>(mut reader: R, buffer: &SharedBuffer) -> usize {
    let mut applied = 0;
    let mut line = Vec::new();

    loop {
        line.clear();
        let limit = MAX_EDIT_LINE_BYTES as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("client read error: {e}");
                break;
            }
        }
        if !line.ends_with(b"\n") && line.len() > MAX_EDIT_LINE_BYTES {
            warn!(limit = MAX_EDIT_LINE_BYTES, "client edit line too long, dropping client");
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let edit: TextBufferState = match serde_json::from_slice(&line) {
            Ok(edit) => edit,
            Err(e) => {
                warn!("ignoring malformed client edit: {e}");
                continue;
            }
        };

        let mut guard = buffer.lock().expect("word buffer lock poisoned");
        match guard.set_value(edit.text, edit.cursor, edit.selection_end) {
            Ok(()) => applied += 1,
            Err(e) => warn!("rejected client edit: {e}"),
        }
    }

    applied
}

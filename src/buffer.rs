//! Word-oriented edit buffer with a single-slot undo.
//!
//! Positions (`cursor`, `selection_end`, restore points) count Unicode scalar
//! values, not bytes, so a position can never land inside a UTF-8 sequence.
//! Words are separated by ASCII spaces only.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detector::GestureEvent;
use crate::error::EditError;

/// Text plus selection. `0 <= cursor <= selection_end <= text length`
/// holds for every state a [`WordBuffer`] exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBufferState {
    pub text: String,
    pub cursor: usize,
    pub selection_end: usize,
}

impl TextBufferState {
    /// Length of `text` in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The most recently deleted word. Depth one: a new delete overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UndoSlot {
    #[default]
    Empty,
    Holding { word: String, restore_cursor: usize },
}

/// What a buffer operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EditOutcome {
    Unchanged,
    Deleted { word: String },
    Restored { word: String },
}

impl EditOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, EditOutcome::Unchanged)
    }
}

#[derive(Debug, Default)]
pub struct WordBuffer {
    state: TextBufferState,
    undo: UndoSlot,
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(
        text: impl Into<String>,
        cursor: usize,
        selection_end: usize,
    ) -> Result<Self, EditError> {
        let mut buffer = Self::new();
        buffer.set_value(text, cursor, selection_end)?;
        Ok(buffer)
    }

    pub fn state(&self) -> &TextBufferState {
        &self.state
    }

    pub fn undo_slot(&self) -> &UndoSlot {
        &self.undo
    }

    /// Replace text and selection wholesale, as keystrokes and IME edits do.
    /// The undo slot is left alone.
    ///
    /// # Errors
    /// Returns [`EditError::InvalidRange`] without touching the buffer when
    /// the positions are out of order or past the end of `text`.
    pub fn set_value(
        &mut self,
        text: impl Into<String>,
        cursor: usize,
        selection_end: usize,
    ) -> Result<(), EditError> {
        let text = text.into();
        let len = text.chars().count();
        if cursor > selection_end || selection_end > len {
            return Err(EditError::InvalidRange {
                cursor,
                selection_end,
                len,
            });
        }

        debug!(text = %text, cursor, selection_end, "set_value");
        self.state = TextBufferState {
            text,
            cursor,
            selection_end,
        };
        Ok(())
    }

    /// Empty the text and put the cursor at 0. The undo slot survives, so a
    /// word deleted before the clear can still be restored.
    pub fn clear(&mut self) {
        debug!("clear called");
        self.state = TextBufferState::default();
    }

    /// Remove the word touching the cursor and remember it for
    /// [`restore_last_deleted`](Self::restore_last_deleted).
    pub fn delete_word_at_cursor(&mut self) -> EditOutcome {
        let cursor = self.state.cursor;
        let text = &self.state.text;

        if text.is_empty() {
            debug!("nothing to remove, text was empty");
            return EditOutcome::Unchanged;
        }
        if cursor == 0 {
            debug!("nothing to remove, cursor at start");
            return EditOutcome::Unchanged;
        }

        let cursor_byte = byte_offset(text, cursor);
        let before = text[..cursor_byte].rfind(' ').map_or(0, |i| i + 1);
        let after = text[cursor_byte..]
            .find(' ')
            .map_or(text.len(), |i| cursor_byte + i);
        if before >= after {
            debug!(before, after, "no word found to remove");
            return EditOutcome::Unchanged;
        }

        let restore_cursor = text[..before].chars().count();
        let word = text[before..after].to_string();
        let old_text = text.clone();

        self.state.text.replace_range(before..after, "");
        self.state.cursor = restore_cursor;
        self.state.selection_end = restore_cursor;
        debug!(
            before = %old_text,
            after = %self.state.text,
            cursor,
            new_cursor = restore_cursor,
            "removed current word"
        );

        self.undo = UndoSlot::Holding {
            word: word.clone(),
            restore_cursor,
        };
        EditOutcome::Deleted { word }
    }

    /// Splice the last deleted word back in at the position it was removed
    /// from, then empty the slot. The current text is not compared against
    /// the text at delete time; a restore point past the end is clamped to
    /// the end.
    pub fn restore_last_deleted(&mut self) -> EditOutcome {
        let (word, restore_cursor) = match std::mem::take(&mut self.undo) {
            UndoSlot::Empty => {
                debug!("nothing to restore");
                return EditOutcome::Unchanged;
            }
            UndoSlot::Holding {
                word,
                restore_cursor,
            } => (word, restore_cursor),
        };

        let at = restore_cursor.min(self.state.len());
        let at_byte = byte_offset(&self.state.text, at);
        self.state.text.insert_str(at_byte, &word);

        let new_cursor = at + word.chars().count();
        self.state.cursor = new_cursor;
        self.state.selection_end = new_cursor;
        debug!(word = %word, text = %self.state.text, cursor = new_cursor, "restored word");

        EditOutcome::Restored { word }
    }

    /// Route a classified gesture to its edit.
    pub fn apply(&mut self, event: GestureEvent) -> EditOutcome {
        match event {
            GestureEvent::Delete => self.delete_word_at_cursor(),
            GestureEvent::Redo => self.restore_last_deleted(),
            GestureEvent::None => EditOutcome::Unchanged,
        }
    }
}

/// Byte offset of char index `idx`, or the end of `text` past the last char.
fn byte_offset(text: &str, idx: usize) -> usize {
    text.char_indices().nth(idx).map_or(text.len(), |(b, _)| b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(buffer: &WordBuffer) {
        let s = buffer.state();
        assert!(s.cursor <= s.selection_end, "cursor past selection: {:?}", s);
        assert!(s.selection_end <= s.len(), "selection past end: {:?}", s);
    }

    #[test]
    fn delete_then_restore_round_trips() {
        let mut buffer = WordBuffer::with_value("hello world", 11, 11).unwrap();

        let outcome = buffer.delete_word_at_cursor();
        assert_eq!(
            outcome,
            EditOutcome::Deleted {
                word: "world".into()
            }
        );
        assert_eq!(buffer.state().text, "hello ");
        assert_eq!(buffer.state().cursor, 6);
        assert_eq!(buffer.state().selection_end, 6);

        buffer.restore_last_deleted();
        assert_eq!(buffer.state().text, "hello world");
        assert_eq!(buffer.state().cursor, 11);
        assert_eq!(buffer.undo_slot(), &UndoSlot::Empty);
    }

    #[test]
    fn mid_word_cursor_removes_whole_word() {
        let mut buffer = WordBuffer::with_value("the quick brown fox", 8, 8).unwrap();

        buffer.delete_word_at_cursor();

        // Surrounding spaces are kept, so the restore is exact
        assert_eq!(buffer.state().text, "the  brown fox");
        assert_eq!(buffer.state().cursor, 4);
        assert_eq!(
            buffer.undo_slot(),
            &UndoSlot::Holding {
                word: "quick".into(),
                restore_cursor: 4
            }
        );

        buffer.restore_last_deleted();
        assert_eq!(buffer.state().text, "the quick brown fox");
        assert_eq!(buffer.state().cursor, 9);
    }

    #[test]
    fn empty_text_is_noop() {
        let mut buffer = WordBuffer::new();
        assert!(buffer.delete_word_at_cursor().is_unchanged());
        assert_eq!(buffer.state(), &TextBufferState::default());
        assert_eq!(buffer.undo_slot(), &UndoSlot::Empty);
    }

    #[test]
    fn cursor_at_start_is_noop() {
        let mut buffer = WordBuffer::with_value("hello", 0, 3).unwrap();
        assert!(buffer.delete_word_at_cursor().is_unchanged());
        assert_eq!(buffer.state().text, "hello");
        assert_eq!(buffer.state().selection_end, 3);
    }

    #[test]
    fn cursor_between_two_spaces_is_noop() {
        let mut buffer = WordBuffer::with_value("a  b", 2, 2).unwrap();
        assert!(buffer.delete_word_at_cursor().is_unchanged());
        assert_eq!(buffer.state().text, "a  b");
        assert_eq!(buffer.undo_slot(), &UndoSlot::Empty);
    }

    #[test]
    fn cursor_before_space_removes_preceding_word() {
        let mut buffer = WordBuffer::with_value("hello world", 5, 5).unwrap();
        buffer.delete_word_at_cursor();
        assert_eq!(buffer.state().text, " world");
        assert_eq!(buffer.state().cursor, 0);
    }

    #[test]
    fn delete_collapses_selection() {
        let mut buffer = WordBuffer::with_value("one two three", 5, 13).unwrap();
        buffer.delete_word_at_cursor();
        assert_eq!(buffer.state().text, "one  three");
        assert_eq!(buffer.state().cursor, 4);
        assert_eq!(buffer.state().selection_end, 4);
    }

    #[test]
    fn second_restore_is_noop() {
        let mut buffer = WordBuffer::with_value("hello world", 11, 11).unwrap();
        buffer.delete_word_at_cursor();

        assert!(!buffer.restore_last_deleted().is_unchanged());
        let after_first = buffer.state().clone();
        assert!(buffer.restore_last_deleted().is_unchanged());
        assert_eq!(buffer.state(), &after_first);
    }

    #[test]
    fn restore_without_delete_is_noop() {
        let mut buffer = WordBuffer::with_value("hello", 5, 5).unwrap();
        assert!(buffer.restore_last_deleted().is_unchanged());
        assert_eq!(buffer.state().text, "hello");
    }

    #[test]
    fn only_latest_delete_is_restorable() {
        let mut buffer = WordBuffer::with_value("alpha beta gamma", 16, 16).unwrap();
        buffer.delete_word_at_cursor();
        assert_eq!(buffer.state().text, "alpha beta ");

        buffer.set_value("alpha beta", 10, 10).unwrap();
        buffer.delete_word_at_cursor();
        assert_eq!(buffer.state().text, "alpha ");

        assert_eq!(
            buffer.restore_last_deleted(),
            EditOutcome::Restored {
                word: "beta".into()
            }
        );
        assert_eq!(buffer.state().text, "alpha beta");
        assert!(buffer.restore_last_deleted().is_unchanged());
    }

    #[test]
    fn set_value_rejects_bad_ranges_without_mutation() {
        let mut buffer = WordBuffer::with_value("abc", 1, 2).unwrap();

        assert_eq!(
            buffer.set_value("xy", 0, 3),
            Err(EditError::InvalidRange {
                cursor: 0,
                selection_end: 3,
                len: 2
            })
        );
        assert!(buffer.set_value("xyz", 2, 1).is_err());
        assert_eq!(buffer.state().text, "abc");
        assert_eq!(buffer.state().cursor, 1);
        assert_eq!(buffer.state().selection_end, 2);
    }

    #[test]
    fn set_value_keeps_pending_undo() {
        let mut buffer = WordBuffer::with_value("hello world", 11, 11).unwrap();
        buffer.delete_word_at_cursor();
        buffer.set_value("hello there", 11, 11).unwrap();

        // Inserted into whatever the text is now
        buffer.restore_last_deleted();
        assert_eq!(buffer.state().text, "hello worldthere");
        assert_eq!(buffer.state().cursor, 11);
    }

    #[test]
    fn restore_clamps_to_shortened_text() {
        let mut buffer = WordBuffer::with_value("hello world", 11, 11).unwrap();
        buffer.delete_word_at_cursor();
        buffer.clear();

        buffer.restore_last_deleted();
        assert_eq!(buffer.state().text, "world");
        assert_eq!(buffer.state().cursor, 5);
        assert_invariant(&buffer);
    }

    #[test]
    fn positions_count_chars_not_bytes() {
        let mut buffer = WordBuffer::with_value("café crème brûlée", 10, 10).unwrap();

        assert_eq!(
            buffer.delete_word_at_cursor(),
            EditOutcome::Deleted {
                word: "crème".into()
            }
        );
        assert_eq!(buffer.state().text, "café  brûlée");
        assert_eq!(buffer.state().cursor, 5);

        buffer.restore_last_deleted();
        assert_eq!(buffer.state().text, "café crème brûlée");
        assert_eq!(buffer.state().cursor, 10);
    }

    #[test]
    fn apply_routes_gestures() {
        let mut buffer = WordBuffer::with_value("hello world", 11, 11).unwrap();

        assert!(buffer.apply(GestureEvent::None).is_unchanged());
        assert_eq!(
            buffer.apply(GestureEvent::Delete),
            EditOutcome::Deleted {
                word: "world".into()
            }
        );
        assert_eq!(
            buffer.apply(GestureEvent::Redo),
            EditOutcome::Restored {
                word: "world".into()
            }
        );
    }

    #[test]
    fn invariant_holds_across_mixed_operations() {
        let mut buffer = WordBuffer::with_value("a bb ccc dddd", 13, 13).unwrap();
        let script = [
            GestureEvent::Delete,
            GestureEvent::Delete,
            GestureEvent::Redo,
            GestureEvent::Redo,
            GestureEvent::Delete,
            GestureEvent::Delete,
            GestureEvent::Delete,
            GestureEvent::Delete,
            GestureEvent::Redo,
        ];
        for event in script {
            buffer.apply(event);
            assert_invariant(&buffer);
        }
    }
}

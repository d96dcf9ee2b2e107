//! Shake-to-edit core: classify accelerometer jerks into delete/redo gestures
//! and apply them to a word buffer with a single-slot undo.

pub mod buffer;
#[cfg(unix)]
pub mod clients;
pub mod config;
pub mod detector;
pub mod error;
pub mod sensor;
pub mod session;

pub use buffer::{EditOutcome, TextBufferState, UndoSlot, WordBuffer};
pub use config::Config;
pub use detector::{Classifier, GestureEvent};
pub use error::{ConfigError, EditError, SourceError};
pub use sensor::MotionSample;
pub use session::{Dispatch, Session, SharedBuffer};

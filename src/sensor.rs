//! Motion samples and the stream that feeds them to the classifier.
//!
//! The hardware reader is replaced by a newline-delimited JSON stream, one
//! sample per line:
//!
//! ```text
//! {"x":0.1,"y":9.8,"z":14.2,"timestamp_ms":1200}
//! ```
//!
//! Any producer (a phone bridge, a recorded trace, a test) can write it.

use std::io::BufRead;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SourceError;

/// Standard gravity in m/s².
pub const GRAVITY_EARTH: f64 = 9.80665;

// ── Public types ────────────────────────────────────────────────────────────

/// A raw accelerometer reading in m/s². Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: i64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    /// False when any axis is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Axes expressed in g.
    pub fn normalized(&self) -> (f64, f64, f64) {
        (
            self.x / GRAVITY_EARTH,
            self.y / GRAVITY_EARTH,
            self.z / GRAVITY_EARTH,
        )
    }
}

// ── Decoding ────────────────────────────────────────────────────────────────

/// Decode samples from a line-oriented reader. Blank lines are skipped; a
/// malformed line yields a `Parse` error carrying its 1-based line number and
/// decoding continues with the next line.
pub fn read_samples<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<MotionSample, SourceError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Err(e) => Some(Err(SourceError::Io(e))),
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str::<MotionSample>(line.trim())
                    .map_err(|source| SourceError::Parse {
                        line: idx + 1,
                        source,
                    }),
            ),
        })
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Forward samples from `reader` into `tx` until the input ends, the reader
/// fails, or the receiving side hangs up. Blocks, so run it on a dedicated
/// thread.
///
/// Returns the number of samples delivered.
pub fn start<R: BufRead>(reader: R, tx: mpsc::Sender<MotionSample>) -> Result<u64, SourceError> {
    let mut delivered = 0u64;

    for item in read_samples(reader) {
        let sample = match item {
            Ok(sample) => sample,
            Err(SourceError::Parse { line, source }) => {
                warn!(line, error = %source, "skipping malformed sample");
                continue;
            }
            Err(e) => return Err(e),
        };

        // Receiver gone: the session is over, stop delivering
        if tx.send(sample).is_err() {
            debug!(delivered, "sample receiver closed");
            break;
        }
        delivered += 1;
    }

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn normalizes_by_standard_gravity() {
        let sample = MotionSample::new(GRAVITY_EARTH, 0.0, -2.0 * GRAVITY_EARTH, 10);
        let (nx, ny, nz) = sample.normalized();
        assert!((nx - 1.0).abs() < 1e-12);
        assert_eq!(ny, 0.0);
        assert!((nz + 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_axes_are_detected() {
        assert!(MotionSample::new(0.0, 9.8, 0.0, 0).is_finite());
        assert!(!MotionSample::new(f64::NAN, 0.0, 0.0, 0).is_finite());
        assert!(!MotionSample::new(0.0, f64::INFINITY, 0.0, 0).is_finite());
        assert!(!MotionSample::new(0.0, 0.0, f64::NEG_INFINITY, 0).is_finite());
    }

    #[test]
    fn reads_json_lines_and_skips_blanks() {
        let input = "{\"x\":1.0,\"y\":2.0,\"z\":3.0,\"timestamp_ms\":5}\n\n  \n\
                     {\"x\":-1.5,\"y\":0.0,\"z\":12.0,\"timestamp_ms\":25}\n";
        let samples: Vec<_> = read_samples(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            samples,
            vec![
                MotionSample::new(1.0, 2.0, 3.0, 5),
                MotionSample::new(-1.5, 0.0, 12.0, 25),
            ]
        );
    }

    #[test]
    fn parse_errors_report_line_number() {
        let input = "{\"x\":1.0,\"y\":2.0,\"z\":3.0,\"timestamp_ms\":5}\nnot json\n";
        let results: Vec<_> = read_samples(Cursor::new(input)).collect();

        assert!(results[0].is_ok());
        match &results[1] {
            Err(SourceError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn start_skips_malformed_lines() {
        let input = "{\"x\":1.0,\"y\":2.0,\"z\":3.0,\"timestamp_ms\":5}\n\
                     {\"x\":\"oops\"}\n\
                     {\"x\":4.0,\"y\":5.0,\"z\":6.0,\"timestamp_ms\":9}\n";
        let (tx, rx) = mpsc::channel();

        let delivered = start(Cursor::new(input), tx).unwrap();

        assert_eq!(delivered, 2);
        let received: Vec<_> = rx.iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].timestamp_ms, 9);
    }

    #[test]
    fn start_stops_when_receiver_is_dropped() {
        let input = "{\"x\":1.0,\"y\":2.0,\"z\":3.0,\"timestamp_ms\":5}\n\
                     {\"x\":4.0,\"y\":5.0,\"z\":6.0,\"timestamp_ms\":9}\n";
        let (tx, rx) = mpsc::channel();
        drop(rx);

        assert_eq!(start(Cursor::new(input), tx).unwrap(), 0);
    }
}

use thiserror::Error;

/// Rejected edits. Nothing is mutated when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid range: cursor {cursor}, selection end {selection_end}, text length {len}")]
    InvalidRange {
        cursor: usize,
        selection_end: usize,
        len: usize,
    },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("sample source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed sample on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be a finite positive number, got {0}")]
    Threshold(f64),

    #[error("debounce window must not be negative, got {0}ms")]
    Debounce(i64),
}

//! Error types for the subont-graph crate.

use subont_core::Interrupted;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Input has no header row")]
    EmptyInput,

    #[error("Required column {column:?} not found in header: {header}")]
    MissingColumn { column: String, header: String },

    #[error("Malformed record at line {line}: {reason} (content: {content:?})")]
    MalformedRecord {
        line: usize,
        reason: String,
        content: String,
    },

    #[error("Computation timeout: exceeded {max_seconds}s limit")]
    Timeout { max_seconds: u64 },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl From<Interrupted> for GraphError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::TimedOut { max_seconds } => Self::Timeout { max_seconds },
            Interrupted::Cancelled => Self::Cancelled,
        }
    }
}

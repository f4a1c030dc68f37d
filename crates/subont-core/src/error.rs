use thiserror::Error;

/// Top-level error type for subont.
#[derive(Error, Debug)]
pub enum SubontError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid concept code {value:?}: {reason}")]
    InvalidConceptCode { value: String, reason: &'static str },

    #[error("Invalid relation type filter {0:?}: expected \"116680003\", \"is-a-only\" or \"all\"")]
    InvalidRelationFilter(String),

    #[error("Invalid delimiter {0:?}: expected exactly one character")]
    InvalidDelimiter(String),
}

impl From<config::ConfigError> for SubontError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SubontError>;

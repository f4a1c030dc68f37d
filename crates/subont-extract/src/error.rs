//! Error types for the subont-extract crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Core(#[from] subont_core::SubontError),

    #[error("Graph error: {0}")]
    Graph(#[from] subont_graph::GraphError),

    #[error("No seed concepts given")]
    NoSeeds,

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

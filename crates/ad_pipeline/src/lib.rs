//! ad_pipeline: one dashboard session over a loaded snapshot.
//!
//! load (ad_io) → index + series (ad_algo) → [`Dashboard`] query surface.
//! File access is confined to [`load`]; everything else is pure over the
//! loaded data.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod access;
pub mod dashboard;
pub mod load;
pub mod rollup;

pub use access::{AccessEditor, AccessGrant};
pub use dashboard::Dashboard;
pub use load::{load_dashboard, LoadReport};

/// Single error surface for session construction and token parsing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io: {0}")]
    Io(String),
    #[error("input: {0}")]
    Input(String),
    #[error("{0}")]
    Token(String),
}

impl From<ad_io::IoError> for PipelineError {
    fn from(e: ad_io::IoError) -> Self {
        use ad_io::IoError;
        match e {
            IoError::Path(m) => PipelineError::Io(format!("path: {m}")),
            IoError::TooLarge { path, limit } => PipelineError::Io(format!("{path}: larger than {limit} bytes")),
            IoError::Json { pointer, msg } => PipelineError::Input(format!("json {pointer}: {msg}")),
            IoError::Invalid(m) => PipelineError::Input(m),
        }
    }
}

impl From<ad_core::errors::CoreError> for PipelineError {
    fn from(e: ad_core::errors::CoreError) -> Self {
        PipelineError::Token(e.to_string())
    }
}

//! ad_io: local JSON in, canonical JSON out.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - [`loader`]: snapshot / monthly / params files → `ad_core` raw shapes.
//! - [`canonical_json`]: sorted-key compact JSON and atomic file writes.
//!
//! No network I/O. Data repairs (bad amounts, unresolved parents) are not
//! errors here; they are left to `ad_algo`, which reports them as issues.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for ad_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors.
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse errors, or a document of the wrong overall shape.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Input larger than the loader accepts.
    #[error("{path}: input exceeds {limit} bytes")]
    TooLarge { path: String, limit: u64 },

    /// Well-formed but out-of-domain values (e.g. params).
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

impl From<ad_core::errors::CoreError> for IoError {
    fn from(e: ad_core::errors::CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

pub mod canonical_json;
pub mod loader;

pub use loader::{load_monthly, load_params, load_snapshot, MonthlyInput, SkippedRow, SnapshotInput};

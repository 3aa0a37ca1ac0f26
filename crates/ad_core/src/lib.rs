//! ad_core: Core types, ordering helpers, rounding and params.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`ad_io`, `ad_algo`, `ad_pipeline`, `ad_cli`).
//!
//! - Canonical ids: `RegionId`, `BranchId`, `CentreId`
//! - Hierarchy entities and monthly records
//! - Raw ingest shapes (bare id *or* embedded object references)
//! - One-decimal display rounding
//! - Stable ordering helpers (index-tagged sorts, case-folded names)
//! - `Params` with safe defaults
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain parsing & validation.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidPeriod(String),
        InvalidToken(&'static str, String),
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidPeriod(s) => write!(f, "invalid period (want YYYY-MM): {s}"),
                CoreError::InvalidToken(kind, s) => write!(f, "invalid {kind}: {s}"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod ids;
pub mod entities;
pub mod raw;
pub mod rounding;
pub mod determinism;
pub mod variables;

pub use entities::{Branch, Centre, Completeness, Level, MonthlyRecord, Period, Region};
pub use ids::{BranchId, CentreId, IdError, RegionId};

//! Algorithm layer. Pure, synchronous, no I/O.
//!
//! raw snapshot → [`hierarchy::HierarchyIndex`] → [`metrics`] → [`ranking`]
//! and, independently, selection events → [`selection::SelectionSet`] →
//! [`cascade::CascadeFilter`].

#![forbid(unsafe_code)]

pub mod hierarchy;
pub mod metrics;
pub mod ranking;
pub mod selection;
pub mod cascade;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use cascade::{CascadeFilter, CascadeView, LevelOption, OutOfScope, SearchTerms, SelectionOp, SelectionState};
pub use hierarchy::{HierarchyIndex, IndexIssue};
pub use metrics::{
    aggregate, classify, period_metrics, AggregateMetrics, Classification, MonthlySeries,
    PeriodMetrics, SeriesIssue, Trend,
};
pub use ranking::{rank, RankInput, RankedEntry};
pub use selection::SelectionSet;


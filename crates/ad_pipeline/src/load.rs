//! LOAD stage: local files → `ad_io` loaders → one ready [`Dashboard`].

use std::collections::BTreeMap;
use std::path::Path;

use ad_core::variables::Params;
use ad_io::{loader, SkippedRow};

use crate::{Dashboard, PipelineError};

/// What ingest repaired or dropped, for the caller to surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub skipped: Vec<SkippedRow>,
    pub index_issues: usize,
    pub series_issues: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.index_issues == 0 && self.series_issues == 0
    }
}

/// `monthly` and `params` are optional; without them every Centre has an
/// empty series and params take their defaults.
pub fn load_dashboard(
    snapshot: &Path,
    monthly: Option<&Path>,
    params: Option<&Path>,
) -> Result<(Dashboard, LoadReport), PipelineError> {
    let snap = loader::load_snapshot(snapshot)?;
    let mut skipped = snap.skipped;

    let by_centre = match monthly {
        Some(p) => {
            let m = loader::load_monthly(p)?;
            skipped.extend(m.skipped);
            m.by_centre
        }
        None => BTreeMap::new(),
    };

    let params = match params {
        Some(p) => loader::load_params(p)?,
        None => Params::default(),
    };

    let dashboard = Dashboard::new(&snap.snapshot, &by_centre, params);
    let report = LoadReport {
        skipped,
        index_issues: dashboard.issues().len(),
        series_issues: dashboard.series_issues().values().map(Vec::len).sum(),
    };
    if !report.is_clean() {
        tracing::warn!(
            skipped = report.skipped.len(),
            index_issues = report.index_issues,
            series_issues = report.series_issues,
            "input loaded with repairs"
        );
    }
    Ok((dashboard, report))
}

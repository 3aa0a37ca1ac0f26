//! Dashboard session: the query surface the presentation layer talks to.
//!
//! A session owns its own cascade state and shares the immutable index and
//! series with nobody else. All queries are pure reads; the only mutations
//! are selection, search and prune.

use std::collections::BTreeMap;
use std::sync::Arc;

use ad_algo::{
    aggregate, period_metrics, rank, AggregateMetrics, CascadeFilter, HierarchyIndex, IndexIssue, LevelOption,
    MonthlySeries, OutOfScope, PeriodMetrics, RankInput, RankedEntry, SelectionOp, SeriesIssue,
};
use ad_core::{
    raw::{RawMonthly, RawSnapshot},
    variables::{Params, RankScope, SortDirection, SortKey},
    CentreId, Level,
};

use crate::access::AccessGrant;
use crate::rollup::{self, SeriesMap};

#[derive(Clone, Debug)]
pub struct Dashboard {
    index: Arc<HierarchyIndex>,
    series: Arc<SeriesMap>,
    series_issues: BTreeMap<CentreId, Vec<SeriesIssue>>,
    filter: CascadeFilter,
    params: Params,
}

impl Dashboard {
    /// Build the index and normalize every Centre's monthly rows. Rows for a
    /// Centre the snapshot does not contain are dropped.
    pub fn new(snapshot: &RawSnapshot, monthly: &BTreeMap<CentreId, Vec<RawMonthly>>, params: Params) -> Self {
        let index = HierarchyIndex::build(snapshot);
        let mut series = SeriesMap::new();
        let mut series_issues = BTreeMap::new();
        for (id, rows) in monthly {
            if index.centre(id).is_none() {
                tracing::warn!(centre = %id, rows = rows.len(), "monthly rows for unknown centre dropped");
                continue;
            }
            let (s, issues) = MonthlySeries::from_raw(rows);
            if !issues.is_empty() {
                series_issues.insert(id.clone(), issues);
            }
            series.insert(id.clone(), s);
        }
        Self::from_parts(Arc::new(index), Arc::new(series), series_issues, params)
    }

    fn from_parts(
        index: Arc<HierarchyIndex>,
        series: Arc<SeriesMap>,
        series_issues: BTreeMap<CentreId, Vec<SeriesIssue>>,
        params: Params,
    ) -> Self {
        let mut filter = CascadeFilter::new(Arc::clone(&index));
        filter.set_min_search_chars(usize::from(params.search_min_chars));
        tracing::debug!(
            centres = index.centres().len(),
            with_series = series.len(),
            "dashboard session ready"
        );
        Self { index, series, series_issues, filter, params }
    }

    pub fn index(&self) -> &HierarchyIndex { &self.index }
    pub fn params(&self) -> &Params { &self.params }
    pub fn filter(&self) -> &CascadeFilter { &self.filter }
    pub fn issues(&self) -> &[IndexIssue] { self.index.issues() }
    pub fn series_issues(&self) -> &BTreeMap<CentreId, Vec<SeriesIssue>> { &self.series_issues }

    /// Replace params for later queries. Selection and search are kept.
    pub fn set_params(&mut self, params: Params) {
        self.filter.set_min_search_chars(usize::from(params.search_min_chars));
        self.params = params;
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn available_options(&self, level: Level) -> Vec<LevelOption> {
        self.filter.available(level)
    }

    pub fn selection(&self, level: Level) -> Vec<String> {
        self.filter.selection(level)
    }

    pub fn mutate_selection(&mut self, level: Level, ids: &[&str], op: SelectionOp) -> bool {
        self.filter.mutate(level, op, ids)
    }

    pub fn set_search(&mut self, level: Level, term: &str) {
        self.filter.set_search(level, term);
    }

    pub fn out_of_scope(&self) -> &OutOfScope {
        self.filter.out_of_scope()
    }

    pub fn prune_out_of_scope(&mut self) -> OutOfScope {
        self.filter.prune_out_of_scope()
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    fn centre_series(&self, id: &CentreId) -> MonthlySeries {
        self.series.get(id).cloned().unwrap_or_default()
    }

    /// Unknown ids and Centres without records yield zero metrics.
    pub fn aggregates(&self, centre: &str) -> AggregateMetrics {
        match CentreId::parse_query(centre) {
            Ok(id) => aggregate(&self.centre_series(&id)),
            Err(_) => AggregateMetrics::ZERO,
        }
    }

    /// Roll-up metrics for any level.
    pub fn level_aggregates(&self, level: Level, id: &str) -> AggregateMetrics {
        rollup::level_metrics(&self.index, &self.series, level, id)
    }

    /// Per-period chart series for one entity at any level.
    pub fn series(&self, level: Level, id: &str) -> Vec<PeriodMetrics> {
        let members = rollup::members(&self.index, level, id);
        period_metrics(&rollup::merged_series(&self.series, &members))
    }

    // ------------------------------------------------------------------
    // Ranking
    // ------------------------------------------------------------------

    /// Centres a ranking covers under the configured scope. Search does not
    /// narrow it; only the hierarchy rules and the Centre selection do.
    fn ranked_centres(&self) -> Vec<CentreId> {
        let view = self.filter.view();
        if self.params.rank_scope == RankScope::SelectedOrAvailable {
            let chosen: Vec<CentreId> = self
                .filter
                .state()
                .centres
                .iter()
                .filter(|c| !view.out_of_scope.centres.contains(c))
                .cloned()
                .collect();
            if !chosen.is_empty() {
                return chosen;
            }
        }
        view.available_centres.clone()
    }

    fn truncate<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        if let Some(n) = self.params.top_n {
            rows.truncate(n as usize);
        }
        rows
    }

    pub fn ranked(&self, key: SortKey, direction: SortDirection) -> Vec<RankedEntry<CentreId>> {
        let inputs: Vec<RankInput<CentreId>> = self
            .ranked_centres()
            .into_iter()
            .filter_map(|id| {
                let c = self.index.centre(&id)?;
                Some(RankInput { name: c.name.clone(), metrics: aggregate(&self.centre_series(&id)), id })
            })
            .collect();
        self.truncate(rank(inputs, key, direction))
    }

    /// Ranking with the configured default key and direction.
    pub fn ranked_default(&self) -> Vec<RankedEntry<CentreId>> {
        self.ranked(self.params.default_sort_key, self.params.default_direction)
    }

    /// Ranking of roll-ups. Regions: the selected ones, else all. Branches:
    /// the selected in-scope ones, else every available Branch.
    pub fn ranked_at(&self, level: Level, key: SortKey, direction: SortDirection) -> Vec<RankedEntry<String>> {
        let view = self.filter.view();
        let state = self.filter.state();
        let entities: Vec<(String, String)> = match level {
            Level::Centre => {
                return self
                    .ranked(key, direction)
                    .into_iter()
                    .map(|e| RankedEntry {
                        position: e.position,
                        id: e.id.to_string(),
                        name: e.name,
                        metrics: e.metrics,
                        classification: e.classification,
                    })
                    .collect();
            }
            Level::Region => {
                let ids: Vec<_> = if state.regions.is_empty() {
                    self.index.regions().iter().map(|r| r.id.clone()).collect()
                } else {
                    state.regions.as_slice().to_vec()
                };
                ids.iter()
                    .filter_map(|id| self.index.region(id))
                    .map(|r| (r.id.to_string(), r.name.clone()))
                    .collect()
            }
            Level::Branch => {
                let chosen: Vec<_> = state
                    .branches
                    .iter()
                    .filter(|b| !view.out_of_scope.branches.contains(b))
                    .cloned()
                    .collect();
                let ids = if chosen.is_empty() { view.available_branches.clone() } else { chosen };
                ids.iter()
                    .filter_map(|id| self.index.branch(id))
                    .map(|b| (b.id.to_string(), b.name.clone()))
                    .collect()
            }
        };
        let inputs: Vec<RankInput<String>> = entities
            .into_iter()
            .map(|(id, name)| RankInput { metrics: self.level_aggregates(level, &id), id, name })
            .collect();
        self.truncate(rank(inputs, key, direction))
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// A fresh session over only the Centres `grant` reaches. An empty grant
    /// reaches nothing.
    pub fn restrict_to(&self, grant: &AccessGrant) -> Dashboard {
        let granted = grant.granted_centres(&self.index);
        let index = self.index.retain_centres(|c| granted.contains(&c.id));
        let series: SeriesMap = self
            .series
            .iter()
            .filter(|(id, _)| granted.contains(*id))
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();
        let series_issues = self
            .series_issues
            .iter()
            .filter(|(id, _)| granted.contains(*id))
            .map(|(id, i)| (id.clone(), i.clone()))
            .collect();
        tracing::debug!(granted = granted.len(), "dashboard restricted to grant");
        Self::from_parts(Arc::new(index), Arc::new(series), series_issues, self.params.clone())
    }
}

//! Cascading Region → Branch → Centre filter.
//!
//! Rules, applied to the *hierarchy-available* sets:
//! - Regions R selected: Branches and Centres are limited to R (all when R is
//!   empty).
//! - Branches B selected: Centres are limited to B ∩ available Branches. When
//!   that intersection is empty the Region rule applies.
//! - Search runs after the hierarchy rules and only narrows what is shown.
//!
//! Selections that fall outside the available sets are kept, reported in
//! [`OutOfScope`], and dropped only by [`CascadeFilter::prune_out_of_scope`].
//!
//! Each mutation computes the complete next state and view from the current
//! one, then replaces both. A reader never sees a half-updated view.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;
use std::sync::Arc;

use ad_core::{
    determinism::{collation_key, sort_stable_indexed},
    errors::CoreError,
    BranchId, CentreId, IdError, Level, RegionId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyIndex;
use crate::selection::SelectionSet;

/* -------------------------------------------------------------------------- */
/*                                   Types                                     */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectionOp {
    Add,
    Remove,
    /// Add every currently visible id.
    SelectAllVisible,
    /// Remove every currently visible id.
    DeselectAllVisible,
    /// Empty the level, visible or not.
    Clear,
}

impl SelectionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionOp::Add => "add",
            SelectionOp::Remove => "remove",
            SelectionOp::SelectAllVisible => "select_all_visible",
            SelectionOp::DeselectAllVisible => "deselect_all_visible",
            SelectionOp::Clear => "clear",
        }
    }
}

impl fmt::Display for SelectionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionOp {
    type Err = CoreError;
    /// Accepts snake_case, camelCase and kebab-case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "add" => Ok(SelectionOp::Add),
            "remove" => Ok(SelectionOp::Remove),
            "selectallvisible" | "selectall" => Ok(SelectionOp::SelectAllVisible),
            "deselectallvisible" | "deselectall" => Ok(SelectionOp::DeselectAllVisible),
            "clear" => Ok(SelectionOp::Clear),
            _ => Err(CoreError::InvalidToken("selection op", s.to_string())),
        }
    }
}

/// Selected ids per level, in selection order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectionState {
    pub regions: SelectionSet<RegionId>,
    pub branches: SelectionSet<BranchId>,
    pub centres: SelectionSet<CentreId>,
}

impl SelectionState {
    pub fn ids(&self, level: Level) -> Vec<String> {
        match level {
            Level::Region => self.regions.iter().map(ToString::to_string).collect(),
            Level::Branch => self.branches.iter().map(ToString::to_string).collect(),
            Level::Centre => self.centres.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.branches.is_empty() && self.centres.is_empty()
    }
}

/// One free-text term per level. Blank means no search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchTerms {
    pub region: String,
    pub branch: String,
    pub centre: String,
}

impl SearchTerms {
    pub fn get(&self, level: Level) -> &str {
        match level {
            Level::Region => &self.region,
            Level::Branch => &self.branch,
            Level::Centre => &self.centre,
        }
    }

    fn slot_mut(&mut self, level: Level) -> &mut String {
        match level {
            Level::Region => &mut self.region,
            Level::Branch => &mut self.branch,
            Level::Centre => &mut self.centre,
        }
    }
}

/// A row of an option list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LevelOption {
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub code: Option<String>,
    pub selected: bool,
    /// Centre (or bucket) with an unresolved parent.
    pub incomplete: bool,
}

/// Selected ids the hierarchy rules currently hide.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct OutOfScope {
    pub branches: Vec<BranchId>,
    pub centres: Vec<CentreId>,
}

impl OutOfScope {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.centres.is_empty()
    }
}

/// Everything derived from (index, selection, search).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeView {
    /// Hierarchy rules only, index order.
    pub available_branches: Vec<BranchId>,
    pub available_centres: Vec<CentreId>,
    /// Hierarchy rules plus search, name order.
    pub visible_regions: Vec<RegionId>,
    pub visible_branches: Vec<BranchId>,
    pub visible_centres: Vec<CentreId>,
    pub out_of_scope: OutOfScope,
}

/* -------------------------------------------------------------------------- */
/*                              View computation                               */
/* -------------------------------------------------------------------------- */

fn active_term(raw: &str, min_chars: usize) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() || t.chars().count() < min_chars {
        return None;
    }
    Some(collation_key(t))
}

fn matches(term: &Option<String>, fields: &[Option<&str>]) -> bool {
    match term {
        None => true,
        Some(t) => fields.iter().flatten().any(|f| collation_key(f).contains(t.as_str())),
    }
}

fn by_name<T>(items: Vec<(String, T)>) -> Vec<T> {
    sort_stable_indexed(items, |a, b| a.0.cmp(&b.0)).into_iter().map(|(_, t)| t).collect()
}

/// Pure: derive the full view for one state.
pub fn compute_view(
    index: &HierarchyIndex,
    state: &SelectionState,
    search: &SearchTerms,
    min_search_chars: usize,
) -> CascadeView {
    let regions = &state.regions;
    let in_regions = |id: &RegionId| regions.is_empty() || regions.contains(id);

    let branch_ok: BTreeSet<&BranchId> =
        index.branches().iter().filter(|b| in_regions(&b.region_id)).map(|b| &b.id).collect();
    let effective: BTreeSet<&BranchId> = state.branches.iter().filter(|b| branch_ok.contains(b)).collect();
    let centre_ok: BTreeSet<&CentreId> = index
        .centres()
        .iter()
        .filter(|c| {
            if effective.is_empty() {
                in_regions(&c.region_id)
            } else {
                effective.contains(&c.branch_id)
            }
        })
        .map(|c| &c.id)
        .collect();

    let rt = active_term(&search.region, min_search_chars);
    let bt = active_term(&search.branch, min_search_chars);
    let ct = active_term(&search.centre, min_search_chars);

    let visible_regions = by_name(
        index
            .regions()
            .iter()
            .filter(|r| matches(&rt, &[Some(r.name.as_str()), r.code.as_deref()]))
            .map(|r| (collation_key(&r.name), r.id.clone()))
            .collect(),
    );
    let visible_branches = by_name(
        index
            .branches()
            .iter()
            .filter(|b| branch_ok.contains(&b.id))
            .filter(|b| matches(&bt, &[Some(b.name.as_str()), b.code.as_deref()]))
            .map(|b| (collation_key(&b.name), b.id.clone()))
            .collect(),
    );
    let visible_centres = by_name(
        index
            .centres()
            .iter()
            .filter(|c| centre_ok.contains(&c.id))
            .filter(|c| {
                matches(&ct, &[Some(c.name.as_str()), c.short_code.as_deref(), c.external_code.as_deref()])
            })
            .map(|c| (collation_key(&c.name), c.id.clone()))
            .collect(),
    );

    let out_of_scope = OutOfScope {
        branches: state.branches.iter().filter(|b| !branch_ok.contains(b)).cloned().collect(),
        centres: state.centres.iter().filter(|c| !centre_ok.contains(c)).cloned().collect(),
    };

    CascadeView {
        available_branches: index.branches().iter().filter(|b| branch_ok.contains(&b.id)).map(|b| b.id.clone()).collect(),
        available_centres: index.centres().iter().filter(|c| centre_ok.contains(&c.id)).map(|c| c.id.clone()).collect(),
        visible_regions,
        visible_branches,
        visible_centres,
        out_of_scope,
    }
}

fn apply<T, P, K>(set: &mut SelectionSet<T>, op: SelectionOp, ids: &[&str], visible: &[T], parse: P, known: K) -> bool
where
    T: Ord + Clone,
    P: Fn(&str) -> Result<T, IdError>,
    K: Fn(&T) -> bool,
{
    let parsed: Vec<T> = ids.iter().filter_map(|s| parse(*s).ok()).collect();
    match op {
        SelectionOp::Add => parsed.into_iter().filter(|id| known(id)).fold(false, |changed, id| set.insert(id) || changed),
        SelectionOp::Remove => parsed.iter().fold(false, |changed, id| set.remove(id) || changed),
        SelectionOp::SelectAllVisible => set.select_all(visible) > 0,
        SelectionOp::DeselectAllVisible => set.deselect_all(visible) > 0,
        SelectionOp::Clear => {
            let had = !set.is_empty();
            set.clear();
            had
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                   Filter                                    */
/* -------------------------------------------------------------------------- */

/// One editing session's selection over a shared, immutable index.
#[derive(Clone, Debug)]
pub struct CascadeFilter {
    index: Arc<HierarchyIndex>,
    state: SelectionState,
    search: SearchTerms,
    min_search_chars: usize,
    view: CascadeView,
}

impl CascadeFilter {
    pub fn new(index: Arc<HierarchyIndex>) -> Self {
        Self::with_state(index, SelectionState::default())
    }

    /// Seed from a stored selection. Ids the index does not know are dropped.
    pub fn with_state(index: Arc<HierarchyIndex>, mut state: SelectionState) -> Self {
        state.regions.retain(|id| index.region(id).is_some());
        state.branches.retain(|id| index.branch(id).is_some());
        state.centres.retain(|id| index.centre(id).is_some());
        let search = SearchTerms::default();
        let view = compute_view(&index, &state, &search, 0);
        Self { index, state, search, min_search_chars: 0, view }
    }

    pub fn set_min_search_chars(&mut self, n: usize) {
        self.min_search_chars = n;
        self.publish(self.state.clone(), self.search.clone());
    }

    fn publish(&mut self, state: SelectionState, search: SearchTerms) {
        let view = compute_view(&self.index, &state, &search, self.min_search_chars);
        self.state = state;
        self.search = search;
        self.view = view;
    }

    pub fn index(&self) -> &Arc<HierarchyIndex> { &self.index }
    pub fn state(&self) -> &SelectionState { &self.state }
    pub fn search(&self) -> &SearchTerms { &self.search }
    pub fn view(&self) -> &CascadeView { &self.view }
    pub fn out_of_scope(&self) -> &OutOfScope { &self.view.out_of_scope }

    pub fn selection(&self, level: Level) -> Vec<String> {
        self.state.ids(level)
    }

    pub fn visible_ids(&self, level: Level) -> Vec<String> {
        match level {
            Level::Region => self.view.visible_regions.iter().map(ToString::to_string).collect(),
            Level::Branch => self.view.visible_branches.iter().map(ToString::to_string).collect(),
            Level::Centre => self.view.visible_centres.iter().map(ToString::to_string).collect(),
        }
    }

    /// Visible options for `level`, name order.
    pub fn available(&self, level: Level) -> Vec<LevelOption> {
        let idx = &self.index;
        match level {
            Level::Region => self
                .view
                .visible_regions
                .iter()
                .filter_map(|id| idx.region(id))
                .map(|r| LevelOption {
                    id: r.id.to_string(),
                    name: r.name.clone(),
                    code: r.code.clone(),
                    selected: self.state.regions.contains(&r.id),
                    incomplete: r.id.is_unassigned(),
                })
                .collect(),
            Level::Branch => self
                .view
                .visible_branches
                .iter()
                .filter_map(|id| idx.branch(id))
                .map(|b| LevelOption {
                    id: b.id.to_string(),
                    name: b.name.clone(),
                    code: b.code.clone(),
                    selected: self.state.branches.contains(&b.id),
                    incomplete: b.id.is_unassigned() || b.region_id.is_unassigned(),
                })
                .collect(),
            Level::Centre => self
                .view
                .visible_centres
                .iter()
                .filter_map(|id| idx.centre(id))
                .map(|c| LevelOption {
                    id: c.id.to_string(),
                    name: c.name.clone(),
                    code: c.short_code.clone(),
                    selected: self.state.centres.contains(&c.id),
                    incomplete: !c.completeness.is_complete(),
                })
                .collect(),
        }
    }

    /// Apply one selection change. Returns whether the selection changed.
    /// Ids unknown to the index are ignored by `Add`.
    pub fn mutate(&mut self, level: Level, op: SelectionOp, ids: &[&str]) -> bool {
        let mut next = self.state.clone();
        let idx = &self.index;
        let changed = match level {
            Level::Region => apply(
                &mut next.regions,
                op,
                ids,
                &self.view.visible_regions,
                RegionId::parse_query,
                |id| idx.region(id).is_some(),
            ),
            Level::Branch => apply(
                &mut next.branches,
                op,
                ids,
                &self.view.visible_branches,
                BranchId::parse_query,
                |id| idx.branch(id).is_some(),
            ),
            Level::Centre => apply(
                &mut next.centres,
                op,
                ids,
                &self.view.visible_centres,
                CentreId::parse_query,
                |id| idx.centre(id).is_some(),
            ),
        };
        if changed {
            self.publish(next, self.search.clone());
        }
        tracing::debug!(level = %level, op = %op, changed, "selection mutated");
        changed
    }

    pub fn set_search(&mut self, level: Level, term: &str) {
        let mut search = self.search.clone();
        *search.slot_mut(level) = term.to_string();
        self.publish(self.state.clone(), search);
    }

    /// Drop every selected id the hierarchy rules currently hide, returning
    /// what was dropped.
    pub fn prune_out_of_scope(&mut self) -> OutOfScope {
        let dropped = self.view.out_of_scope.clone();
        if dropped.is_empty() {
            return dropped;
        }
        let mut next = self.state.clone();
        next.branches.deselect_all(&dropped.branches);
        next.centres.deselect_all(&dropped.centres);
        self.publish(next, self.search.clone());
        tracing::debug!(
            branches = dropped.branches.len(),
            centres = dropped.centres.len(),
            "pruned out-of-scope selections"
        );
        dropped
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use ad_core::raw::{RawBranch, RawCentre, RawRef, RawRegion, RawScalar, RawSnapshot};

    fn fixture() -> Arc<HierarchyIndex> {
        let region = |id: &str, name: &str| RawRegion {
            id: Some(RawScalar::from(id)),
            name: Some(name.to_string()),
            short_code: None,
        };
        let branch = |id: &str, name: &str, r: &str| RawBranch {
            id: Some(RawScalar::from(id)),
            name: Some(name.to_string()),
            short_code: None,
            region_id: Some(RawRef::bare(r)),
        };
        let centre = |id: &str, name: &str, b: &str| RawCentre {
            id: Some(RawScalar::from(id)),
            name: Some(name.to_string()),
            branch_id: Some(RawRef::bare(b)),
            ..RawCentre::default()
        };
        let mut centres = vec![
            centre("c1", "Zed", "b1"),
            centre("c2", "Beta", "b1"),
            centre("c3", "Gamma", "b2"),
            centre("c4", "Delta", "b3"),
        ];
        centres[2].external_code = Some("EXT-77".to_string());
        Arc::new(HierarchyIndex::build(&RawSnapshot {
            regions: vec![region("r1", "North"), region("r2", "South")],
            branches: vec![branch("b1", "Bay", "r1"), branch("b2", "Cove", "r1"), branch("b3", "Dune", "r2")],
            centres,
        }))
    }

    #[test]
    fn nothing_selected_shows_everything_by_name() {
        let f = CascadeFilter::new(fixture());
        assert_eq!(f.visible_ids(Level::Region), vec!["r1", "r2"]);
        assert_eq!(f.visible_ids(Level::Branch), vec!["b1", "b2", "b3"]);
        assert_eq!(f.visible_ids(Level::Centre), vec!["c2", "c4", "c3", "c1"]);
        assert!(f.out_of_scope().is_empty());
    }

    #[test]
    fn region_then_branch_narrowing() {
        let mut f = CascadeFilter::new(fixture());
        assert!(f.mutate(Level::Region, SelectionOp::Add, &["r1"]));
        assert_eq!(f.visible_ids(Level::Branch), vec!["b1", "b2"]);
        assert_eq!(f.visible_ids(Level::Centre), vec!["c2", "c3", "c1"]);

        assert!(f.mutate(Level::Branch, SelectionOp::Add, &["b1"]));
        assert_eq!(f.visible_ids(Level::Centre), vec!["c2", "c1"]);
        assert_eq!(f.selection(Level::Branch), vec!["b1"]);
    }

    #[test]
    fn hidden_branch_is_retained_then_pruned() {
        let mut f = CascadeFilter::new(fixture());
        f.mutate(Level::Branch, SelectionOp::Add, &["b3"]);
        f.mutate(Level::Centre, SelectionOp::Add, &["c4"]);
        f.mutate(Level::Region, SelectionOp::Add, &["r1"]);

        // b3 lies outside r1: kept in the selection, ignored by the Centre rule.
        assert_eq!(f.selection(Level::Branch), vec!["b3"]);
        assert_eq!(f.visible_ids(Level::Centre), vec!["c2", "c3", "c1"]);
        assert_eq!(f.out_of_scope().branches, vec!["b3".parse::<BranchId>().unwrap()]);
        assert_eq!(f.out_of_scope().centres, vec!["c4".parse::<CentreId>().unwrap()]);

        let dropped = f.prune_out_of_scope();
        assert_eq!(dropped.branches.len(), 1);
        assert!(f.selection(Level::Branch).is_empty());
        assert!(f.selection(Level::Centre).is_empty());
        assert!(f.out_of_scope().is_empty());
        assert!(f.prune_out_of_scope().is_empty());
    }

    #[test]
    fn search_narrows_bulk_ops() {
        let mut f = CascadeFilter::new(fixture());
        f.mutate(Level::Centre, SelectionOp::Add, &["c1"]);
        f.set_search(Level::Centre, "ext-7");
        assert_eq!(f.visible_ids(Level::Centre), vec!["c3"]);

        assert!(f.mutate(Level::Centre, SelectionOp::SelectAllVisible, &[]));
        assert!(!f.mutate(Level::Centre, SelectionOp::SelectAllVisible, &[]));
        assert_eq!(f.selection(Level::Centre), vec!["c1", "c3"]);

        assert!(f.mutate(Level::Centre, SelectionOp::DeselectAllVisible, &[]));
        assert!(!f.mutate(Level::Centre, SelectionOp::DeselectAllVisible, &[]));
        assert_eq!(f.selection(Level::Centre), vec!["c1"]);

        // Clear ignores the search.
        assert!(f.mutate(Level::Centre, SelectionOp::Clear, &[]));
        assert!(f.selection(Level::Centre).is_empty());
    }

    #[test]
    fn search_matching_nothing_makes_select_all_a_no_op() {
        let mut f = CascadeFilter::new(fixture());
        f.set_search(Level::Branch, "zzz");
        assert!(f.available(Level::Branch).is_empty());
        let before = f.state().clone();
        assert!(!f.mutate(Level::Branch, SelectionOp::SelectAllVisible, &[]));
        assert_eq!(f.state(), &before);
    }

    #[test]
    fn short_terms_are_ignored() {
        let mut f = CascadeFilter::new(fixture());
        f.set_min_search_chars(3);
        f.set_search(Level::Centre, "ga");
        assert_eq!(f.visible_ids(Level::Centre).len(), 4);
        f.set_search(Level::Centre, "GAM");
        assert_eq!(f.visible_ids(Level::Centre), vec!["c3"]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut f = CascadeFilter::new(fixture());
        assert!(!f.mutate(Level::Region, SelectionOp::Add, &["nowhere", ""]));
        assert!(f.state().is_empty());
        assert!(!f.mutate(Level::Region, SelectionOp::Remove, &["r1"]));
    }

    #[test]
    fn options_carry_selection_flags() {
        let mut f = CascadeFilter::new(fixture());
        f.mutate(Level::Region, SelectionOp::Add, &["r2"]);
        let opts = f.available(Level::Region);
        assert_eq!(opts.len(), 2);
        assert!(!opts[0].selected);
        assert!(opts[1].selected);
        assert_eq!(opts[1].name, "South");
    }

    #[test]
    fn seeded_state_drops_unknown_ids() {
        let state = SelectionState {
            regions: ["r1", "gone"].iter().filter_map(|s| s.parse().ok()).collect(),
            ..SelectionState::default()
        };
        let f = CascadeFilter::with_state(fixture(), state);
        assert_eq!(f.selection(Level::Region), vec!["r1"]);
    }

    #[test]
    fn op_tokens() {
        assert_eq!("selectAllVisible".parse::<SelectionOp>().unwrap(), SelectionOp::SelectAllVisible);
        assert_eq!("deselect-all".parse::<SelectionOp>().unwrap(), SelectionOp::DeselectAllVisible);
        assert_eq!(SelectionOp::Clear.to_string(), "clear");
        assert!("toggle".parse::<SelectionOp>().is_err());
    }
}

//! Access editor: edit a user's Region/Branch/Centre grant with the same
//! cascading filter the dashboard uses.
//!
//! The grant itself is persisted elsewhere. The editor is seeded from it once
//! and hands back a new grant on [`AccessEditor::save`]; nothing flows back
//! from the dashboard into the editor.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ad_algo::{CascadeFilter, HierarchyIndex, OutOfScope, SelectionOp, SelectionState};
use ad_core::{BranchId, CentreId, Level, RegionId};

/// Stored access list. An id at a higher level grants every Centre under it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessGrant {
    pub regions: Vec<RegionId>,
    pub branches: Vec<BranchId>,
    pub centres: Vec<CentreId>,
}

impl AccessGrant {
    pub fn from_state(state: &SelectionState) -> Self {
        Self {
            regions: state.regions.as_slice().to_vec(),
            branches: state.branches.as_slice().to_vec(),
            centres: state.centres.as_slice().to_vec(),
        }
    }

    pub fn to_state(&self) -> SelectionState {
        SelectionState {
            regions: self.regions.iter().cloned().collect(),
            branches: self.branches.iter().cloned().collect(),
            centres: self.centres.iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.branches.is_empty() && self.centres.is_empty()
    }

    /// Same ids regardless of order or repetition.
    pub fn same_members(&self, other: &AccessGrant) -> bool {
        fn set<T: Ord>(v: &[T]) -> BTreeSet<&T> {
            v.iter().collect()
        }
        set(&self.regions) == set(&other.regions)
            && set(&self.branches) == set(&other.branches)
            && set(&self.centres) == set(&other.centres)
    }

    /// Every Centre reachable through the grant.
    pub fn granted_centres(&self, index: &HierarchyIndex) -> BTreeSet<CentreId> {
        let mut out: BTreeSet<CentreId> = self.centres.iter().filter(|c| index.centre(c).is_some()).cloned().collect();
        for r in &self.regions {
            out.extend(index.centres_of_region(r).iter().cloned());
        }
        for b in &self.branches {
            out.extend(index.centres_of_branch(b).iter().cloned());
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct AccessEditor {
    baseline: AccessGrant,
    filter: CascadeFilter,
}

impl AccessEditor {
    /// Ids in `grant` that the index does not know are dropped on entry, so
    /// they do not count as an edit.
    pub fn new(index: Arc<HierarchyIndex>, grant: &AccessGrant) -> Self {
        let filter = CascadeFilter::with_state(index, grant.to_state());
        let baseline = AccessGrant::from_state(filter.state());
        Self { baseline, filter }
    }

    pub fn filter(&self) -> &CascadeFilter {
        &self.filter
    }

    pub fn set_search(&mut self, level: Level, term: &str) {
        self.filter.set_search(level, term);
    }

    /// Drop selections hidden by a higher-level change. Counts as an edit.
    pub fn prune_out_of_scope(&mut self) -> OutOfScope {
        self.filter.prune_out_of_scope()
    }

    pub fn mutate(&mut self, level: Level, op: SelectionOp, ids: &[&str]) -> bool {
        self.filter.mutate(level, op, ids)
    }

    pub fn current(&self) -> AccessGrant {
        AccessGrant::from_state(self.filter.state())
    }

    pub fn is_dirty(&self) -> bool {
        !self.current().same_members(&self.baseline)
    }

    /// The grant to persist. It becomes the new clean baseline.
    pub fn save(&mut self) -> AccessGrant {
        let grant = self.current();
        tracing::debug!(
            regions = grant.regions.len(),
            branches = grant.branches.len(),
            centres = grant.centres.len(),
            "access grant saved"
        );
        self.baseline = grant.clone();
        grant
    }

    /// Discard edits since the last save.
    pub fn revert(&mut self) {
        let index = Arc::clone(self.filter.index());
        self.filter = CascadeFilter::with_state(index, self.baseline.to_state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_core::raw::{RawCentre, RawRef, RawScalar};

    fn index() -> Arc<HierarchyIndex> {
        let centre = |id: &str, b: &str, r: &str| RawCentre {
            id: Some(RawScalar::from(id)),
            name: Some(id.to_string()),
            branch_id: Some(RawRef::embedded(b, b)),
            region_id: Some(RawRef::embedded(r, r)),
            ..RawCentre::default()
        };
        Arc::new(HierarchyIndex::from_centres(vec![
            centre("c1", "b1", "r1"),
            centre("c2", "b1", "r1"),
            centre("c3", "b2", "r2"),
        ]))
    }

    #[test]
    fn edit_save_cycle() {
        let grant = AccessGrant { centres: vec!["c1".parse().unwrap()], ..AccessGrant::default() };
        let mut ed = AccessEditor::new(index(), &grant);
        assert!(!ed.is_dirty());

        ed.mutate(Level::Centre, SelectionOp::Add, &["c3"]);
        assert!(ed.is_dirty());
        ed.mutate(Level::Centre, SelectionOp::Remove, &["c3"]);
        assert!(!ed.is_dirty());

        ed.mutate(Level::Branch, SelectionOp::Add, &["b2"]);
        let saved = ed.save();
        assert!(!ed.is_dirty());
        assert_eq!(saved.branches, vec!["b2".parse::<BranchId>().unwrap()]);
        // The caller's grant is untouched.
        assert!(grant.branches.is_empty());
    }

    #[test]
    fn search_and_prune_through_the_editor() {
        let grant = AccessGrant { branches: vec!["b2".parse().unwrap()], ..AccessGrant::default() };
        let mut ed = AccessEditor::new(index(), &grant);
        ed.set_search(Level::Centre, "c3");
        assert!(ed.mutate(Level::Centre, SelectionOp::SelectAllVisible, &[]));
        assert_eq!(ed.current().centres, vec!["c3".parse::<CentreId>().unwrap()]);

        ed.mutate(Level::Region, SelectionOp::Add, &["r1"]);
        let dropped = ed.prune_out_of_scope();
        assert_eq!(dropped.branches, vec!["b2".parse::<BranchId>().unwrap()]);
        assert_eq!(dropped.centres.len(), 1);
        assert!(ed.current().branches.is_empty());
        assert!(ed.current().centres.is_empty());
        assert!(ed.is_dirty());
    }

    #[test]
    fn unknown_ids_do_not_make_it_dirty() {
        let grant = AccessGrant { regions: vec!["gone".parse().unwrap()], ..AccessGrant::default() };
        let mut ed = AccessEditor::new(index(), &grant);
        assert!(!ed.is_dirty());
        assert!(ed.current().is_empty());
        ed.mutate(Level::Region, SelectionOp::Add, &["r1"]);
        ed.revert();
        assert!(ed.current().is_empty());
    }

    #[test]
    fn granted_centres_expand_levels() {
        let idx = index();
        let grant = AccessGrant {
            branches: vec!["b2".parse().unwrap()],
            centres: vec!["c1".parse().unwrap(), "ghost".parse().unwrap()],
            ..AccessGrant::default()
        };
        let got: Vec<String> = grant.granted_centres(&idx).iter().map(|c| c.to_string()).collect();
        assert_eq!(got, vec!["c1", "c3"]);
    }

    #[test]
    fn stored_grant_ids_are_normalized() {
        let grant: AccessGrant = serde_json::from_str(r#"{"branches": [" b1 "]}"#).unwrap();
        assert_eq!(grant.branches, vec!["b1".parse::<BranchId>().unwrap()]);
        assert_eq!(grant.granted_centres(&index()).len(), 2);

        assert!(serde_json::from_str::<AccessGrant>(r#"{"branches": ["b1"], "regions": [""]}"#).is_err());
    }
}

//! Hierarchy index: Region → Branch → Centre lookups built from one raw
//! snapshot.
//!
//! Contract:
//! - Every parent reference (bare id or embedded object) is normalized to a
//!   canonical id here, once. Embedded names/codes are attached to the
//!   Region/Branch they describe.
//! - A Region/Branch is *known* when it appears as a record in the snapshot or
//!   as an embedded object anywhere in it. A bare id that nothing declares is
//!   unresolved.
//! - A Centre whose branch is unresolved sits under the synthetic
//!   "Unassigned" branch (inside the "Unassigned" region) and is marked
//!   incomplete. It is never dropped.
//! - A Centre's region is always its branch's region. A conflicting declared
//!   region is recorded as `InconsistentHierarchy` and ignored.
//! - Nothing here fails: problems are returned as [`IndexIssue`]s and logged.
//!
//! Lists preserve first-seen order: explicit records first, then parents
//! discovered through embedded objects, then the synthetic buckets.

use std::collections::{BTreeMap, BTreeSet};

use ad_core::{
    ids::UNASSIGNED_NAME,
    raw::{non_blank, RawRef, RawScalar, RawSnapshot},
    Branch, BranchId, Centre, CentreId, Completeness, Level, Region, RegionId,
};

/// Diagnostics produced while normalizing a snapshot. None of them is fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum IndexIssue {
    /// A record without a usable id; it cannot be addressed and was skipped.
    MalformedRecord { level: Level, position: usize, reason: &'static str },
    /// No display name anywhere in the input; the id is used as the label.
    MissingName { level: Level, id: String },
    /// A repeated id; the first occurrence wins.
    DuplicateId { level: Level, id: String },
    /// A Centre's parent reference was absent or named an id declared nowhere.
    UnresolvedReference { centre: CentreId, level: Level, reference: Option<String> },
    /// The Centre's declared region disagreed with its branch's region.
    InconsistentHierarchy { centre: CentreId, branch: BranchId, declared: RegionId, resolved: RegionId },
    /// A Branch whose region could not be determined.
    OrphanBranch { branch: BranchId, reference: Option<String> },
}

impl IndexIssue {
    pub fn centre(&self) -> Option<&CentreId> {
        match self {
            IndexIssue::UnresolvedReference { centre, .. }
            | IndexIssue::InconsistentHierarchy { centre, .. } => Some(centre),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HierarchyIndex {
    regions: Vec<Region>,
    branches: Vec<Branch>,
    centres: Vec<Centre>,
    region_pos: BTreeMap<RegionId, usize>,
    branch_pos: BTreeMap<BranchId, usize>,
    centre_pos: BTreeMap<CentreId, usize>,
    branches_by_region: BTreeMap<RegionId, Vec<BranchId>>,
    centres_by_region: BTreeMap<RegionId, Vec<CentreId>>,
    centres_by_branch: BTreeMap<BranchId, Vec<CentreId>>,
    issues: Vec<IndexIssue>,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

struct DraftRegion {
    id: RegionId,
    name: Option<String>,
    code: Option<String>,
}

struct DraftBranch {
    id: BranchId,
    name: Option<String>,
    code: Option<String>,
    region_ref: Option<String>,
}

#[derive(Default)]
struct Builder {
    regions: Vec<DraftRegion>,
    region_pos: BTreeMap<RegionId, usize>,
    branches: Vec<DraftBranch>,
    branch_pos: BTreeMap<BranchId, usize>,
    issues: Vec<IndexIssue>,
}

fn parse_scalar<T: std::str::FromStr>(s: Option<&RawScalar>) -> Option<T> {
    s.and_then(RawScalar::canonical).and_then(|t| t.parse().ok())
}

fn owned(s: Option<&str>) -> Option<String> {
    non_blank(s).map(str::to_string)
}

impl Builder {
    fn issue(&mut self, issue: IndexIssue) {
        match &issue {
            IndexIssue::InconsistentHierarchy { centre, branch, declared, resolved } => {
                tracing::warn!(
                    centre = %centre, branch = %branch, declared = %declared, resolved = %resolved,
                    "centre region disagrees with its branch; using the branch's region"
                );
            }
            IndexIssue::UnresolvedReference { centre, level, reference } => {
                tracing::warn!(
                    centre = %centre, level = %level, reference = ?reference,
                    "unresolved parent reference; centre indexed under Unassigned"
                );
            }
            other => tracing::warn!(issue = ?other, "hierarchy ingest issue"),
        }
        self.issues.push(issue);
    }

    fn declare_region(&mut self, id: RegionId, name: Option<&str>, code: Option<&str>) {
        if let Some(&i) = self.region_pos.get(&id) {
            let r = &mut self.regions[i];
            if r.name.is_none() { r.name = owned(name); }
            if r.code.is_none() { r.code = owned(code); }
            return;
        }
        self.region_pos.insert(id.clone(), self.regions.len());
        self.regions.push(DraftRegion { id, name: owned(name), code: owned(code) });
    }

    fn declare_branch(
        &mut self,
        id: BranchId,
        name: Option<&str>,
        code: Option<&str>,
        region_ref: Option<String>,
    ) {
        if let Some(&i) = self.branch_pos.get(&id) {
            let b = &mut self.branches[i];
            if b.name.is_none() { b.name = owned(name); }
            if b.code.is_none() { b.code = owned(code); }
            if b.region_ref.is_none() { b.region_ref = region_ref; }
            return;
        }
        self.branch_pos.insert(id.clone(), self.branches.len());
        self.branches.push(DraftBranch { id, name: owned(name), code: owned(code), region_ref });
    }

    /// Declare the region described by an embedded object; bare ids declare nothing.
    fn learn_region(&mut self, r: &RawRef) {
        if let RawRef::Embedded(_) = r {
            if let Some(id) = r.id().and_then(|s| s.parse::<RegionId>().ok()) {
                self.declare_region(id, r.name(), r.short_code());
            }
        }
    }

    fn learn_branch(&mut self, r: &RawRef) {
        if let RawRef::Embedded(_) = r {
            let region_ref = r.embedded_region().and_then(|reg| {
                self.learn_region(reg);
                reg.id()
            });
            if let Some(id) = r.id().and_then(|s| s.parse::<BranchId>().ok()) {
                self.declare_branch(id, r.name(), r.short_code(), region_ref);
            }
        }
    }

    fn known_region(&self, s: Option<&str>) -> Option<RegionId> {
        s.and_then(|t| t.parse::<RegionId>().ok())
            .filter(|id| self.region_pos.contains_key(id))
    }
}

impl HierarchyIndex {
    /// Build from a Centres-only list.
    pub fn from_centres(centres: Vec<ad_core::raw::RawCentre>) -> Self {
        Self::build(&RawSnapshot::from_centres(centres))
    }

    pub fn build(snapshot: &RawSnapshot) -> Self {
        let mut b = Builder::default();

        // 1) Explicit region and branch records.
        for (position, r) in snapshot.regions.iter().enumerate() {
            let Some(id) = parse_scalar::<RegionId>(r.id.as_ref()) else {
                b.issue(IndexIssue::MalformedRecord { level: Level::Region, position, reason: "missing id" });
                continue;
            };
            if b.region_pos.contains_key(&id) {
                b.issue(IndexIssue::DuplicateId { level: Level::Region, id: id.to_string() });
            }
            b.declare_region(id, r.name.as_deref(), r.short_code.as_deref());
        }
        for (position, br) in snapshot.branches.iter().enumerate() {
            let Some(id) = parse_scalar::<BranchId>(br.id.as_ref()) else {
                b.issue(IndexIssue::MalformedRecord { level: Level::Branch, position, reason: "missing id" });
                continue;
            };
            if b.branch_pos.contains_key(&id) {
                b.issue(IndexIssue::DuplicateId { level: Level::Branch, id: id.to_string() });
            }
            let region_ref = br.region_id.as_ref().and_then(|r| {
                b.learn_region(r);
                r.id()
            });
            b.declare_branch(id, br.name.as_deref(), br.short_code.as_deref(), region_ref);
        }

        // 2) Parents declared through embedded objects on Centres.
        for c in &snapshot.centres {
            if let Some(r) = &c.region_id { b.learn_region(r); }
            if let Some(br) = &c.branch_id { b.learn_branch(br); }
        }

        // 3) Resolve each branch's region: its own reference first, then the
        //    first Centre that names both the branch and a known region.
        let mut branch_region: Vec<Option<RegionId>> = b
            .branches
            .iter()
            .map(|d| b.known_region(d.region_ref.as_deref()))
            .collect();
        for c in &snapshot.centres {
            let Some(bid) = c.branch_id.as_ref().and_then(RawRef::id).and_then(|s| s.parse::<BranchId>().ok()) else {
                continue;
            };
            let Some(&i) = b.branch_pos.get(&bid) else { continue };
            if branch_region[i].is_none() {
                branch_region[i] = b.known_region(c.region_id.as_ref().and_then(RawRef::id).as_deref());
            }
        }

        let mut needs_unassigned_region = false;
        let mut branches: Vec<Branch> = Vec::with_capacity(b.branches.len() + 1);
        let drafts = std::mem::take(&mut b.branches);
        for (d, resolved) in drafts.into_iter().zip(branch_region) {
            let region_id = match resolved {
                Some(r) => r,
                None => {
                    b.issue(IndexIssue::OrphanBranch { branch: d.id.clone(), reference: d.region_ref.clone() });
                    needs_unassigned_region = true;
                    RegionId::unassigned()
                }
            };
            let name = match d.name {
                Some(n) => n,
                None => {
                    b.issue(IndexIssue::MissingName { level: Level::Branch, id: d.id.to_string() });
                    d.id.to_string()
                }
            };
            branches.push(Branch { id: d.id, name, code: d.code, region_id });
        }

        // 4) Centres.
        let mut centres: Vec<Centre> = Vec::with_capacity(snapshot.centres.len());
        let mut seen: BTreeSet<CentreId> = BTreeSet::new();
        let mut needs_unassigned_branch = false;
        for (position, c) in snapshot.centres.iter().enumerate() {
            let Some(id) = parse_scalar::<CentreId>(c.id.as_ref()) else {
                b.issue(IndexIssue::MalformedRecord { level: Level::Centre, position, reason: "missing id" });
                continue;
            };
            if !seen.insert(id.clone()) {
                b.issue(IndexIssue::DuplicateId { level: Level::Centre, id: id.to_string() });
                continue;
            }
            let name = match non_blank(c.name.as_deref()) {
                Some(n) => n.to_string(),
                None => {
                    b.issue(IndexIssue::MissingName { level: Level::Centre, id: id.to_string() });
                    id.to_string()
                }
            };

            let branch_ref = c.branch_id.as_ref().and_then(RawRef::id);
            let region_ref = c.region_id.as_ref().and_then(RawRef::id);
            let branch = branch_ref
                .as_deref()
                .and_then(|s| s.parse::<BranchId>().ok())
                .and_then(|bid| b.branch_pos.get(&bid).map(|&i| &branches[i]));

            let (branch_id, region_id, completeness) = match branch {
                Some(br) => {
                    if let Some(declared) = b.known_region(region_ref.as_deref()) {
                        if declared != br.region_id {
                            b.issue(IndexIssue::InconsistentHierarchy {
                                centre: id.clone(),
                                branch: br.id.clone(),
                                declared,
                                resolved: br.region_id.clone(),
                            });
                        }
                    }
                    let region_unresolved = br.region_id.is_unassigned();
                    if region_unresolved {
                        b.issue(IndexIssue::UnresolvedReference {
                            centre: id.clone(),
                            level: Level::Region,
                            reference: region_ref.clone(),
                        });
                    }
                    let completeness = if region_unresolved {
                        Completeness::Incomplete { branch_unresolved: false, region_unresolved: true }
                    } else {
                        Completeness::Complete
                    };
                    (br.id.clone(), br.region_id.clone(), completeness)
                }
                None => {
                    b.issue(IndexIssue::UnresolvedReference {
                        centre: id.clone(),
                        level: Level::Branch,
                        reference: branch_ref.clone(),
                    });
                    needs_unassigned_branch = true;
                    (
                        BranchId::unassigned(),
                        RegionId::unassigned(),
                        Completeness::Incomplete { branch_unresolved: true, region_unresolved: true },
                    )
                }
            };

            centres.push(Centre {
                id,
                name,
                external_code: owned(c.external_code.as_deref()),
                short_code: owned(c.short_code.as_deref()),
                branch_id,
                region_id,
                completeness,
            });
        }

        // 5) Regions, then the synthetic buckets last.
        let mut regions: Vec<Region> = Vec::with_capacity(b.regions.len() + 1);
        let region_drafts = std::mem::take(&mut b.regions);
        for d in region_drafts {
            let name = match d.name {
                Some(n) => n,
                None => {
                    b.issue(IndexIssue::MissingName { level: Level::Region, id: d.id.to_string() });
                    d.id.to_string()
                }
            };
            regions.push(Region { id: d.id, name, code: d.code });
        }
        if needs_unassigned_branch {
            branches.push(Branch {
                id: BranchId::unassigned(),
                name: UNASSIGNED_NAME.to_string(),
                code: None,
                region_id: RegionId::unassigned(),
            });
        }
        if needs_unassigned_branch || needs_unassigned_region {
            regions.push(Region { id: RegionId::unassigned(), name: UNASSIGNED_NAME.to_string(), code: None });
        }

        let index = Self::assemble(regions, branches, centres, b.issues);
        tracing::debug!(
            regions = index.regions.len(),
            branches = index.branches.len(),
            centres = index.centres.len(),
            issues = index.issues.len(),
            "hierarchy index built"
        );
        index
    }

    /// Derive all lookup tables from already-normalized entity lists.
    fn assemble(regions: Vec<Region>, branches: Vec<Branch>, centres: Vec<Centre>, issues: Vec<IndexIssue>) -> Self {
        let region_pos = regions.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
        let branch_pos = branches.iter().enumerate().map(|(i, b)| (b.id.clone(), i)).collect();
        let centre_pos = centres.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();

        let mut branches_by_region: BTreeMap<RegionId, Vec<BranchId>> = BTreeMap::new();
        for br in &branches {
            branches_by_region.entry(br.region_id.clone()).or_default().push(br.id.clone());
        }
        let mut centres_by_region: BTreeMap<RegionId, Vec<CentreId>> = BTreeMap::new();
        let mut centres_by_branch: BTreeMap<BranchId, Vec<CentreId>> = BTreeMap::new();
        for c in &centres {
            centres_by_region.entry(c.region_id.clone()).or_default().push(c.id.clone());
            centres_by_branch.entry(c.branch_id.clone()).or_default().push(c.id.clone());
        }

        Self {
            regions,
            branches,
            centres,
            region_pos,
            branch_pos,
            centre_pos,
            branches_by_region,
            centres_by_region,
            centres_by_branch,
            issues,
        }
    }

    /// A new index holding only the Centres `keep` accepts, plus the Regions
    /// and Branches that still have at least one of them.
    pub fn retain_centres<F>(&self, keep: F) -> Self
    where
        F: Fn(&Centre) -> bool,
    {
        let centres: Vec<Centre> = self.centres.iter().filter(|c| keep(c)).cloned().collect();
        let live_branches: BTreeSet<&BranchId> = centres.iter().map(|c| &c.branch_id).collect();
        let live_regions: BTreeSet<&RegionId> = centres.iter().map(|c| &c.region_id).collect();
        let branches = self.branches.iter().filter(|b| live_branches.contains(&b.id)).cloned().collect();
        let regions = self.regions.iter().filter(|r| live_regions.contains(&r.id)).cloned().collect();
        let kept: BTreeSet<&CentreId> = centres.iter().map(|c| &c.id).collect();
        let issues = self
            .issues
            .iter()
            .filter(|i| i.centre().map_or(true, |c| kept.contains(c)))
            .cloned()
            .collect();
        Self::assemble(regions, branches, centres, issues)
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl HierarchyIndex {
    pub fn regions(&self) -> &[Region] { &self.regions }
    pub fn branches(&self) -> &[Branch] { &self.branches }
    pub fn centres(&self) -> &[Centre] { &self.centres }
    pub fn issues(&self) -> &[IndexIssue] { &self.issues }

    pub fn is_empty(&self) -> bool {
        self.centres.is_empty() && self.branches.is_empty() && self.regions.is_empty()
    }

    pub fn region(&self, id: &RegionId) -> Option<&Region> {
        self.region_pos.get(id).map(|&i| &self.regions[i])
    }

    pub fn branch(&self, id: &BranchId) -> Option<&Branch> {
        self.branch_pos.get(id).map(|&i| &self.branches[i])
    }

    pub fn centre(&self, id: &CentreId) -> Option<&Centre> {
        self.centre_pos.get(id).map(|&i| &self.centres[i])
    }

    pub fn branches_of_region(&self, id: &RegionId) -> &[BranchId] {
        self.branches_by_region.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn centres_of_region(&self, id: &RegionId) -> &[CentreId] {
        self.centres_by_region.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn centres_of_branch(&self, id: &BranchId) -> &[CentreId] {
        self.centres_by_branch.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incomplete_centres(&self) -> impl Iterator<Item = &Centre> {
        self.centres.iter().filter(|c| !c.completeness.is_complete())
    }

    /// Display label for any id at `level`; `None` when the id is unknown.
    pub fn label(&self, level: Level, id: &str) -> Option<&str> {
        match level {
            Level::Region => RegionId::parse_query(id).ok().and_then(|r| self.region(&r)).map(|r| r.name.as_str()),
            Level::Branch => BranchId::parse_query(id).ok().and_then(|b| self.branch(&b)).map(|b| b.name.as_str()),
            Level::Centre => CentreId::parse_query(id).ok().and_then(|c| self.centre(&c)).map(|c| c.name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_core::raw::{RawBranch, RawCentre, RawRegion};

    fn centre(id: &str, branch: Option<RawRef>, region: Option<RawRef>) -> RawCentre {
        RawCentre {
            id: Some(RawScalar::from(id)),
            name: Some(format!("Centre {id}")),
            branch_id: branch,
            region_id: region,
            ..RawCentre::default()
        }
    }

    fn rid(s: &str) -> RegionId { s.parse().unwrap() }
    fn bid(s: &str) -> BranchId { s.parse().unwrap() }
    fn cid(s: &str) -> CentreId { s.parse().unwrap() }

    #[test]
    fn embedded_parents_are_declared_and_named() {
        let idx = HierarchyIndex::from_centres(vec![
            centre("c1", Some(RawRef::embedded("b1", "Bay")), Some(RawRef::embedded("r1", "North"))),
            centre("c2", Some(RawRef::bare("b1")), Some(RawRef::bare("r1"))),
        ]);
        assert_eq!(idx.region(&rid("r1")).unwrap().name, "North");
        assert_eq!(idx.branch(&bid("b1")).unwrap().region_id, rid("r1"));
        assert_eq!(idx.centres_of_branch(&bid("b1")), &[cid("c1"), cid("c2")]);
        assert_eq!(idx.centres_of_region(&rid("r1")).len(), 2);
        assert_eq!(idx.branches_of_region(&rid("r1")), &[bid("b1")]);
        assert!(idx.branches_of_region(&rid("r9")).is_empty());
        assert!(idx.issues().is_empty());
        assert_eq!(idx.incomplete_centres().count(), 0);
    }

    #[test]
    fn unknown_branch_goes_to_unassigned_bucket() {
        let idx = HierarchyIndex::from_centres(vec![centre("c1", Some(RawRef::bare("ghost")), None)]);
        let c = idx.centre(&cid("c1")).unwrap();
        assert!(c.branch_id.is_unassigned());
        assert!(c.region_id.is_unassigned());
        assert!(!c.completeness.is_complete());
        assert_eq!(idx.branch(&BranchId::unassigned()).unwrap().name, "Unassigned");
        assert_eq!(idx.region(&RegionId::unassigned()).unwrap().name, "Unassigned");
        assert_eq!(idx.branches_of_region(&RegionId::unassigned()), &[BranchId::unassigned()]);
        assert!(matches!(
            idx.issues()[0],
            IndexIssue::UnresolvedReference { level: Level::Branch, .. }
        ));
    }

    #[test]
    fn branch_region_wins_over_declared_region() {
        let snap = RawSnapshot {
            regions: vec![
                RawRegion { id: Some("r1".into()), name: Some("North".into()), short_code: None },
                RawRegion { id: Some("r2".into()), name: Some("South".into()), short_code: None },
            ],
            branches: vec![RawBranch {
                id: Some("b1".into()),
                name: Some("Bay".into()),
                short_code: Some("BY".into()),
                region_id: Some(RawRef::bare("r1")),
            }],
            centres: vec![centre("c1", Some(RawRef::bare("b1")), Some(RawRef::bare("r2")))],
        };
        let idx = HierarchyIndex::build(&snap);
        assert_eq!(idx.centre(&cid("c1")).unwrap().region_id, rid("r1"));
        assert!(idx.centres_of_region(&rid("r2")).is_empty());
        assert_eq!(
            idx.issues(),
            &[IndexIssue::InconsistentHierarchy {
                centre: cid("c1"),
                branch: bid("b1"),
                declared: rid("r2"),
                resolved: rid("r1"),
            }]
        );
    }

    #[test]
    fn malformed_and_duplicate_centres_are_reported_not_fatal() {
        let mut nameless = centre("c2", Some(RawRef::embedded("b1", "Bay")), None);
        nameless.name = None;
        let idx = HierarchyIndex::from_centres(vec![
            RawCentre::default(),
            centre("c1", Some(RawRef::embedded("b1", "Bay")), Some(RawRef::embedded("r1", "North"))),
            centre("c1", None, None),
            nameless,
        ]);
        assert_eq!(idx.centres().len(), 2);
        assert_eq!(idx.centre(&cid("c2")).unwrap().name, "c2");
        assert_eq!(idx.centre(&cid("c2")).unwrap().region_id, rid("r1"));
        assert!(idx.issues().iter().any(|i| matches!(i, IndexIssue::MalformedRecord { position: 0, .. })));
        assert!(idx.issues().iter().any(|i| matches!(i, IndexIssue::DuplicateId { level: Level::Centre, .. })));
        assert!(idx.issues().iter().any(|i| matches!(i, IndexIssue::MissingName { level: Level::Centre, .. })));
    }

    #[test]
    fn empty_snapshot_is_empty_index() {
        let idx = HierarchyIndex::build(&RawSnapshot::default());
        assert!(idx.is_empty());
        assert!(idx.issues().is_empty());
        assert!(idx.centres_of_region(&rid("r1")).is_empty());
    }

    #[test]
    fn retain_drops_empty_parents() {
        let idx = HierarchyIndex::from_centres(vec![
            centre("c1", Some(RawRef::embedded("b1", "Bay")), Some(RawRef::embedded("r1", "North"))),
            centre("c2", Some(RawRef::embedded("b2", "Cove")), Some(RawRef::embedded("r2", "South"))),
        ]);
        let only = idx.retain_centres(|c| c.id.as_str() == "c2");
        assert_eq!(only.centres().len(), 1);
        assert_eq!(only.regions().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2"]);
        assert_eq!(only.branches().len(), 1);
        assert_eq!(only.label(Level::Branch, "b2"), Some("Cove"));
        assert_eq!(only.label(Level::Branch, "b1"), None);
        assert_eq!(only.label(Level::Branch, "__unassigned__"), None);
    }
}

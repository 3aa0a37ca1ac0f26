//! Property tests for the metrics, ranking and cascade layers.

use std::collections::BTreeSet;
use std::sync::Arc;

use ad_algo::{
    aggregate, classify, rank, CascadeFilter, Classification, HierarchyIndex, MonthlySeries, RankInput,
    SelectionOp,
};
use ad_core::raw::{RawBranch, RawCentre, RawRef, RawRegion, RawScalar, RawSnapshot};
use ad_core::variables::{SortDirection, SortKey};
use ad_core::{Level, MonthlyRecord, Period};
use proptest::prelude::*;

// -----------------------------------------------------------------------------
// Strategies
// -----------------------------------------------------------------------------

/// Everyday amounts plus extremes whose sums overflow or whose ratios blow up.
fn amount() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => 0.0f64..1.0e6,
        1 => 1.0e300f64..=f64::MAX,
        1 => 1.0e-300f64..1.0e-290,
        1 => Just(0.0),
    ]
}

fn record() -> impl Strategy<Value = MonthlyRecord> {
    (2020u16..2026, 1u8..=12, amount(), amount()).prop_map(|(y, m, ad, biz)| MonthlyRecord {
        period: Period::new(y, m).unwrap(),
        ad_expense_total: ad,
        business_total: biz,
    })
}

/// 3 regions, 6 branches, up to 24 centres; some centres point at a missing branch.
fn snapshot() -> impl Strategy<Value = RawSnapshot> {
    let centres = prop::collection::vec((0usize..7, "[a-z]{1,6}"), 0..24);
    centres.prop_map(|cs| {
        let regions = (0..3)
            .map(|r| RawRegion {
                id: Some(RawScalar::from(format!("r{r}").as_str())),
                name: Some(format!("Region {r}")),
                short_code: None,
            })
            .collect();
        let branches = (0..6)
            .map(|b| RawBranch {
                id: Some(RawScalar::from(format!("b{b}").as_str())),
                name: Some(format!("Branch {b}")),
                short_code: None,
                region_id: Some(RawRef::bare(&format!("r{}", b % 3))),
            })
            .collect();
        let centres = cs
            .into_iter()
            .enumerate()
            .map(|(i, (b, name))| RawCentre {
                id: Some(RawScalar::from(format!("c{i}").as_str())),
                name: Some(name),
                branch_id: Some(RawRef::bare(&format!("b{b}"))),
                ..RawCentre::default()
            })
            .collect();
        RawSnapshot { regions, branches, centres }
    })
}

#[derive(Clone, Debug)]
enum Step {
    Mutate(Level, SelectionOp, Vec<String>),
    Search(Level, String),
}

fn level() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::Region), Just(Level::Branch), Just(Level::Centre)]
}

fn op() -> impl Strategy<Value = SelectionOp> {
    prop_oneof![
        Just(SelectionOp::Add),
        Just(SelectionOp::Remove),
        Just(SelectionOp::SelectAllVisible),
        Just(SelectionOp::DeselectAllVisible),
        Just(SelectionOp::Clear),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    let ids = prop::collection::vec(
        prop_oneof!["r[0-3]", "b[0-6]", "c[0-9]", Just("__unassigned__".to_string())],
        0..4,
    );
    prop_oneof![
        4 => (level(), op(), ids).prop_map(|(l, o, ids)| Step::Mutate(l, o, ids)),
        1 => (level(), "[a-z]{0,2}").prop_map(|(l, t)| Step::Search(l, t)),
    ]
}

fn apply(f: &mut CascadeFilter, s: &Step) {
    match s {
        Step::Mutate(l, o, ids) => {
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            f.mutate(*l, *o, &refs);
        }
        Step::Search(l, t) => f.set_search(*l, t),
    }
}

/// Every visible Branch/Centre satisfies the hierarchy rules for the current selection.
fn assert_consistent(f: &CascadeFilter) -> Result<(), TestCaseError> {
    let idx = f.index();
    let st = f.state();
    let branch_ok = |id: &ad_core::BranchId| {
        idx.branch(id).map_or(false, |b| st.regions.is_empty() || st.regions.contains(&b.region_id))
    };
    for b in &f.view().visible_branches {
        prop_assert!(branch_ok(b));
    }
    let effective: BTreeSet<_> = st.branches.iter().filter(|b| branch_ok(*b)).collect();
    for c in &f.view().visible_centres {
        let centre = idx.centre(c).unwrap();
        if effective.is_empty() {
            prop_assert!(st.regions.is_empty() || st.regions.contains(&centre.region_id));
        } else {
            prop_assert!(effective.contains(&centre.branch_id));
        }
    }
    for b in &f.out_of_scope().branches {
        prop_assert!(st.branches.contains(b));
        prop_assert!(!branch_ok(b));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Properties
// -----------------------------------------------------------------------------

proptest! {
    #[test]
    fn ratios_are_non_negative(recs in prop::collection::vec(record(), 1..30)) {
        let m = aggregate(&MonthlySeries::new(recs));
        prop_assert!(m.ad_percentage >= 0.0 && m.ad_percentage.is_finite());
        prop_assert!(m.roi >= 0.0 && m.roi.is_finite());
        prop_assert!(m.efficiency >= 0.0 && m.efficiency.is_finite());
        prop_assert!(m.performance_score.is_finite());
        prop_assert!(m.ad_expense_total.is_finite() && m.business_total.is_finite());
        if m.business_total == 0.0 { prop_assert_eq!(m.ad_percentage, 0.0); }
        if m.ad_expense_total == 0.0 { prop_assert_eq!(m.roi, 0.0); }
    }

    #[test]
    fn every_score_lands_in_exactly_one_band(score in prop::num::f64::ANY) {
        let c = classify(score);
        let expected = if score > 15.0 {
            Classification::Excellent
        } else if score > 10.0 {
            Classification::Good
        } else if score > 5.0 {
            Classification::Average
        } else {
            Classification::Poor
        };
        prop_assert_eq!(c, expected);
    }

    #[test]
    fn series_order_does_not_matter(mut recs in prop::collection::vec(record(), 0..20)) {
        let a = MonthlySeries::new(recs.clone());
        recs.reverse();
        let b = MonthlySeries::new(recs);
        prop_assert_eq!(a.records().len(), b.records().len());
        prop_assert_eq!(aggregate(&a).trend, aggregate(&b).trend);
        let periods: Vec<Period> = a.records().iter().map(|r| r.period).collect();
        prop_assert!(periods.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ranking_is_stable(values in prop::collection::vec(0u8..4, 0..40), desc in any::<bool>()) {
        let items: Vec<RankInput<usize>> = values
            .iter()
            .enumerate()
            .map(|(i, v)| RankInput {
                id: i,
                name: format!("n{i}"),
                metrics: ad_algo::AggregateMetrics { business_total: f64::from(*v), ..ad_algo::AggregateMetrics::ZERO },
            })
            .collect();
        let dir = if desc { SortDirection::Descending } else { SortDirection::Ascending };
        let out = rank(items, SortKey::BusinessTotal, dir);
        prop_assert_eq!(out.len(), values.len());
        for w in out.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if a.metrics.business_total == b.metrics.business_total {
                prop_assert!(a.id < b.id);
            } else if desc {
                prop_assert!(a.metrics.business_total > b.metrics.business_total);
            } else {
                prop_assert!(a.metrics.business_total < b.metrics.business_total);
            }
            prop_assert_eq!(a.position + 1, b.position);
        }
    }

    #[test]
    fn cascade_stays_consistent(snap in snapshot(), steps in prop::collection::vec(step(), 0..20)) {
        let mut f = CascadeFilter::new(Arc::new(HierarchyIndex::build(&snap)));
        assert_consistent(&f)?;
        for s in &steps {
            apply(&mut f, s);
            assert_consistent(&f)?;
        }
        f.prune_out_of_scope();
        prop_assert!(f.out_of_scope().is_empty());
        assert_consistent(&f)?;
    }

    #[test]
    fn bulk_ops_are_idempotent(
        snap in snapshot(),
        steps in prop::collection::vec(step(), 0..10),
        lvl in level(),
        bulk in prop_oneof![
            Just(SelectionOp::SelectAllVisible),
            Just(SelectionOp::DeselectAllVisible),
            Just(SelectionOp::Clear),
        ],
    ) {
        let mut f = CascadeFilter::new(Arc::new(HierarchyIndex::build(&snap)));
        for s in &steps {
            apply(&mut f, s);
        }
        f.mutate(lvl, bulk, &[]);
        let once = f.state().clone();
        let view = f.view().clone();
        prop_assert!(!f.mutate(lvl, bulk, &[]));
        prop_assert_eq!(f.state(), &once);
        prop_assert_eq!(f.view(), &view);
    }
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

#[test]
fn two_month_centre_is_excellent() {
    let p = |s: &str| s.parse::<Period>().unwrap();
    let m = aggregate(&MonthlySeries::new(vec![
        MonthlyRecord { period: p("2024-01"), ad_expense_total: 10.0, business_total: 100.0 },
        MonthlyRecord { period: p("2024-02"), ad_expense_total: 20.0, business_total: 400.0 },
    ]));
    assert_eq!(ad_core::rounding::format_percent_one_decimal(m.ad_percentage), "6.0%");
    assert_eq!(ad_core::rounding::format_one_decimal(m.roi), "16.7");
    assert_eq!(ad_core::rounding::format_one_decimal(m.performance_score), "160.7");
    assert_eq!(m.classification(), Classification::Excellent);
}

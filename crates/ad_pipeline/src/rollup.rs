//! Branch / Region roll-ups: member Centres' series summed per period, then
//! reduced with the same formulas as a single Centre.

use std::collections::BTreeMap;

use ad_algo::{aggregate, AggregateMetrics, HierarchyIndex, MonthlySeries};
use ad_core::{BranchId, CentreId, Level, RegionId};

pub type SeriesMap = BTreeMap<CentreId, MonthlySeries>;

/// Centres under `id` at `level`, index order. Unknown ids give an empty list.
pub fn members(index: &HierarchyIndex, level: Level, id: &str) -> Vec<CentreId> {
    match level {
        Level::Region => RegionId::parse_query(id)
            .map(|r| index.centres_of_region(&r).to_vec())
            .unwrap_or_default(),
        Level::Branch => BranchId::parse_query(id)
            .map(|b| index.centres_of_branch(&b).to_vec())
            .unwrap_or_default(),
        Level::Centre => CentreId::parse_query(id)
            .ok()
            .filter(|c| index.centre(c).is_some())
            .into_iter()
            .collect(),
    }
}

pub fn merged_series(series: &SeriesMap, centres: &[CentreId]) -> MonthlySeries {
    MonthlySeries::merge(centres.iter().filter_map(|c| series.get(c)))
}

pub fn level_metrics(index: &HierarchyIndex, series: &SeriesMap, level: Level, id: &str) -> AggregateMetrics {
    aggregate(&merged_series(series, &members(index, level, id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_algo::Trend;
    use ad_core::raw::{RawCentre, RawRef, RawScalar};
    use ad_core::MonthlyRecord;

    fn centre(id: &str, b: &str, r: &str) -> RawCentre {
        RawCentre {
            id: Some(RawScalar::from(id)),
            name: Some(id.to_uppercase()),
            branch_id: Some(RawRef::embedded(b, b)),
            region_id: Some(RawRef::embedded(r, r)),
            ..RawCentre::default()
        }
    }

    fn series(p: &str, ad: f64, biz: f64) -> MonthlySeries {
        MonthlySeries::new(vec![MonthlyRecord { period: p.parse().unwrap(), ad_expense_total: ad, business_total: biz }])
    }

    #[test]
    fn region_sums_its_centres() {
        let idx = HierarchyIndex::from_centres(vec![
            centre("c1", "b1", "r1"),
            centre("c2", "b2", "r1"),
            centre("c3", "b3", "r2"),
        ]);
        let mut map = SeriesMap::new();
        map.insert("c1".parse().unwrap(), series("2024-01", 10.0, 100.0));
        map.insert("c2".parse().unwrap(), series("2024-02", 20.0, 400.0));
        map.insert("c3".parse().unwrap(), series("2024-01", 99.0, 1.0));

        let m = level_metrics(&idx, &map, Level::Region, "r1");
        assert_eq!(m.ad_expense_total, 30.0);
        assert_eq!(m.business_total, 500.0);
        assert_eq!(m.trend, Trend::Up);

        let b = level_metrics(&idx, &map, Level::Branch, "b3");
        assert_eq!(b.ad_expense_total, 99.0);
        assert_eq!(level_metrics(&idx, &map, Level::Region, "nowhere"), AggregateMetrics::ZERO);
        assert!(members(&idx, Level::Centre, "c9").is_empty());
    }
}

//! Ranking: order aggregated entities by one key, deterministically.
//!
//! Ties on the primary key keep input order regardless of direction; only
//! the primary comparison is reversed for descending output.

use core::cmp::Ordering;

use ad_core::determinism::{cmp_metric, cmp_names, sort_stable_indexed};
use ad_core::variables::{SortDirection, SortKey};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::metrics::{AggregateMetrics, Classification};

/// One entity to rank. `Id` is whichever level is being ranked.
#[derive(Clone, Debug, PartialEq)]
pub struct RankInput<Id> {
    pub id: Id,
    pub name: String,
    pub metrics: AggregateMetrics,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RankedEntry<Id> {
    /// 1-based.
    pub position: u32,
    pub id: Id,
    pub name: String,
    pub metrics: AggregateMetrics,
    pub classification: Classification,
}

fn cmp_by_key<Id>(key: SortKey, a: &RankInput<Id>, b: &RankInput<Id>) -> Ordering {
    match key {
        SortKey::BusinessTotal => cmp_metric(a.metrics.business_total, b.metrics.business_total),
        SortKey::AdExpenseTotal => cmp_metric(a.metrics.ad_expense_total, b.metrics.ad_expense_total),
        SortKey::Roi => cmp_metric(a.metrics.roi, b.metrics.roi),
        SortKey::Name => cmp_names(&a.name, &b.name),
    }
}

pub fn rank<Id>(items: Vec<RankInput<Id>>, key: SortKey, direction: SortDirection) -> Vec<RankedEntry<Id>> {
    let sorted = sort_stable_indexed(items, |a, b| {
        let primary = cmp_by_key(key, a, b);
        match direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        }
    });

    sorted
        .into_iter()
        .zip(1u32..)
        .map(|(item, position)| RankedEntry {
            position,
            classification: item.metrics.classification(),
            id: item.id,
            name: item.name,
            metrics: item.metrics,
        })
        .collect()
}

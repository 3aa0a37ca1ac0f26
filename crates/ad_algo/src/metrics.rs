//! Monthly series → aggregate metrics, trend and performance class.
//!
//! Every ratio has a defined value for a zero denominator (0), so downstream
//! ordering stays total. Classification compares the raw `f64`; display
//! rounding is applied later by callers via [`AggregateMetrics::rounded_for_display`].

use std::collections::BTreeMap;

use ad_core::{raw::RawMonthly, rounding::round_one_decimal, MonthlyRecord, Period};

#[cfg(feature = "serde")]
use serde::Serialize;

/* -------------------------------------------------------------------------- */
/*                                  Series                                     */
/* -------------------------------------------------------------------------- */

/// A Centre's monthly records: sorted by period, one record per period,
/// every value finite and non-negative.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MonthlySeries {
    records: Vec<MonthlyRecord>,
}

/// Diagnostics from turning raw monthly rows into a series.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SeriesIssue {
    /// Period missing or not `YYYY-MM`; the row was dropped.
    InvalidPeriod { position: usize, value: Option<String> },
    /// Missing, negative or non-finite amount replaced by 0.
    ClampedValue { period: Period, field: &'static str },
    /// Two rows for the same period; their amounts were summed.
    DuplicatePeriod { period: Period },
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}

/// Non-negative sum that saturates at `f64::MAX` instead of reaching infinity.
fn add_capped(a: f64, b: f64) -> f64 {
    (a + b).min(f64::MAX)
}

/// Keep a derived figure finite: NaN becomes 0, overflow saturates.
fn finite(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-f64::MAX, f64::MAX) }
}

impl MonthlySeries {
    /// Sort, merge duplicate periods by summing, and clamp bad amounts to 0.
    pub fn new(records: Vec<MonthlyRecord>) -> Self {
        let mut by_period: BTreeMap<Period, MonthlyRecord> = BTreeMap::new();
        for r in records {
            let e = by_period.entry(r.period).or_insert(MonthlyRecord {
                period: r.period,
                ad_expense_total: 0.0,
                business_total: 0.0,
            });
            e.ad_expense_total = add_capped(e.ad_expense_total, sanitize(r.ad_expense_total));
            e.business_total = add_capped(e.business_total, sanitize(r.business_total));
        }
        Self { records: by_period.into_values().collect() }
    }

    /// Normalize wire rows, reporting every repair.
    pub fn from_raw(rows: &[RawMonthly]) -> (Self, Vec<SeriesIssue>) {
        let mut issues = Vec::new();
        let mut records = Vec::with_capacity(rows.len());
        let mut seen: BTreeMap<Period, ()> = BTreeMap::new();

        for (position, row) in rows.iter().enumerate() {
            let Some(period) = row.period.as_deref().and_then(|p| p.parse::<Period>().ok()) else {
                issues.push(SeriesIssue::InvalidPeriod { position, value: row.period.clone() });
                continue;
            };
            if seen.insert(period, ()).is_some() {
                issues.push(SeriesIssue::DuplicatePeriod { period });
            }
            let mut field = |value: Option<f64>, name: &'static str| match value {
                Some(v) if v.is_finite() && v >= 0.0 => v,
                _ => {
                    issues.push(SeriesIssue::ClampedValue { period, field: name });
                    0.0
                }
            };
            let ad_expense_total = field(row.ad_expense_total, "adExpenseTotal");
            let business_total = field(row.business_total, "businessTotal");
            records.push(MonthlyRecord { period, ad_expense_total, business_total });
        }

        for issue in &issues {
            tracing::warn!(issue = ?issue, "monthly record repaired");
        }
        (Self::new(records), issues)
    }

    /// Sum several series period by period (Branch/Region roll-ups).
    pub fn merge<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a MonthlySeries>,
    {
        Self::new(parts.into_iter().flat_map(|s| s.records.iter().copied()).collect())
    }

    pub fn records(&self) -> &[MonthlyRecord] { &self.records }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/* -------------------------------------------------------------------------- */
/*                               Trend & class                                 */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Trend {
    Up,
    Down,
    /// Fewer than two periods.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Classification {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Excellent => "excellent",
            Classification::Good => "good",
            Classification::Average => "average",
            Classification::Poor => "poor",
        }
    }
}

/// Band a performance score: `(15, ∞)` Excellent, `(10, 15]` Good,
/// `(5, 10]` Average, everything else (NaN included) Poor.
pub fn classify(score: f64) -> Classification {
    if score > 15.0 {
        Classification::Excellent
    } else if score > 10.0 {
        Classification::Good
    } else if score > 5.0 {
        Classification::Average
    } else {
        Classification::Poor
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Metrics                                     */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AggregateMetrics {
    pub ad_expense_total: f64,
    pub business_total: f64,
    pub ad_percentage: f64,
    pub roi: f64,
    pub performance_score: f64,
    pub efficiency: f64,
    pub trend: Trend,
}

/// Ratios for one period, for chart series.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PeriodMetrics {
    pub period: Period,
    pub ad_expense_total: f64,
    pub business_total: f64,
    pub ad_percentage: f64,
    pub roi: f64,
    pub performance_score: f64,
}

struct Ratios {
    ad_percentage: f64,
    roi: f64,
    performance_score: f64,
}

fn ratios(ad_expense: f64, business: f64) -> Ratios {
    let ad_percentage = if business > 0.0 { finite(ad_expense / business * 100.0) } else { 0.0 };
    let roi = if ad_expense > 0.0 { finite(business / ad_expense) } else { 0.0 };
    Ratios { ad_percentage, roi, performance_score: finite(roi * 10.0 - ad_percentage) }
}

fn trend_of(records: &[MonthlyRecord]) -> Trend {
    match records {
        [.., prev, last] if last.business_total > prev.business_total => Trend::Up,
        [.., _, _] => Trend::Down,
        _ => Trend::Unknown,
    }
}

impl AggregateMetrics {
    pub const ZERO: AggregateMetrics = AggregateMetrics {
        ad_expense_total: 0.0,
        business_total: 0.0,
        ad_percentage: 0.0,
        roi: 0.0,
        performance_score: 0.0,
        efficiency: 0.0,
        trend: Trend::Unknown,
    };

    pub fn classification(&self) -> Classification {
        classify(self.performance_score)
    }

    /// Copy with every number rounded to one decimal. Only for presentation.
    pub fn rounded_for_display(&self) -> Self {
        Self {
            ad_expense_total: round_one_decimal(self.ad_expense_total),
            business_total: round_one_decimal(self.business_total),
            ad_percentage: round_one_decimal(self.ad_percentage),
            roi: round_one_decimal(self.roi),
            performance_score: round_one_decimal(self.performance_score),
            efficiency: round_one_decimal(self.efficiency),
            trend: self.trend,
        }
    }
}

/// Reduce a series to totals, ratios and trend. Empty input yields all zeros
/// and `Trend::Unknown`.
pub fn aggregate(series: &MonthlySeries) -> AggregateMetrics {
    let (ad_expense_total, business_total) = series
        .records()
        .iter()
        .fold((0.0, 0.0), |(a, b), r| (add_capped(a, r.ad_expense_total), add_capped(b, r.business_total)));
    let Ratios { ad_percentage, roi, performance_score } = ratios(ad_expense_total, business_total);
    let efficiency = if roi > 0.0 && ad_percentage > 0.0 { finite(roi / ad_percentage * 100.0) } else { 0.0 };

    AggregateMetrics {
        ad_expense_total,
        business_total,
        ad_percentage,
        roi,
        performance_score,
        efficiency,
        trend: trend_of(series.records()),
    }
}

pub fn period_metrics(series: &MonthlySeries) -> Vec<PeriodMetrics> {
    series
        .records()
        .iter()
        .map(|r| {
            let Ratios { ad_percentage, roi, performance_score } = ratios(r.ad_expense_total, r.business_total);
            PeriodMetrics {
                period: r.period,
                ad_expense_total: r.ad_expense_total,
                business_total: r.business_total,
                ad_percentage,
                roi,
                performance_score,
            }
        })
        .collect()
}

// ---- Tests ----

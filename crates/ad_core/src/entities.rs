//! Normalized hierarchy entities and monthly records.
//!
//! These are the shapes *after* ingest normalization: every reference is a
//! canonical id and every Centre carries a region consistent with its branch.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::{BranchId, CentreId, RegionId};

/// Hierarchy level addressed by selection / option queries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Level {
    Region,
    Branch,
    Centre,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Region => "region",
            Level::Branch => "branch",
            Level::Centre => "centre",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" | "regions" => Ok(Level::Region),
            "branch" | "branches" => Ok(Level::Branch),
            "centre" | "centres" | "center" | "centers" => Ok(Level::Centre),
            other => Err(CoreError::InvalidToken("level", other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub code: Option<String>,
    pub region_id: RegionId,
}

/// Whether ingest could resolve both parents of a Centre.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum Completeness {
    #[default]
    Complete,
    /// At least one parent was missing or unknown; the Centre sits under the
    /// "Unassigned" bucket for that level.
    Incomplete { branch_unresolved: bool, region_unresolved: bool },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Centre {
    pub id: CentreId,
    pub name: String,
    pub external_code: Option<String>,
    pub short_code: Option<String>,
    pub branch_id: BranchId,
    /// Always the region of `branch_id` after normalization.
    pub region_id: RegionId,
    pub completeness: Completeness,
}

// ---------------------------------------------------------------------------
// Periods & monthly records
// ---------------------------------------------------------------------------

/// Calendar month, ordered chronologically. Wire form is `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    pub fn new(year: u16, month: u8) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    #[inline] pub fn year(self) -> u16 { self.year }
    #[inline] pub fn month(self) -> u8 { self.month }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CoreError::InvalidPeriod(s.to_string());
        let t = s.trim();
        let (y, m) = t.split_once('-').ok_or_else(bad)?;
        if y.len() != 4 || m.is_empty() || m.len() > 2 {
            return Err(bad());
        }
        if !y.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let year: u16 = y.parse().map_err(|_| bad())?;
        let month: u8 = m.parse().map_err(|_| bad())?;
        Period::new(year, month).map_err(|_| bad())
    }
}

#[cfg(feature = "serde")]
impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One month of activity for a Centre. Totals are finite and non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MonthlyRecord {
    pub period: Period,
    pub ad_expense_total: f64,
    pub business_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_and_orders() {
        let a: Period = "2024-02".parse().unwrap();
        let b: Period = "2023-12".parse().unwrap();
        let c: Period = "2024-1".parse().unwrap();
        assert!(b < c && c < a);
        assert_eq!(c.to_string(), "2024-01");
    }

    #[test]
    fn period_rejects_garbage() {
        for s in ["", "2024", "2024-13", "2024-00", "24-01", "2024-1a", "2024/01"] {
            assert!(s.parse::<Period>().is_err(), "{s} should be rejected");
        }
    }

    #[test]
    fn level_tokens() {
        assert_eq!("Branches".parse::<Level>().unwrap(), Level::Branch);
        assert_eq!("center".parse::<Level>().unwrap(), Level::Centre);
        assert!("district".parse::<Level>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn monthly_record_wire_shape() {
        let r: MonthlyRecord = serde_json::from_str(
            r#"{"period":"2024-03","adExpenseTotal":12.5,"businessTotal":250}"#,
        )
        .unwrap();
        assert_eq!(r.period, Period::new(2024, 3).unwrap());
        assert_eq!(r.business_total, 250.0);
    }
}

//! Raw ingest shapes, exactly as the fetch collaborator hands them over.
//!
//! Parent references arrive either as a bare id (string or integer) or as an
//! embedded object `{ id | _id, name, shortCode | code, region? }`. Both
//! shapes are accepted here and resolved once, by the hierarchy index; no
//! other layer ever looks at a `RawRef`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar id as found on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawScalar {
    Text(String),
    Int(i64),
}

impl RawScalar {
    /// Canonical text form; `None` for blank strings.
    pub fn canonical(&self) -> Option<String> {
        match self {
            RawScalar::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            RawScalar::Int(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for RawScalar {
    fn from(s: &str) -> Self {
        RawScalar::Text(s.to_string())
    }
}

/// Embedded (populated) parent object.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawEmbedded {
    #[cfg_attr(feature = "serde", serde(default, alias = "_id"))]
    pub id: Option<RawScalar>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "code"))]
    pub short_code: Option<String>,
    /// A populated branch may carry its own region reference.
    #[cfg_attr(feature = "serde", serde(default, alias = "regionId", alias = "regionRef"))]
    pub region: Option<Box<RawRef>>,
}

/// A parent reference: bare id or embedded object.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawRef {
    Id(RawScalar),
    Embedded(RawEmbedded),
}

impl RawRef {
    pub fn bare(id: &str) -> Self {
        RawRef::Id(RawScalar::from(id))
    }

    pub fn embedded(id: &str, name: &str) -> Self {
        RawRef::Embedded(RawEmbedded {
            id: Some(RawScalar::from(id)),
            name: Some(name.to_string()),
            ..RawEmbedded::default()
        })
    }

    pub fn id(&self) -> Option<String> {
        match self {
            RawRef::Id(s) => s.canonical(),
            RawRef::Embedded(e) => e.id.as_ref().and_then(RawScalar::canonical),
        }
    }

    /// Display name, only available on embedded objects.
    pub fn name(&self) -> Option<&str> {
        match self {
            RawRef::Id(_) => None,
            RawRef::Embedded(e) => non_blank(e.name.as_deref()),
        }
    }

    pub fn short_code(&self) -> Option<&str> {
        match self {
            RawRef::Id(_) => None,
            RawRef::Embedded(e) => non_blank(e.short_code.as_deref()),
        }
    }

    pub fn embedded_region(&self) -> Option<&RawRef> {
        match self {
            RawRef::Id(_) => None,
            RawRef::Embedded(e) => e.region.as_deref(),
        }
    }
}

/// Trimmed text, `None` when blank.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawRegion {
    #[cfg_attr(feature = "serde", serde(default, alias = "_id"))]
    pub id: Option<RawScalar>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "code"))]
    pub short_code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawBranch {
    #[cfg_attr(feature = "serde", serde(default, alias = "_id"))]
    pub id: Option<RawScalar>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "code"))]
    pub short_code: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "regionRef", alias = "region"))]
    pub region_id: Option<RawRef>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawCentre {
    #[cfg_attr(feature = "serde", serde(default, alias = "_id"))]
    pub id: Option<RawScalar>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub external_code: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "code"))]
    pub short_code: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, alias = "branchRef", alias = "branch"))]
    pub branch_id: Option<RawRef>,
    #[cfg_attr(feature = "serde", serde(default, alias = "regionRef", alias = "region"))]
    pub region_id: Option<RawRef>,
}

/// Everything one fetch returns. `regions` / `branches` are optional: a
/// Centres-only snapshot relies on embedded parent objects for names.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawSnapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub regions: Vec<RawRegion>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub branches: Vec<RawBranch>,
    #[cfg_attr(feature = "serde", serde(default, alias = "centers"))]
    pub centres: Vec<RawCentre>,
}

impl RawSnapshot {
    pub fn from_centres(centres: Vec<RawCentre>) -> Self {
        Self { centres, ..Self::default() }
    }
}

/// One monthly row; every field may be missing on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawMonthly {
    #[cfg_attr(feature = "serde", serde(default))]
    pub period: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ad_expense_total: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub business_total: Option<f64>,
}

/// Flat-list form of a monthly row, keyed by its Centre.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RawMonthlyRow {
    #[cfg_attr(feature = "serde", serde(default, alias = "centerId", alias = "centre"))]
    pub centre_id: Option<RawScalar>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub record: RawMonthly,
}

//! crates/ad_core/src/ids.rs
//! Canonical hierarchy identifiers. Every raw reference (bare id, number, or
//! embedded object) is normalized into one of these at the ingest boundary.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors returned when validating or parsing IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    Empty,
    TooLong,
    Reserved,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::Empty => f.write_str("id is empty"),
            IdError::TooLong => write!(f, "id longer than {MAX_ID_LEN} bytes"),
            IdError::Reserved => write!(f, "id `{UNASSIGNED_TOKEN}` is reserved"),
        }
    }
}

impl std::error::Error for IdError {}

const MAX_ID_LEN: usize = 256;

/// Token behind every synthetic "Unassigned" bucket id.
pub const UNASSIGNED_TOKEN: &str = "__unassigned__";

/// Display name of the synthetic bucket.
pub const UNASSIGNED_NAME: &str = "Unassigned";

/// Trimmed, non-empty, bounded. The unassigned token is reserved for the index.
fn check_id(s: &str) -> Result<&str, IdError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(IdError::Empty);
    }
    if t.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    if t == UNASSIGNED_TOKEN {
        return Err(IdError::Reserved);
    }
    Ok(t)
}

macro_rules! hierarchy_id {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        /// Stored ids go through the same checks as parsed ones. The
        /// unassigned token reads back as the synthetic bucket.
        #[cfg(feature = "serde")]
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                Self::parse_query(&s).map_err(serde::de::Error::custom)
            }
        }

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }

            /// Id of the synthetic "Unassigned" bucket at this level.
            #[inline] pub fn unassigned() -> Self { Self(UNASSIGNED_TOKEN.to_owned()) }

            #[inline] pub fn is_unassigned(&self) -> bool { self.0 == UNASSIGNED_TOKEN }

            /// Parse a caller-supplied id. Unlike `FromStr`, the unassigned
            /// token is accepted and names the synthetic bucket.
            pub fn parse_query(s: &str) -> Result<Self, IdError> {
                if s.trim() == UNASSIGNED_TOKEN {
                    return Ok(Self::unassigned());
                }
                s.parse()
            }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                check_id(s).map(|t| Self(t.to_owned()))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str { &self.0 }
        }
    }
}

hierarchy_id!(
    /// Region identifier (top of the hierarchy).
    RegionId
);
hierarchy_id!(
    /// Branch identifier; a branch belongs to exactly one region.
    BranchId
);
hierarchy_id!(
    /// Centre identifier; a centre belongs to exactly one branch.
    CentreId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_trimmed() {
        let r: RegionId = "  R-1 ".parse().unwrap();
        assert_eq!(r.as_str(), "R-1");
    }

    #[test]
    fn empty_and_reserved_ids_rejected() {
        assert_eq!("   ".parse::<BranchId>(), Err(IdError::Empty));
        assert_eq!(UNASSIGNED_TOKEN.parse::<CentreId>(), Err(IdError::Reserved));
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert_eq!(long.parse::<CentreId>(), Err(IdError::TooLong));
    }

    #[test]
    fn unassigned_bucket_is_recognizable() {
        assert!(BranchId::unassigned().is_unassigned());
        assert!(!"B1".parse::<BranchId>().unwrap().is_unassigned());
        assert_eq!(RegionId::parse_query(" __unassigned__ "), Ok(RegionId::unassigned()));
        assert_eq!(RegionId::parse_query(""), Err(IdError::Empty));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_checks_ids() {
        let b: BranchId = serde_json::from_str(r#"" b1 ""#).unwrap();
        assert_eq!(b.as_str(), "b1");
        assert!(serde_json::from_str::<RegionId>(r#""  ""#).is_err());
        let long = format!("\"{}\"", "x".repeat(MAX_ID_LEN + 1));
        assert!(serde_json::from_str::<CentreId>(&long).is_err());

        let bucket = serde_json::to_string(&CentreId::unassigned()).unwrap();
        assert_eq!(serde_json::from_str::<CentreId>(&bucket).unwrap(), CentreId::unassigned());
    }
}

//! variables.rs: engine parameters with safe defaults, plus the token enums
//! (sort key, direction, rank scope) shared by ranking, the pipeline and the CLI.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ------------ Macros ------------

/// Define an enum with explicit wire tokens (plus accepted aliases) that
/// round-trips through `FromStr` / `Display` and, with `serde`, through JSON.
macro_rules! token_enum {
    ($(#[$m:meta])* $name:ident ($kind:literal) => {
        $($(#[$vm:meta])* $variant:ident = $token:literal $(| $alias:literal)*),+ $(,)?
    }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $(
                $(#[$vm])*
                #[cfg_attr(feature = "serde", serde(rename = $token $(, alias = $alias)*))]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self { $($name::$variant => $token,)+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let t = s.trim().to_ascii_lowercase();
                match t.as_str() {
                    $($token $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(CoreError::InvalidToken($kind, s.to_string())),
                }
            }
        }
    };
}

// ------------ Canonical enums (wire tokens explicit) ------------

token_enum!(
    /// Primary key for ranking.
    SortKey ("sort key") => {
        BusinessTotal  = "business_total" | "business",
        AdExpenseTotal = "ad_expense_total" | "ad_expense" | "expense",
        Roi            = "roi",
        Name           = "name",
    }
);

token_enum!(
    SortDirection ("sort direction") => {
        Ascending  = "asc" | "ascending",
        Descending = "desc" | "descending",
    }
);

token_enum!(
    /// Which Centres a ranking covers.
    RankScope ("rank scope") => {
        /// Selected Centres when any are selected, else every available Centre.
        SelectedOrAvailable = "selected_or_available",
        /// Every available Centre, ignoring the Centre selection.
        Available           = "available",
    }
);

// ------------ Params ------------

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Params {
    pub default_sort_key: SortKey,
    pub default_direction: SortDirection,
    pub rank_scope: RankScope,
    /// Truncate ranked output to the first `n` rows.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub top_n: Option<u32>,
    /// Search terms shorter than this (in chars, after trimming) are ignored.
    pub search_min_chars: u8,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            default_sort_key: SortKey::BusinessTotal,
            default_direction: SortDirection::Descending,
            rank_scope: RankScope::SelectedOrAvailable,
            top_n: None,
            search_min_chars: 0,
        }
    }
}

pub const MAX_SEARCH_MIN_CHARS: u8 = 32;

impl Params {
    /// Domain checks for values serde cannot express.
    pub fn validate_domains(&self) -> Result<(), CoreError> {
        if self.top_n == Some(0) {
            return Err(CoreError::DomainOutOfRange("top_n must be >= 1"));
        }
        if self.search_min_chars > MAX_SEARCH_MIN_CHARS {
            return Err(CoreError::DomainOutOfRange("search_min_chars must be <= 32"));
        }
        Ok(())
    }
}

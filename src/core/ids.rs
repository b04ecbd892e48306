// File: src/core/ids.rs

//! Identifier types for ranking and selection.
//!
//! This module is intentionally **type-heavy** and **logic-light**.
//! Every entity the engine touches is keyed by a database integer id; the
//! newtypes below keep article ids from being compared against user ids
//! (or organization ids, which share the same integer space in storage).
//!
//! All ids serialize transparently as plain integers so configuration files
//! and collaborator payloads stay readable.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declare an integer newtype with a consistent API.
macro_rules! define_numeric_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw database id.
            #[inline]
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Extract the raw database id.
            #[inline]
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

define_numeric_id!(
    /// Identifier of an article (the unit ranked by the feed formula).
    ///
    /// Billboards also use it as their boost context.
    ArticleId
);

define_numeric_id!(
    /// User account identifier (article author or follow target).
    UserId
);

define_numeric_id!(
    /// Organization identifier.
    OrganizationId
);

define_numeric_id!(
    /// Identifier of a billboard (ad placement candidate).
    BillboardId
);

define_numeric_id!(
    /// Identifier of a survey used by billboard exclusion rules.
    SurveyId
);

define_numeric_id!(
    /// Identifier of a subforem (community partition an article belongs to).
    SubforemId
);

/// Parse a comma-separated list of ids, skipping blank entries.
///
/// Mirrors how web forms submit id lists (`"11,12, 13"`); an empty string
/// yields an empty list.
///
/// # Errors
/// Returns the first integer parse failure.
pub fn parse_id_list<T>(input: &str) -> Result<Vec<T>, ParseIntError>
where
    T: FromStr<Err = ParseIntError>,
{
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

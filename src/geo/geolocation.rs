//! Geolocation value type and parsing.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a location code cannot be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{input} is not a recognizable location code")]
pub struct GeoParseError {
    /// The rejected input, trimmed.
    pub input: String,
}

/// A country with an optional subdivision.
///
/// Codes are stored upper-case. Equality is structural: two values are equal
/// when both the country and the region (including its absence) match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StoredGeolocation")]
pub struct Geolocation {
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// ISO 3166-2 subdivision code without the country prefix.
    pub region_code: Option<String>,
}

/// Serialized shape of a [`Geolocation`], normalized through [`Geolocation::new`].
#[derive(Deserialize)]
struct StoredGeolocation {
    country_code: String,
    #[serde(default)]
    region_code: Option<String>,
}

impl From<StoredGeolocation> for Geolocation {
    fn from(stored: StoredGeolocation) -> Self {
        Self::new(stored.country_code, stored.region_code.as_deref())
    }
}

/// Freeform input accepted by [`Geolocation::parse`].
#[derive(Clone, Debug)]
pub enum GeoInput<'a> {
    /// ISO 3166-2 (`US-CA`) or hierarchical (`CA.NL`) text.
    Code(&'a str),
    /// An already constructed value, returned unchanged.
    Parsed(Geolocation),
}

impl<'a> From<&'a str> for GeoInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Code(value)
    }
}

impl From<Geolocation> for GeoInput<'_> {
    fn from(value: Geolocation) -> Self {
        Self::Parsed(value)
    }
}

// Literal pattern; compilation cannot fail.
#[allow(clippy::unwrap_used)]
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)(?:\s*[-.]\s*([A-Za-z0-9]+))?$").unwrap()
    })
}

impl Geolocation {
    /// Build a geolocation, upper-casing both codes.
    #[must_use]
    pub fn new(country_code: impl AsRef<str>, region_code: Option<&str>) -> Self {
        Self {
            country_code: country_code.as_ref().trim().to_ascii_uppercase(),
            region_code: region_code
                .map(|region| region.trim().to_ascii_uppercase())
                .filter(|region| !region.is_empty()),
        }
    }

    /// Build a country-only geolocation.
    #[must_use]
    pub fn country(country_code: impl AsRef<str>) -> Self {
        Self::new(country_code, None)
    }

    /// Parse freeform input.
    ///
    /// Accepts `"US-CA"`, `"CA.NL"`, `"US"` or an existing value. `None`,
    /// blank text and text that does not look like a location code yield
    /// `None`. Parsing does not check the reference data; see
    /// [`crate::geo::GeoMatcher::is_valid`].
    #[must_use]
    pub fn parse(input: Option<GeoInput<'_>>) -> Option<Self> {
        match input? {
            GeoInput::Parsed(geo) => Some(geo),
            GeoInput::Code(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                let caps = code_pattern().captures(text)?;
                let country = caps.get(1)?.as_str();
                let region = caps.get(2).map(|m| m.as_str());
                Some(Self::new(country, region))
            }
        }
    }

    /// Parse a comma-separated list such as `"US-CA, CA-ON"`.
    ///
    /// Blank entries are skipped, so `""` yields an empty list.
    ///
    /// # Errors
    /// Returns the first entry that is not a recognizable location code.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, GeoParseError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }

    /// ISO 3166-2 rendering (`US-CA`, or `US` without a region).
    #[must_use]
    pub fn to_iso3166(&self) -> String {
        self.region_code.as_ref().map_or_else(
            || self.country_code.clone(),
            |region| format!("{}-{region}", self.country_code),
        )
    }

    /// Hierarchical path rendering (`US.CA`), the form stored by label-tree columns.
    #[must_use]
    pub fn to_ltree(&self) -> String {
        self.region_code.as_ref().map_or_else(
            || self.country_code.clone(),
            |region| format!("{}.{region}", self.country_code),
        )
    }

    /// Whether this target covers `location`.
    ///
    /// A country-only target covers every region of that country; a region
    /// target covers only the same region.
    #[must_use]
    pub fn covers(&self, location: &Self) -> bool {
        self.country_code == location.country_code
            && self
                .region_code
                .as_ref()
                .is_none_or(|region| location.region_code.as_ref() == Some(region))
    }
}

impl fmt::Display for Geolocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso3166())
    }
}

impl FromStr for Geolocation {
    type Err = GeoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(GeoInput::Code(s))).ok_or_else(|| GeoParseError {
            input: s.trim().to_string(),
        })
    }
}

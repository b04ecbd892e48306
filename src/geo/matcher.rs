//! Validation of geolocations against the enabled-country configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geo::geolocation::Geolocation;
use crate::geo::iso3166;

/// Whether a country accepts region-level targeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionTargeting {
    /// Regions may be targeted.
    WithRegions,
    /// Only whole-country targeting is allowed.
    WithoutRegions,
}

/// Validation context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Matching against existing data: regions are tolerated even where
    /// region targeting is disabled.
    Query,
    /// Setting new targeting rules: region targeting must be enabled.
    Targeting,
}

/// Enabled countries keyed by upper-case ISO 3166-1 code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, RegionTargeting>")]
pub struct EnabledCountries(HashMap<String, RegionTargeting>);

impl From<HashMap<String, RegionTargeting>> for EnabledCountries {
    fn from(map: HashMap<String, RegionTargeting>) -> Self {
        map.into_iter().collect()
    }
}

impl Default for EnabledCountries {
    fn default() -> Self {
        Self::from_iter([
            ("US", RegionTargeting::WithRegions),
            ("CA", RegionTargeting::WithRegions),
        ])
    }
}

impl<S: AsRef<str>> FromIterator<(S, RegionTargeting)> for EnabledCountries {
    fn from_iter<I: IntoIterator<Item = (S, RegionTargeting)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(code, targeting)| (code.as_ref().trim().to_ascii_uppercase(), targeting))
                .collect(),
        )
    }
}

impl EnabledCountries {
    /// Region policy for a country, if enabled.
    #[must_use]
    pub fn get(&self, country: &str) -> Option<RegionTargeting> {
        self.0.get(country).copied()
    }

    /// Enable (or reconfigure) a country.
    pub fn insert(&mut self, country: &str, targeting: RegionTargeting) {
        self.0.insert(country.trim().to_ascii_uppercase(), targeting);
    }

    /// Number of enabled countries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no country is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(country, policy)` pairs.
    pub fn countries(&self) -> impl Iterator<Item = (&str, RegionTargeting)> {
        self.0.iter().map(|(code, targeting)| (code.as_str(), *targeting))
    }
}

/// Validates geolocations against ISO reference data and enabled countries.
#[derive(Clone, Debug, Default)]
pub struct GeoMatcher {
    enabled: EnabledCountries,
}

impl GeoMatcher {
    /// Create a matcher over an enabled-country whitelist.
    #[must_use]
    pub const fn new(enabled: EnabledCountries) -> Self {
        Self { enabled }
    }

    /// The whitelist this matcher validates against.
    #[must_use]
    pub const fn enabled_countries(&self) -> &EnabledCountries {
        &self.enabled
    }

    /// Whether `geo` is acceptable in `mode`.
    ///
    /// The country must be a real ISO 3166-1 code and enabled. A region must
    /// be a real subdivision of that country; in [`ValidationMode::Targeting`]
    /// the country must also allow region targeting.
    #[must_use]
    pub fn is_valid(&self, geo: &Geolocation, mode: ValidationMode) -> bool {
        if !iso3166::is_country(&geo.country_code) {
            return false;
        }
        let Some(targeting) = self.enabled.get(&geo.country_code) else {
            return false;
        };

        let Some(region) = geo.region_code.as_deref() else {
            return true;
        };

        if !iso3166::is_subdivision(&geo.country_code, region) {
            return false;
        }

        match mode {
            ValidationMode::Query => true,
            ValidationMode::Targeting => targeting == RegionTargeting::WithRegions,
        }
    }

    /// ISO 3166-2 renderings of the entries that fail [`Self::is_valid`].
    #[must_use]
    pub fn unsupported_codes(&self, geos: &[Geolocation], mode: ValidationMode) -> Vec<String> {
        geos.iter()
            .filter(|geo| !self.is_valid(geo, mode))
            .map(Geolocation::to_iso3166)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(code: &str) -> Geolocation {
        code.parse().unwrap()
    }

    #[test]
    fn test_default_whitelist() {
        let matcher = GeoMatcher::default();
        assert!(matcher.is_valid(&geo("US"), ValidationMode::Targeting));
        assert!(matcher.is_valid(&geo("CA-ON"), ValidationMode::Targeting));
        assert!(!matcher.is_valid(&geo("FR"), ValidationMode::Query));
    }

    #[test]
    fn test_unknown_country_rejected_even_if_enabled() {
        let enabled = EnabledCountries::from_iter([("XX", RegionTargeting::WithRegions)]);
        let matcher = GeoMatcher::new(enabled);
        assert!(!matcher.is_valid(&geo("XX"), ValidationMode::Query));
    }

    #[test]
    fn test_region_of_wrong_country_is_invalid_in_both_modes() {
        let matcher = GeoMatcher::default();
        let wrong = Geolocation::new("US", Some("ON"));
        assert!(!matcher.is_valid(&wrong, ValidationMode::Query));
        assert!(!matcher.is_valid(&wrong, ValidationMode::Targeting));
    }

    #[test]
    fn test_region_policy_depends_on_mode() {
        let mut enabled = EnabledCountries::from_iter([
            ("US", RegionTargeting::WithRegions),
            ("CA", RegionTargeting::WithoutRegions),
        ]);
        let newfoundland = geo("CA-NL");

        let matcher = GeoMatcher::new(enabled.clone());
        assert!(matcher.is_valid(&newfoundland, ValidationMode::Query));
        assert!(!matcher.is_valid(&newfoundland, ValidationMode::Targeting));
        assert!(matcher.is_valid(&geo("CA"), ValidationMode::Targeting));

        enabled.insert("ca", RegionTargeting::WithRegions);
        let widened = GeoMatcher::new(enabled);
        assert!(widened.is_valid(&newfoundland, ValidationMode::Query));
        assert!(widened.is_valid(&newfoundland, ValidationMode::Targeting));
    }

    #[test]
    fn test_regions_outside_north_america() {
        let matcher = GeoMatcher::new(EnabledCountries::from_iter([
            ("GB", RegionTargeting::WithRegions),
            ("JP", RegionTargeting::WithoutRegions),
        ]));
        assert!(matcher.is_valid(&geo("GB-SCT"), ValidationMode::Targeting));
        assert!(matcher.is_valid(&geo("GB-ENG"), ValidationMode::Query));
        assert!(matcher.is_valid(&geo("JP-13"), ValidationMode::Query));
        assert!(!matcher.is_valid(&geo("JP-13"), ValidationMode::Targeting));
        assert!(!matcher.is_valid(&geo("GB-CA"), ValidationMode::Query));
    }

    #[test]
    fn test_unsupported_codes() {
        let matcher = GeoMatcher::default();
        let list = Geolocation::parse_list("CA-QC, CA-FAKE, NOT-REAL").unwrap();
        assert_eq!(
            matcher.unsupported_codes(&list, ValidationMode::Targeting),
            vec!["CA-FAKE".to_string(), "NOT-REAL".to_string()]
        );
    }

    #[test]
    fn test_enabled_countries_serde() {
        let enabled: EnabledCountries =
            serde_json::from_str(r#"{"us":"with_regions","GB":"without_regions"}"#).unwrap();
        assert_eq!(enabled.get("GB"), Some(RegionTargeting::WithoutRegions));
        assert_eq!(enabled.get("US"), Some(RegionTargeting::WithRegions));
        assert_eq!(enabled.len(), 2);

        let mut codes: Vec<&str> = enabled.countries().map(|(code, _)| code).collect();
        codes.sort_unstable();
        assert_eq!(codes, vec!["GB", "US"]);

        let json = serde_json::to_string(&enabled).unwrap();
        let restored: EnabledCountries = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, enabled);
    }
}

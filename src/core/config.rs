//! Configuration for the ranking engine.
//!
//! Values come from JSON (`EngineConfig::from_json_str`) and can be
//! overridden per deployment through environment variables:
//!
//! | Variable | Effect |
//! |---|---|
//! | `LOW_IMPRESSION_COUNT` | global seldom-seen threshold |
//! | `LOW_IMPRESSION_COUNT_FOR_<AREA>` | threshold for one placement area |
//! | `SELDOM_SEEN_MIN[_FOR_<AREA>]` | upper bound of the random-selection range |
//! | `SELDOM_SEEN_MAX[_FOR_<AREA>]` | upper bound of the new-and-priority range |
//! | `NEW_ONLY_MAX[_FOR_<AREA>]` | upper bound of the new-only range |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::billboard::delivery::{
    self, NEW_AND_PRIORITY_RANGE_MAX_FALLBACK, NEW_ONLY_RANGE_MAX_FALLBACK, PlacementAreaConfig,
    RANDOM_RANGE_MAX_FALLBACK, SelectionWeights,
};
use crate::billboard::display::BillboardPicker;
use crate::billboard::placement::PlacementArea;
use crate::billboard::selector::{DEFAULT_BOOST_MULTIPLIER, WeightedSelector};
use crate::core::errors::{RankingError, RankingResult, ensure_weight};
use crate::feed::weights::FeedConfig;
use crate::geo::{EnabledCountries, GeoMatcher};

/// Seldom-seen threshold used when nothing overrides it.
pub const DEFAULT_LOW_IMPRESSION_COUNT: u64 = 1_000;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Feed scoring settings.
    pub feed: FeedConfig,
    /// Billboard selection settings.
    pub billboard: BillboardSettings,
    /// Geolocation settings.
    pub geo: GeoSettings,
}

impl EngineConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> RankingResult<()> {
        self.feed.validate()?;
        self.billboard.validate()?;
        self.geo.validate()
    }

    /// Parse and validate a JSON document; missing sections keep defaults.
    ///
    /// # Errors
    /// Returns [`RankingError::Serialization`] for malformed JSON and the
    /// validation error for out-of-range values.
    pub fn from_json_str(json: &str) -> RankingResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    /// Returns the validation error of the resulting configuration.
    pub fn from_env() -> RankingResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.billboard.apply_env_overrides(&lookup);
    }
}

/// Cut points of the strategy draw; `None` keeps the fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRanges {
    /// Upper bound of the random-selection range.
    pub seldom_seen_min: Option<u32>,
    /// Upper bound of the new-and-priority range.
    pub seldom_seen_max: Option<u32>,
    /// Upper bound of the new-only range.
    pub new_only_max: Option<u32>,
}

impl SelectionRanges {
    fn or(self, fallback: Self) -> Self {
        Self {
            seldom_seen_min: self.seldom_seen_min.or(fallback.seldom_seen_min),
            seldom_seen_max: self.seldom_seen_max.or(fallback.seldom_seen_max),
            new_only_max: self.new_only_max.or(fallback.new_only_max),
        }
    }

    fn is_empty(self) -> bool {
        self == Self::default()
    }
}

/// Billboard selection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillboardSettings {
    /// Global seldom-seen threshold override.
    pub low_impression_count: Option<u64>,
    /// Per-area seldom-seen thresholds.
    pub low_impression_count_by_area: HashMap<PlacementArea, u64>,
    /// Global strategy cut points.
    pub ranges: SelectionRanges,
    /// Per-area strategy cut points.
    pub ranges_by_area: HashMap<PlacementArea, SelectionRanges>,
    /// Multiplier applied to billboards preferred for the current article.
    pub boost_multiplier: f64,
    /// Delivery rates and optional strategy mixes per area.
    pub placement_configs: Vec<PlacementAreaConfig>,
}

impl Default for BillboardSettings {
    fn default() -> Self {
        Self {
            low_impression_count: None,
            low_impression_count_by_area: HashMap::new(),
            ranges: SelectionRanges::default(),
            ranges_by_area: HashMap::new(),
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
            placement_configs: Vec::new(),
        }
    }
}

impl BillboardSettings {
    /// Validate multiplier and delivery rates.
    ///
    /// # Errors
    /// Returns the first invalid value, including duplicated placement areas.
    pub fn validate(&self) -> RankingResult<()> {
        ensure_weight("boost_multiplier", self.boost_multiplier)?;
        let mut seen = Vec::with_capacity(self.placement_configs.len());
        for config in &self.placement_configs {
            config.validate()?;
            if seen.contains(&config.placement_area) {
                return Err(RankingError::InvalidConfig(format!(
                    "placement area {} is configured twice",
                    config.placement_area
                )));
            }
            seen.push(config.placement_area);
        }
        Ok(())
    }

    /// Seldom-seen threshold for `area`: area override, then global
    /// override, then [`DEFAULT_LOW_IMPRESSION_COUNT`].
    #[must_use]
    pub fn low_impression_count_for(&self, area: PlacementArea) -> u64 {
        self.low_impression_count_by_area
            .get(&area)
            .copied()
            .or(self.low_impression_count)
            .unwrap_or(DEFAULT_LOW_IMPRESSION_COUNT)
    }

    /// Strategy mix for `area`.
    ///
    /// An explicit mix in the area's placement config wins; otherwise the
    /// mix is derived from the area ranges, then the global ranges, then the
    /// fallback cut points.
    #[must_use]
    pub fn selection_weights_for(&self, area: PlacementArea) -> SelectionWeights {
        if let Some(weights) = self
            .placement_config(area)
            .and_then(|config| config.selection_weights)
        {
            return weights;
        }
        let ranges = self
            .ranges_by_area
            .get(&area)
            .copied()
            .unwrap_or_default()
            .or(self.ranges);
        SelectionWeights::from_ranges(
            ranges.seldom_seen_min.unwrap_or(RANDOM_RANGE_MAX_FALLBACK),
            ranges
                .seldom_seen_max
                .unwrap_or(NEW_AND_PRIORITY_RANGE_MAX_FALLBACK),
            ranges.new_only_max.unwrap_or(NEW_ONLY_RANGE_MAX_FALLBACK),
        )
    }

    /// Configuration of `area`, if any.
    #[must_use]
    pub fn placement_config(&self, area: PlacementArea) -> Option<&PlacementAreaConfig> {
        self.placement_configs
            .iter()
            .find(|config| config.placement_area == area)
    }

    /// Delivery rate for `area` and sign-in state.
    #[must_use]
    pub fn delivery_rate(&self, area: PlacementArea, user_signed_in: bool) -> i32 {
        delivery::delivery_rate_for(&self.placement_configs, Some(area.as_str()), user_signed_in)
    }

    /// Picker configured for `area`.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] for an invalid boost multiplier.
    pub fn picker_for(&self, area: PlacementArea) -> RankingResult<BillboardPicker> {
        Ok(BillboardPicker::new(
            WeightedSelector::new(self.boost_multiplier)?,
            self.low_impression_count_for(area),
            self.selection_weights_for(area),
        ))
    }

    fn apply_env_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(count) = threshold_override(lookup, "LOW_IMPRESSION_COUNT") {
            self.low_impression_count = Some(count);
        }
        self.ranges = range_overrides(lookup, "").or(self.ranges);

        for area in PlacementArea::ALL {
            let suffix = format!("_FOR_{}", area.env_key());
            if let Some(count) = threshold_override(lookup, &format!("LOW_IMPRESSION_COUNT{suffix}")) {
                self.low_impression_count_by_area.insert(area, count);
            }
            let ranges = range_overrides(lookup, &suffix);
            if !ranges.is_empty() {
                let current = self.ranges_by_area.get(&area).copied().unwrap_or_default();
                self.ranges_by_area.insert(area, ranges.or(current));
            }
        }
    }
}

fn threshold_override<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    raw.trim()
        .parse::<u64>()
        .inspect_err(|err| warn!(key, value = %raw, %err, "ignoring unparseable impression threshold"))
        .ok()
}

fn range_overrides<F>(lookup: &F, suffix: &str) -> SelectionRanges
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(&format!("{name}{suffix}")).map(|raw| leading_integer(&raw));
    SelectionRanges {
        seldom_seen_min: read("SELDOM_SEEN_MIN"),
        seldom_seen_max: read("SELDOM_SEEN_MAX"),
        new_only_max: read("NEW_ONLY_MAX"),
    }
}

/// Leading decimal digits of `raw` as an integer; 0 when there are none.
fn leading_integer(raw: &str) -> u32 {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

/// Geolocation settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Countries open to targeting.
    pub enabled_countries: EnabledCountries,
}

impl GeoSettings {
    /// Validate the whitelist.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] when the whitelist is empty.
    pub fn validate(&self) -> RankingResult<()> {
        if self.enabled_countries.is_empty() {
            return Err(RankingError::InvalidConfig(
                "geo.enabled_countries must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Matcher over the configured whitelist.
    #[must_use]
    pub fn matcher(&self) -> GeoMatcher {
        GeoMatcher::new(self.enabled_countries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Geolocation, RegionTargeting, ValidationMode};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.billboard.low_impression_count_for(PlacementArea::SidebarLeft),
            1000
        );
        assert_eq!(
            config.billboard.selection_weights_for(PlacementArea::SidebarLeft),
            SelectionWeights::default()
        );
    }

    #[test]
    fn test_threshold_precedence() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[
            ("LOW_IMPRESSION_COUNT", "500"),
            ("LOW_IMPRESSION_COUNT_FOR_SIDEBAR_LEFT", "250"),
        ]));
        let billboard = &config.billboard;
        assert_eq!(billboard.low_impression_count_for(PlacementArea::SidebarLeft), 250);
        assert_eq!(billboard.low_impression_count_for(PlacementArea::Footer), 500);
    }

    #[test]
    fn test_unparseable_threshold_is_ignored() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[("LOW_IMPRESSION_COUNT", "lots")]));
        assert_eq!(
            config.billboard.low_impression_count_for(PlacementArea::Footer),
            DEFAULT_LOW_IMPRESSION_COUNT
        );
    }

    #[test]
    fn test_range_overrides() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[
            ("SELDOM_SEEN_MIN", "10"),
            ("SELDOM_SEEN_MAX", "40"),
            ("NEW_ONLY_MAX", "45"),
            ("SELDOM_SEEN_MIN_FOR_FEED_FIRST", "20"),
        ]));
        let billboard = &config.billboard;
        assert_eq!(
            billboard.selection_weights_for(PlacementArea::Footer),
            SelectionWeights::from_ranges(10, 40, 45)
        );
        assert_eq!(
            billboard.selection_weights_for(PlacementArea::FeedFirst),
            SelectionWeights::from_ranges(20, 40, 45)
        );
    }

    #[test]
    fn test_gibberish_range_becomes_zero() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[("SELDOM_SEEN_MIN_FOR_FOOTER", "gibberish")]));
        let weights = config.billboard.selection_weights_for(PlacementArea::Footer);
        assert_eq!(weights.random_selection, 0);
        assert_eq!(weights.new_and_priority, 35);
        assert_eq!(leading_integer("12abc"), 12);
    }

    #[test]
    fn test_explicit_selection_weights_win() {
        let mut config = EngineConfig::default();
        let mut area = PlacementAreaConfig::new(PlacementArea::PostComments, 100, 100);
        area.selection_weights = Some(SelectionWeights::from_entries([("random_selection", 100)]));
        config.billboard.placement_configs.push(area);
        let weights = config.billboard.selection_weights_for(PlacementArea::PostComments);
        assert_eq!(weights.random_selection, 100);
    }

    #[test]
    fn test_validate_rejects_bad_rates_and_duplicates() {
        let mut config = EngineConfig::default();
        config
            .billboard
            .placement_configs
            .push(PlacementAreaConfig::new(PlacementArea::SidebarLeft, 150, 50));
        assert!(config.validate().is_err());

        let mut duplicated = EngineConfig::default();
        duplicated.billboard.placement_configs = vec![
            PlacementAreaConfig::new(PlacementArea::SidebarLeft, 50, 50),
            PlacementAreaConfig::new(PlacementArea::SidebarLeft, 75, 75),
        ];
        assert!(duplicated.validate().is_err());
    }

    #[test]
    fn test_from_json_str() {
        let config = EngineConfig::from_json_str(
            r#"{
                "feed": {"weights": {"recency": 1.5}, "tag_counts": {"recent_min": 1, "recent_max": 3}},
                "billboard": {
                    "low_impression_count_by_area": {"post_sidebar": 50},
                    "placement_configs": [{"placement_area": "sidebar_left", "signed_in_rate": 80, "signed_out_rate": 60}]
                },
                "geo": {"enabled_countries": {"US": "with_regions", "GB": "without_regions"}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.feed.weights.recency, 1.5);
        assert_eq!(config.billboard.low_impression_count_for(PlacementArea::PostSidebar), 50);
        assert_eq!(config.billboard.delivery_rate(PlacementArea::SidebarLeft, false), 60);
        assert_eq!(config.billboard.delivery_rate(PlacementArea::Footer, false), 100);

        let matcher = config.geo.matcher();
        assert!(matcher.is_valid(&Geolocation::country("GB"), ValidationMode::Targeting));
        assert_eq!(
            matcher.enabled_countries().get("GB"),
            Some(RegionTargeting::WithoutRegions)
        );
    }

    #[test]
    fn test_from_json_str_errors() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(RankingError::Serialization(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"feed": {"weights": {"recency": -1.0}}}"#),
            Err(RankingError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_picker_for_area() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[("LOW_IMPRESSION_COUNT_FOR_HOME_HERO", "42")]));
        let picker = config.billboard.picker_for(PlacementArea::HomeHero).unwrap();
        assert_eq!(picker.low_impression_count(), 42);
    }
}

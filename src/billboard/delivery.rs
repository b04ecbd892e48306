//! Per-placement delivery gating and strategy-mix weights.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::billboard::placement::PlacementArea;
use crate::core::errors::{RankingError, RankingResult};

/// Delivery rate used when an area has no configuration.
pub const DEFAULT_DELIVERY_RATE: i32 = 100;

/// Upper bound of the random-selection range.
pub const RANDOM_RANGE_MAX_FALLBACK: u32 = 5;
/// Upper bound of the new-and-priority range.
pub const NEW_AND_PRIORITY_RANGE_MAX_FALLBACK: u32 = 35;
/// Upper bound of the new-only range.
pub const NEW_ONLY_RANGE_MAX_FALLBACK: u32 = 40;
/// Last value of the strategy draw; draws cover `0..=STRATEGY_DRAW_MAX`.
pub const STRATEGY_DRAW_MAX: u32 = 99;

/// Delivery rates for one placement area, in percent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementAreaConfig {
    /// Area the rates apply to.
    pub placement_area: PlacementArea,
    /// Percentage of signed-in requests that fetch a billboard.
    pub signed_in_rate: i32,
    /// Percentage of signed-out requests that fetch a billboard.
    pub signed_out_rate: i32,
    /// Strategy mix for this area, overriding the range-derived default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_weights: Option<SelectionWeights>,
}

impl PlacementAreaConfig {
    /// Create a config with the given rates.
    #[must_use]
    pub const fn new(placement_area: PlacementArea, signed_in_rate: i32, signed_out_rate: i32) -> Self {
        Self {
            placement_area,
            signed_in_rate,
            signed_out_rate,
            selection_weights: None,
        }
    }

    /// Check that both rates lie in `0..=100`.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] naming the offending rate.
    pub fn validate(&self) -> RankingResult<()> {
        for (name, rate) in [
            ("signed_in_rate", self.signed_in_rate),
            ("signed_out_rate", self.signed_out_rate),
        ] {
            if !(0..=100).contains(&rate) {
                return Err(RankingError::InvalidConfig(format!(
                    "{name} for {} must be between 0 and 100, got {rate}",
                    self.placement_area
                )));
            }
        }
        Ok(())
    }

    /// Rate for the given sign-in state.
    #[must_use]
    pub const fn rate(&self, user_signed_in: bool) -> i32 {
        if user_signed_in {
            self.signed_in_rate
        } else {
            self.signed_out_rate
        }
    }
}

/// Delivery rate for `area`, or 100 when the area is missing, blank,
/// unknown or unconfigured.
#[must_use]
pub fn delivery_rate_for(configs: &[PlacementAreaConfig], area: Option<&str>, user_signed_in: bool) -> i32 {
    let Some(area) = area.map(str::trim).filter(|area| !area.is_empty()) else {
        return DEFAULT_DELIVERY_RATE;
    };
    let Ok(area) = area.parse::<PlacementArea>() else {
        return DEFAULT_DELIVERY_RATE;
    };
    configs
        .iter()
        .find(|config| config.placement_area == area)
        .map_or(DEFAULT_DELIVERY_RATE, |config| config.rate(user_signed_in))
}

/// Draw `0..100` and serve iff the draw is below `rate`.
pub fn should_fetch_billboard<R: Rng + ?Sized>(rate: i32, rng: &mut R) -> bool {
    let draw: i32 = rng.gen_range(0..100);
    let fetch = draw < rate;
    debug!(rate, draw, fetch, "billboard delivery gate");
    fetch
}

/// Relative weights of the four selection strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    /// Uniform pick over the whole pool.
    pub random_selection: u32,
    /// Weighted pick over seldom-seen and priority billboards.
    pub new_and_priority: u32,
    /// Uniform pick over billboards below the impression threshold.
    pub new_only: u32,
    /// Pick among the best performers.
    pub weighted_performance: u32,
}

/// Weights from the fallback cut points, 5/30/5/59 out of 99.
///
/// The cut points are rebased onto a single `0..=99` draw line where each
/// strategy owns the span up to its cut, so the spans never overlap.
impl Default for SelectionWeights {
    fn default() -> Self {
        Self::from_ranges(
            RANDOM_RANGE_MAX_FALLBACK,
            NEW_AND_PRIORITY_RANGE_MAX_FALLBACK,
            NEW_ONLY_RANGE_MAX_FALLBACK,
        )
    }
}

impl SelectionWeights {
    /// Convert cut points on the `0..=99` draw line into weights.
    ///
    /// Out-of-order cut points collapse the affected strategies to zero.
    #[must_use]
    pub const fn from_ranges(random_max: u32, new_and_priority_max: u32, new_only_max: u32) -> Self {
        Self {
            random_selection: random_max,
            new_and_priority: new_and_priority_max.saturating_sub(random_max),
            new_only: new_only_max.saturating_sub(new_and_priority_max),
            weighted_performance: STRATEGY_DRAW_MAX.saturating_sub(new_only_max),
        }
    }

    /// Build weights from loosely typed `(name, value)` entries.
    ///
    /// Negative values become 0, missing names keep their default and
    /// unknown names are ignored.
    #[must_use]
    pub fn from_entries<S, I>(entries: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, i64)>,
    {
        let mut weights = Self::default();
        for (name, value) in entries {
            let value = u32::try_from(value.max(0)).unwrap_or(u32::MAX);
            match name.as_ref() {
                "random_selection" => weights.random_selection = value,
                "new_and_priority" => weights.new_and_priority = value,
                "new_only" => weights.new_only = value,
                "weighted_performance" => weights.weighted_performance = value,
                other => debug!(name = other, "ignoring unknown selection weight"),
            }
        }
        weights
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> u64 {
        u64::from(self.random_selection)
            + u64::from(self.new_and_priority)
            + u64::from(self.new_only)
            + u64::from(self.weighted_performance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn configs() -> Vec<PlacementAreaConfig> {
        vec![PlacementAreaConfig::new(PlacementArea::SidebarLeft, 80, 60)]
    }

    #[test]
    fn test_validate_rates() {
        assert!(PlacementAreaConfig::new(PlacementArea::SidebarLeft, 50, 75).validate().is_ok());
        assert!(PlacementAreaConfig::new(PlacementArea::SidebarLeft, 150, 50).validate().is_err());
        assert!(PlacementAreaConfig::new(PlacementArea::SidebarLeft, 50, -10).validate().is_err());
    }

    #[test]
    fn test_delivery_rate_for() {
        let configs = configs();
        assert_eq!(delivery_rate_for(&configs, Some("sidebar_left"), true), 80);
        assert_eq!(delivery_rate_for(&configs, Some("sidebar_left"), false), 60);
        assert_eq!(delivery_rate_for(&configs, Some("nonexistent_area"), true), 100);
        assert_eq!(delivery_rate_for(&configs, Some("footer"), true), 100);
        assert_eq!(delivery_rate_for(&configs, Some("  "), true), 100);
        assert_eq!(delivery_rate_for(&configs, None, false), 100);
    }

    #[test]
    fn test_should_fetch_extremes() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            assert!(should_fetch_billboard(100, &mut rng));
            assert!(!should_fetch_billboard(0, &mut rng));
        }
    }

    #[test]
    fn test_should_fetch_half_rate() {
        let mut rng = StdRng::seed_from_u64(12);
        let hits = (0..5000).filter(|_| should_fetch_billboard(50, &mut rng)).count();
        let ratio = f64::from(u32::try_from(hits).unwrap()) / 5000.0;
        assert!((ratio - 0.5).abs() < 0.025, "ratio {ratio}");
    }

    #[test]
    fn test_from_ranges() {
        assert_eq!(
            SelectionWeights::from_ranges(10, 40, 45),
            SelectionWeights {
                random_selection: 10,
                new_and_priority: 30,
                new_only: 5,
                weighted_performance: 54,
            }
        );
    }

    #[test]
    fn test_default_split_is_rebased_on_draw_line() {
        // Fallback cut points 5/35/40 partition 0..=99 without overlap.
        let defaults = SelectionWeights::default();
        assert_eq!(
            (
                defaults.random_selection,
                defaults.new_and_priority,
                defaults.new_only,
                defaults.weighted_performance
            ),
            (5, 30, 5, 59)
        );
        assert_eq!(defaults.total(), 99);
    }

    #[test]
    fn test_from_entries_sanitises() {
        let weights = SelectionWeights::from_entries([("random_selection", -5), ("new_only", 12), ("bogus", 3)]);
        assert_eq!(weights.random_selection, 0);
        assert_eq!(weights.new_only, 12);
        assert_eq!(weights.new_and_priority, 30);
        assert_eq!(weights.weighted_performance, 59);
    }
}

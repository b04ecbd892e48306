//! Feed weights and experiment configuration.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::errors::{RankingError, RankingResult, ensure_weight};

/// Default magnitude for [`ScoreWeights::create_mutated_clone`].
pub const DEFAULT_MUTATION_MAGNITUDE: f64 = 0.1;

/// Tag count used when a tag-count range is `0..=0`.
pub const DEFAULT_TAG_COUNT: u32 = 5;

/// Declare the term enumeration and the weight struct from one list, so the
/// two cannot drift apart.
macro_rules! define_weights {
    ($( $(#[$doc:meta])* $variant:ident => $field:ident ),+ $(,)?) => {
        /// One term of the score formula.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum WeightTerm {
            $( $(#[$doc])* $variant, )+
        }

        impl WeightTerm {
            /// Every term, in formula order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            /// Stable `snake_case` name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($field), )+
                }
            }
        }

        /// Named weights of the score formula.
        ///
        /// Every weight defaults to 0, which removes its term from the formula.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ScoreWeights {
            $( $(#[$doc])* pub $field: f64, )+
        }

        impl ScoreWeights {
            /// Weight of `term`.
            #[must_use]
            pub const fn get(&self, term: WeightTerm) -> f64 {
                match term {
                    $( WeightTerm::$variant => self.$field, )+
                }
            }

            /// Set the weight of `term`.
            pub const fn set(&mut self, term: WeightTerm, value: f64) {
                match term {
                    $( WeightTerm::$variant => self.$field = value, )+
                }
            }
        }
    };
}

define_weights! {
    /// Engagement-derived success score.
    FeedSuccess => feed_success,
    /// Comment score.
    CommentScore => comment_score,
    /// Reaction-based article score.
    BaseScore => base_score,
    /// Author organization is followed.
    OrganizationFollow => organization_follow,
    /// Author is followed.
    UserFollow => user_follow,
    /// Count of followed tags on the article.
    TagFollow => tag_follow,
    /// Seconds since publication, negated.
    Recency => recency,
    /// Seconds since the last comment, negated.
    CommentRecency => comment_recency,
    /// Published since the user's second most recent page view.
    LookbackWindow => lookback_window,
    /// Article is in the user's precomputed selection.
    PrecomputedSelection => precomputed_selection,
    /// Count of recently seen labels on the article.
    LabelMatch => label_match,
    /// Article belongs to a followed subforem.
    SubforemFollow => subforem_follow,
    /// Article belongs to a subforem the reader was recently active in;
    /// root-subforem feeds only.
    RecentSubforem => recent_subforem,
    /// Article is featured.
    Featured => featured,
    /// Clickbait score, subtracted.
    ClickbaitScore => clickbait_score,
    /// Compellingness score.
    CompellingnessScore => compellingness_score,
    /// Article language is one the user reads.
    LanguageMatch => language_match,
    /// Published within the last day.
    PublishedToday => published_today,
    /// Second bonus for articles published within the last day.
    GeneralPastDayBonus => general_past_day_bonus,
    /// Past-day bonus scaled by the user's recent page views.
    RecentlyActivePastDayBonus => recently_active_past_day_bonus,
    /// Article was recently viewed by the user, subtracted.
    RecentArticleSuppression => recent_article_suppression,
    /// Uniform noise in `[0, 1)`.
    Randomness => randomness,
}

impl WeightTerm {
    /// Whether the term lowers the score as its signal grows.
    #[must_use]
    pub const fn is_subtracted(self) -> bool {
        matches!(self, Self::ClickbaitScore | Self::RecentArticleSuppression)
    }
}

impl fmt::Display for WeightTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightTerm {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|term| term.as_str() == raw)
            .ok_or_else(|| RankingError::InvalidConfig(format!("unknown weight term: {raw}")))
    }
}

impl ScoreWeights {
    /// Copy with `term` set to `value`.
    #[must_use]
    pub const fn with_weight(mut self, term: WeightTerm, value: f64) -> Self {
        self.set(term, value);
        self
    }

    /// Iterate `(term, weight)` pairs in formula order.
    pub fn iter(&self) -> impl Iterator<Item = (WeightTerm, f64)> + '_ {
        WeightTerm::ALL.iter().map(|term| (*term, self.get(*term)))
    }

    /// Whether every weight is exactly zero.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.iter().all(|(_, weight)| weight == 0.0)
    }

    /// Check every weight is finite and non-negative.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] for the first offending term.
    pub fn validate(&self) -> RankingResult<()> {
        for (term, weight) in self.iter() {
            ensure_weight(term.as_str(), weight)?;
        }
        Ok(())
    }

    /// Copy with every weight multiplied by `1 + magnitude`.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] when a resulting weight is
    /// negative or non-finite.
    pub fn create_mutated_clone(&self, magnitude: f64) -> RankingResult<Self> {
        let factor = 1.0 + magnitude;
        let mut mutated = self.clone();
        for (term, weight) in self.iter() {
            mutated.set(term, weight * factor);
        }
        mutated.validate()?;
        Ok(mutated)
    }
}

/// Ranges the relevant-tag counts are drawn from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagCountRange {
    /// Lower bound of recently viewed tags.
    pub recent_min: u32,
    /// Upper bound of recently viewed tags.
    pub recent_max: u32,
    /// Lower bound of all-time tags.
    pub all_time_min: u32,
    /// Upper bound of all-time tags.
    pub all_time_max: u32,
}

impl TagCountRange {
    /// Check that every lower bound is at most its upper bound.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] for an inverted range.
    pub fn validate(&self) -> RankingResult<()> {
        if self.recent_min > self.recent_max {
            return Err(RankingError::InvalidConfig(
                "tag_counts.recent_min must be <= recent_max".to_string(),
            ));
        }
        if self.all_time_min > self.all_time_max {
            return Err(RankingError::InvalidConfig(
                "tag_counts.all_time_min must be <= all_time_max".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw `(recent, all_time)` tag counts.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (u32, u32) {
        (
            draw_count(self.recent_min, self.recent_max, rng),
            draw_count(self.all_time_min, self.all_time_max, rng),
        )
    }
}

fn draw_count<R: Rng + ?Sized>(min: u32, max: u32, rng: &mut R) -> u32 {
    if min == 0 && max == 0 {
        return DEFAULT_TAG_COUNT;
    }
    rng.gen_range(min..=max.max(min))
}

fn shift_bound(value: u32, shift: i64) -> u32 {
    u32::try_from((i64::from(value) + shift).max(0)).unwrap_or(u32::MAX)
}

/// A feed experiment: weights, tag-count ranges and an impression counter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Formula weights.
    pub weights: ScoreWeights,
    /// Relevant-tag count ranges.
    pub tag_counts: TagCountRange,
    /// Feed impressions served with this configuration.
    pub feed_impressions_count: u64,
}

impl FeedConfig {
    /// Validate weights and tag-count ranges.
    ///
    /// # Errors
    /// Returns the first weight or range violation.
    pub fn validate(&self) -> RankingResult<()> {
        self.weights.validate()?;
        self.tag_counts.validate()
    }

    /// Draw `(recent, all_time)` relevant-tag counts.
    pub fn tag_counts<R: Rng + ?Sized>(&self, rng: &mut R) -> (u32, u32) {
        self.tag_counts.draw(rng)
    }

    /// Copy for a follow-up experiment.
    ///
    /// Each weight is scaled by a factor drawn in `[0.9, 1.1]`, each tag-count
    /// bound moves by -1, 0 or +1, and the impression counter restarts.
    #[must_use]
    pub fn create_slightly_modified_clone<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let factors: Vec<f64> = WeightTerm::ALL
            .iter()
            .map(|_| rng.gen_range(0.9..=1.1))
            .collect();
        let shifts = [(); 4].map(|()| rng.gen_range(-1..=1));
        self.perturbed_clone(&factors, shifts)
    }

    /// Copy with explicit perturbations.
    ///
    /// `factors` pairs with [`WeightTerm::ALL`]; missing factors leave the
    /// weight unchanged. `shifts` applies to `recent_min`, `recent_max`,
    /// `all_time_min` and `all_time_max` in that order. Bounds are floored at
    /// 0 and an upper bound never ends below its lower bound.
    #[must_use]
    pub fn perturbed_clone(&self, factors: &[f64], shifts: [i64; 4]) -> Self {
        let mut weights = self.weights.clone();
        for (term, factor) in WeightTerm::ALL.iter().zip(factors) {
            weights.set(*term, self.weights.get(*term) * factor);
        }

        let [recent_min, recent_max, all_time_min, all_time_max] = shifts;
        let recent_min = shift_bound(self.tag_counts.recent_min, recent_min);
        let all_time_min = shift_bound(self.tag_counts.all_time_min, all_time_min);
        let tag_counts = TagCountRange {
            recent_min,
            recent_max: shift_bound(self.tag_counts.recent_max, recent_max).max(recent_min),
            all_time_min,
            all_time_max: shift_bound(self.tag_counts.all_time_max, all_time_max).max(all_time_min),
        };

        Self {
            weights,
            tag_counts,
            feed_impressions_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn numbered_weights() -> ScoreWeights {
        let mut weights = ScoreWeights::default();
        for (term, value) in WeightTerm::ALL.iter().zip(1_u32..) {
            weights.set(*term, f64::from(value));
        }
        weights
    }

    #[test]
    fn test_term_names_roundtrip() {
        for term in WeightTerm::ALL {
            assert_eq!(term.as_str().parse::<WeightTerm>().unwrap(), *term);
            let json = serde_json::to_string(term).unwrap();
            assert_eq!(json, format!("\"{}\"", term.as_str()));
        }
        assert!("score_weight".parse::<WeightTerm>().is_err());
    }

    #[test]
    fn test_weights_serde_field_names_match_terms() {
        let weights = numbered_weights();
        let value = serde_json::to_value(&weights).unwrap();
        for term in WeightTerm::ALL {
            assert_eq!(value[term.as_str()].as_f64(), Some(weights.get(*term)));
        }
    }

    #[test]
    fn test_defaults_are_zero() {
        assert!(ScoreWeights::default().is_all_zero());
        let partial: ScoreWeights = serde_json::from_str(r#"{"recency": 2.5}"#).unwrap();
        assert_eq!(partial.recency, 2.5);
        assert_eq!(partial.base_score, 0.0);
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let negative = ScoreWeights::default().with_weight(WeightTerm::Recency, -1.0);
        assert!(matches!(
            negative.validate(),
            Err(RankingError::InvalidWeight { ref name, .. }) if name == "recency"
        ));
        let nan = ScoreWeights::default().with_weight(WeightTerm::Featured, f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_create_mutated_clone() {
        let original = numbered_weights();
        let mutated = original.create_mutated_clone(DEFAULT_MUTATION_MAGNITUDE).unwrap();
        for term in WeightTerm::ALL {
            let expected = original.get(*term) * 1.1;
            assert!((mutated.get(*term) - expected).abs() < 1e-9);
        }
        // Input untouched.
        assert_eq!(original, numbered_weights());
        assert!(original.create_mutated_clone(-2.0).is_err());
    }

    #[test]
    fn test_tag_counts_default_and_fixed() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = FeedConfig::default();
        assert_eq!(config.tag_counts(&mut rng), (DEFAULT_TAG_COUNT, DEFAULT_TAG_COUNT));

        let fixed = FeedConfig {
            tag_counts: TagCountRange {
                recent_min: 2,
                recent_max: 2,
                all_time_min: 3,
                all_time_max: 3,
            },
            ..FeedConfig::default()
        };
        assert_eq!(fixed.tag_counts(&mut rng), (2, 3));
    }

    #[test]
    fn test_perturbed_clone() {
        let config = FeedConfig {
            weights: numbered_weights(),
            tag_counts: TagCountRange {
                recent_min: 2,
                recent_max: 5,
                all_time_min: 3,
                all_time_max: 8,
            },
            feed_impressions_count: 1234,
        };
        let factors = vec![1.1; WeightTerm::ALL.len()];
        let clone = config.perturbed_clone(&factors, [1, 1, 1, 1]);

        for term in WeightTerm::ALL {
            assert_eq!(clone.weights.get(*term), config.weights.get(*term) * 1.1);
        }
        assert_eq!(
            clone.tag_counts,
            TagCountRange {
                recent_min: 3,
                recent_max: 6,
                all_time_min: 4,
                all_time_max: 9,
            }
        );
        assert_eq!(clone.feed_impressions_count, 0);
        assert_eq!(config.feed_impressions_count, 1234);
    }

    #[test]
    fn test_perturbed_clone_keeps_bounds_ordered() {
        let config = FeedConfig {
            tag_counts: TagCountRange {
                recent_min: 0,
                recent_max: 0,
                all_time_min: 4,
                all_time_max: 4,
            },
            ..FeedConfig::default()
        };
        let clone = config.perturbed_clone(&[], [-1, -1, 1, -1]);
        assert_eq!(clone.tag_counts.recent_min, 0);
        assert_eq!(clone.tag_counts.recent_max, 0);
        assert_eq!(clone.tag_counts.all_time_min, 5);
        assert_eq!(clone.tag_counts.all_time_max, 5);
        assert!(clone.validate().is_ok());
    }

    #[test]
    fn test_slightly_modified_clone_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(99);
        let config = FeedConfig {
            weights: numbered_weights(),
            feed_impressions_count: 10,
            ..FeedConfig::default()
        };
        let clone = config.create_slightly_modified_clone(&mut rng);
        for term in WeightTerm::ALL {
            let ratio = clone.weights.get(*term) / config.weights.get(*term);
            assert!((0.9 - 1e-9..=1.1 + 1e-9).contains(&ratio), "{term}: {ratio}");
        }
        assert!(clone.validate().is_ok());
        assert_eq!(clone.feed_impressions_count, 0);
    }
}

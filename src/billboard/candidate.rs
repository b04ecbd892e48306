//! Weighted billboard candidates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::billboard::placement::PlacementArea;
use crate::core::errors::{RankingError, RankingResult};
use crate::core::ids::{ArticleId, BillboardId, SurveyId, parse_id_list};
use crate::geo::Geolocation;

/// Upper bound accepted for a billboard weight.
pub const MAX_BILLBOARD_WEIGHT: f64 = 10_000.0;

/// Anything the weighted selector can pick from.
pub trait WeightedCandidate {
    /// Stable identifier used in logs.
    fn id(&self) -> BillboardId;

    /// Base selection weight, expected `>= 0`.
    fn weight(&self) -> f64;

    /// Whether this candidate prefers to appear next to `article`.
    fn is_preferred_for(&self, article: ArticleId) -> bool;
}

impl<T: WeightedCandidate + ?Sized> WeightedCandidate for &T {
    fn id(&self) -> BillboardId {
        (**self).id()
    }

    fn weight(&self) -> f64 {
        (**self).weight()
    }

    fn is_preferred_for(&self, article: ArticleId) -> bool {
        (**self).is_preferred_for(article)
    }
}

/// A billboard eligible for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Billboard {
    /// Identifier.
    pub id: BillboardId,
    /// Slot the billboard renders into.
    pub placement_area: PlacementArea,
    /// Selection weight in `[0, 10_000]`.
    pub weight: f64,
    /// Articles next to which the billboard is boosted.
    #[serde(default)]
    pub preferred_article_ids: HashSet<ArticleId>,
    /// Articles next to which the billboard is never shown.
    #[serde(default)]
    pub exclude_article_ids: HashSet<ArticleId>,
    /// Impressions served so far.
    #[serde(default)]
    pub impressions_count: u64,
    /// Priority billboards count as seldom seen regardless of impressions.
    #[serde(default)]
    pub priority: bool,
    /// Hide the billboard from users who completed any of `exclude_survey_ids`.
    #[serde(default)]
    pub exclude_survey_completions: bool,
    /// Surveys whose completion hides the billboard.
    #[serde(default)]
    pub exclude_survey_ids: HashSet<SurveyId>,
    /// Locations the billboard is restricted to; empty means everywhere.
    #[serde(default)]
    pub target_geolocations: Vec<Geolocation>,
}

impl Billboard {
    /// Create a billboard with a validated weight and no targeting.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] when `weight` is not a finite
    /// value in `[0, 10_000]`.
    pub fn new(id: BillboardId, placement_area: PlacementArea, weight: f64) -> RankingResult<Self> {
        let billboard = Self {
            id,
            placement_area,
            weight,
            preferred_article_ids: HashSet::new(),
            exclude_article_ids: HashSet::new(),
            impressions_count: 0,
            priority: false,
            exclude_survey_completions: false,
            exclude_survey_ids: HashSet::new(),
            target_geolocations: Vec::new(),
        };
        billboard.validate()?;
        Ok(billboard)
    }

    /// Check the weight bounds.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] for a weight outside `[0, 10_000]`.
    pub fn validate(&self) -> RankingResult<()> {
        if self.weight.is_finite() && (0.0..=MAX_BILLBOARD_WEIGHT).contains(&self.weight) {
            Ok(())
        } else {
            Err(RankingError::invalid_weight(
                format!("billboard {}", self.id),
                self.weight,
            ))
        }
    }

    /// Set the articles this billboard is boosted next to.
    #[must_use]
    pub fn with_preferred_articles(mut self, ids: impl IntoIterator<Item = ArticleId>) -> Self {
        self.preferred_article_ids = ids.into_iter().collect();
        self
    }

    /// Never show the billboard next to any of `ids`.
    #[must_use]
    pub fn excluding_articles(mut self, ids: impl IntoIterator<Item = ArticleId>) -> Self {
        self.exclude_article_ids = ids.into_iter().collect();
        self
    }

    /// Set preferred and excluded articles from comma-separated form input
    /// such as `"11, 12,,13"`. Blank entries are skipped.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] when an entry is not an integer.
    pub fn with_article_id_lists(mut self, preferred: &str, excluded: &str) -> RankingResult<Self> {
        self.preferred_article_ids = article_id_list("preferred_article_ids", preferred)?;
        self.exclude_article_ids = article_id_list("exclude_article_ids", excluded)?;
        Ok(self)
    }

    /// Set the impression counter.
    #[must_use]
    pub const fn with_impressions(mut self, impressions_count: u64) -> Self {
        self.impressions_count = impressions_count;
        self
    }

    /// Mark the billboard as priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    /// Hide the billboard from users who completed any of `surveys`.
    #[must_use]
    pub fn excluding_survey_completions(mut self, surveys: impl IntoIterator<Item = SurveyId>) -> Self {
        self.exclude_survey_completions = true;
        self.exclude_survey_ids = surveys.into_iter().collect();
        self
    }

    /// Restrict the billboard to `targets`.
    #[must_use]
    pub fn with_target_geolocations(mut self, targets: Vec<Geolocation>) -> Self {
        self.target_geolocations = targets;
        self
    }
}

fn article_id_list(field: &str, input: &str) -> RankingResult<HashSet<ArticleId>> {
    parse_id_list::<ArticleId>(input)
        .map(|ids| ids.into_iter().collect())
        .map_err(|err| RankingError::InvalidConfig(format!("{field} {input:?}: {err}")))
}

impl WeightedCandidate for Billboard {
    fn id(&self) -> BillboardId {
        self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn is_preferred_for(&self, article: ArticleId) -> bool {
        self.preferred_article_ids.contains(&article)
    }
}

//! Pool filters applied before selection.

use std::collections::HashSet;
use std::hash::BuildHasher;

use crate::billboard::candidate::Billboard;
use crate::core::ids::{ArticleId, SurveyId};
use crate::geo::Geolocation;

/// Billboards below the impression threshold, plus priority billboards.
#[must_use]
pub fn seldom_seen(pool: &[Billboard], low_impression_count: u64) -> Vec<&Billboard> {
    pool.iter()
        .filter(|billboard| billboard.impressions_count < low_impression_count || billboard.priority)
        .collect()
}

/// Billboards below the impression threshold; priority is ignored.
#[must_use]
pub fn new_only(pool: &[Billboard], low_impression_count: u64) -> Vec<&Billboard> {
    pool.iter()
        .filter(|billboard| billboard.impressions_count < low_impression_count)
        .collect()
}

/// Drop billboards hidden from users who completed one of `completed`.
#[must_use]
pub fn exclude_completed_surveys<'a, S: BuildHasher>(
    pool: &'a [Billboard],
    completed: &HashSet<SurveyId, S>,
) -> Vec<&'a Billboard> {
    pool.iter()
        .filter(|billboard| {
            !billboard.exclude_survey_completions
                || !billboard.exclude_survey_ids.iter().any(|id| completed.contains(id))
        })
        .collect()
}

/// Drop billboards excluded from `article`; without an article nothing is dropped.
#[must_use]
pub fn excluding_article(pool: &[Billboard], article: Option<ArticleId>) -> Vec<&Billboard> {
    pool.iter()
        .filter(|billboard| article.is_none_or(|id| !billboard.exclude_article_ids.contains(&id)))
        .collect()
}

/// Keep billboards that may be shown at `location`.
///
/// Untargeted billboards always pass. A targeted billboard passes when one
/// of its targets covers the location; with no known location only
/// untargeted billboards pass.
#[must_use]
pub fn matching_location<'a>(pool: &'a [Billboard], location: Option<&Geolocation>) -> Vec<&'a Billboard> {
    pool.iter()
        .filter(|billboard| {
            billboard.target_geolocations.is_empty()
                || location.is_some_and(|here| {
                    billboard
                        .target_geolocations
                        .iter()
                        .any(|target| target.covers(here))
                })
        })
        .collect()
}

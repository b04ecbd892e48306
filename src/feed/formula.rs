//! The feed score formula.
//!
//! A formula is compiled once per feed build from a weight vector and the
//! reader's affinity. Terms whose weight is zero, or whose signal is
//! identically zero for this reader, are left out entirely, so scoring cost
//! and the rendered SQL only cover what can move a score.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::core::errors::RankingResult;
use crate::core::ids::{ArticleId, OrganizationId, SubforemId, UserId};
use crate::feed::affinity::UserAffinity;
use crate::feed::candidate::ScoredCandidate;
use crate::feed::weights::{ScoreWeights, WeightTerm};

/// Window of the past-day terms.
pub const PAST_DAY_HOURS: i64 = 24;

/// Data a compiled term reads besides the candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Signal {
    FeedSuccess,
    CommentScore,
    BaseScore,
    OrganizationFollow(HashSet<OrganizationId>),
    UserFollow(HashSet<UserId>),
    TagFollow(Vec<String>),
    Recency,
    CommentRecency,
    LookbackWindow(DateTime<Utc>),
    PrecomputedSelection(HashSet<ArticleId>),
    LabelMatch(Vec<String>),
    SubforemFollow(HashSet<SubforemId>),
    RecentSubforem(HashSet<SubforemId>),
    Featured,
    ClickbaitScore,
    CompellingnessScore,
    LanguageMatch(HashSet<String>),
    PublishedToday(DateTime<Utc>),
    GeneralPastDayBonus(DateTime<Utc>),
    RecentlyActivePastDayBonus { since: DateTime<Utc>, views: usize },
    RecentArticleSuppression(HashSet<ArticleId>),
    Randomness,
}

/// One active term of a compiled formula.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ActiveTerm {
    pub(crate) term: WeightTerm,
    pub(crate) weight: f64,
    pub(crate) signal: Signal,
}

// Millisecond spans of real timestamps stay far below 2^53.
#[allow(clippy::cast_precision_loss)]
fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Exact conversion of a count, saturating at `u32::MAX`.
pub(crate) fn count_to_f64(count: usize) -> f64 {
    f64::from(u32::try_from(count).unwrap_or(u32::MAX))
}

const fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn overlap(names: &[String], wanted: &[String]) -> f64 {
    let names: HashSet<String> = names.iter().map(|name| name.trim().to_lowercase()).collect();
    count_to_f64(wanted.iter().filter(|name| names.contains(name.as_str())).count())
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

impl ActiveTerm {
    /// Signed signal of this term for `candidate`, before weighting.
    fn signal_value<C, R>(&self, candidate: &C, now: DateTime<Utc>, rng: &mut R) -> f64
    where
        C: ScoredCandidate + ?Sized,
        R: Rng + ?Sized,
    {
        match &self.signal {
            Signal::FeedSuccess => candidate.feed_success_score(),
            Signal::CommentScore => candidate.comment_score(),
            Signal::BaseScore => candidate.base_score(),
            Signal::OrganizationFollow(orgs) => {
                flag(candidate.organization_id().is_some_and(|org| orgs.contains(&org)))
            }
            Signal::UserFollow(users) => flag(users.contains(&candidate.user_id())),
            Signal::TagFollow(tags) => overlap(candidate.tags(), tags),
            Signal::Recency => -seconds_between(now, candidate.published_at()),
            Signal::CommentRecency => -seconds_between(now, candidate.last_activity_at()),
            Signal::LookbackWindow(since) => {
                let published = candidate.published_at();
                flag(*since <= published && published <= now)
            }
            Signal::PrecomputedSelection(ids) => flag(ids.contains(&candidate.id())),
            Signal::LabelMatch(labels) => overlap(candidate.labels(), labels),
            Signal::SubforemFollow(subforems) | Signal::RecentSubforem(subforems) => {
                flag(candidate.subforem_id().is_some_and(|id| subforems.contains(&id)))
            }
            Signal::Featured => flag(candidate.featured()),
            Signal::ClickbaitScore => -candidate.clickbait_score(),
            Signal::CompellingnessScore => candidate.compellingness_score(),
            Signal::LanguageMatch(languages) => {
                flag(candidate.language().is_some_and(|language| languages.contains(language)))
            }
            Signal::PublishedToday(since) | Signal::GeneralPastDayBonus(since) => {
                flag(candidate.published_at() >= *since)
            }
            Signal::RecentlyActivePastDayBonus { since, views } => {
                if candidate.published_at() >= *since {
                    count_to_f64(*views)
                } else {
                    0.0
                }
            }
            Signal::RecentArticleSuppression(ids) => -flag(ids.contains(&candidate.id())),
            Signal::Randomness => rng.gen_range(0.0..1.0),
        }
    }
}

/// Contribution of a single term to a score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TermContribution {
    /// Term.
    pub term: WeightTerm,
    /// Weight the term was compiled with.
    pub weight: f64,
    /// Signed weighted contribution.
    pub contribution: f64,
}

/// Per-term explanation of a score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Sum of all contributions.
    pub total: f64,
    /// Contributions in formula order.
    pub contributions: Vec<TermContribution>,
}

/// A candidate paired with its score.
#[derive(Debug)]
pub struct RankedCandidate<'c, C> {
    /// The candidate.
    pub candidate: &'c C,
    /// Its score.
    pub score: f64,
}

/// A compiled score formula.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreFormula {
    pub(crate) terms: Vec<ActiveTerm>,
    pub(crate) now: DateTime<Utc>,
}

impl ScoreFormula {
    /// Compile `weights` against `affinity` at time `now`.
    ///
    /// # Errors
    /// Returns [`crate::RankingError::InvalidWeight`] when a weight is
    /// negative or non-finite.
    pub fn build(weights: &ScoreWeights, affinity: &UserAffinity, now: DateTime<Utc>) -> RankingResult<Self> {
        weights.validate()?;

        let past_day = now - Duration::hours(PAST_DAY_HOURS);
        let mut terms = Vec::new();
        for (term, weight) in weights.iter() {
            if weight == 0.0 {
                continue;
            }
            let Some(signal) = compile_signal(term, affinity, past_day) else {
                debug!(%term, "term has no signal for this reader, omitted");
                continue;
            };
            terms.push(ActiveTerm { term, weight, signal });
        }

        debug!(active = terms.len(), "score formula compiled");
        Ok(Self { terms, now })
    }

    /// Active terms, in formula order.
    #[must_use]
    pub fn terms(&self) -> Vec<WeightTerm> {
        self.terms.iter().map(|active| active.term).collect()
    }

    /// Whether `term` contributes to scores.
    #[must_use]
    pub fn is_active(&self, term: WeightTerm) -> bool {
        self.terms.iter().any(|active| active.term == term)
    }

    /// Whether no term is active, so every score is 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Reference time of the formula.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Score `candidate`.
    ///
    /// `rng` is only drawn from when the randomness term is active.
    pub fn score<C, R>(&self, candidate: &C, rng: &mut R) -> f64
    where
        C: ScoredCandidate + ?Sized,
        R: Rng + ?Sized,
    {
        self.terms.iter().fold(0.0, |total, active| {
            active
                .weight
                .mul_add(active.signal_value(candidate, self.now, rng), total)
        })
    }

    /// Score `candidate` and report each term's contribution.
    pub fn explain<C, R>(&self, candidate: &C, rng: &mut R) -> ScoreBreakdown
    where
        C: ScoredCandidate + ?Sized,
        R: Rng + ?Sized,
    {
        let contributions: Vec<TermContribution> = self
            .terms
            .iter()
            .map(|active| TermContribution {
                term: active.term,
                weight: active.weight,
                contribution: active.weight * active.signal_value(candidate, self.now, rng),
            })
            .collect();
        ScoreBreakdown {
            total: contributions.iter().fold(0.0, |total, c| total + c.contribution),
            contributions,
        }
    }

    /// Score and sort `candidates`, best first.
    ///
    /// Equal scores keep the more recently published article first.
    pub fn rank<'c, C, R>(&self, candidates: &'c [C], rng: &mut R) -> Vec<RankedCandidate<'c, C>>
    where
        C: ScoredCandidate,
        R: Rng + ?Sized,
    {
        let mut ranked: Vec<RankedCandidate<'c, C>> = candidates
            .iter()
            .map(|candidate| RankedCandidate {
                candidate,
                score: self.score(candidate, rng),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.candidate.published_at().cmp(&a.candidate.published_at()))
        });
        ranked
    }
}

fn compile_signal(term: WeightTerm, affinity: &UserAffinity, past_day: DateTime<Utc>) -> Option<Signal> {
    let signal = match term {
        WeightTerm::FeedSuccess => Signal::FeedSuccess,
        WeightTerm::CommentScore => Signal::CommentScore,
        WeightTerm::BaseScore => Signal::BaseScore,
        WeightTerm::OrganizationFollow => non_empty(&affinity.followed_organization_ids)
            .map(|ids| Signal::OrganizationFollow(ids.clone()))?,
        WeightTerm::UserFollow => {
            non_empty(&affinity.followed_user_ids).map(|ids| Signal::UserFollow(ids.clone()))?
        }
        WeightTerm::TagFollow => {
            non_empty(&affinity.followed_tags).map(|tags| Signal::TagFollow(sorted(tags)))?
        }
        WeightTerm::Recency => Signal::Recency,
        WeightTerm::CommentRecency => Signal::CommentRecency,
        WeightTerm::LookbackWindow => Signal::LookbackWindow(affinity.second_most_recent_pageview_at?),
        WeightTerm::PrecomputedSelection => non_empty(&affinity.precomputed_selection_ids)
            .map(|ids| Signal::PrecomputedSelection(ids.clone()))?,
        WeightTerm::LabelMatch => {
            non_empty(&affinity.recent_labels).map(|labels| Signal::LabelMatch(sorted(labels)))?
        }
        WeightTerm::SubforemFollow => non_empty(&affinity.followed_subforem_ids)
            .map(|ids| Signal::SubforemFollow(ids.clone()))?,
        WeightTerm::RecentSubforem if affinity.is_root_request => non_empty(&affinity.recent_subforem_ids)
            .map(|ids| Signal::RecentSubforem(ids.clone()))?,
        WeightTerm::RecentSubforem => return None,
        WeightTerm::Featured => Signal::Featured,
        WeightTerm::ClickbaitScore => Signal::ClickbaitScore,
        WeightTerm::CompellingnessScore => Signal::CompellingnessScore,
        WeightTerm::LanguageMatch => non_empty(&affinity.preferred_languages)
            .map(|languages| Signal::LanguageMatch(languages.clone()))?,
        WeightTerm::PublishedToday => Signal::PublishedToday(past_day),
        WeightTerm::GeneralPastDayBonus => Signal::GeneralPastDayBonus(past_day),
        WeightTerm::RecentlyActivePastDayBonus => match affinity.recent_view_count() {
            0 => return None,
            views => Signal::RecentlyActivePastDayBonus {
                since: past_day,
                views,
            },
        },
        WeightTerm::RecentArticleSuppression => non_empty(&affinity.recently_viewed_article_ids)
            .map(|ids| Signal::RecentArticleSuppression(ids.clone()))?,
        WeightTerm::Randomness => Signal::Randomness,
    };
    Some(signal)
}

fn non_empty<T>(set: &HashSet<T>) -> Option<&HashSet<T>> {
    (!set.is_empty()).then_some(set)
}

impl<C> Clone for RankedCandidate<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for RankedCandidate<'_, C> {}

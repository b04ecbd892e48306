//! Per-user affinity signals consumed by the score formula.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::core::ids::{ArticleId, OrganizationId, SubforemId, UserId};
use crate::feed::weights::FeedConfig;

/// Collaborator that knows a user's follows and activity.
///
/// Storage and caching live behind this trait; the engine only reads.
pub trait AffinitySource {
    /// Users the reader follows.
    fn followed_user_ids(&self, user: UserId) -> Vec<UserId>;

    /// Organizations the reader follows.
    fn followed_organization_ids(&self, user: UserId) -> Vec<OrganizationId>;

    /// Tag names the reader follows.
    fn followed_tag_names(&self, user: UserId) -> Vec<String>;

    /// Tags drawn from recent and all-time activity, or `None` when the
    /// activity store has nothing for the reader.
    fn relevant_tags(&self, user: UserId, recent_count: u32, all_time_count: u32) -> Option<Vec<String>>;

    /// Timestamp of the reader's second most recent page view.
    fn second_most_recent_pageview_at(&self, user: UserId) -> Option<DateTime<Utc>>;

    /// Articles preselected for the reader, or `None` when the lookup is
    /// unavailable.
    fn precomputed_selection_ids(&self, user: UserId) -> Option<Vec<ArticleId>>;

    /// Subforems the reader follows.
    fn followed_subforem_ids(&self, _user: UserId) -> Vec<SubforemId> {
        Vec::new()
    }

    /// Labels seen on recently read articles.
    fn recent_labels(&self, _user: UserId) -> Vec<String> {
        Vec::new()
    }

    /// Languages the reader reads.
    fn preferred_languages(&self, _user: UserId) -> Vec<String> {
        Vec::new()
    }

    /// Articles the reader viewed recently.
    fn recently_viewed_article_ids(&self, _user: UserId) -> Vec<ArticleId> {
        Vec::new()
    }

    /// Subforems of the articles the reader viewed recently.
    fn recent_subforem_ids(&self, _user: UserId) -> Vec<SubforemId> {
        Vec::new()
    }
}

/// Read-only view of a user's affinity, resolved once per feed build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserAffinity {
    /// Followed authors.
    pub followed_user_ids: HashSet<UserId>,
    /// Followed organizations.
    pub followed_organization_ids: HashSet<OrganizationId>,
    /// Followed or relevant tag names, lower-cased.
    pub followed_tags: HashSet<String>,
    /// Second most recent page view; `None` for users with fewer than two.
    pub second_most_recent_pageview_at: Option<DateTime<Utc>>,
    /// Precomputed selection; may be empty.
    pub precomputed_selection_ids: HashSet<ArticleId>,
    /// Followed subforems.
    pub followed_subforem_ids: HashSet<SubforemId>,
    /// Recently seen labels, lower-cased.
    pub recent_labels: HashSet<String>,
    /// Preferred language codes.
    pub preferred_languages: HashSet<String>,
    /// Recently viewed articles.
    pub recently_viewed_article_ids: HashSet<ArticleId>,
    /// Subforems the reader was recently active in.
    pub recent_subforem_ids: HashSet<SubforemId>,
    /// The feed is requested on the root subforem, which aggregates every
    /// other one. Recent-subforem affinity only applies there.
    pub is_root_request: bool,
}

fn lowercase_set(names: impl IntoIterator<Item = String>) -> HashSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

impl UserAffinity {
    /// Replace the followed tags, lower-casing them.
    #[must_use]
    pub fn with_followed_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.followed_tags = lowercase_set(tags.into_iter().map(Into::into));
        self
    }

    /// Replace the recent labels, lower-casing them.
    #[must_use]
    pub fn with_recent_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.recent_labels = lowercase_set(labels.into_iter().map(Into::into));
        self
    }

    /// Number of recent page views, used by the past-day activity bonus.
    #[must_use]
    pub fn recent_view_count(&self) -> usize {
        self.recently_viewed_article_ids.len()
    }

    /// Assemble the affinity of `user` from `source`.
    ///
    /// The result is not marked as a root request; callers serving the root
    /// subforem set [`Self::is_root_request`] themselves.
    ///
    /// Relevant tags are only looked up when the tag-follow term is active;
    /// the lookup draws its counts from `feed_config` and falls back to the
    /// followed tags when the source has none.
    pub fn resolve<S, R>(source: &S, user: UserId, feed_config: &FeedConfig, rng: &mut R) -> Self
    where
        S: AffinitySource + ?Sized,
        R: Rng + ?Sized,
    {
        let followed_tags = if feed_config.weights.tag_follow > 0.0 {
            let (recent, all_time) = feed_config.tag_counts(rng);
            source.relevant_tags(user, recent, all_time).unwrap_or_else(|| {
                debug!(%user, "no relevant tags, using followed tags");
                source.followed_tag_names(user)
            })
        } else {
            source.followed_tag_names(user)
        };

        let precomputed_selection_ids = source.precomputed_selection_ids(user).map_or_else(
            || {
                warn!(%user, "precomputed selection unavailable, treating as empty");
                HashSet::new()
            },
            |ids| ids.into_iter().collect(),
        );

        Self {
            followed_user_ids: source.followed_user_ids(user).into_iter().collect(),
            followed_organization_ids: source.followed_organization_ids(user).into_iter().collect(),
            followed_tags: lowercase_set(followed_tags),
            second_most_recent_pageview_at: source.second_most_recent_pageview_at(user),
            precomputed_selection_ids,
            followed_subforem_ids: source.followed_subforem_ids(user).into_iter().collect(),
            recent_labels: lowercase_set(source.recent_labels(user)),
            preferred_languages: source
                .preferred_languages(user)
                .into_iter()
                .map(|language| language.trim().to_string())
                .filter(|language| !language.is_empty())
                .collect(),
            recently_viewed_article_ids: source.recently_viewed_article_ids(user).into_iter().collect(),
            recent_subforem_ids: source.recent_subforem_ids(user).into_iter().collect(),
            is_root_request: false,
        }
    }
}

//! Articles as seen by the score formula.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{ArticleId, OrganizationId, SubforemId, UserId};

/// Signals the score formula reads from a candidate article.
pub trait ScoredCandidate {
    /// Article id.
    fn id(&self) -> ArticleId;

    /// Engagement-derived success score.
    fn feed_success_score(&self) -> f64;

    /// Comment score.
    fn comment_score(&self) -> f64;

    /// Reaction-based score.
    fn base_score(&self) -> f64;

    /// Publication time.
    fn published_at(&self) -> DateTime<Utc>;

    /// Time of the last comment, if any.
    fn last_comment_at(&self) -> Option<DateTime<Utc>>;

    /// Author.
    fn user_id(&self) -> UserId;

    /// Publishing organization, if any.
    fn organization_id(&self) -> Option<OrganizationId>;

    /// Tag names.
    fn tags(&self) -> &[String];

    /// Label names.
    fn labels(&self) -> &[String] {
        &[]
    }

    /// Subforem the article was posted to.
    fn subforem_id(&self) -> Option<SubforemId> {
        None
    }

    /// Whether the article is featured.
    fn featured(&self) -> bool {
        false
    }

    /// Clickbait score.
    fn clickbait_score(&self) -> f64 {
        0.0
    }

    /// Compellingness score.
    fn compellingness_score(&self) -> f64 {
        0.0
    }

    /// Language code.
    fn language(&self) -> Option<&str> {
        None
    }

    /// Last comment time, or publication time for uncommented articles.
    fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_comment_at().unwrap_or_else(|| self.published_at())
    }
}

/// Plain record implementing [`ScoredCandidate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleSignals {
    /// Article id.
    pub id: ArticleId,
    /// Author.
    pub user_id: UserId,
    /// Publishing organization.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    /// Engagement-derived success score.
    #[serde(default)]
    pub feed_success_score: f64,
    /// Comment score.
    #[serde(default)]
    pub comment_score: f64,
    /// Reaction-based score.
    #[serde(default)]
    pub score: f64,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Time of the last comment.
    #[serde(default)]
    pub last_comment_at: Option<DateTime<Utc>>,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Subforem.
    #[serde(default)]
    pub subforem_id: Option<SubforemId>,
    /// Featured flag.
    #[serde(default)]
    pub featured: bool,
    /// Clickbait score.
    #[serde(default)]
    pub clickbait_score: f64,
    /// Compellingness score.
    #[serde(default)]
    pub compellingness_score: f64,
    /// Language code.
    #[serde(default)]
    pub language: Option<String>,
}

impl ArticleSignals {
    /// Article with zeroed signals.
    #[must_use]
    pub const fn new(id: ArticleId, user_id: UserId, published_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            organization_id: None,
            feed_success_score: 0.0,
            comment_score: 0.0,
            score: 0.0,
            published_at,
            last_comment_at: None,
            tags: Vec::new(),
            labels: Vec::new(),
            subforem_id: None,
            featured: false,
            clickbait_score: 0.0,
            compellingness_score: 0.0,
            language: None,
        }
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the labels.
    #[must_use]
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

impl ScoredCandidate for ArticleSignals {
    fn id(&self) -> ArticleId {
        self.id
    }

    fn feed_success_score(&self) -> f64 {
        self.feed_success_score
    }

    fn comment_score(&self) -> f64 {
        self.comment_score
    }

    fn base_score(&self) -> f64 {
        self.score
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    fn last_comment_at(&self) -> Option<DateTime<Utc>> {
        self.last_comment_at
    }

    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn organization_id(&self) -> Option<OrganizationId> {
        self.organization_id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn subforem_id(&self) -> Option<SubforemId> {
        self.subforem_id
    }

    fn featured(&self) -> bool {
        self.featured
    }

    fn clickbait_score(&self) -> f64 {
        self.clickbait_score
    }

    fn compellingness_score(&self) -> f64 {
        self.compellingness_score
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

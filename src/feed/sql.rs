//! `PostgreSQL` rendering of a compiled [`ScoreFormula`].
//!
//! The expression reads columns of the `articles` table and can be used
//! directly in an `ORDER BY`. A formula without active terms renders as
//! `(0)`.
//!
//! Comment recency reads
//! `COALESCE(articles.last_comment_at, articles.published_at)`: an article
//! without comments ages from its publish time, matching
//! [`ScoreFormula::score`].

use std::collections::HashSet;
use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::feed::formula::{ActiveTerm, ScoreFormula, Signal, count_to_f64};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `formula` as a SQL score expression.
#[must_use]
pub fn render_sql(formula: &ScoreFormula) -> String {
    let mut expression = String::new();
    for active in &formula.terms {
        let fragment = render_term(active);
        if expression.is_empty() {
            expression.push_str(&fragment);
        } else if fragment.starts_with('-') {
            expression.push(' ');
            expression.push_str(&fragment);
        } else {
            expression.push_str(" + ");
            expression.push_str(&fragment);
        }
    }
    if expression.is_empty() {
        expression.push('0');
    }
    format!("({expression})")
}

fn render_term(active: &ActiveTerm) -> String {
    let weight = active.weight;
    match &active.signal {
        Signal::FeedSuccess => format!("articles.feed_success_score * {weight:?}"),
        Signal::CommentScore => format!("articles.comment_score * {weight:?}"),
        Signal::BaseScore => format!("articles.score * {weight:?}"),
        Signal::OrganizationFollow(ids) => case_in("articles.organization_id", &id_list(ids), weight),
        Signal::UserFollow(ids) => case_in("articles.user_id", &id_list(ids), weight),
        Signal::TagFollow(tags) => word_matches("articles.cached_tag_list", tags, weight),
        Signal::Recency => {
            format!("- (EXTRACT(epoch FROM (NOW() - articles.published_at)) * {weight:?})")
        }
        Signal::CommentRecency => format!(
            "- (EXTRACT(epoch FROM (NOW() - COALESCE(articles.last_comment_at, articles.published_at))) * {weight:?})"
        ),
        Signal::LookbackWindow(since) => format!(
            "CASE WHEN articles.published_at BETWEEN '{}' AND NOW() THEN {weight:?} ELSE 0 END",
            timestamp(*since)
        ),
        Signal::PrecomputedSelection(ids) => case_in("articles.id", &id_list(ids), weight),
        Signal::LabelMatch(labels) => word_matches("articles.cached_label_list", labels, weight),
        Signal::SubforemFollow(ids) => case_in("articles.subforem_id", &id_list(ids), weight),
        Signal::RecentSubforem(ids) => format!(
            "CASE WHEN articles.subforem_id = ANY(ARRAY[{}]::bigint[]) THEN {weight:?} ELSE 0 END",
            id_list(ids)
        ),
        Signal::Featured => format!("CASE WHEN articles.featured = TRUE THEN {weight:?} ELSE 0 END"),
        Signal::ClickbaitScore => format!("- (articles.clickbait_score * {weight:?})"),
        Signal::CompellingnessScore => format!("articles.compellingness_score * {weight:?}"),
        Signal::LanguageMatch(languages) => {
            let mut quoted: Vec<String> = languages.iter().map(|code| quote(code)).collect();
            quoted.sort();
            case_in("articles.language", &quoted.join(","), weight)
        }
        Signal::PublishedToday(since) | Signal::GeneralPastDayBonus(since) => published_since(*since, weight),
        Signal::RecentlyActivePastDayBonus { since, views } => published_since(*since, weight * count_to_f64(*views)),
        Signal::RecentArticleSuppression(ids) => case_in("articles.id", &id_list(ids), -weight),
        Signal::Randomness => format!("RANDOM() * {weight:?}"),
    }
}

fn case_in(column: &str, list: &str, value: f64) -> String {
    format!("CASE WHEN {column} IN ({list}) THEN {value:?} ELSE 0 END")
}

fn published_since(since: DateTime<Utc>, value: f64) -> String {
    format!(
        "CASE WHEN articles.published_at >= '{}' THEN {value:?} ELSE 0 END",
        timestamp(since)
    )
}

fn word_matches(column: &str, names: &[String], weight: f64) -> String {
    let cases: Vec<String> = names
        .iter()
        .map(|name| {
            let pattern = quote_inner(&regex::escape(name));
            format!("(CASE WHEN {column} ~ '[[:<:]]{pattern}[[:>:]]' THEN {weight:?} ELSE 0 END)")
        })
        .collect();
    format!("({})", cases.join(" + "))
}

fn id_list<T: Ord + Copy + Display>(ids: &HashSet<T>) -> String {
    let mut ids: Vec<T> = ids.iter().copied().collect();
    ids.sort();
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn quote_inner(value: &str) -> String {
    value.replace('\'', "''")
}

fn quote(value: &str) -> String {
    format!("'{}'", quote_inner(value))
}

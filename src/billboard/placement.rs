//! Billboard placement areas.
//!
//! A placement area is the slot on a page a billboard renders into. The
//! identifiers are stable `snake_case` strings shared with storage and with
//! the environment-override keys (`LOW_IMPRESSION_COUNT_FOR_SIDEBAR_LEFT`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown placement area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement area: {value}")]
pub struct PlacementAreaParseError {
    /// The rejected input.
    pub value: String,
}

/// Slot a billboard can be placed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementArea {
    /// Left sidebar, first position.
    SidebarLeft,
    /// Left sidebar, second position.
    #[serde(rename = "sidebar_left_2")]
    SidebarLeft2,
    /// Right sidebar on the home page, first position.
    SidebarRight,
    /// Right sidebar on the home page, second position.
    SidebarRightSecond,
    /// Right sidebar on the home page, third position.
    SidebarRightThird,
    /// Home feed, first slot.
    FeedFirst,
    /// Home feed, second slot.
    FeedSecond,
    /// Home feed, third slot.
    FeedThird,
    /// Home hero banner.
    HomeHero,
    /// Page footer.
    Footer,
    /// Fixed bottom bar on generic pages.
    PageFixedBottom,
    /// Fixed bottom bar on an individual post.
    PostFixedBottom,
    /// Below the post body.
    PostBodyBottom,
    /// Right sidebar of an individual post.
    PostSidebar,
    /// Below the comment section.
    PostComments,
    /// Midway through the comment section.
    PostCommentsMid,
    /// First slot of the digest email.
    DigestFirst,
    /// Second slot of the digest email.
    DigestSecond,
}

impl PlacementArea {
    /// Every placement area, in display order.
    pub const ALL: [Self; 18] = [
        Self::SidebarLeft,
        Self::SidebarLeft2,
        Self::SidebarRight,
        Self::SidebarRightSecond,
        Self::SidebarRightThird,
        Self::FeedFirst,
        Self::FeedSecond,
        Self::FeedThird,
        Self::HomeHero,
        Self::Footer,
        Self::PageFixedBottom,
        Self::PostFixedBottom,
        Self::PostBodyBottom,
        Self::PostSidebar,
        Self::PostComments,
        Self::PostCommentsMid,
        Self::DigestFirst,
        Self::DigestSecond,
    ];

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SidebarLeft => "sidebar_left",
            Self::SidebarLeft2 => "sidebar_left_2",
            Self::SidebarRight => "sidebar_right",
            Self::SidebarRightSecond => "sidebar_right_second",
            Self::SidebarRightThird => "sidebar_right_third",
            Self::FeedFirst => "feed_first",
            Self::FeedSecond => "feed_second",
            Self::FeedThird => "feed_third",
            Self::HomeHero => "home_hero",
            Self::Footer => "footer",
            Self::PageFixedBottom => "page_fixed_bottom",
            Self::PostFixedBottom => "post_fixed_bottom",
            Self::PostBodyBottom => "post_body_bottom",
            Self::PostSidebar => "post_sidebar",
            Self::PostComments => "post_comments",
            Self::PostCommentsMid => "post_comments_mid",
            Self::DigestFirst => "digest_first",
            Self::DigestSecond => "digest_second",
        }
    }

    /// Label shown to administrators.
    #[must_use]
    pub const fn human_readable(self) -> &'static str {
        match self {
            Self::SidebarLeft => "Sidebar Left (First Position)",
            Self::SidebarLeft2 => "Sidebar Left (Second Position)",
            Self::SidebarRight => "Sidebar Right (Home first position)",
            Self::SidebarRightSecond => "Sidebar Right (Home second position)",
            Self::SidebarRightThird => "Sidebar Right (Home third position)",
            Self::FeedFirst => "Home Feed First",
            Self::FeedSecond => "Home Feed Second",
            Self::FeedThird => "Home Feed Third",
            Self::HomeHero => "Home Hero",
            Self::Footer => "Footer",
            Self::PageFixedBottom => "Fixed Bottom (Page)",
            Self::PostFixedBottom => "Fixed Bottom (Individual Post)",
            Self::PostBodyBottom => "Below the post body",
            Self::PostSidebar => "Sidebar Right (Individual Post)",
            Self::PostComments => "Below the comment section",
            Self::PostCommentsMid => "Midway through the comment section",
            Self::DigestFirst => "Digest Email First",
            Self::DigestSecond => "Digest Email Second",
        }
    }

    /// Upper-case key used in environment variable names.
    #[must_use]
    pub fn env_key(self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for PlacementArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementArea {
    type Err = PlacementAreaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Self::ALL
            .into_iter()
            .find(|area| area.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| PlacementAreaParseError {
                value: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_roundtrip() {
        for area in PlacementArea::ALL {
            assert_eq!(area.as_str().parse::<PlacementArea>(), Ok(area));
        }
    }

    #[test]
    fn test_serde_matches_as_str() {
        for area in PlacementArea::ALL {
            let json = serde_json::to_string(&area).unwrap();
            assert_eq!(json, format!("\"{}\"", area.as_str()));
        }
    }

    #[test]
    fn test_unknown_area() {
        assert!("invalid_area".parse::<PlacementArea>().is_err());
        assert!("".parse::<PlacementArea>().is_err());
    }

    #[test]
    fn test_human_readable_and_env_key() {
        assert_eq!(
            PlacementArea::SidebarLeft.human_readable(),
            "Sidebar Left (First Position)"
        );
        assert_eq!(PlacementArea::PostComments.env_key(), "POST_COMMENTS");
    }
}

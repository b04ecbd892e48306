//! Core identifiers, errors and configuration.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{BillboardSettings, DEFAULT_LOW_IMPRESSION_COUNT, EngineConfig, GeoSettings, SelectionRanges};
pub use errors::{RankingError, RankingResult, ensure_weight};
pub use ids::{ArticleId, BillboardId, OrganizationId, SubforemId, SurveyId, UserId, parse_id_list};

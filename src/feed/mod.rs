//! Personalized feed scoring.

pub mod affinity;
pub mod candidate;
pub mod formula;
pub mod sql;
pub mod weights;

pub use affinity::{AffinitySource, UserAffinity};
pub use candidate::{ArticleSignals, ScoredCandidate};
pub use formula::{RankedCandidate, ScoreBreakdown, ScoreFormula, TermContribution};
pub use sql::render_sql;
pub use weights::{DEFAULT_MUTATION_MAGNITUDE, FeedConfig, ScoreWeights, TagCountRange, WeightTerm};

//! Billboard selection: weighted picks, pool filters, delivery gating and
//! the strategy mix.

pub mod candidate;
pub mod delivery;
pub mod display;
pub mod placement;
pub mod policy;
pub mod selector;

pub use candidate::{Billboard, MAX_BILLBOARD_WEIGHT, WeightedCandidate};
pub use delivery::{PlacementAreaConfig, SelectionWeights, delivery_rate_for, should_fetch_billboard};
pub use display::{BillboardPicker, SelectionStrategy};
pub use placement::{PlacementArea, PlacementAreaParseError};
pub use selector::{DEFAULT_BOOST_MULTIPLIER, WeightedSelector};

//! Geolocation parsing and targeting validation.

pub mod geolocation;
pub mod iso3166;
pub mod matcher;

pub use geolocation::{GeoInput, GeoParseError, Geolocation};
pub use matcher::{EnabledCountries, GeoMatcher, RegionTargeting, ValidationMode};

//! ISO 3166 reference data.
//!
//! Lookups go through the `rust_iso3166` registry, which carries the full
//! ISO 3166-1 alpha-2 list and every ISO 3166-2 subdivision. Codes are
//! matched in upper case only; callers normalize before asking.

use rust_iso3166::iso3166_2;

fn is_upper_code(code: &str, max_len: usize) -> bool {
    !code.is_empty()
        && code.len() <= max_len
        && code
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
}

/// Whether `code` is an ISO 3166-1 alpha-2 country code (upper-case).
#[must_use]
pub fn is_country(code: &str) -> bool {
    code.len() == 2
        && code.bytes().all(|byte| byte.is_ascii_uppercase())
        && rust_iso3166::from_alpha2(code).is_some()
}

/// Whether `region` is an ISO 3166-2 subdivision of `country` (both upper-case).
#[must_use]
pub fn is_subdivision(country: &str, region: &str) -> bool {
    is_country(country)
        && is_upper_code(region, 3)
        && iso3166_2::from_code(&format!("{country}-{region}")).is_some()
}

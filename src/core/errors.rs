//! Error types for the ranking engine.

use thiserror::Error;

/// Ranking engine error type.
#[derive(Debug, Error)]
pub enum RankingError {
    /// Weighted selection was asked to pick from zero candidates.
    #[error("cannot select from an empty candidate pool")]
    EmptyPool,
    /// A weight is non-finite or negative.
    #[error("invalid weight for {name}: {value}")]
    InvalidWeight {
        /// Name of the offending weight.
        name: String,
        /// Value that was rejected.
        value: f64,
    },
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RankingError {
    /// Build an [`RankingError::InvalidWeight`] for a named weight.
    #[must_use]
    pub fn invalid_weight(name: impl Into<String>, value: f64) -> Self {
        Self::InvalidWeight {
            name: name.into(),
            value,
        }
    }
}

/// Convenience result alias for ranking operations.
pub type RankingResult<T> = Result<T, RankingError>;

/// Check that a weight is finite and non-negative.
///
/// # Errors
/// Returns [`RankingError::InvalidWeight`] for NaN, infinities and negative values.
pub fn ensure_weight(name: &str, value: f64) -> RankingResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RankingError::invalid_weight(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_weight() {
        assert!(ensure_weight("w", 0.0).is_ok());
        assert!(ensure_weight("w", 12.5).is_ok());
        assert!(ensure_weight("w", -0.1).is_err());
        assert!(ensure_weight("w", f64::NAN).is_err());
        assert!(ensure_weight("w", f64::INFINITY).is_err());
        assert!(ensure_weight("w", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = RankingError::invalid_weight("recency", -1.0);
        assert_eq!(err.to_string(), "invalid weight for recency: -1");
        assert_eq!(
            RankingError::EmptyPool.to_string(),
            "cannot select from an empty candidate pool"
        );
    }
}

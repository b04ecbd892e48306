//! Weighted random selection with contextual boosting.
//!
//! Each candidate owns a half-open interval of the cumulative weight line,
//! `[w_0 + ... + w_(i-1), w_0 + ... + w_i)`. A uniform draw `r` in
//! `[0, total)` lands in exactly one interval, so the probability of picking
//! candidate `i` is `w_i / total`. Zero-weight candidates own an empty
//! interval and are never drawn unless every weight is zero, in which case
//! the pick is uniform.

use rand::Rng;
use tracing::debug;

use crate::billboard::candidate::WeightedCandidate;
use crate::core::errors::{RankingError, RankingResult, ensure_weight};
use crate::core::ids::ArticleId;

/// Multiplier applied to candidates that prefer the current article.
pub const DEFAULT_BOOST_MULTIPLIER: f64 = 10.0;

/// Weighted-random picker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedSelector {
    boost_multiplier: f64,
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self {
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
        }
    }
}

impl WeightedSelector {
    /// Create a selector with a custom boost multiplier.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidWeight`] for a negative or non-finite multiplier.
    pub fn new(boost_multiplier: f64) -> RankingResult<Self> {
        let boost_multiplier = ensure_weight("boost_multiplier", boost_multiplier)?;
        Ok(Self { boost_multiplier })
    }

    /// Multiplier applied to boosted candidates.
    #[must_use]
    pub const fn boost_multiplier(self) -> f64 {
        self.boost_multiplier
    }

    /// Weight of `candidate` once the boost for `context` is applied.
    #[must_use]
    pub fn effective_weight<C: WeightedCandidate>(self, candidate: &C, context: Option<ArticleId>) -> f64 {
        let weight = candidate.weight();
        if context.is_some_and(|article| candidate.is_preferred_for(article)) {
            weight * self.boost_multiplier
        } else {
            weight
        }
    }

    /// Pick one candidate from `pool`.
    ///
    /// # Errors
    /// - [`RankingError::EmptyPool`] when `pool` is empty.
    /// - [`RankingError::InvalidWeight`] when an effective weight is negative
    ///   or non-finite.
    pub fn select<'a, C, R>(
        self,
        pool: &'a [C],
        context: Option<ArticleId>,
        rng: &mut R,
    ) -> RankingResult<&'a C>
    where
        C: WeightedCandidate,
        R: Rng + ?Sized,
    {
        if pool.is_empty() {
            return Err(RankingError::EmptyPool);
        }

        let mut weights = Vec::with_capacity(pool.len());
        for candidate in pool {
            let weight = self.effective_weight(candidate, context);
            weights.push(ensure_weight(&format!("billboard {}", candidate.id()), weight)?);
        }

        let total: f64 = weights.iter().sum();
        if !total.is_finite() {
            return Err(RankingError::invalid_weight("total weight", total));
        }

        if total <= 0.0 {
            let index = rng.gen_range(0..pool.len());
            debug!(pool = pool.len(), index, "all weights zero, uniform pick");
            return Ok(&pool[index]);
        }

        let draw = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        for (index, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = index;
            if draw < cumulative {
                debug!(pool = pool.len(), index, draw, total, "weighted pick");
                return Ok(&pool[index]);
            }
        }

        // Rounding can leave `draw` at the very end of the line.
        Ok(&pool[last_positive])
    }
}

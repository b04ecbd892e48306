//! Strategy mix for choosing the billboard to display.
//!
//! Most requests go to the best performers, a slice goes to billboards
//! that have not been seen much yet, and a small slice is fully random so
//! that unevaluated billboards get a chance to earn engagement.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::billboard::candidate::Billboard;
use crate::billboard::delivery::SelectionWeights;
use crate::billboard::policy;
use crate::billboard::selector::WeightedSelector;
use crate::core::ids::ArticleId;

/// Largest number of top performers sampled from.
pub const TOP_PERFORMER_LIMIT: usize = 15;

/// How a single billboard request picks from its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Uniform over the pool.
    RandomSelection,
    /// Weighted over seldom-seen and priority billboards.
    NewAndPriority,
    /// Uniform over billboards below the impression threshold.
    NewOnly,
    /// Uniform over a random-length prefix of the best-first pool.
    WeightedPerformance,
}

impl SelectionStrategy {
    /// Draw a strategy in proportion to `weights`.
    ///
    /// All-zero weights fall back to [`Self::WeightedPerformance`].
    pub fn choose<R: Rng + ?Sized>(weights: &SelectionWeights, rng: &mut R) -> Self {
        let total = weights.total();
        if total == 0 {
            warn!("all selection weights are zero, using weighted performance");
            return Self::WeightedPerformance;
        }

        let mut draw = rng.gen_range(0..total);
        for (strategy, weight) in [
            (Self::RandomSelection, weights.random_selection),
            (Self::NewAndPriority, weights.new_and_priority),
            (Self::NewOnly, weights.new_only),
            (Self::WeightedPerformance, weights.weighted_performance),
        ] {
            let weight = u64::from(weight);
            if draw < weight {
                return strategy;
            }
            draw -= weight;
        }
        Self::WeightedPerformance
    }
}

/// Picks the billboard to display for one placement area.
#[derive(Clone, Debug, PartialEq)]
pub struct BillboardPicker {
    selector: WeightedSelector,
    low_impression_count: u64,
    weights: SelectionWeights,
}

impl BillboardPicker {
    /// Create a picker.
    #[must_use]
    pub const fn new(selector: WeightedSelector, low_impression_count: u64, weights: SelectionWeights) -> Self {
        Self {
            selector,
            low_impression_count,
            weights,
        }
    }

    /// Impression threshold below which a billboard counts as new.
    #[must_use]
    pub const fn low_impression_count(&self) -> u64 {
        self.low_impression_count
    }

    /// Strategy mix used by [`Self::pick`].
    #[must_use]
    pub const fn weights(&self) -> &SelectionWeights {
        &self.weights
    }

    /// Pick a billboard from `pool`, which must be ordered best performer first.
    ///
    /// Returns `None` only for an empty pool.
    pub fn pick<'a, R: Rng + ?Sized>(
        &self,
        pool: &'a [Billboard],
        article: Option<ArticleId>,
        rng: &mut R,
    ) -> Option<&'a Billboard> {
        if pool.is_empty() {
            return None;
        }
        let strategy = SelectionStrategy::choose(&self.weights, rng);
        debug!(?strategy, pool = pool.len(), "billboard strategy");
        self.pick_with(strategy, pool, article, rng)
    }

    /// Pick a billboard from `pool` with a fixed strategy.
    pub fn pick_with<'a, R: Rng + ?Sized>(
        &self,
        strategy: SelectionStrategy,
        pool: &'a [Billboard],
        article: Option<ArticleId>,
        rng: &mut R,
    ) -> Option<&'a Billboard> {
        if pool.is_empty() {
            return None;
        }
        match strategy {
            SelectionStrategy::RandomSelection => sample(pool, rng),
            SelectionStrategy::NewAndPriority => {
                let seldom = policy::seldom_seen(pool, self.low_impression_count);
                self.selector.select(&seldom, article, rng).map_or_else(
                    |err| {
                        debug!(%err, "seldom-seen selection failed, sampling whole pool");
                        sample(pool, rng)
                    },
                    |billboard| Some(*billboard),
                )
            }
            SelectionStrategy::NewOnly => {
                let fresh = policy::new_only(pool, self.low_impression_count);
                if fresh.is_empty() {
                    top_performer(pool, rng)
                } else {
                    Some(fresh[rng.gen_range(0..fresh.len())])
                }
            }
            SelectionStrategy::WeightedPerformance => top_performer(pool, rng),
        }
    }
}

fn sample<'a, R: Rng + ?Sized>(pool: &'a [Billboard], rng: &mut R) -> Option<&'a Billboard> {
    if pool.is_empty() {
        return None;
    }
    Some(&pool[rng.gen_range(0..pool.len())])
}

// Cutting the pool at a random length and sampling within it favours the
// head: the first billboard is in every prefix, the fifteenth in one.
fn top_performer<'a, R: Rng + ?Sized>(pool: &'a [Billboard], rng: &mut R) -> Option<&'a Billboard> {
    let limit = rng.gen_range(1..=TOP_PERFORMER_LIMIT).min(pool.len());
    sample(&pool[..limit], rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billboard::placement::PlacementArea;
    use crate::core::ids::BillboardId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn billboard(id: i64, impressions: u64) -> Billboard {
        Billboard::new(BillboardId::new(id), PlacementArea::SidebarRight, 1.0)
            .unwrap()
            .with_impressions(impressions)
    }

    fn picker() -> BillboardPicker {
        BillboardPicker::new(WeightedSelector::default(), 1000, SelectionWeights::default())
    }

    #[test]
    fn test_choose_all_zero_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        let zero = SelectionWeights::from_ranges(0, 0, 0);
        let zero = SelectionWeights {
            weighted_performance: 0,
            ..zero
        };
        assert_eq!(
            SelectionStrategy::choose(&zero, &mut rng),
            SelectionStrategy::WeightedPerformance
        );
    }

    #[test]
    fn test_choose_single_strategy() {
        let mut rng = StdRng::seed_from_u64(6);
        let only_new = SelectionWeights {
            random_selection: 0,
            new_and_priority: 0,
            new_only: 3,
            weighted_performance: 0,
        };
        for _ in 0..100 {
            assert_eq!(SelectionStrategy::choose(&only_new, &mut rng), SelectionStrategy::NewOnly);
        }
    }

    #[test]
    fn test_choose_frequencies() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = SelectionWeights::default();
        let draws: u32 = 5000;
        let performance = (0..draws)
            .filter(|_| SelectionStrategy::choose(&weights, &mut rng) == SelectionStrategy::WeightedPerformance)
            .count();
        let ratio = f64::from(u32::try_from(performance).unwrap()) / f64::from(draws);
        assert!((ratio - 59.0 / 99.0).abs() < 0.025, "ratio {ratio}");
    }

    #[test]
    fn test_empty_pool() {
        let mut rng = StdRng::seed_from_u64(8);
        assert!(picker().pick(&[], None, &mut rng).is_none());
    }

    #[test]
    fn test_new_only_prefers_fresh_billboards() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = vec![billboard(1, 5000), billboard(2, 10), billboard(3, 9000)];
        for _ in 0..50 {
            let picked = picker()
                .pick_with(SelectionStrategy::NewOnly, &pool, None, &mut rng)
                .unwrap();
            assert_eq!(picked.id.get(), 2);
        }
    }

    #[test]
    fn test_new_only_falls_back_to_performance() {
        let mut rng = StdRng::seed_from_u64(10);
        let pool = vec![billboard(1, 5000), billboard(2, 6000)];
        let picked = picker().pick_with(SelectionStrategy::NewOnly, &pool, None, &mut rng);
        assert!(picked.is_some());
    }

    #[test]
    fn test_new_and_priority_falls_back_to_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = vec![billboard(1, 5000)];
        let picked = picker()
            .pick_with(SelectionStrategy::NewAndPriority, &pool, None, &mut rng)
            .unwrap();
        assert_eq!(picked.id.get(), 1);
    }

    #[test]
    fn test_new_and_priority_uses_seldom_seen() {
        let mut rng = StdRng::seed_from_u64(12);
        let pool = vec![
            billboard(1, 5000),
            billboard(2, 5000).with_priority(true),
            billboard(3, 50),
        ];
        for _ in 0..100 {
            let picked = picker()
                .pick_with(SelectionStrategy::NewAndPriority, &pool, None, &mut rng)
                .unwrap();
            assert_ne!(picked.id.get(), 1);
        }
    }

    #[test]
    fn test_weighted_performance_stays_in_top_prefix() {
        let mut rng = StdRng::seed_from_u64(13);
        let pool: Vec<Billboard> = (0..40).map(|id| billboard(id, 0)).collect();
        let mut first = 0;
        for _ in 0..2000 {
            let picked = picker()
                .pick_with(SelectionStrategy::WeightedPerformance, &pool, None, &mut rng)
                .unwrap();
            assert!(picked.id.get() < i64::try_from(TOP_PERFORMER_LIMIT).unwrap());
            if picked.id.get() == 0 {
                first += 1;
            }
        }
        // The head is favoured over a uniform pick from fifteen.
        assert!(first > 2000 / 15);
    }
}

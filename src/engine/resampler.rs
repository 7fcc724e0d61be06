//! Bootstrap resampler

use super::rng::RandomSource;
use super::types::SimulationError;
use crate::trades::TradePool;

/// A trade drawn from the pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    /// Index into the pool
    pub index: usize,
    /// Outcome of the drawn trade
    pub outcome: f64,
}

/// Draws outcomes uniformly with replacement from a non-empty pool
#[derive(Debug, Clone, Copy)]
pub struct Resampler<'a> {
    pool: &'a TradePool,
}

impl<'a> Resampler<'a> {
    /// Wrap a pool, rejecting an empty one
    pub fn new(pool: &'a TradePool) -> Result<Self, SimulationError> {
        if pool.is_empty() {
            return Err(SimulationError::EmptyPool {
                filter: format!("{} unit", pool.unit()),
            });
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &'a TradePool {
        self.pool
    }

    /// Draw one trade
    #[inline]
    pub fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Draw {
        let index = rng.next_index(self.pool.len());
        Draw {
            index,
            outcome: self.pool.outcome(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rng::stream_rng;

    #[test]
    fn test_empty_pool_rejected() {
        let pool = TradePool::from_outcomes(vec![]);
        let err = Resampler::new(&pool).unwrap_err();
        assert!(matches!(err, SimulationError::EmptyPool { .. }));
    }

    #[test]
    fn test_draw_matches_pool() {
        let pool = TradePool::from_outcomes(vec![100.0, -50.0, 25.0]);
        let resampler = Resampler::new(&pool).unwrap();
        let mut rng = stream_rng(Some(7), 0);

        for _ in 0..100 {
            let draw = resampler.draw(&mut rng);
            assert_eq!(draw.outcome, pool.outcome(draw.index));
        }
    }

    #[test]
    fn test_draws_cover_pool() {
        let pool = TradePool::from_outcomes(vec![1.0, 2.0, 3.0, 4.0]);
        let resampler = Resampler::new(&pool).unwrap();
        let mut rng = stream_rng(Some(11), 0);

        let mut seen = [0usize; 4];
        for _ in 0..4000 {
            seen[resampler.draw(&mut rng).index] += 1;
        }
        // Uniform: each index close to 1000
        for count in seen {
            assert!((800..1200).contains(&count), "count {count}");
        }
    }
}

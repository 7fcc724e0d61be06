//! Injectable random sources

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator used for simulation streams
pub type SimRng = ChaCha8Rng;

/// Source of uniform indices for the resampler
pub trait RandomSource {
    /// Uniform index in `[0, bound)`; `bound` must be non-zero
    fn next_index(&mut self, bound: usize) -> usize;
}

impl<R: RngCore> RandomSource for R {
    #[inline]
    fn next_index(&mut self, bound: usize) -> usize {
        self.gen_range(0..bound)
    }
}

/// Generator for one batch stream
///
/// With a seed, stream `n` is seeded with `seed ^ n`, so a batch draws the
/// same values whichever worker runs it. Without one, every stream gets
/// fresh entropy.
pub fn stream_rng(seed: Option<u64>, stream: u64) -> SimRng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed ^ stream),
        None => ChaCha8Rng::from_entropy(),
    }
}

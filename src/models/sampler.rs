use crate::errors::{EngineError, EngineResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Stream families. Each component draws from its own family so two
/// components never share a generator.
pub const STREAM_NAIVE: u64 = 1;
pub const STREAM_IMPORTANCE: u64 = 2;
pub const STREAM_NATURAL_PATHS: u64 = 3;
pub const STREAM_TILTED_PATHS: u64 = 4;

/// Seeded generator for `(family, index)`. Index is a shard or a path row.
#[inline]
pub fn stream_rng(seed: u64, family: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream((family << 32) | (index as u64 & 0xFFFF_FFFF));
    rng
}

/// Seed and shard layout for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub seed: u64,
    pub shard_size: usize,
}

impl SamplingPlan {
    pub fn new(seed: u64, shard_size: usize) -> EngineResult<Self> {
        if shard_size == 0 {
            return Err(EngineError::InvalidCount {
                name: "shard_size",
                value: shard_size,
                reason: "must be >= 1",
            });
        }
        Ok(Self { seed, shard_size })
    }
}

/// Running count / mean / sum of squared deviations.
///
/// Shards are combined with the pairwise update of Chan, Golub & LeVeque:
///   mean = mean_a + delta * n_b / n
///   M2   = M2_a + M2_b + delta^2 * n_a * n_b / n
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Moments {
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn merge(self, other: Moments) -> Moments {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        Moments {
            count: self.count + other.count,
            mean: self.mean + delta * nb / n,
            m2: self.m2 + other.m2 + delta * delta * na * nb / n,
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Divisor n.
    #[inline]
    pub fn population_variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0)
    }

    /// std / sqrt(n), zero for an empty accumulator.
    #[inline]
    pub fn standard_error(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.population_variance() / self.count as f64).sqrt()
    }
}

/// Ordered draws from one sharded sampling pass.
#[derive(Debug, Default)]
pub struct SampleBatch {
    pub terminal_prices: Vec<f64>,
    pub values: Vec<f64>,
    pub moments: Moments,
}

/// Shard lengths: full shards of `shard_size`, then the remainder.
/// Depends only on `n` and `shard_size`, never on the thread count.
pub fn split_draws(n: usize, shard_size: usize) -> Vec<usize> {
    let size = shard_size.max(1);
    let full = n / size;
    let rem = n % size;
    let mut shards = vec![size; full];
    if rem > 0 {
        shards.push(rem);
    }
    shards
}

/// Draw `n` samples across rayon shards. `draw` returns
/// `(terminal_price, value)`; the value feeds the moment accumulator.
pub fn sample_sharded<F>(n: usize, plan: &SamplingPlan, family: u64, draw: F) -> SampleBatch
where
    F: Fn(&mut ChaCha8Rng) -> (f64, f64) + Sync,
{
    let shards = split_draws(n, plan.shard_size);

    let outputs: Vec<SampleBatch> = shards
        .par_iter()
        .enumerate()
        .map(|(k, &len)| {
            let mut rng = stream_rng(plan.seed, family, k);
            let mut batch = SampleBatch {
                terminal_prices: Vec::with_capacity(len),
                values: Vec::with_capacity(len),
                moments: Moments::default(),
            };
            for _ in 0..len {
                let (st, value) = draw(&mut rng);
                batch.terminal_prices.push(st);
                batch.values.push(value);
                batch.moments.push(value);
            }
            batch
        })
        .collect();

    let mut merged = SampleBatch {
        terminal_prices: Vec::with_capacity(n),
        values: Vec::with_capacity(n),
        moments: Moments::default(),
    };
    for (k, shard) in outputs.into_iter().enumerate() {
        tracing::debug!(
            shard = k,
            draws = shard.moments.count(),
            shard_mean = shard.moments.mean(),
            "merging shard"
        );
        merged.terminal_prices.extend(shard.terminal_prices);
        merged.values.extend(shard.values);
        merged.moments = merged.moments.merge(shard.moments);
    }
    merged
}

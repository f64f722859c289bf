use crate::errors::EngineResult;
use crate::models::sampler::{stream_rng, STREAM_NATURAL_PATHS, STREAM_TILTED_PATHS};
use crate::state::ParameterSet;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Discretized GBM trajectories under the natural and the tilted measure.
///
/// Both matrices are `path_count x (steps + 1)` on the shared grid `times`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PathEnsemble {
    pub steps: usize,
    pub tilt_mean: f64,
    pub times: Vec<f64>,
    pub natural: Vec<Vec<f64>>,
    pub tilted: Vec<Vec<f64>>,
}

impl PathEnsemble {
    /// Share of paths ending below `strike`, (natural, tilted).
    pub fn terminal_crash_share(&self, strike: f64) -> (f64, f64) {
        (crash_share(&self.natural, strike), crash_share(&self.tilted, strike))
    }
}

fn crash_share(rows: &[Vec<f64>], strike: f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let hits = rows
        .iter()
        .filter(|row| row.last().is_some_and(|&s| s < strike))
        .count();
    hits as f64 / rows.len() as f64
}

/// Simulate `params.path_count()` paths per measure.
///
/// steps = floor(252 T), dt = T / steps.
/// Natural: W_{j} = sum_{i<=j} z_i sqrt(dt).
/// Tilted:  W_{j} = sum_{i<=j} (z_i + mu sqrt(dt) / sqrt(T)) sqrt(dt),
/// so W_T carries the same mu sqrt(T) shift the IS estimator applies.
/// S_t = S_0 exp((r - sigma^2/2) t + sigma W_t).
pub fn simulate_paths(params: &ParameterSet, tilt_mean: f64, seed: u64) -> EngineResult<PathEnsemble> {
    let steps = params.path_steps()?;
    let horizon = params.horizon();
    let dt = horizon / steps as f64;
    let sqrt_dt = dt.sqrt();

    let times: Vec<f64> = (0..=steps)
        .map(|j| if j == steps { horizon } else { j as f64 * dt })
        .collect();

    let tilt_shift = tilt_mean * sqrt_dt / params.sqrt_t();

    let natural = simulate_rows(params, &times, sqrt_dt, 0.0, seed, STREAM_NATURAL_PATHS);
    let tilted = simulate_rows(params, &times, sqrt_dt, tilt_shift, seed, STREAM_TILTED_PATHS);

    Ok(PathEnsemble { steps, tilt_mean, times, natural, tilted })
}

fn simulate_rows(
    params: &ParameterSet,
    times: &[f64],
    sqrt_dt: f64,
    shift: f64,
    seed: u64,
    family: u64,
) -> Vec<Vec<f64>> {
    let spot = params.spot();
    let sigma = params.volatility();
    let drift_rate = params.rate() - 0.5 * sigma * sigma;

    (0..params.path_count())
        .into_par_iter()
        .map(|i| {
            let mut rng = stream_rng(seed, family, i);
            let mut row = Vec::with_capacity(times.len());
            row.push(spot);
            let mut w = 0.0;
            for &t in &times[1..] {
                let z: f64 = rng.sample(StandardNormal);
                w += (z + shift) * sqrt_dt;
                row.push(spot * (drift_rate * t + sigma * w).exp());
            }
            row
        })
        .collect()
}

use crate::errors::{EngineError, EngineResult};
use crate::models::sampler::{self, SamplingPlan, STREAM_IMPORTANCE};
use crate::models::CrashEstimator;
use crate::state::{EstimatorResult, ParameterSet};
use rand::Rng;
use rand_distr::StandardNormal;

/// Default shift of the sampling mean past the crash boundary.
pub const DEFAULT_BOUNDARY_OFFSET: f64 = 0.5;

/// How the tilting mean mu is chosen.
///
/// Any finite mu gives an unbiased estimator; mu only moves the variance.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltStrategy {
    /// mu = sb - offset, where sb is the standardized crash boundary.
    BoundaryOffset(f64),
    /// Explicit mu. mu = 0 is plain sampling with unit weights.
    Fixed(f64),
}

impl Default for TiltStrategy {
    fn default() -> Self {
        Self::BoundaryOffset(DEFAULT_BOUNDARY_OFFSET)
    }
}

impl TiltStrategy {
    pub fn tilt_mean(&self, params: &ParameterSet) -> EngineResult<f64> {
        let (mu, name, raw) = match *self {
            Self::BoundaryOffset(offset) => (params.boundary_z() - offset, "tilt_offset", offset),
            Self::Fixed(mu) => (mu, "tilt_mean", mu),
        };
        if !mu.is_finite() {
            return Err(EngineError::InvalidParameter {
                name,
                value: raw,
                reason: "tilting mean must be finite",
            });
        }
        Ok(mu)
    }
}

/// Likelihood ratio phi(z) / phi(z - mu) = exp(-mu z + mu^2 / 2).
#[inline]
pub fn likelihood_ratio(mu: f64, z: f64) -> f64 {
    (-mu * z + 0.5 * mu * mu).exp()
}

/// Importance-sampling estimator with exponential tilting.
///
/// Z ~ N(mu, 1), S_T from the same GBM map as the naive estimator,
/// value = 1{S_T < K} * exp(-mu Z + mu^2/2).
/// p = mean(value), se = std(value) / sqrt(N).
pub struct ImportanceEstimator {
    tilt: TiltStrategy,
}

impl ImportanceEstimator {
    pub fn new(tilt: TiltStrategy) -> Self {
        Self { tilt }
    }
}

impl CrashEstimator for ImportanceEstimator {
    #[inline]
    fn name(&self) -> &'static str {
        "Importance Sampling"
    }

    fn estimate(&self, params: &ParameterSet, plan: &SamplingPlan) -> EngineResult<EstimatorResult> {
        let mu = self.tilt.tilt_mean(params)?;
        let strike = params.strike();

        let batch = sampler::sample_sharded(params.sample_count(), plan, STREAM_IMPORTANCE, |rng| {
            let z = mu + rng.sample::<f64, _>(StandardNormal);
            let st = params.terminal_price(z);
            let value = if st < strike { likelihood_ratio(mu, z) } else { 0.0 };
            (st, value)
        });

        let probability = batch.moments.mean();
        let standard_error = batch.moments.standard_error();
        if !probability.is_finite() || !standard_error.is_finite() {
            return Err(EngineError::Model(format!(
                "importance estimate not finite: p={probability}, se={standard_error}, mu={mu}"
            )));
        }

        Ok(EstimatorResult {
            name: self.name(),
            // weights are positive, so only rounding can push the mean below zero
            probability: probability.max(0.0),
            standard_error,
            tilt_mean: mu,
            terminal_prices: batch.terminal_prices,
            event_indicators: batch.values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analytical::AnalyticalReference;
    use crate::models::naive::NaiveEstimator;

    fn scenario(n: usize) -> ParameterSet {
        ParameterSet::new(100.0, 70.0, 1.0, 0.05, 0.2, n, 1).unwrap()
    }

    #[test]
    fn test_default_tilt_mean() {
        let params = scenario(1);
        let mu = TiltStrategy::default().tilt_mean(&params).unwrap();
        assert!((mu - (params.boundary_z() - 0.5)).abs() < 1e-15);
        // sb = (ln 0.7 - 0.03) / 0.2 = -1.933
        assert!((mu + 2.4334).abs() < 1e-3, "mu={mu}");
    }

    #[test]
    fn test_non_finite_tilt_rejected() {
        let params = scenario(1);
        assert!(TiltStrategy::Fixed(f64::INFINITY).tilt_mean(&params).is_err());
        assert!(TiltStrategy::BoundaryOffset(f64::NAN).tilt_mean(&params).is_err());
    }

    #[test]
    fn test_likelihood_ratio_identity_at_zero_shift() {
        for z in [-3.0, -0.5, 0.0, 1.2, 4.0] {
            assert_eq!(likelihood_ratio(0.0, z), 1.0);
        }
    }

    #[test]
    fn test_zero_tilt_reduces_to_naive() {
        let plan = SamplingPlan::new(8, 4096).unwrap();
        let params = scenario(20_000);
        let res = ImportanceEstimator::new(TiltStrategy::Fixed(0.0)).estimate(&params, &plan).unwrap();
        assert!(res.event_indicators.iter().all(|&v| v == 0.0 || v == 1.0), "mu=0 must give unit weights");
        let truth = AnalyticalReference::new().probability(&params);
        assert!(
            (res.probability - truth).abs() < 5.0 * res.standard_error,
            "p={} truth={truth} se={}",
            res.probability,
            res.standard_error
        );
    }

    #[test]
    fn test_unbiased_for_several_tilts() {
        let params = scenario(50_000);
        let truth = AnalyticalReference::new().probability(&params);
        let plan = SamplingPlan::new(17, 4096).unwrap();
        for tilt in [
            TiltStrategy::Fixed(-1.0),
            TiltStrategy::Fixed(-3.0),
            TiltStrategy::BoundaryOffset(0.0),
            TiltStrategy::default(),
        ] {
            let res = ImportanceEstimator::new(tilt).estimate(&params, &plan).unwrap();
            assert!(
                (res.probability - truth).abs() < 5.0 * res.standard_error + 1e-4,
                "{tilt:?}: p={} truth={truth} se={}",
                res.probability,
                res.standard_error
            );
        }
    }

    #[test]
    fn test_variance_reduction_over_naive() {
        let params = scenario(20_000);
        let plan = SamplingPlan::new(1, 4096).unwrap();
        let naive = NaiveEstimator::new().estimate(&params, &plan).unwrap();
        let is = ImportanceEstimator::new(TiltStrategy::default()).estimate(&params, &plan).unwrap();
        let ratio = (naive.standard_error / is.standard_error).powi(2);
        assert!(ratio > 5.0, "variance reduction ratio={ratio}");
        assert!((is.probability - 0.0217).abs() < 0.01, "IS p={}", is.probability);
    }

    #[test]
    fn test_deterministic_seed() {
        let plan = SamplingPlan::new(42, 4096).unwrap();
        let est = ImportanceEstimator::new(TiltStrategy::default());
        let a = est.estimate(&scenario(1000), &plan).unwrap();
        let b = est.estimate(&scenario(1000), &plan).unwrap();
        assert_eq!(a.probability, b.probability);
        assert_eq!(a.standard_error, b.standard_error);
    }

    #[test]
    fn test_standard_error_decays_with_sqrt_n() {
        let small = scenario(1000);
        let large = scenario(100_000);
        let plan = SamplingPlan::new(77, 4096).unwrap();
        let est = ImportanceEstimator::new(TiltStrategy::default());
        let se_small = est.estimate(&small, &plan).unwrap().standard_error;
        let se_large = est.estimate(&large, &plan).unwrap().standard_error;
        let ratio = se_small / se_large;
        assert!((8.0..12.0).contains(&ratio), "se ratio={ratio}");
    }
}

use crate::errors::{EngineError, EngineResult};
use crate::models::sampler::{self, SamplingPlan, STREAM_NAIVE};
use crate::models::CrashEstimator;
use crate::state::{EstimatorResult, ParameterSet};
use rand::Rng;
use rand_distr::StandardNormal;

/// Direct Monte Carlo under the risk-neutral measure.
///
/// S_T = S_0 * exp((r - sigma^2/2) T + sigma sqrt(T) Z),  Z ~ N(0, 1)
/// p   = mean(1{S_T < K}),  se = std(1{S_T < K}) / sqrt(N)
pub struct NaiveEstimator;

impl NaiveEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl CrashEstimator for NaiveEstimator {
    #[inline]
    fn name(&self) -> &'static str {
        "Naive MC"
    }

    fn estimate(&self, params: &ParameterSet, plan: &SamplingPlan) -> EngineResult<EstimatorResult> {
        let strike = params.strike();
        let batch = sampler::sample_sharded(params.sample_count(), plan, STREAM_NAIVE, |rng| {
            let z: f64 = rng.sample(StandardNormal);
            let st = params.terminal_price(z);
            (st, if st < strike { 1.0 } else { 0.0 })
        });

        let probability = batch.moments.mean();
        let standard_error = batch.moments.standard_error();
        if !probability.is_finite() || !standard_error.is_finite() {
            return Err(EngineError::Model(format!(
                "naive estimate not finite: p={probability}, se={standard_error}"
            )));
        }

        Ok(EstimatorResult {
            name: self.name(),
            probability,
            standard_error,
            tilt_mean: 0.0,
            terminal_prices: batch.terminal_prices,
            event_indicators: batch.values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analytical::AnalyticalReference;

    fn scenario(n: usize) -> ParameterSet {
        ParameterSet::new(100.0, 70.0, 1.0, 0.05, 0.2, n, 1).unwrap()
    }

    #[test]
    fn test_output_shape() {
        let plan = SamplingPlan::new(3, 256).unwrap();
        let res = NaiveEstimator::new().estimate(&scenario(1000), &plan).unwrap();
        assert_eq!(res.terminal_prices.len(), 1000);
        assert_eq!(res.event_indicators.len(), 1000);
        assert!(res.event_indicators.iter().all(|&v| v == 0.0 || v == 1.0));
        // indicator agrees with its price, draw by draw
        for (st, ind) in res.terminal_prices.iter().zip(&res.event_indicators) {
            assert_eq!(*ind == 1.0, *st < 70.0);
        }
        assert!((0.0..=1.0).contains(&res.probability));
    }

    #[test]
    fn test_deterministic_seed() {
        let plan = SamplingPlan::new(42, 4096).unwrap();
        let a = NaiveEstimator::new().estimate(&scenario(1000), &plan).unwrap();
        let b = NaiveEstimator::new().estimate(&scenario(1000), &plan).unwrap();
        assert_eq!(a.probability, b.probability);
        assert_eq!(a.standard_error, b.standard_error);
        assert_eq!(a.terminal_prices, b.terminal_prices);
    }

    #[test]
    fn test_converges_to_analytical() {
        let plan = SamplingPlan::new(2024, 4096).unwrap();
        let params = scenario(50_000);
        let res = NaiveEstimator::new().estimate(&params, &plan).unwrap();
        let truth = AnalyticalReference::new().probability(&params);
        assert!(
            (res.probability - truth).abs() < 5.0 * res.standard_error,
            "naive p={} truth={truth} se={}",
            res.probability,
            res.standard_error
        );
        assert!((res.probability - 0.0217).abs() < 0.01);
    }

    #[test]
    fn test_standard_error_formula() {
        let plan = SamplingPlan::new(5, 128).unwrap();
        let res = NaiveEstimator::new().estimate(&scenario(2000), &plan).unwrap();
        let p = res.probability;
        let expected = (p * (1.0 - p) / 2000.0).sqrt();
        assert!((res.standard_error - expected).abs() < 1e-12, "se={} expected={expected}", res.standard_error);
    }

    #[test]
    fn test_standard_error_decays_with_sqrt_n() {
        // strike near the money keeps p large enough that the ratio is tight at N=1000
        let small = ParameterSet::new(100.0, 90.0, 1.0, 0.05, 0.2, 1000, 1).unwrap();
        let large = ParameterSet::new(100.0, 90.0, 1.0, 0.05, 0.2, 100_000, 1).unwrap();
        let plan = SamplingPlan::new(99, 4096).unwrap();
        let se_small = NaiveEstimator::new().estimate(&small, &plan).unwrap().standard_error;
        let se_large = NaiveEstimator::new().estimate(&large, &plan).unwrap().standard_error;
        let ratio = se_small / se_large;
        assert!((8.5..11.5).contains(&ratio), "se ratio={ratio}");
    }
}

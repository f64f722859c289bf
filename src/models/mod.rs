pub mod analytical;
pub mod historical;
pub mod importance;
pub mod naive;
pub mod sampler;

use crate::errors::EngineResult;
use crate::models::sampler::SamplingPlan;
use crate::state::{EstimatorResult, ParameterSet};

/// Monte Carlo estimators of P(S_T < K) implement this trait.
/// estimate() is a pure function of its inputs: the same parameters and
/// plan always return the same result. Send + Sync so estimators can run
/// side by side on rayon.
pub trait CrashEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, params: &ParameterSet, plan: &SamplingPlan) -> EngineResult<EstimatorResult>;
}

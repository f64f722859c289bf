use crate::engine::convergence::ConvergenceTrace;
use crate::engine::paths::{self, PathEnsemble};
use crate::errors::EngineResult;
use crate::models::analytical::AnalyticalReference;
use crate::models::importance::{ImportanceEstimator, TiltStrategy};
use crate::models::naive::NaiveEstimator;
use crate::models::sampler::SamplingPlan;
use crate::models::CrashEstimator;
use crate::risk::level::RiskLevel;
use crate::risk::var::{RiskMetrics, CONFIDENCE_LEVELS};
use crate::state::{EstimatorResult, ParameterSet};
use rand::Rng;
use std::time::Instant;

/// Per-run knobs that are not market parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// Master seed. `None` draws one from OS entropy; the chosen seed is
    /// reported in the result either way.
    pub seed: Option<u64>,
    pub shard_size: usize,
    pub tilt: TiltStrategy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            shard_size: 4096,
            tilt: TiltStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalyticalSummary {
    pub probability: f64,
    pub d2: f64,
}

/// Everything one run produces. Built fresh per call, never cached.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulationResult {
    pub run_id: uuid::Uuid,
    pub computed_at: String,
    pub seed: u64,
    pub parameters: ParameterSet,
    pub analytical: AnalyticalSummary,
    pub naive: EstimatorResult,
    pub importance: EstimatorResult,
    pub naive_error_pct: f64,
    pub importance_error_pct: f64,
    pub variance_reduction: f64,
    pub risk: RiskMetrics,
    pub risk_level: RiskLevel,
    pub naive_convergence: ConvergenceTrace,
    pub importance_convergence: ConvergenceTrace,
    pub paths: PathEnsemble,
    /// Share of paths ending below the strike, (natural, tilted).
    pub path_crash_share: (f64, f64),
}

/// |p - truth| / truth * 100, or 0 when the reference is exactly zero.
#[inline]
pub fn relative_error_pct(estimate: f64, truth: f64) -> f64 {
    if truth == 0.0 {
        return 0.0;
    }
    (estimate - truth).abs() / truth * 100.0
}

/// (se_naive / se_is)^2, or 0 when the IS error vanished.
#[inline]
pub fn variance_reduction(se_naive: f64, se_is: f64) -> f64 {
    if se_is > 0.0 {
        (se_naive * se_naive) / (se_is * se_is)
    } else {
        0.0
    }
}

/// Run every component for one parameter set.
///
/// All validation happens before the first draw; a failing run returns
/// only the error. Estimators and the path simulator are independent and
/// run concurrently on rayon.
pub fn run(params: &ParameterSet, options: &RunOptions) -> EngineResult<SimulationResult> {
    let started = Instant::now();

    // Fail fast: nothing below may consume randomness yet.
    params.path_steps()?;
    let importance = ImportanceEstimator::new(options.tilt);
    let tilt_mean = options.tilt.tilt_mean(params)?;
    let seed = options.seed.unwrap_or_else(|| rand::rng().random::<u64>());
    let plan = SamplingPlan::new(seed, options.shard_size)?;

    tracing::info!(
        spot = params.spot(),
        strike = params.strike(),
        horizon = params.horizon(),
        samples = params.sample_count(),
        paths = params.path_count(),
        seed = seed,
        tilt_mean = tilt_mean,
        "simulation run starting"
    );

    let analytical = AnalyticalReference::new();
    let naive = NaiveEstimator::new();

    let ((naive_res, is_res), path_res) = rayon::join(
        || rayon::join(|| naive.estimate(params, &plan), || importance.estimate(params, &plan)),
        || paths::simulate_paths(params, tilt_mean, seed),
    );
    let naive_res = naive_res?;
    let is_res = is_res?;
    let paths = path_res?;

    let truth = analytical.probability(params);
    let risk = RiskMetrics::from_terminal_prices(&naive_res.terminal_prices, params.spot(), &CONFIDENCE_LEVELS)?;
    let (naive_convergence, importance_convergence) = rayon::join(
        || ConvergenceTrace::from_values(&naive_res.event_indicators),
        || ConvergenceTrace::from_values(&is_res.event_indicators),
    );

    let result = SimulationResult {
        run_id: uuid::Uuid::new_v4(),
        computed_at: chrono::Utc::now().to_rfc3339(),
        seed,
        parameters: *params,
        analytical: AnalyticalSummary { probability: truth, d2: params.d2() },
        naive_error_pct: relative_error_pct(naive_res.probability, truth),
        importance_error_pct: relative_error_pct(is_res.probability, truth),
        variance_reduction: variance_reduction(naive_res.standard_error, is_res.standard_error),
        risk_level: RiskLevel::classify(truth),
        risk,
        naive: naive_res,
        importance: is_res,
        naive_convergence,
        importance_convergence,
        path_crash_share: paths.terminal_crash_share(params.strike()),
        paths,
    };

    tracing::info!(
        analytical = truth,
        naive = result.naive.probability,
        naive_se = result.naive.standard_error,
        importance = result.importance.probability,
        importance_se = result.importance.standard_error,
        naive_trace_end = result.naive_convergence.final_mean(),
        importance_trace_end = result.importance_convergence.final_mean(),
        variance_reduction = result.variance_reduction,
        var_95 = result.risk.at(0.95).map(|t| t.var),
        risk_level = %result.risk_level,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation run complete"
    );

    Ok(result)
}

use crate::config::AppConfig;
use crate::errors::{EngineError, EngineResult};
use portable_atomic::AtomicU64;
use std::sync::Arc;

/// Trading days per year; also the path grid density (steps per year).
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Upper bound on the path grid: 50 years of trading days.
pub const MAX_PATH_STEPS: usize = 12_600;

// ── Validated run parameters (immutable, Copy) ──

/// Market and simulation inputs for one run.
///
/// Construction validates every scalar. The precomputed terms are shared
/// by the analytical reference, both estimators, and the path simulator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ParameterSet {
    spot: f64,
    strike: f64,
    horizon: f64,
    rate: f64,
    volatility: f64,
    sample_count: usize,
    path_count: usize,
    // Precomputed
    #[serde(skip)]
    drift_t: f64,
    #[serde(skip)]
    sigma_sqrt_t: f64,
    #[serde(skip)]
    sqrt_t: f64,
}

impl ParameterSet {
    pub fn new(
        spot: f64,
        strike: f64,
        horizon: f64,
        rate: f64,
        volatility: f64,
        sample_count: usize,
        path_count: usize,
    ) -> EngineResult<Self> {
        validate_positive("spot", spot)?;
        validate_positive("strike", strike)?;
        validate_positive("horizon", horizon)?;
        validate_finite("rate", rate)?;
        validate_positive("volatility", volatility)?;
        validate_count("sample_count", sample_count)?;
        validate_count("path_count", path_count)?;

        let sqrt_t = horizon.sqrt();
        let sigma_sqrt_t = volatility * sqrt_t;
        let drift_t = (rate - 0.5 * volatility * volatility) * horizon;

        if !(sigma_sqrt_t > 0.0 && sigma_sqrt_t.is_finite() && drift_t.is_finite()) {
            return Err(EngineError::InvalidParameter {
                name: "volatility",
                value: volatility,
                reason: "sigma * sqrt(horizon) must be finite and > 0",
            });
        }

        Ok(Self {
            spot,
            strike,
            horizon,
            rate,
            volatility,
            sample_count,
            path_count,
            drift_t,
            sigma_sqrt_t,
            sqrt_t,
        })
    }

    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    #[inline]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[inline]
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    #[inline]
    pub fn sqrt_t(&self) -> f64 {
        self.sqrt_t
    }

    /// Exact GBM terminal price for a driving variate `z`.
    #[inline]
    pub fn terminal_price(&self, z: f64) -> f64 {
        self.spot * (self.drift_t + self.sigma_sqrt_t * z).exp()
    }

    /// Standardized distance to the crash boundary: S_T < K  <=>  Z < sb.
    #[inline]
    pub fn boundary_z(&self) -> f64 {
        ((self.strike / self.spot).ln() - self.drift_t) / self.sigma_sqrt_t
    }

    /// d2 = (ln(S/K) + (r - sigma^2/2)T) / (sigma sqrt(T)) = -sb
    #[inline]
    pub fn d2(&self) -> f64 {
        ((self.spot / self.strike).ln() + self.drift_t) / self.sigma_sqrt_t
    }

    /// Number of path grid steps, floor(252 * T). Fails when the horizon
    /// is shorter than one trading day or the grid exceeds `MAX_PATH_STEPS`.
    pub fn path_steps(&self) -> EngineResult<usize> {
        let steps = (TRADING_DAYS_PER_YEAR * self.horizon).floor();
        if steps < 1.0 {
            return Err(EngineError::InvalidParameter {
                name: "horizon",
                value: self.horizon,
                reason: "floor(252 * horizon) must be >= 1 for path simulation",
            });
        }
        // compare as f64 so the cast below never saturates
        if steps > MAX_PATH_STEPS as f64 {
            return Err(EngineError::InvalidCount {
                name: "steps",
                value: steps.min(usize::MAX as f64) as usize,
                reason: "path grid exceeds 12600 steps (50 years)",
            });
        }
        Ok(steps as usize)
    }
}

/// Convert a crash fraction in (0, 1) to a strike price. Boundary-layer helper:
/// the core only ever sees the strike.
pub fn strike_from_fraction(spot: f64, crash_fraction: f64) -> EngineResult<f64> {
    validate_positive("spot", spot)?;
    if !(crash_fraction.is_finite() && crash_fraction > 0.0 && crash_fraction < 1.0) {
        return Err(EngineError::InvalidParameter {
            name: "crash_fraction",
            value: crash_fraction,
            reason: "must lie strictly inside (0, 1)",
        });
    }
    Ok(spot * crash_fraction)
}

// ── Estimator output ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct EstimatorResult {
    pub name: &'static str,
    pub probability: f64,
    pub standard_error: f64,
    /// Tilting mean used for the draws (0 for naive sampling).
    pub tilt_mean: f64,
    /// Sampled terminal prices in draw order
    pub terminal_prices: Vec<f64>,
    /// Per-draw indicator (naive) or weight x indicator (IS), same order
    pub event_indicators: Vec<f64>,
}

impl EstimatorResult {
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.terminal_prices.len()
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub runs_completed: AtomicU64,
    pub runs_rejected: AtomicU64,
    pub samples_drawn: AtomicU64,
    pub paths_simulated: AtomicU64,
    pub exports_written: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
            samples_drawn: AtomicU64::new(0),
            paths_simulated: AtomicU64::new(0),
            exports_written: AtomicU64::new(0),
        }
    }
}

// ── Application shared state ──
// Config and counters only; no simulation result outlives its response.

pub struct AppState {
    pub config: AppConfig,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            counters: PerfCounters::new(),
        })
    }
}

// ── Validation helpers ──

pub(crate) fn validate_positive(name: &'static str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name, value, reason: "must be finite and > 0" })
    }
}

pub(crate) fn validate_finite(name: &'static str, value: f64) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name, value, reason: "must be finite" })
    }
}

pub(crate) fn validate_count(name: &'static str, value: usize) -> EngineResult<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(EngineError::InvalidCount { name, value, reason: "must be >= 1" })
    }
}

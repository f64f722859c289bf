use crate::config::AppConfig;
use crate::engine::run::RunOptions;
use crate::errors::{EngineError, EngineResult};
use crate::models::importance::TiltStrategy;
use crate::state::{self, ParameterSet};

/// Simulation inputs as supplied by a client. The crash threshold arrives
/// as a fraction of spot and is converted to a strike exactly once here.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SimulationRequest {
    pub spot: f64,
    pub volatility: f64,
    pub crash_fraction: f64,
    pub horizon: f64,
    pub rate: Option<f64>,
    pub sample_count: Option<usize>,
    pub path_count: Option<usize>,
    pub seed: Option<u64>,
    pub tilt: Option<TiltStrategy>,
    pub label: Option<String>,
}

impl SimulationRequest {
    /// Validate against the service caps and build the core inputs.
    pub fn into_run(&self, config: &AppConfig) -> EngineResult<(ParameterSet, RunOptions)> {
        let sample_count = self.sample_count.unwrap_or(config.default_sample_count);
        let path_count = self.path_count.unwrap_or(config.default_path_count);
        check_cap("sample_count", sample_count, config.max_sample_count)?;
        check_cap("path_count", path_count, config.max_path_count)?;

        let strike = state::strike_from_fraction(self.spot, self.crash_fraction)?;
        let params = ParameterSet::new(
            self.spot,
            strike,
            self.horizon,
            self.rate.unwrap_or(config.default_rate),
            self.volatility,
            sample_count,
            path_count,
        )?;

        let options = RunOptions {
            seed: self.seed.or(config.rng_seed),
            shard_size: config.shard_size,
            tilt: self.tilt.unwrap_or_default(),
        };
        Ok((params, options))
    }
}

fn check_cap(name: &'static str, value: usize, cap: usize) -> EngineResult<()> {
    if value > cap {
        return Err(EngineError::InvalidCount {
            name,
            value,
            reason: "exceeds the configured maximum",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HistoricalRequest {
    pub closes: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SimulationRequest {
        serde_json::from_value(serde_json::json!({
            "spot": 100.0,
            "volatility": 0.2,
            "crash_fraction": 0.7,
            "horizon": 1.0
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_in() {
        let cfg = AppConfig::default();
        let (params, options) = request().into_run(&cfg).unwrap();
        assert!((params.strike() - 70.0).abs() < 1e-12);
        assert_eq!(params.sample_count(), cfg.default_sample_count);
        assert_eq!(params.path_count(), cfg.default_path_count);
        assert_eq!(params.rate(), cfg.default_rate);
        assert_eq!(options.tilt, TiltStrategy::default());
        assert_eq!(options.seed, None);
    }

    #[test]
    fn test_tilt_deserializes() {
        let req: SimulationRequest = serde_json::from_value(serde_json::json!({
            "spot": 100.0, "volatility": 0.2, "crash_fraction": 0.7, "horizon": 1.0,
            "tilt": {"fixed": -1.5}
        }))
        .unwrap();
        assert_eq!(req.tilt, Some(TiltStrategy::Fixed(-1.5)));
    }

    #[test]
    fn test_caps_enforced() {
        let cfg = AppConfig::default();
        let mut req = request();
        req.sample_count = Some(cfg.max_sample_count + 1);
        assert!(matches!(
            req.into_run(&cfg),
            Err(EngineError::InvalidCount { name: "sample_count", .. })
        ));
    }

    #[test]
    fn test_percent_threshold_rejected() {
        let mut req = request();
        req.crash_fraction = 70.0;
        assert!(matches!(
            req.into_run(&AppConfig::default()),
            Err(EngineError::InvalidParameter { name: "crash_fraction", .. })
        ));
    }

    #[test]
    fn test_config_seed_used_when_request_has_none() {
        let cfg = AppConfig { rng_seed: Some(9), ..AppConfig::default() };
        let (_, options) = request().into_run(&cfg).unwrap();
        assert_eq!(options.seed, Some(9));
    }
}

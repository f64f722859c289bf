use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub default_sample_count: usize,
    pub default_path_count: usize,
    pub max_sample_count: usize,
    pub max_path_count: usize,
    pub shard_size: usize,
    pub rng_seed: Option<u64>,
    pub default_rate: f64,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let default_rate = env_var_or("DEFAULT_RATE", "0.05")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_RATE: {e}")))?;

        let rng_seed = match std::env::var("RNG_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| EngineError::Config(format!("RNG_SEED: {e}")))?,
            ),
            Err(_) => None,
        };

        let cfg = Self {
            server_port,
            default_sample_count: parse_count("DEFAULT_SAMPLE_COUNT", "5000")?,
            default_path_count: parse_count("DEFAULT_PATH_COUNT", "50")?,
            max_sample_count: parse_count("MAX_SAMPLE_COUNT", "200000")?,
            max_path_count: parse_count("MAX_PATH_COUNT", "500")?,
            shard_size: parse_count("SHARD_SIZE", "4096")?,
            rng_seed,
            default_rate,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> EngineResult<()> {
        if !self.default_rate.is_finite() {
            return Err(EngineError::Config("DEFAULT_RATE must be finite".into()));
        }
        if self.default_sample_count > self.max_sample_count {
            return Err(EngineError::Config(
                "DEFAULT_SAMPLE_COUNT exceeds MAX_SAMPLE_COUNT".into(),
            ));
        }
        if self.default_path_count > self.max_path_count {
            return Err(EngineError::Config(
                "DEFAULT_PATH_COUNT exceeds MAX_PATH_COUNT".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            default_sample_count: 5000,
            default_path_count: 50,
            max_sample_count: 200_000,
            max_path_count: 500,
            shard_size: 4096,
            rng_seed: None,
            default_rate: 0.05,
        }
    }
}

/// Positive integer env var. Zero is a config error.
fn parse_count(key: &str, default: &str) -> EngineResult<usize> {
    let value = env_var_or(key, default)
        .parse::<usize>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))?;
    if value == 0 {
        return Err(EngineError::Config(format!("{key}: must be >= 1")));
    }
    Ok(value)
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

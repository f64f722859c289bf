use crate::errors::{EngineError, EngineResult};
use crate::state::TRADING_DAYS_PER_YEAR;
use statrs::statistics::Statistics;

/// Default window for realized volatility (trading days).
pub const ROLLING_VOL_WINDOW: usize = 30;

/// Minimum closes needed: two returns for a sample variance, three for skew.
const MIN_CLOSES: usize = 3;

/// Summary of a closing-price history, used to pre-populate spot and
/// volatility for a run. Retrieval of the prices happens elsewhere.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoricalStats {
    pub spot: f64,
    pub volatility: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub observations: usize,
    pub rolling_volatility: Vec<f64>,
}

impl HistoricalStats {
    /// Pure function of the close series (oldest first).
    pub fn from_closes(closes: &[f64]) -> EngineResult<Self> {
        if closes.len() < MIN_CLOSES {
            return Err(EngineError::Data(format!(
                "need at least {MIN_CLOSES} closes, got {}",
                closes.len()
            )));
        }
        if let Some((i, &bad)) = closes.iter().enumerate().find(|(_, p)| !(p.is_finite() && **p > 0.0)) {
            return Err(EngineError::Data(format!("close #{i} = {bad} is not a positive price")));
        }

        let returns = log_returns(closes);
        let spot = closes[closes.len() - 1];
        let volatility = returns.iter().std_dev() * TRADING_DAYS_PER_YEAR.sqrt();

        Ok(Self {
            spot,
            volatility,
            skewness: sample_skewness(&returns),
            excess_kurtosis: sample_excess_kurtosis(&returns),
            observations: returns.len(),
            rolling_volatility: rolling_volatility(&returns, ROLLING_VOL_WINDOW),
        })
    }
}

/// ln(P_t / P_{t-1}) for consecutive closes.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Annualized sample std over each full trailing window.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || returns.len() < window {
        return Vec::new();
    }
    let annualize = TRADING_DAYS_PER_YEAR.sqrt();
    returns
        .windows(window)
        .map(|w| w.iter().std_dev() * annualize)
        .collect()
}

/// Adjusted Fisher-Pearson skewness, G1 = sqrt(n(n-1)) / (n-2) * m3 / m2^1.5.
pub fn sample_skewness(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 3 {
        return 0.0;
    }
    let nf = n as f64;
    let (m2, m3, _) = central_moments(data);
    if m2 < 1e-300 {
        return 0.0;
    }
    (nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3 / m2.powf(1.5)
}

/// Bias-corrected excess kurtosis (G2).
pub fn sample_excess_kurtosis(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 4 {
        return 0.0;
    }
    let nf = n as f64;
    let (m2, _, m4) = central_moments(data);
    if m2 < 1e-300 {
        return 0.0;
    }
    // With s2 = n*m2, s4 = n*m4: s4 / s2^2 = m4 / (n * m2^2)
    let ratio = m4 / (nf * m2 * m2);
    let denom = (nf - 2.0) * (nf - 3.0);
    nf * (nf + 1.0) * (nf - 1.0) / denom * ratio - 3.0 * (nf - 1.0) * (nf - 1.0) / denom
}

/// Biased central moments (divisor n): (m2, m3, m4).
fn central_moments(data: &[f64]) -> (f64, f64, f64) {
    let nf = data.len() as f64;
    let mean = data.iter().sum::<f64>() / nf;
    let mut m2: f64 = 0.0;
    let mut m3: f64 = 0.0;
    let mut m4: f64 = 0.0;
    for &x in data {
        let d = x - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / nf, m3 / nf, m4 / nf)
}

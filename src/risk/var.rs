use crate::errors::{EngineError, EngineResult};
use smallvec::SmallVec;

/// Confidence levels reported for every run.
pub const CONFIDENCE_LEVELS: [f64; 2] = [0.95, 0.99];

/// Empirical percentile with linear interpolation between order statistics.
///
/// `q` is in percent, [0, 100]. Rank = q/100 * (n - 1); the value is
/// interpolated between floor(rank) and ceil(rank) of the sorted sample.
pub fn percentile(values: &[f64], q: f64) -> EngineResult<f64> {
    if values.is_empty() {
        return Err(EngineError::InvalidCount {
            name: "sample",
            value: 0,
            reason: "percentile of an empty sample",
        });
    }
    if !(q.is_finite() && (0.0..=100.0).contains(&q)) {
        return Err(EngineError::InvalidParameter {
            name: "percentile",
            value: q,
            reason: "must lie in [0, 100]",
        });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(percentile_sorted(&sorted, q))
}

#[inline]
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// VaR / CVaR at one confidence level. Returns are fractions of spot;
/// both figures are usually negative. Amounts are in price units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TailRisk {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
    pub var_amount: f64,
    pub cvar_amount: f64,
}

/// `(VaR_c, CVaR_c)` of a return sample.
///
/// VaR_c is the (1-c)*100-th percentile; CVaR_c is the mean of returns at
/// or below it, falling back to VaR_c when that subset is empty.
pub fn var_cvar(returns: &[f64], confidence: f64) -> EngineResult<(f64, f64)> {
    if !(confidence.is_finite() && confidence > 0.0 && confidence < 1.0) {
        return Err(EngineError::InvalidParameter {
            name: "confidence",
            value: confidence,
            reason: "must lie strictly inside (0, 1)",
        });
    }
    let var = percentile(returns, (1.0 - confidence) * 100.0)?;

    let mut tail_sum = 0.0;
    let mut tail_count = 0usize;
    for &r in returns {
        if r <= var {
            tail_sum += r;
            tail_count += 1;
        }
    }
    let cvar = if tail_count == 0 { var } else { tail_sum / tail_count as f64 };
    Ok((var, cvar))
}

/// Tail-risk table derived from naive terminal prices.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskMetrics {
    pub levels: SmallVec<[TailRisk; 2]>,
}

impl RiskMetrics {
    pub fn from_terminal_prices(terminal_prices: &[f64], spot: f64, confidences: &[f64]) -> EngineResult<Self> {
        let returns: Vec<f64> = terminal_prices.iter().map(|&st| (st - spot) / spot).collect();
        let mut levels = SmallVec::new();
        for &c in confidences {
            let (var, cvar) = var_cvar(&returns, c)?;
            levels.push(TailRisk {
                confidence: c,
                var,
                cvar,
                var_amount: var * spot,
                cvar_amount: cvar * spot,
            });
        }
        Ok(Self { levels })
    }

    pub fn at(&self, confidence: f64) -> Option<&TailRisk> {
        self.levels.iter().find(|t| (t.confidence - confidence).abs() < 1e-12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> Vec<f64> {
        (0..=1000).map(|i| i as f64 / 1000.0 - 0.5).collect()
    }

    #[test]
    fn test_percentile_on_uniform_grid() {
        let values = grid();
        let p5 = percentile(&values, 5.0).unwrap();
        assert!((p5 + 0.45).abs() < 1e-9, "p5={p5}");
        assert!((percentile(&values, 0.0).unwrap() + 0.5).abs() < 1e-12);
        assert!((percentile(&values, 100.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        // rank = 0.25 * 3 = 0.75 -> 1 + 0.75 * (2 - 1)
        let p = percentile(&[4.0, 1.0, 3.0, 2.0], 25.0).unwrap();
        assert!((p - 1.75).abs() < 1e-12, "p={p}");
    }

    #[test]
    fn test_var_cvar_on_grid() {
        let (var, cvar) = var_cvar(&grid(), 0.95).unwrap();
        assert!((var + 0.45).abs() < 1e-9, "VaR95={var}");
        // mean of -0.500..=-0.450
        assert!((cvar + 0.475).abs() < 1e-9, "CVaR95={cvar}");
    }

    #[test]
    fn test_single_value_sample() {
        let (var, cvar) = var_cvar(&[-0.1], 0.99).unwrap();
        assert_eq!(var, -0.1);
        assert_eq!(cvar, -0.1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(var_cvar(&[], 0.95).is_err());
        assert!(var_cvar(&[0.1, 0.2], 1.0).is_err());
        assert!(var_cvar(&[0.1, 0.2], 0.0).is_err());
        assert!(percentile(&[0.1], 101.0).is_err());
    }

    #[test]
    fn test_risk_metrics_amounts() {
        let prices: Vec<f64> = (0..=1000).map(|i| 50.0 + i as f64 * 0.1).collect();
        let metrics = RiskMetrics::from_terminal_prices(&prices, 100.0, &CONFIDENCE_LEVELS).unwrap();
        let t95 = metrics.at(0.95).unwrap();
        assert!((t95.var_amount - t95.var * 100.0).abs() < 1e-12);
        assert!(metrics.at(0.5).is_none());
        assert_eq!(metrics.levels.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_cvar_not_above_var(returns in prop::collection::vec(-1.0f64..2.0, 1..400)) {
            for c in CONFIDENCE_LEVELS {
                let (var, cvar) = var_cvar(&returns, c).unwrap();
                prop_assert!(cvar <= var + 1e-12, "c={} var={} cvar={}", c, var, cvar);
            }
        }

        #[test]
        fn prop_var99_not_above_var95(returns in prop::collection::vec(-1.0f64..2.0, 1..400)) {
            let (v95, _) = var_cvar(&returns, 0.95).unwrap();
            let (v99, _) = var_cvar(&returns, 0.99).unwrap();
            prop_assert!(v99 <= v95 + 1e-12, "v99={} v95={}", v99, v95);
        }
    }
}

use crate::state::ParameterSet;
use statrs::distribution::{ContinuousCDF, Normal};

/// Closed-form crash probability under the lognormal model.
///
/// P(S_T < K) = Phi(-d2)
///
/// where d2 = (ln(S/K) + (r - sigma^2/2)*T) / (sigma * sqrt(T)).
///
/// No sampling error; used as the reference for both estimators.
pub struct AnalyticalReference {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl AnalyticalReference {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        "Analytical"
    }

    /// ParameterSet guarantees sigma * sqrt(T) > 0, so d2 is finite.
    #[inline]
    pub fn probability(&self, params: &ParameterSet) -> f64 {
        self.normal.cdf(-params.d2())
    }
}

impl Default for AnalyticalReference {
    fn default() -> Self {
        Self::new()
    }
}

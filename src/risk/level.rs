/// Coarse crash-risk class of the analytical probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Above this the run is flagged high risk.
const HIGH_THRESHOLD: f64 = 0.20;
/// Above this (and not high) the run is moderate.
const MODERATE_THRESHOLD: f64 = 0.10;

impl RiskLevel {
    /// Classify a crash probability. Pure function, no side effects.
    #[inline]
    pub fn classify(probability: f64) -> Self {
        if probability > HIGH_THRESHOLD {
            RiskLevel::High
        } else if probability > MODERATE_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

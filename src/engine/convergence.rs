/// z-value of the two-sided 95% band.
pub const BAND_Z: f64 = 1.96;

/// Running estimate after each draw, in draw order.
///
/// `running_mean[i]` is the mean of the first i+1 values; the band is
/// mean +/- 1.96 * std / sqrt(i+1) with the population std of that prefix.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ConvergenceTrace {
    pub running_mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ConvergenceTrace {
    /// Single Welford pass over the ordered per-draw values.
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let mut trace = Self {
            running_mean: Vec::with_capacity(n),
            lower: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
        };

        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, &x) in values.iter().enumerate() {
            let count = (i + 1) as f64;
            let delta = x - mean;
            mean += delta / count;
            m2 += delta * (x - mean);

            let std = (m2 / count).max(0.0).sqrt();
            let half_width = BAND_Z * std / count.sqrt();
            trace.running_mean.push(mean);
            trace.lower.push(mean - half_width);
            trace.upper.push(mean + half_width);
        }
        trace
    }

    /// Estimate after the last draw.
    #[inline]
    pub fn final_mean(&self) -> Option<f64> {
        self.running_mean.last().copied()
    }
}

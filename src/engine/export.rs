//! Tabular export of per-draw results. Pure functions -- they take run
//! output and return rows or CSV text.

use crate::errors::{EngineError, EngineResult};
use crate::state::EstimatorResult;
use chrono::{DateTime, Utc};

/// One row per simulation index (1-based).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExportRow {
    pub simulation: usize,
    pub naive_price: f64,
    pub is_price: f64,
    pub naive_return: f64,
    pub is_return: f64,
    pub naive_crash: f64,
    pub is_crash: f64,
}

/// Zip both estimators draw by draw. Lengths must agree.
pub fn export_rows(naive: &EstimatorResult, importance: &EstimatorResult, spot: f64) -> EngineResult<Vec<ExportRow>> {
    if naive.sample_count() != importance.sample_count() {
        return Err(EngineError::Export(format!(
            "estimator lengths differ: naive={} importance={}",
            naive.sample_count(),
            importance.sample_count()
        )));
    }

    let rows = naive
        .terminal_prices
        .iter()
        .zip(&importance.terminal_prices)
        .zip(naive.event_indicators.iter().zip(&importance.event_indicators))
        .enumerate()
        .map(|(i, ((&np, &ip), (&nc, &ic)))| ExportRow {
            simulation: i + 1,
            naive_price: np,
            is_price: ip,
            naive_return: (np - spot) / spot,
            is_return: (ip - spot) / spot,
            naive_crash: nc,
            is_crash: ic,
        })
        .collect();
    Ok(rows)
}

/// CSV text with a header row.
pub fn write_csv(naive: &EstimatorResult, importance: &EstimatorResult, spot: f64) -> EngineResult<String> {
    let rows = export_rows(naive, importance, spot)?;
    let mut writer = csv::Writer::from_writer(Vec::with_capacity(rows.len() * 96));
    for row in &rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::Export(e.to_string()))
}

/// `crash_risk_{label}_{YYYYmmdd_HHMMSS}.csv`. Label is reduced to
/// `[A-Za-z0-9_-]`; an empty label becomes `run`.
pub fn export_file_name(label: Option<&str>, now: DateTime<Utc>) -> String {
    let cleaned: String = label
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect();
    let label = if cleaned.is_empty() { "run".to_string() } else { cleaned };
    format!("crash_risk_{label}_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

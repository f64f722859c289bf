use crate::engine::export;
use crate::engine::run::{self, SimulationResult};
use crate::errors::{EngineError, EngineResult};
use crate::models::analytical::AnalyticalReference;
use crate::models::historical::HistoricalStats;
use crate::server::request::{HistoricalRequest, SimulationRequest};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/analytical -- closed form only, no sampling
pub async fn post_analytical(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulationRequest>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let (params, _) = reject_logged(&state, req.into_run(&state.config))?;
    let model = AnalyticalReference::new();
    Ok(Json(serde_json::json!({
        "model": model.name(),
        "probability": model.probability(&params),
        "d2": params.d2(),
        "parameters": params,
    })))
}

/// POST /api/simulate -- full run (cold path, blocking pool)
pub async fn post_simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulationRequest>,
) -> Result<Json<SimulationResult>, EngineError> {
    let result = simulate(&state, &req).await?;
    Ok(Json(result))
}

/// POST /api/export -- same run, returned as a CSV attachment
pub async fn post_export(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulationRequest>,
) -> Result<Response, EngineError> {
    let result = simulate(&state, &req).await?;
    let spot = result.parameters.spot();
    let body = tokio::task::spawn_blocking(move || {
        export::write_csv(&result.naive, &result.importance, spot)
    })
    .await??;

    state.counters.exports_written.fetch_add(1, Relaxed);
    let file_name = export::export_file_name(req.label.as_deref(), chrono::Utc::now());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response())
}

/// POST /api/historical -- spot / volatility / shape stats from closes
pub async fn post_historical(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HistoricalRequest>,
) -> Result<Json<HistoricalStats>, EngineError> {
    let stats = reject_logged(&state, HistoricalStats::from_closes(&req.closes))?;
    Ok(Json(stats))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "runs_completed": state.counters.runs_completed.load(Relaxed),
        "runs_rejected": state.counters.runs_rejected.load(Relaxed),
        "samples_drawn": state.counters.samples_drawn.load(Relaxed),
        "paths_simulated": state.counters.paths_simulated.load(Relaxed),
        "exports_written": state.counters.exports_written.load(Relaxed),
    }))
}

async fn simulate(state: &Arc<AppState>, req: &SimulationRequest) -> EngineResult<SimulationResult> {
    let (params, options) = reject_logged(state, req.into_run(&state.config))?;

    let outcome = tokio::task::spawn_blocking(move || run::run(&params, &options)).await;
    let result = match outcome {
        Ok(inner) => reject_logged(state, inner)?,
        Err(e) => {
            tracing::error!(error = %e, "simulation worker failed");
            return Err(e.into());
        }
    };

    let c = &state.counters;
    c.runs_completed.fetch_add(1, Relaxed);
    c.samples_drawn.fetch_add(2 * result.parameters.sample_count() as u64, Relaxed);
    c.paths_simulated.fetch_add(2 * result.parameters.path_count() as u64, Relaxed);
    Ok(result)
}

/// Count and log failed runs before handing the error back.
fn reject_logged<T>(state: &AppState, res: EngineResult<T>) -> EngineResult<T> {
    res.map_err(|e| {
        state.counters.runs_rejected.fetch_add(1, Relaxed);
        if e.is_client_error() {
            tracing::warn!(error = %e, "request rejected");
        } else {
            tracing::error!(error = %e, "run failed");
        }
        e
    })
}

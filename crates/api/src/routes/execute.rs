//! Execute Route
//!
//! Appends the current straddle reading to the executed-data sheet.

use axum::{extract::State, Json};
use premium_window::Reading;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Response for execute endpoint
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub reading: Reading,
    pub path: String,
    /// Executed rows now in the sheet
    pub rows: usize,
}

/// Record the latest reading as executed
pub async fn execute(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let state = state.read().await;
    let reading = state.session.latest()?;

    let rows = state.exporter.append(&state.executed_path, &reading)?;
    info!(
        "Executed straddle at strike {} for {:.2}",
        reading.strike_price, reading.total_premium
    );

    Ok(Json(ExecuteResponse {
        reading,
        path: state.executed_path.display().to_string(),
        rows,
    }))
}

//! Chart Route

use axum::{extract::State, Json};
use std::sync::Arc;
use storage::ChartSnapshot;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::AppState;

/// Get the live chart data
pub async fn get_chart(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Result<Json<ChartSnapshot>, ApiError> {
    let state = state.read().await;
    let snapshot = state.session.chart(state.chart.max_points, state.window_size)?;
    Ok(Json(snapshot))
}

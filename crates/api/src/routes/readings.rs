//! Reading Routes

use axum::{
    extract::{Query, State},
    Json,
};
use premium_window::Reading;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::AppState;

/// Query parameters for readings endpoint
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    /// Maximum number of rows (defaults to the table size)
    pub limit: Option<usize>,
}

/// Response for readings endpoint
#[derive(Debug, Serialize)]
pub struct ReadingsResponse {
    /// Readings, newest first
    pub data: Vec<Reading>,
    pub count: usize,
    /// Readings retained this session
    pub total: usize,
}

/// Get the latest readings
pub async fn get_readings(
    State(state): State<Arc<RwLock<AppState>>>,
    Query(params): Query<ReadingsQuery>,
) -> Result<Json<ReadingsResponse>, ApiError> {
    let state = state.read().await;
    let limit = params.limit.unwrap_or(state.chart.table_rows);
    let readings = state.session.recent(limit)?;

    Ok(Json(ReadingsResponse {
        count: readings.len(),
        total: state.session.reading_count(),
        data: readings,
    }))
}

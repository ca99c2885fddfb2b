//! Alert Routes

use axum::{
    extract::{Query, State},
    Json,
};
use alerting::AlertPoint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::AlertBanner;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::AppState;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Alert points, newest first
    pub data: Vec<AlertPoint>,
    pub count: usize,
    /// Alerts raised this session
    pub total: usize,
    /// Latest alert while it is still fresh
    pub banner: Option<AlertBanner>,
}

/// Get alerts
pub async fn get_alerts(
    State(state): State<Arc<RwLock<AppState>>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let state = state.read().await;

    let alerts = state.session.alerts(params.limit)?;
    let ttl = chrono::Duration::seconds(state.chart.banner_seconds as i64);
    let banner = state.session.active_banner(chrono::Utc::now(), ttl)?;

    Ok(Json(AlertResponse {
        count: alerts.len(),
        total: state.session.alert_count(),
        data: alerts,
        banner,
    }))
}

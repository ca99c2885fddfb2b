//! Straddle Monitor API Server
//!
//! REST dashboard over the session log: live table, chart, alerts, the
//! execute action and Prometheus metrics.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{SessionLog, XlsxExporter};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{subscriber::SetGlobalDefaultError, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::{
    BrokerSettings, ChartSettings, ExportSettings, LoggingSettings, MonitorSettings,
    ServerSettings, Settings, SettingsError,
};

/// Application state shared across handlers
pub struct AppState {
    /// Session history written by the poller
    pub session: Arc<SessionLog>,
    /// Chart and table sizing
    pub chart: ChartSettings,
    /// Log count the chart average covers
    pub window_size: usize,
    /// Executed-data sheet
    pub executed_path: PathBuf,
    /// Writes sheet times on the exchange clock
    pub exporter: XlsxExporter,
    /// Prometheus exporter (None when no recorder is installed)
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(session: Arc<SessionLog>, settings: &Settings) -> Self {
        Self {
            session,
            chart: settings.chart.clone(),
            window_size: settings.monitor.window_size,
            executed_path: settings.export.executed_path.clone(),
            exporter: XlsxExporter::new(settings.instrument.utc_offset_minutes),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Attach the Prometheus handle served at `/metrics`
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub reading_count: usize,
    pub alert_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/readings", get(routes::readings::get_readings))
        .route("/api/v1/chart", get(routes::chart::get_chart))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/execute", post(routes::execute::execute))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        reading_count: state.session.reading_count(),
        alert_count: state.session.alert_count(),
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SetGlobalDefaultError> {
    // Settings::validate has already rejected unknown levels
    let level = settings.max_level().unwrap_or(Level::INFO);

    if settings.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Install the global Prometheus metrics recorder
pub fn install_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::AlertPoint;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{Duration, TimeZone, Utc};
    use premium_window::Reading;
    use serde_json::Value;
    use tower::ServiceExt;

    fn reading(second: i64, premium: f64) -> Reading {
        let ts = Utc.with_ymd_and_hms(2025, 5, 15, 9, 15, 0).unwrap() + Duration::seconds(second);
        Reading::new(ts, 24_500.0, premium / 2.0, premium / 2.0)
    }

    fn app_with(session: Arc<SessionLog>, settings: &Settings) -> Router {
        create_router(Arc::new(RwLock::new(AppState::new(session, settings))))
    }

    fn populated() -> Arc<SessionLog> {
        let session = Arc::new(SessionLog::new());
        for i in 0..30 {
            session.record(reading(i, 100.0 + i as f64)).unwrap();
        }
        session
            .record_alert(
                AlertPoint {
                    timestamp: reading(29, 129.0).timestamp,
                    total_premium: 129.0,
                },
                "spike".to_string(),
            )
            .unwrap();
        session
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(populated(), &Settings::default());
        let (status, body) = get_json(app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["reading_count"], 30);
        assert_eq!(body["alert_count"], 1);
    }

    #[tokio::test]
    async fn test_readings_default_and_limit() {
        let session = populated();
        let (_, body) = get_json(app_with(session.clone(), &Settings::default()), "/api/v1/readings").await;
        assert_eq!(body["count"], 20);
        assert_eq!(body["total"], 30);
        assert_eq!(body["data"][0]["total_premium"], 129.0);

        let (_, body) = get_json(app_with(session, &Settings::default()), "/api/v1/readings?limit=3").await;
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_chart() {
        let mut settings = Settings::default();
        settings.chart.max_points = 10;
        settings.monitor.window_size = 4;

        let (status, body) = get_json(app_with(populated(), &settings), "/api/v1/chart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"].as_array().unwrap().len(), 10);
        assert_eq!(body["window"], 4);
        // Mean of 126..=129
        assert_eq!(body["average"], 127.5);
        assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chart_without_data_is_not_found() {
        let app = app_with(Arc::new(SessionLog::new()), &Settings::default());
        let (status, body) = get_json(app, "/api/v1/chart").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("No readings"));
    }

    #[tokio::test]
    async fn test_alerts_banner_expired() {
        let (status, body) = get_json(app_with(populated(), &Settings::default()), "/api/v1/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["total_premium"], 129.0);
        // Recorded in 2025, long past the banner lifetime
        assert!(body["banner"].is_null());
    }

    #[tokio::test]
    async fn test_execute_appends_latest() {
        let path = std::env::temp_dir().join(format!("straddle-executed-{}.xlsx", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut settings = Settings::default();
        settings.export.executed_path = path.clone();

        let response = app_with(populated(), &settings)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/execute")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["rows"], 1);

        let rows = storage::read_sheet(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_premium, 129.0);
        // 09:15:29 UTC shown at UTC+05:30
        assert_eq!(rows[0].time, "2025-05-15 14:45:29");

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_execute_without_data() {
        let response = app_with(Arc::new(SessionLog::new()), &Settings::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/execute")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let response = app_with(Arc::new(SessionLog::new()), &Settings::default())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

//! API Server
//!
//! JSON endpoints for the charting frontend: quotes, OHLC bars and gamma
//! exposure maps, plus a status endpoint backed by the metrics collector.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::Level;

use crate::analysis::gamma_exposure::{GammaExposureOptions, GammaExposureStats};
use crate::core::{Ohlc, OhlcInterval, Quote};
use crate::engine::AppEngine;
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::metrics::{MetricsCollector, MetricsSnapshot};
use crate::{log_api, GexError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AppEngine>,
    pub metrics: Arc<MetricsCollector>,
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

/// Status response DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub version: &'static str,
    pub metrics: MetricsSnapshot,
}

/// Query string for `/api/ohlc/{symbol}`
#[derive(Debug, Default, Deserialize)]
pub struct OhlcQuery {
    #[serde(default)]
    pub interval: OhlcInterval,
}

impl GexError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GexError::NotFound(_) => StatusCode::NOT_FOUND,
            GexError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GexError::Tradier(_) | GexError::Http(..) | GexError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            GexError::Config(_) | GexError::Analysis(_) | GexError::Cache(_) | GexError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GexError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log_api!(Level::ERROR, "Request failed: {}", self);
        } else {
            log_api!(Level::DEBUG, "Request rejected: {}", self);
        }
        (status, Json(ErrorDto { error: self.to_string() })).into_response()
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/quote/:symbol", get(get_quote))
        .route("/api/ohlc/:symbol", get(get_ohlc))
        .route("/api/gamma-exposure/:symbol", get(get_gamma_exposure))
        .route("/api/status", get(get_status))
        // Middleware
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(state: AppState, config: &ApiConfig) -> Result<(), GexError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log_api!(Level::INFO, "API Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handler for /api/quote/{symbol}
async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, GexError> {
    state.metrics.record_api_request();
    log_api!(Level::INFO, "quote {}", symbol);

    let quote = state.engine.quote(&symbol).await?;
    Ok(Json(quote))
}

/// Handler for /api/ohlc/{symbol}?interval=5min
async fn get_ohlc(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<OhlcQuery>,
) -> Result<Json<Vec<Ohlc>>, GexError> {
    state.metrics.record_api_request();
    log_api!(Level::INFO, "ohlc {} {}", symbol, query.interval);

    let bars = state.engine.ohlc(&symbol, query.interval).await?;
    Ok(Json(bars))
}

/// Handler for /api/gamma-exposure/{symbol}?aggregate=true&spotProfile=false&forceDownload=false
///
/// `spotProfile` only applies with `aggregate`.
async fn get_gamma_exposure(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(options): Query<GammaExposureOptions>,
) -> Result<Json<GammaExposureStats>, GexError> {
    state.metrics.record_api_request();
    log_api!(Level::INFO, "gamma exposure {} {:?}", symbol, options);

    let stats = state.engine.gamma_exposure(&symbol, options).await?;
    Ok(Json(stats))
}

/// Handler for /api/status
async fn get_status(State(state): State<AppState>) -> Json<StatusDto> {
    state.metrics.record_api_request();

    Json(StatusDto {
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.metrics.snapshot(),
    })
}

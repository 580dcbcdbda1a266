use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::api_error::{ApiError, ErrorResponse};
use crate::audit::{AuditFile, AuditLog};
use crate::auth::{require_token, ClientAddr, TokenGuard};
use crate::db::{DailyRollup, NewReading, Reading};
use crate::services::{ReadingService, ReportAggregator};

#[derive(Clone)]
pub struct AppState {
    pub reading_service: ReadingService,
    pub report_aggregator: ReportAggregator,
    pub audit_log: AuditLog,
    pub started_at: Instant,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub total_records: i64,
    pub uptime_seconds: f64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Body posted by the sensor controller. Fields are optional only so a
/// missing one can be reported as a validation error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SensorPayload {
    pub ph_in: Option<f64>,
    pub ph_out: Option<f64>,
    pub temp_in: Option<f64>,
    pub temp_out: Option<f64>,
}

impl SensorPayload {
    /// Presence check only; value ranges are not validated
    pub fn into_new_reading(self) -> Option<NewReading> {
        Some(NewReading {
            ph_in: self.ph_in?,
            ph_out: self.ph_out?,
            temp_in: self.temp_in?,
            temp_out: self.temp_out?,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct AckResponse {
    pub status: String,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(get_status, record_reading, get_latest, get_last_30_days),
    components(schemas(
        StatusResponse,
        SensorPayload,
        AckResponse,
        Reading,
        DailyRollup,
        ErrorResponse
    )),
    tags((name = "sensor", description = "IPAL sensor ingestion and monitoring reads"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState, guard: TokenGuard) -> Router {
    let api_routes = Router::new()
        .route("/status", get(get_status))
        .route("/sensor", post(record_reading))
        .route("/data/latest", get(get_latest))
        .route("/data/last30days", get(get_last_30_days))
        .layer(middleware::from_fn_with_state(guard, require_token))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .route("/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
}

async fn openapi_json() -> impl IntoResponse {
    Json(generate_openapi_spec())
}

async fn log_store_error(audit_log: &AuditLog, path: &str, detail: &str) {
    let line = format!("[ERROR] {} - {} @{}", path, detail, Utc::now().to_rfc3339());
    audit_log.append(AuditFile::Error, &line).await;
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "sensor",
    params(("token" = Option<String>, Query, description = "Shared access token")),
    responses(
        (status = 200, description = "Service is online", body = StatusResponse),
        (status = 403, description = "Invalid or missing token", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    debug!("Status check requested");
    let total_records = match state.reading_service.total_records().await {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to count readings: {}", e);
            log_store_error(&state.audit_log, "/api/status", &e.to_string()).await;
            return Err(ApiError::Persistence("Failed to read service status."));
        }
    };

    info!("Status check successful, {} records", total_records);
    Ok(Json(StatusResponse {
        status: "online".to_string(),
        total_records,
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
        message: "API active and ready to receive data.".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/sensor",
    tag = "sensor",
    params(("token" = Option<String>, Query, description = "Shared access token")),
    request_body = SensorPayload,
    responses(
        (status = 200, description = "Reading stored", body = AckResponse),
        (status = 400, description = "A required field is missing", body = ErrorResponse),
        (status = 403, description = "Invalid or missing token", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
async fn record_reading(
    State(state): State<AppState>,
    Extension(client): Extension<ClientAddr>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<Json<AckResponse>, ApiError> {
    let reading = match payload {
        Ok(Json(body)) => body.into_new_reading(),
        Err(rejection) => {
            warn!("Rejected sensor payload: {}", rejection);
            None
        }
    }
    .ok_or_else(|| {
        warn!("Sensor payload from {} is missing required fields", client.0);
        ApiError::Validation
    })?;

    let stored = match state.reading_service.record_reading(reading).await {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to save reading from {}: {}", client.0, e);
            log_store_error(&state.audit_log, "/api/sensor", &e.to_string()).await;
            return Err(ApiError::Persistence("Failed to save data."));
        }
    };

    let line = format!(
        "[DATA_OK] IP={} pH_IN={} pH_OUT={} Temp_IN={} Temp_OUT={} Time={}",
        client.0,
        stored.ph_in,
        stored.ph_out,
        stored.temp_in,
        stored.temp_out,
        stored.timestamp.to_rfc3339()
    );
    info!("{}", line);
    state.audit_log.append(AuditFile::Access, &line).await;

    Ok(Json(AckResponse {
        status: "ok".to_string(),
        message: "Sensor data saved successfully.".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/data/latest",
    tag = "sensor",
    params(("token" = Option<String>, Query, description = "Shared access token")),
    responses(
        (status = 200, description = "Most recent reading", body = Reading),
        (status = 403, description = "Invalid or missing token", body = ErrorResponse),
        (status = 404, description = "Store is empty", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_latest(State(state): State<AppState>) -> Result<Json<Reading>, ApiError> {
    debug!("Fetching latest reading");
    let latest = match state.reading_service.get_latest_reading().await {
        Ok(latest) => latest,
        Err(e) => {
            error!("Failed to fetch latest reading: {}", e);
            log_store_error(&state.audit_log, "/api/data/latest", &e.to_string()).await;
            return Err(ApiError::Persistence("Failed to read sensor data."));
        }
    };

    let reading = latest.ok_or_else(|| {
        warn!("No readings found");
        ApiError::NotFound("No sensor data found.")
    })?;

    info!("Retrieved latest reading from {}", reading.timestamp);
    Ok(Json(reading))
}

#[utoipa::path(
    get,
    path = "/api/data/last30days",
    tag = "sensor",
    params(("token" = Option<String>, Query, description = "Shared access token")),
    responses(
        (status = 200, description = "Daily rollups, oldest day first", body = Vec<DailyRollup>),
        (status = 403, description = "Invalid or missing token", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_last_30_days(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyRollup>>, ApiError> {
    debug!("Fetching trailing 30 day rollups");
    let rollups = match state.report_aggregator.last_30_days(Utc::now()).await {
        Ok(rollups) => rollups,
        Err(e) => {
            error!("Failed to build 30 day rollups: {}", e);
            log_store_error(&state.audit_log, "/api/data/last30days", &e.to_string()).await;
            return Err(ApiError::Persistence("Failed to read sensor data."));
        }
    };

    info!("Retrieved {} daily rollups", rollups.len());
    Ok(Json(rollups))
}

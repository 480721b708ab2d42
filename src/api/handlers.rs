//! API Request Handlers

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Form, Json, State,
    },
    http::StatusCode,
    response::Html,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::middleware::{RateLimitConfig, RateLimiter};
use super::types::*;
use super::views;
use crate::core::loader::{ModelArtifacts, ModelLoader};
use crate::core::scorer;
use crate::models::client::ClientRecord;
use crate::models::config::AppConfig;
use crate::models::errors::{AppResult, ErrorCode};
use crate::models::types::{ResultCard, RiskAssessment};
use crate::utils::constants::{
    APP_VERSION, CRITICAL_THRESHOLD, FEATURE_NAMES, HIGH_THRESHOLD, MODERATE_THRESHOLD,
};
use crate::utils::telemetry::TelemetryCollector;

/// Whether the service can score
#[derive(Debug)]
pub enum ModelStatus {
    Ready(ModelArtifacts),
    /// Artifacts absent or unusable, with the reason shown to the user
    Unavailable(String),
}

/// Shared application state
pub struct AppState {
    pub model: ModelStatus,
    pub telemetry: Arc<TelemetryCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
    pub model_dir: PathBuf,
}

impl AppState {
    pub fn new(
        artifacts: AppResult<ModelArtifacts>,
        model_dir: impl Into<PathBuf>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        let model = match artifacts {
            Ok(artifacts) => ModelStatus::Ready(artifacts),
            Err(e) => {
                error!(code = e.code_str(), "{}", e.message);
                ModelStatus::Unavailable(e.message)
            }
        };

        Self {
            model,
            telemetry: Arc::new(TelemetryCollector::new()),
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
            start_time: Instant::now(),
            model_dir: model_dir.into(),
        }
    }

    /// Resolve artifacts from the configured model directory
    pub fn from_config(config: &AppConfig) -> Self {
        let loader = ModelLoader::new(config.model_dir.clone());
        let artifacts = ModelArtifacts::from_loader(&loader);
        if let Ok(ref artifacts) = artifacts {
            info!(
                classifier = %artifacts.classifier().describe(),
                dir = %config.model_dir.display(),
                "Model artifacts ready"
            );
        }

        let rate_limit = RateLimitConfig {
            requests_per_window: config.rate_limit_per_window,
            window_duration: config.rate_limit_window,
        };
        Self::new(artifacts, config.model_dir.clone(), rate_limit)
    }

    pub fn artifacts(&self) -> Option<&ModelArtifacts> {
        match &self.model {
            ModelStatus::Ready(artifacts) => Some(artifacts),
            ModelStatus::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.model {
            ModelStatus::Ready(_) => None,
            ModelStatus::Unavailable(reason) => Some(reason),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Score and record telemetry
    fn score(&self, artifacts: &ModelArtifacts, record: &ClientRecord) -> RiskAssessment {
        let start = Instant::now();
        let assessment = scorer::score(record, artifacts);
        self.telemetry
            .record_score(assessment.tier, start.elapsed().as_micros() as u64);
        assessment
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn api_error(
    status: StatusCode,
    error: ApiError,
    start: Instant,
) -> (StatusCode, Json<ApiResponse<()>>) {
    (status, Json(ApiResponse::error(error, elapsed_ms(start))))
}

pub(crate) fn status_of(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================
// HTML Form
// ============================================

pub async fn index(State(state): State<Arc<AppState>>) -> (StatusCode, Html<String>) {
    match state.unavailable_reason() {
        Some(reason) => (
            status_of(ErrorCode::ArtifactMissing),
            Html(views::artifacts_missing_page(reason)),
        ),
        None => (
            StatusCode::OK,
            Html(views::form_page(&ClientForm::default(), None, None)),
        ),
    }
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ClientForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let artifacts = match (state.artifacts(), state.unavailable_reason()) {
        (Some(artifacts), _) => artifacts,
        (None, reason) => {
            state.telemetry.record_refused();
            return (
                status_of(ErrorCode::ArtifactMissing),
                Html(views::artifacts_missing_page(reason.unwrap_or_default())),
            );
        }
    };

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected form submission");
            return (
                status_of(ErrorCode::ApiBadRequest),
                Html(views::form_page(
                    &ClientForm::default(),
                    None,
                    Some(&rejection.body_text()),
                )),
            );
        }
    };

    let record = ClientRecord::from(&form);
    let assessment = state.score(artifacts, &record);
    let card = ResultCard::from(&assessment);
    (StatusCode::OK, Html(views::form_page(&form, Some(&card), None)))
}

// ============================================
// JSON Scoring
// ============================================

pub async fn score_client(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ClientForm>, JsonRejection>,
) -> Result<Json<ApiResponse<ScoreData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    let artifacts = state.artifacts().ok_or_else(|| {
        state.telemetry.record_refused();
        api_error(
            status_of(ErrorCode::ArtifactMissing),
            ApiError::service_unavailable(state.unavailable_reason().unwrap_or_default()),
            start,
        )
    })?;

    let Json(form) = body.map_err(|rejection| {
        api_error(
            status_of(ErrorCode::ApiBadRequest),
            ApiError::bad_request(rejection.body_text()),
            start,
        )
    })?;

    let record = ClientRecord::from(&form);

    let assessment = state.score(artifacts, &record);

    Ok(Json(ApiResponse::success(
        ScoreData::from(&assessment),
        elapsed_ms(start),
    )))
}

// ============================================
// Model Info
// ============================================

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ModelInfoData>> {
    let start = Instant::now();

    let thresholds = BTreeMap::from([
        ("critical", CRITICAL_THRESHOLD),
        ("high", HIGH_THRESHOLD),
        ("moderate", MODERATE_THRESHOLD),
    ]);

    let data = ModelInfoData {
        ready: state.artifacts().is_some(),
        classifier: state.artifacts().map(|a| a.classifier().describe()),
        sources: state
            .artifacts()
            .map(|a| a.sources().to_vec())
            .unwrap_or_default(),
        model_dir: state.model_dir.display().to_string(),
        feature_names: FEATURE_NAMES.to_vec(),
        thresholds,
        reason: state.unavailable_reason().map(str::to_string),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats & Health
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        telemetry: state.telemetry.get_stats(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let model_ready = state.artifacts().is_some();
    let data = HealthData {
        status: if model_ready { "healthy" } else { "degraded" }.to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        model_ready,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

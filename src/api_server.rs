// Axum API Server Module
//
// Purpose: REST API over the soil scoring engine, district soil repository
// and session language store. CPU-bound batch work runs on Rayon.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use anyhow::Context;
use moka::future::Cache;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{self, BatchSample, DataSource};
use crate::config::ServerConfig;
use crate::crop::Crop;
use crate::error::SoilError;
use crate::language::{InMemoryLanguageStore, Language, LanguageStore};
use crate::measurement::UNITS;
use crate::repository::{InMemorySoilRepository, SoilRepository};
use crate::scoring::SoilScoringEngine;
use crate::validation::{self, FieldError, SoilDataInput};

/// Largest accepted batch request
const MAX_BATCH_SAMPLES: usize = 500;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SoilScoringEngine>,
    pub soil_repo: Arc<dyn SoilRepository>,
    pub languages: Arc<dyn LanguageStore>,
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading scoring configuration...");
        let scoring = config.scoring().context("Failed to load scoring configuration")?;

        tracing::info!("Loading district soil data from {:?}...", config.soil_csv);
        let soil_repo = InMemorySoilRepository::from_csv_or_seeded(&config.soil_csv);
        tracing::info!(
            "Loaded {} districts (source: {:?})",
            soil_repo.len(),
            soil_repo.source()
        );

        Ok(Self::with_parts(
            SoilScoringEngine::new(scoring),
            Arc::new(soil_repo),
            Arc::new(InMemoryLanguageStore::with_capacity(config.language_capacity)),
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    /// Assemble state from already-built parts
    pub fn with_parts(
        engine: SoilScoringEngine,
        soil_repo: Arc<dyn SoilRepository>,
        languages: Arc<dyn LanguageStore>,
        cache_ttl: Duration,
    ) -> Self {
        tracing::info!("Initializing Moka cache (TTL {:?})...", cache_ttl);
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            engine: Arc::new(engine),
            soil_repo,
            languages,
            cache,
        }
    }
}

// ============================================================================
// Router Configuration
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // District soil data
        .route("/api/soil-data", get(list_soil_data))
        .route("/api/soil-data/districts", get(list_districts))
        .route("/api/soil-data/analysis", get(get_soil_analysis))
        .route("/api/soil-data/analyze", post(analyze_location))
        .route("/api/soil-data/analyze/batch", post(analyze_batch))
        .route("/api/soil-data/health", post(score_health))
        // Fertilizer and crops
        .route("/api/fertilizer/recommend", post(recommend_fertilizer))
        .route("/api/crops/suitability", post(crop_suitability))
        // Language preferences
        .route("/api/language/options", get(language_options))
        .route("/api/language/preference", post(set_language_preference))
        .route("/api/language/preference/:session_id", get(get_language_preference))
        .route("/api/language/stats", get(language_stats))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SoilDataQuery {
    pub district: Option<String>,
    pub state: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DistrictsQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    pub district: Option<String>,
    pub crop: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub location: Option<String>,
    pub soil_data: Option<SoilDataInput>,
    pub crop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchSampleRequest {
    #[serde(default)]
    pub soil_data: SoilDataInput,
    pub crop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub samples: Vec<BatchSampleRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SoilDataRequest {
    #[serde(default)]
    pub soil_data: SoilDataInput,
    pub crop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuitabilityRequest {
    #[serde(default)]
    pub soil_data: SoilDataInput,
    pub crop: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LanguagePreferenceRequest {
    pub language: String,
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "message": "KisaanConnect soil service is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "districts_loaded": state.soil_repo.len(),
    }))
}

async fn list_soil_data(
    State(state): State<AppState>,
    Query(params): Query<SoilDataQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut errors = Vec::new();
    validation::validate_name("district", params.district.as_deref(), false, &mut errors);
    let limit = validation::validate_limit(params.limit, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let offset = params.offset.unwrap_or(0);

    let page = state
        .soil_repo
        .list(params.district.as_deref(), params.state.as_deref(), limit, offset);

    if page.records.is_empty() {
        return Err(AppError::NotFound {
            error: "District not found",
            message: format!(
                "No soil data available for district: {}",
                params.district.as_deref().unwrap_or("any district")
            ),
        });
    }

    let units: serde_json::Map<String, serde_json::Value> = UNITS
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect();

    envelope(serde_json::json!({
        "soil_data": page.records,
        "total_records": page.total,
        "limit": limit,
        "offset": offset,
        "has_more": offset + limit < page.total,
        "source": state.soil_repo.source(),
        "units": units,
    }))
}

async fn list_districts(
    State(state): State<AppState>,
    Query(params): Query<DistrictsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let districts = state.soil_repo.districts(params.state.as_deref());

    envelope(serde_json::json!({
        "total_districts": districts.len(),
        "districts": districts,
        "source": state.soil_repo.source(),
    }))
}

async fn get_soil_analysis(
    State(state): State<AppState>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(district), Some(crop)) = (params.district.as_deref(), params.crop.as_deref()) else {
        return Err(AppError::BadRequest {
            error: "Missing parameters",
            message: "district and crop are required".to_string(),
        });
    };

    let mut errors = Vec::new();
    validation::validate_name("district", Some(district), true, &mut errors);
    validation::validate_name("crop", Some(crop), true, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let state_name = params.state.as_deref().unwrap_or("punjab");
    let crop = Crop::from(crop);

    let cache_key = format!(
        "analysis:{}:{}:{}",
        district.trim().to_lowercase(),
        crop,
        state_name.to_lowercase()
    );
    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("Cache hit: {}", cache_key);
        return Ok(Json(wrap(cached)));
    }

    let record = state
        .soil_repo
        .find_district(district, Some(state_name))
        .ok_or_else(|| AppError::NotFound {
            error: "District not found",
            message: format!("No soil data available for district: {}", district),
        })?;

    let analysis = analysis::analyze_record(&state.engine, &record, &crop)?;
    let data = to_json(&analysis)?;
    state.cache.insert(cache_key, data.clone()).await;

    Ok(Json(wrap(data)))
}

async fn analyze_location(
    State(state): State<AppState>,
    AppJson(req): AppJson<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let location = req.location.as_deref().map(str::trim).filter(|l| !l.is_empty());

    if location.is_none() && req.soil_data.is_none() {
        return Err(AppError::BadRequest {
            error: "Missing parameters",
            message: "Either location or soil_data is required".to_string(),
        });
    }

    let crop = req.crop.as_deref().map(Crop::from);

    // Regional record first
    if let Some(record) = location.and_then(|l| state.soil_repo.match_location(l)) {
        let crops = record.suitable_crops.iter().map(|c| c.name.clone()).collect();
        let result = analysis::analyze_measurement(
            &state.engine,
            &record.district,
            &record.average,
            crops,
            crop.as_ref(),
            DataSource::RegionalDatabase,
        )?;
        return envelope(result);
    }

    // Then the caller's own soil test
    if let Some(input) = &req.soil_data {
        let m = input.validate("soil_data").map_err(AppError::Validation)?;
        let result = analysis::analyze_measurement(
            &state.engine,
            location.unwrap_or("Custom Location"),
            &m,
            Vec::new(),
            crop.as_ref(),
            DataSource::UserInput,
        )?;
        return envelope(result);
    }

    tracing::info!("No soil data for {:?}, using default analysis", location);
    let result = analysis::analyze_measurement(
        &state.engine,
        location.unwrap_or("Unknown"),
        &analysis::default_measurement(),
        vec!["wheat".to_string(), "rice".to_string(), "maize".to_string()],
        crop.as_ref(),
        DataSource::Default,
    )?;
    envelope(result)
}

/// Analyze many soil samples at once
///
/// Invalid samples are reported per entry; the rest run on Rayon inside
/// `spawn_blocking`.
async fn analyze_batch(
    State(state): State<AppState>,
    AppJson(req): AppJson<BatchAnalyzeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.samples.len() > MAX_BATCH_SAMPLES {
        return Err(AppError::BadRequest {
            error: "Batch too large",
            message: format!("At most {} samples per request", MAX_BATCH_SAMPLES),
        });
    }

    let start = std::time::Instant::now();
    tracing::info!("Batch soil analysis for {} samples", req.samples.len());

    let mut valid: Vec<(usize, BatchSample)> = Vec::new();
    let mut invalid: Vec<(usize, Vec<FieldError>)> = Vec::new();

    for (index, sample) in req.samples.iter().enumerate() {
        match sample.soil_data.validate(&format!("samples.{index}.soil_data")) {
            Ok(measurement) => valid.push((
                index,
                BatchSample {
                    label: format!("Sample {}", index + 1),
                    measurement,
                    crop: sample.crop.as_deref().map(Crop::from),
                },
            )),
            Err(errors) => invalid.push((index, errors)),
        }
    }

    let engine = state.engine.clone();
    let (indices, samples): (Vec<usize>, Vec<BatchSample>) = valid.into_iter().unzip();

    let analyzed = tokio::task::spawn_blocking(move || analysis::analyze_batch(&engine, &samples))
        .await
        .map_err(|e| AppError::Internal(format!("Rayon task failed: {}", e)))?;

    let mut results: Vec<(usize, serde_json::Value)> = Vec::with_capacity(req.samples.len());
    for (index, outcome) in indices.into_iter().zip(analyzed) {
        let entry = match outcome {
            Ok(a) => serde_json::json!({ "index": index, "success": true, "analysis": a }),
            Err(e) => serde_json::json!({ "index": index, "success": false, "error": e.to_string() }),
        };
        results.push((index, entry));
    }
    for (index, errors) in invalid {
        results.push((
            index,
            serde_json::json!({ "index": index, "success": false, "details": errors }),
        ));
    }
    results.sort_by_key(|(index, _)| *index);

    let succeeded = results
        .iter()
        .filter(|(_, r)| r["success"].as_bool().unwrap_or(false))
        .count();

    tracing::info!("Batch complete in {:?} ({} ok)", start.elapsed(), succeeded);

    envelope(serde_json::json!({
        "total": results.len(),
        "succeeded": succeeded,
        "results": results.into_iter().map(|(_, r)| r).collect::<Vec<_>>(),
    }))
}

async fn score_health(
    State(state): State<AppState>,
    AppJson(req): AppJson<SoilDataRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let m = req.soil_data.validate("soil_data").map_err(AppError::Validation)?;
    envelope(state.engine.score_health(&m)?)
}

async fn recommend_fertilizer(
    State(state): State<AppState>,
    AppJson(req): AppJson<SoilDataRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let m = req.soil_data.validate("soil_data").map_err(AppError::Validation)?;
    let crop = req.crop.as_deref().map(Crop::from);

    let recommendations = state.engine.recommend_fertilizer(&m, crop.as_ref())?;

    let mut data = serde_json::json!({
        "crop": crop,
        "recommendations": recommendations,
    });
    if recommendations.is_empty() {
        data["message"] = "No fertilizer needed".into();
    }
    envelope(data)
}

async fn crop_suitability(
    State(state): State<AppState>,
    AppJson(req): AppJson<SuitabilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let measured = req.soil_data.validate("soil_data");

    let mut errors = match &measured {
        Ok(_) => Vec::new(),
        Err(errors) => errors.clone(),
    };
    validation::validate_name("crop", req.crop.as_deref(), true, &mut errors);

    let (Ok(m), Some(crop)) = (measured, req.crop.as_deref()) else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let crop = Crop::from(crop);
    let reference = req
        .district
        .as_deref()
        .and_then(|d| state.soil_repo.find_district(d, None))
        .map(|r| r.suitable_crops)
        .unwrap_or_default();

    let verdict = state.engine.classify_crop_suitability(&m, &crop, &reference)?;

    envelope(serde_json::json!({
        "crop": crop,
        "district": req.district,
        "is_suitable": verdict.is_suitable,
        "suitability_score": verdict.suitability_score,
        "source": verdict.source,
    }))
}

async fn language_options() -> Result<Json<serde_json::Value>, AppError> {
    let languages: Vec<serde_json::Value> = Language::ALL
        .iter()
        .map(|l| {
            serde_json::json!({
                "code": l.code(),
                "name": l.name(),
                "native_name": l.native_name(),
            })
        })
        .collect();

    envelope(serde_json::json!({
        "languages": languages,
        "default": Language::En.code(),
    }))
}

async fn set_language_preference(
    State(state): State<AppState>,
    AppJson(req): AppJson<LanguagePreferenceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let language: Language = req.language.parse().map_err(|_| AppError::BadRequest {
        error: "Invalid language",
        message: "Language must be one of: en, hi, pa".to_string(),
    })?;

    let session_id = req
        .session_id
        .or(req.user_id)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(new_session_id);

    let pref = state.languages.set(&session_id, language);
    tracing::info!("Language preference for {} set to {}", session_id, language.code());

    envelope(serde_json::json!({
        "session_id": session_id,
        "language": pref.language,
        "language_details": {
            "name": language.name(),
            "native_name": language.native_name(),
        },
        "set_at": pref.set_at,
        "message": format!("Language preference set to {}", language.name()),
    }))
}

async fn get_language_preference(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pref = state
        .languages
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound {
            error: "Preference not found",
            message: "No language preference found for this session".to_string(),
        })?;

    envelope(serde_json::json!({
        "session_id": session_id,
        "language": pref.language,
        "language_details": {
            "name": pref.language.name(),
            "native_name": pref.language.native_name(),
        },
        "set_at": pref.set_at,
        "last_used": pref.last_used,
    }))
}

async fn language_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let stats = state.languages.stats();
    let total: usize = stats.iter().map(|(_, n)| n).sum();

    let per_language: serde_json::Map<String, serde_json::Value> = stats
        .into_iter()
        .map(|(lang, n)| (lang.code().to_string(), n.into()))
        .collect();

    envelope(serde_json::json!({
        "total_sessions": total,
        "languages": per_language,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn new_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("session_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

fn to_json<T: serde::Serialize>(data: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(data)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))
}

/// `{success, data, timestamp}` around a payload
fn wrap(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "data": data,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

fn envelope<T: serde::Serialize>(data: T) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(wrap(to_json(&data)?)))
}

// ============================================================================
// Error Handling
// ============================================================================

/// `Json` whose rejections use the API's error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                AppError::Validation(vec![FieldError::new("body", e.body_text())])
            }
            JsonRejection::JsonSyntaxError(e) => AppError::BadRequest {
                error: "Invalid JSON",
                message: e.body_text(),
            },
            JsonRejection::MissingJsonContentType(e) => AppError::BadRequest {
                error: "Invalid content type",
                message: e.body_text(),
            },
            other => AppError::BadRequest {
                error: "Invalid request body",
                message: other.body_text(),
            },
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(Vec<FieldError>),
    BadRequest { error: &'static str, message: String },
    NotFound { error: &'static str, message: String },
    Internal(String),
}

impl From<SoilError> for AppError {
    fn from(e: SoilError) -> Self {
        match e {
            SoilError::InvalidInput { .. } => AppError::BadRequest {
                error: "Invalid soil data",
                message: e.to_string(),
            },
            SoilError::Config(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Validation failed",
                    "message": "Invalid request data",
                    "details": details,
                }),
            ),
            AppError::BadRequest { error, message } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": error, "message": message }),
            ),
            AppError::NotFound { error, message } => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": error, "message": message }),
            ),
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error", "message": message }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

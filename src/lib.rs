//! KisaanConnect soil advisory
//!
//! Soil-health scoring, fertilizer planning and crop suitability for district
//! soil-test data, plus the HTTP service that exposes them.
//!
//! Layout:
//! - `scoring/`: the pure engine (health rubric, advice, fertilizer, suitability)
//! - `config`: rubric bands, thresholds and multipliers; server env settings
//! - `data`, `repository`: district soil records loaded with Polars
//! - `analysis`: district and location analysis documents
//! - `language`: session language preferences
//! - `api_server`: Axum router (`api` feature)

pub mod analysis;
pub mod config;
pub mod crop;
pub mod data;
pub mod error;
pub mod language;
pub mod measurement;
pub mod repository;
pub mod scoring;
pub mod validation;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use analysis::{LocationAnalysis, SoilAnalysis};
pub use config::{ScoringConfig, ServerConfig};
pub use crop::Crop;
pub use data::DistrictSoilRecord;
pub use error::{SoilError, SoilResult};
pub use measurement::SoilMeasurement;
pub use repository::{InMemorySoilRepository, SoilRepository};
pub use scoring::{
    CropSuitability, FertilizerRecommendation, HealthStatus, SoilHealthResult, SoilScoringEngine,
};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};

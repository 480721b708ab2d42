//! Credit Default AI
//!
//! Scores credit-card clients for default risk with a pre-trained
//! XGBoost classifier and a pre-fitted standard scaler:
//! - Fixed-order 23-feature vector built from the client record
//! - Native evaluation of XGBoost JSON / UBJSON tree ensembles
//! - Four-tier risk verdict (Low, Moderate, High, Critical)
//! - HTML form and JSON API served with axum

pub mod api;
pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::{score, Classifier, ModelArtifacts, ModelLoader, StandardScaler, XgbClassifier};
pub use models::{
    AppConfig, AppError, AppResult, ClientRecord, ErrorCode, RiskAssessment, RiskTier,
};

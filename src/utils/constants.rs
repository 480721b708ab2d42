//! Constants Module - Single Source of Truth
//!
//! Artifact file names, feature schema, tier thresholds and server
//! defaults live here. No other module hardcodes them.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "Credit Default AI";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// FEATURE SCHEMA
// ============================================

/// Number of features the scaler and classifier were fit on
pub const FEATURE_COUNT: usize = 23;

/// Canonical feature order (UCI Default of Credit Card Clients columns).
/// The scaler and classifier were fit on exactly this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "LIMIT_BAL",
    "SEX",
    "EDUCATION",
    "MARRIAGE",
    "AGE",
    "PAY_0",
    "PAY_2",
    "PAY_3",
    "PAY_4",
    "PAY_5",
    "PAY_6",
    "BILL_AMT1",
    "BILL_AMT2",
    "BILL_AMT3",
    "BILL_AMT4",
    "BILL_AMT5",
    "BILL_AMT6",
    "PAY_AMT1",
    "PAY_AMT2",
    "PAY_AMT3",
    "PAY_AMT4",
    "PAY_AMT5",
    "PAY_AMT6",
];

/// Months covered by the history fields, most recent first
pub const HISTORY_MONTHS: [&str; 6] = ["Sep", "Aug", "Jul", "Jun", "May", "Apr"];

// ============================================
// ARTIFACT CANDIDATES (preference order)
// ============================================

/// XGBoost JSON model (version-stable)
pub const CLASSIFIER_JSON_FILE: &str = "xgboost_model.json";
/// XGBoost Universal Binary JSON model (compact)
pub const CLASSIFIER_UBJ_FILE: &str = "xgboost_model.ubj";
/// Legacy joblib pickle
pub const CLASSIFIER_LEGACY_FILE: &str = "credit_default_model.pkl";

/// Re-saved scaler
pub const SCALER_NEW_FILE: &str = "scaler_new.json";
/// Legacy scaler
pub const SCALER_LEGACY_FILE: &str = "scaler.json";
/// Pickled scalers, recognized only to explain how to re-export them
pub const SCALER_NEW_PICKLE_FILE: &str = "scaler_new.pkl";
pub const SCALER_LEGACY_PICKLE_FILE: &str = "scaler.pkl";

/// Scaler document version written by the migration utility
pub const SCALER_FORMAT_VERSION: u32 = 2;

// ============================================
// RISK TIER THRESHOLDS (strict greater-than)
// ============================================

pub const CRITICAL_THRESHOLD: f64 = 0.70;
pub const HIGH_THRESHOLD: f64 = 0.50;
pub const MODERATE_THRESHOLD: f64 = 0.30;

// ============================================
// INPUT RANGES (advisory, used by the form widgets)
// ============================================

pub const AMOUNT_MAX: f64 = 1_000_000.0;
pub const AGE_MIN: u32 = 18;
pub const AGE_MAX: u32 = 90;
pub const REPAYMENT_STATUS_MIN: i8 = -1;
pub const REPAYMENT_STATUS_MAX: i8 = 8;

// ============================================
// SERVER DEFAULTS
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MODEL_DIR: &str = ".";
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 300;
/// In-flight request cap across all routes and clients
pub const MAX_CONCURRENT_REQUESTS: usize = 256;

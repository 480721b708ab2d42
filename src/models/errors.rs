//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so it can be traced in logs.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - ARTIFACT_xxx: model/scaler artifact errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Artifact Errors (1xx)
    // ============================================
    /// Classifier and/or scaler not found on disk
    ArtifactMissing,
    /// Artifact exists but could not be decoded
    ArtifactMalformed,
    /// Artifact uses a serialization this runtime cannot read
    ArtifactUnsupportedFormat,
    /// Artifact was fit on a different feature order
    FeatureOrderMismatch,

    // ============================================
    // API Errors (3xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Filesystem error
    Io,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Artifact Errors
            Self::ArtifactMissing => "ARTIFACT_MISSING",
            Self::ArtifactMalformed => "ARTIFACT_MALFORMED",
            Self::ArtifactUnsupportedFormat => "ARTIFACT_UNSUPPORTED_FORMAT",
            Self::FeatureOrderMismatch => "FEATURE_ORDER_MISMATCH",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",

            // Configuration Errors
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // Generic
            Self::Io => "IO_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::ConfigInvalidValue => 400,
            Self::ApiRateLimited => 429,
            Self::ArtifactMissing => 503,
            _ => 500,
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Classifier and/or scaler absent
    pub fn artifact_missing(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ArtifactMissing, msg)
    }

    /// Artifact could not be decoded
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ArtifactMalformed, msg)
    }

    /// Artifact format not readable here
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ArtifactUnsupportedFormat, msg)
    }

    /// Feature names in artifact disagree with the canonical order
    pub fn feature_order_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeatureOrderMismatch, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Io, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("JSON parse error: {}", err);
        Self::with_source(ErrorCode::ArtifactMalformed, message, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::artifact_missing("scaler not found");
        assert_eq!(err.code, ErrorCode::ArtifactMissing);
        assert_eq!(err.code_str(), "ARTIFACT_MISSING");
        assert_eq!(err.to_string(), "[ARTIFACT_MISSING] scaler not found");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ApiBadRequest.http_status(), 400);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::ArtifactMissing.http_status(), 503);
        assert_eq!(ErrorCode::ArtifactMalformed.http_status(), 500);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = json_err.into();
        assert_eq!(err.code, ErrorCode::ArtifactMalformed);
        assert!(std::error::Error::source(&err).is_some());
    }
}

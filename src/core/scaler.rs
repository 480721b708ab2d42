//! Standard scaler
//!
//! Applies the per-feature standardization fit at training time:
//! `z = (x - mean) / scale`. The artifact is a JSON document exported from
//! the fitted sklearn `StandardScaler` (`mean_`, `scale_`,
//! `feature_names_in_`). Pickled scalers are refused with a re-export hint.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::core::xgboost::ModelFormat;
use crate::models::client::FeatureVector;
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{FEATURE_COUNT, FEATURE_NAMES, SCALER_FORMAT_VERSION};

/// Standardized features, same order as `FeatureVector`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledFeatures(pub [f64; FEATURE_COUNT]);

/// On-disk scaler document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format_version: Option<u32>,
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
    #[serde(default, alias = "feature_names_in_", skip_serializing_if = "Vec::is_empty")]
    feature_names: Vec<String>,
    #[serde(default, rename = "n_features_in_", skip_serializing_if = "Option::is_none")]
    n_features_in: Option<usize>,
}

/// Fitted standardization transform
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    /// Zero/non-finite scales already replaced by 1.0
    scale: [f64; FEATURE_COUNT],
    format_version: u32,
}

impl StandardScaler {
    /// Build from fitted parameters
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        Self {
            mean,
            scale: scale.map(sanitize_scale),
            format_version: SCALER_FORMAT_VERSION,
        }
    }

    /// Parse a scaler JSON document
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let doc: ScalerDocument = serde_json::from_slice(bytes)?;

        if let Some(n) = doc.n_features_in {
            if n != FEATURE_COUNT {
                return Err(AppError::malformed(format!(
                    "Scaler was fit on {} features, expected {}",
                    n, FEATURE_COUNT
                )));
            }
        }
        if !doc.feature_names.is_empty() && doc.feature_names != FEATURE_NAMES {
            return Err(AppError::feature_order_mismatch(format!(
                "Scaler feature order {:?} does not match {:?}",
                doc.feature_names, FEATURE_NAMES
            )));
        }

        let mean = to_fixed("mean", &doc.mean)?;
        let scale = to_fixed("scale", &doc.scale)?;
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(AppError::malformed("Scaler mean contains non-finite values"));
        }

        let mut scaler = Self::new(mean, scale);
        scaler.format_version = doc.format_version.unwrap_or(1);
        debug!(format_version = scaler.format_version, "Scaler parsed");
        Ok(scaler)
    }

    /// Read and parse a scaler file
    pub fn load(path: &Path) -> AppResult<Self> {
        if ModelFormat::from_path(path) == Some(ModelFormat::LegacyPickle) {
            return Err(AppError::unsupported_format(format!(
                "{} is a Python pickle; re-export `mean_`, `scale_` and \
                 `feature_names_in_` to scaler_new.json",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Serialize with the current format version and canonical feature names
    pub fn to_json(&self) -> AppResult<Vec<u8>> {
        let doc = ScalerDocument {
            format_version: Some(SCALER_FORMAT_VERSION),
            mean: self.mean.to_vec(),
            scale: self.scale.to_vec(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            n_features_in: Some(FEATURE_COUNT),
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// Version recorded in the source document (1 when absent)
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn transform(&self, features: &FeatureVector) -> ScaledFeatures {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, x) in features.0.iter().enumerate() {
            out[i] = (x - self.mean[i]) / self.scale[i];
        }
        ScaledFeatures(out)
    }
}

/// sklearn leaves zero-variance features unscaled
fn sanitize_scale(s: f64) -> f64 {
    if s == 0.0 || !s.is_finite() {
        1.0
    } else {
        s
    }
}

fn to_fixed(field: &str, values: &[f64]) -> AppResult<[f64; FEATURE_COUNT]> {
    values.try_into().map_err(|_| {
        AppError::malformed(format!(
            "Scaler {} has {} entries, expected {}",
            field,
            values.len(),
            FEATURE_COUNT
        ))
    })
}

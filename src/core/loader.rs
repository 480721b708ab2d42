//! Model Loader
//!
//! Resolves the classifier and scaler from a fixed candidate list and
//! loads each at most once per loader. Missing or unreadable artifacts
//! come back as `None` plus a diagnostic, never as an error.
//!
//! Classifier candidates: xgboost_model.json, xgboost_model.ubj,
//! credit_default_model.pkl. Scaler candidates: scaler_new.json,
//! scaler.json, scaler_new.pkl, scaler.pkl. Pickles are never decoded;
//! finding one yields an `ARTIFACT_UNSUPPORTED_FORMAT` diagnostic.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::scaler::StandardScaler;
use crate::core::scorer::Classifier;
use crate::core::xgboost::{ModelFormat, XgbClassifier};
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    CLASSIFIER_JSON_FILE, CLASSIFIER_LEGACY_FILE, CLASSIFIER_UBJ_FILE, SCALER_LEGACY_FILE,
    SCALER_LEGACY_PICKLE_FILE, SCALER_NEW_FILE, SCALER_NEW_PICKLE_FILE,
};

/// Which artifact a source refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Classifier,
    Scaler,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Scaler => "scaler",
        }
    }
}

/// File an artifact was loaded from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSource {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub format: String,
}

/// Classifier candidates in preference order
pub fn classifier_candidates(dir: &Path) -> Vec<(PathBuf, ModelFormat)> {
    vec![
        (dir.join(CLASSIFIER_JSON_FILE), ModelFormat::Json),
        (dir.join(CLASSIFIER_UBJ_FILE), ModelFormat::Ubj),
        (dir.join(CLASSIFIER_LEGACY_FILE), ModelFormat::LegacyPickle),
    ]
}

/// Scaler candidates in preference order
pub fn scaler_candidates(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join(SCALER_NEW_FILE),
        dir.join(SCALER_LEGACY_FILE),
        dir.join(SCALER_NEW_PICKLE_FILE),
        dir.join(SCALER_LEGACY_PICKLE_FILE),
    ]
}

/// Outcome of resolving one artifact class
#[derive(Debug)]
struct Resolution<T> {
    artifact: Option<(Arc<T>, ArtifactSource)>,
    /// Why candidates were skipped
    problems: Vec<String>,
}

impl<T> Resolution<T> {
    fn artifact(&self) -> Option<Arc<T>> {
        self.artifact.as_ref().map(|(a, _)| a.clone())
    }
}

/// Try candidates in order, first successful load wins
fn resolve<T>(
    kind: ArtifactKind,
    candidates: Vec<(PathBuf, String)>,
    load: impl Fn(&Path) -> AppResult<T>,
) -> Resolution<T> {
    let mut problems = Vec::new();

    for (path, format) in candidates {
        if !path.is_file() {
            debug!(kind = kind.as_str(), path = %path.display(), "Candidate not found");
            continue;
        }
        match load(&path) {
            Ok(artifact) => {
                info!(kind = kind.as_str(), path = %path.display(), format = %format, "Artifact loaded");
                let source = ArtifactSource { kind, path, format };
                return Resolution {
                    artifact: Some((Arc::new(artifact), source)),
                    problems,
                };
            }
            Err(e) => {
                warn!(
                    kind = kind.as_str(),
                    path = %path.display(),
                    code = e.code_str(),
                    error = %e.message,
                    "Skipping unreadable artifact"
                );
                problems.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    Resolution {
        artifact: None,
        problems,
    }
}

/// Loads and caches the artifacts found in one model directory
pub struct ModelLoader {
    model_dir: PathBuf,
    classifier: OnceCell<Resolution<XgbClassifier>>,
    scaler: OnceCell<Resolution<StandardScaler>>,
    resolutions: AtomicUsize,
}

impl ModelLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            classifier: OnceCell::new(),
            scaler: OnceCell::new(),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn classifier_resolution(&self) -> &Resolution<XgbClassifier> {
        self.classifier.get_or_init(|| {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            let candidates = classifier_candidates(&self.model_dir)
                .into_iter()
                .map(|(path, format)| (path, format.as_str().to_string()))
                .collect();
            resolve(ArtifactKind::Classifier, candidates, |path| {
                let format = ModelFormat::from_path(path).ok_or_else(|| {
                    AppError::unsupported_format(format!("unknown extension: {}", path.display()))
                })?;
                XgbClassifier::load(path, format)
            })
        })
    }

    fn scaler_resolution(&self) -> &Resolution<StandardScaler> {
        self.scaler.get_or_init(|| {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            let candidates = scaler_candidates(&self.model_dir)
                .into_iter()
                .map(|path| {
                    let format = ModelFormat::from_path(&path).unwrap_or(ModelFormat::Json);
                    (path, format.as_str().to_string())
                })
                .collect();
            resolve(ArtifactKind::Scaler, candidates, StandardScaler::load)
        })
    }

    /// First usable classifier, loaded once
    pub fn classifier(&self) -> Option<Arc<XgbClassifier>> {
        self.classifier_resolution().artifact()
    }

    /// First usable scaler, loaded once
    pub fn scaler(&self) -> Option<Arc<StandardScaler>> {
        self.scaler_resolution().artifact()
    }

    /// `(classifier, scaler)`, either may be absent
    pub fn load_artifacts(&self) -> (Option<Arc<XgbClassifier>>, Option<Arc<StandardScaler>>) {
        (self.classifier(), self.scaler())
    }

    /// Number of times an artifact class was resolved from disk
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Files the artifacts were loaded from
    pub fn sources(&self) -> Vec<ArtifactSource> {
        let classifier = self.classifier_resolution().artifact.as_ref().map(|(_, s)| s.clone());
        let scaler = self.scaler_resolution().artifact.as_ref().map(|(_, s)| s.clone());
        classifier.into_iter().chain(scaler).collect()
    }

    /// Human-readable reason for each absent artifact class
    fn missing_report(&self) -> Vec<String> {
        let mut report = Vec::new();

        let classifier = self.classifier_resolution();
        if classifier.artifact.is_none() {
            report.push(describe_missing(
                ArtifactKind::Classifier,
                &classifier.problems,
                &classifier_candidates(&self.model_dir)
                    .into_iter()
                    .map(|(p, _)| p)
                    .collect::<Vec<_>>(),
            ));
        }

        let scaler = self.scaler_resolution();
        if scaler.artifact.is_none() {
            report.push(describe_missing(
                ArtifactKind::Scaler,
                &scaler.problems,
                &scaler_candidates(&self.model_dir),
            ));
        }
        report
    }
}

fn describe_missing(kind: ArtifactKind, problems: &[String], tried: &[PathBuf]) -> String {
    if problems.is_empty() {
        let names: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
        format!("{} not found (looked for {})", kind.as_str(), names.join(", "))
    } else {
        format!("{} unusable ({})", kind.as_str(), problems.join("; "))
    }
}

/// Scaler + classifier, immutable once built
#[derive(Clone)]
pub struct ModelArtifacts {
    classifier: Arc<dyn Classifier>,
    scaler: Arc<StandardScaler>,
    sources: Vec<ArtifactSource>,
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("classifier", &self.classifier.describe())
            .field("sources", &self.sources)
            .finish()
    }
}

impl ModelArtifacts {
    pub fn new(classifier: Arc<dyn Classifier>, scaler: Arc<StandardScaler>) -> Self {
        Self {
            classifier,
            scaler,
            sources: Vec::new(),
        }
    }

    /// Both parts are required; absence is an `ARTIFACT_MISSING` error
    pub fn from_parts(
        classifier: Option<Arc<dyn Classifier>>,
        scaler: Option<Arc<StandardScaler>>,
    ) -> AppResult<Self> {
        match (classifier, scaler) {
            (Some(classifier), Some(scaler)) => Ok(Self::new(classifier, scaler)),
            (None, Some(_)) => Err(AppError::artifact_missing("classifier not found")),
            (Some(_), None) => Err(AppError::artifact_missing("scaler not found")),
            (None, None) => Err(AppError::artifact_missing("classifier and scaler not found")),
        }
    }

    /// Resolve both artifacts through the loader
    pub fn from_loader(loader: &ModelLoader) -> AppResult<Self> {
        let (classifier, scaler) = loader.load_artifacts();
        let classifier = classifier.map(|c| c as Arc<dyn Classifier>);

        match Self::from_parts(classifier, scaler) {
            Ok(artifacts) => Ok(artifacts.with_sources(loader.sources())),
            Err(mut e) => {
                e.message = format!(
                    "Model artifacts unavailable in {}: {}",
                    loader.model_dir().display(),
                    loader.missing_report().join("; ")
                );
                Err(e)
            }
        }
    }

    pub fn with_sources(mut self, sources: Vec<ArtifactSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn sources(&self) -> &[ArtifactSource] {
        &self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use crate::utils::constants::FEATURE_COUNT;

    #[test]
    fn test_candidate_order() {
        let dir = Path::new("/models");
        let classifiers: Vec<_> = classifier_candidates(dir).into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            classifiers,
            vec![
                dir.join("xgboost_model.json"),
                dir.join("xgboost_model.ubj"),
                dir.join("credit_default_model.pkl"),
            ]
        );
        assert_eq!(
            scaler_candidates(dir),
            vec![
                dir.join("scaler_new.json"),
                dir.join("scaler.json"),
                dir.join("scaler_new.pkl"),
                dir.join("scaler.pkl"),
            ]
        );
    }

    #[test]
    fn test_from_parts_requires_both() {
        let scaler = Arc::new(StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]));

        let err = ModelArtifacts::from_parts(None, Some(scaler)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArtifactMissing);
        assert!(err.message.contains("classifier"));

        let err = ModelArtifacts::from_parts(None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArtifactMissing);
    }

    #[test]
    fn test_empty_dir_resolves_once() {
        let loader = ModelLoader::new("/nonexistent/credit-default-models");
        for _ in 0..5 {
            let (classifier, scaler) = loader.load_artifacts();
            assert!(classifier.is_none());
            assert!(scaler.is_none());
        }
        assert_eq!(loader.resolution_count(), 2);

        let err = ModelArtifacts::from_loader(&loader).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArtifactMissing);
        assert!(err.message.contains("xgboost_model.json"));
        assert!(err.message.contains("scaler_new.json"));
    }

    #[test]
    fn test_pickle_scaler_is_diagnosed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scaler.pkl"), b"\x80\x04junk").unwrap();
        let loader = ModelLoader::new(dir.path());
        assert!(loader.scaler().is_none());

        let err = ModelArtifacts::from_loader(&loader).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArtifactMissing);
        assert!(err.message.contains("scaler unusable"));
        assert!(err.message.contains("ARTIFACT_UNSUPPORTED_FORMAT"));
        assert!(err.message.contains("scaler_new.json"));
    }

    #[test]
    fn test_json_scaler_preferred_over_pickle() {
        let dir = tempfile::tempdir().unwrap();
        let scaler = StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        std::fs::write(dir.path().join("scaler.json"), scaler.to_json().unwrap()).unwrap();
        std::fs::write(dir.path().join("scaler_new.pkl"), b"\x80\x04junk").unwrap();

        let loader = ModelLoader::new(dir.path());
        assert!(loader.scaler().is_some());
        let sources = loader.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].format, "json");
    }
}

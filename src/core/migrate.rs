//! Artifact migration
//!
//! Re-serializes an existing classifier/scaler pair into the formats the
//! loader prefers: `xgboost_model.json` + `xgboost_model.ubj` and a
//! versioned `scaler_new.json`. One-time tooling, never run by the server.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::loader::classifier_candidates;
use crate::core::scaler::StandardScaler;
use crate::core::xgboost::{read_document, XgbClassifier};
use crate::models::errors::AppResult;
use crate::utils::constants::{
    CLASSIFIER_JSON_FILE, CLASSIFIER_UBJ_FILE, SCALER_LEGACY_FILE, SCALER_LEGACY_PICKLE_FILE,
    SCALER_NEW_FILE, SCALER_NEW_PICKLE_FILE,
};
use crate::utils::ubjson;

/// One file produced by the migration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Outcome of a migration run
#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    pub written: Vec<WrittenFile>,
    /// Candidates that could not be read, with the reason
    pub problems: Vec<String>,
    /// Number of trees in the migrated classifier
    pub trees: Option<usize>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

fn write_file(report: &mut MigrationReport, path: PathBuf, contents: &[u8]) -> AppResult<()> {
    std::fs::write(&path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "Artifact written");
    report.written.push(WrittenFile {
        path,
        bytes: contents.len() as u64,
    });
    Ok(())
}

/// Scaler sources for migration, legacy file first. Pickles are listed
/// so their presence is reported.
pub fn legacy_scaler_candidates(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join(SCALER_LEGACY_FILE),
        dir.join(SCALER_NEW_FILE),
        dir.join(SCALER_LEGACY_PICKLE_FILE),
        dir.join(SCALER_NEW_PICKLE_FILE),
    ]
}

/// Migrate the artifacts found in `dir`, writing the results next to them.
///
/// Unreadable candidates are reported, not fatal; only write failures
/// abort the run.
pub fn migrate_dir(dir: &Path) -> AppResult<MigrationReport> {
    let mut report = MigrationReport::default();

    // Classifier: first candidate that decodes and validates
    let mut document = None;
    for (path, format) in classifier_candidates(dir) {
        if !path.is_file() {
            continue;
        }
        let parsed = read_document(&path, format)
            .and_then(|doc| XgbClassifier::from_document(doc.clone()).map(|model| (doc, model)));
        match parsed {
            Ok((doc, model)) => {
                info!(path = %path.display(), trees = model.num_trees(), "Classifier loaded");
                report.trees = Some(model.num_trees());
                document = Some(doc);
                break;
            }
            Err(e) => {
                warn!(path = %path.display(), code = e.code_str(), "Classifier candidate unusable");
                report.problems.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    match document {
        Some(doc) => {
            let json = serde_json::to_vec(&doc)?;
            write_file(&mut report, dir.join(CLASSIFIER_JSON_FILE), &json)?;
            write_file(&mut report, dir.join(CLASSIFIER_UBJ_FILE), &ubjson::encode(&doc))?;
        }
        None => report
            .problems
            .push(format!("no usable classifier in {}", dir.display())),
    }

    // Scaler: legacy first so an old scaler.json is always upgraded
    let mut scaler = None;
    for path in legacy_scaler_candidates(dir) {
        if !path.is_file() {
            continue;
        }
        match StandardScaler::load(&path) {
            Ok(loaded) => {
                info!(
                    path = %path.display(),
                    format_version = loaded.format_version(),
                    "Scaler loaded"
                );
                scaler = Some(loaded);
                break;
            }
            Err(e) => {
                warn!(path = %path.display(), code = e.code_str(), "Scaler candidate unusable");
                report.problems.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    match scaler {
        Some(scaler) => write_file(&mut report, dir.join(SCALER_NEW_FILE), &scaler.to_json()?)?,
        None => report
            .problems
            .push(format!("no usable scaler in {}", dir.display())),
    }

    Ok(report)
}

//! Artifact migration utility
//!
//! Rewrites an existing model/scaler pair into the formats the server
//! prefers (`xgboost_model.json`, `xgboost_model.ubj`, `scaler_new.json`).
//!
//! Usage:
//!   cargo run --bin migrate_artifacts -- [MODEL_DIR]
//!
//! MODEL_DIR defaults to CREDIT_MODEL_DIR, then the current directory.

use credit_default_ai::core::migrate::migrate_dir;
use credit_default_ai::AppConfig;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| AppConfig::from_env().model_dir);

    info!(dir = %dir.display(), "Migrating model artifacts");
    let report = migrate_dir(&dir)?;

    println!();
    println!("📦 Migration summary for {}", dir.display());
    if let Some(trees) = report.trees {
        println!("   Classifier trees: {}", trees);
    }
    for file in &report.written {
        println!("   ✅ {} ({} bytes)", file.path.display(), file.bytes);
    }
    for problem in &report.problems {
        println!("   ⚠️  {}", problem);
    }

    if report.is_empty() {
        error!(dir = %dir.display(), "No artifacts were written");
        eyre::bail!("nothing to migrate in {}", dir.display());
    }

    println!("\n   {} file(s) written", report.written.len());
    Ok(())
}

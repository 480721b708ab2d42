//! Core Module - artifact loading and scoring
//!
//! Loader resolves artifacts on disk, the scaler and tree evaluator
//! reproduce the fitted transforms, and the scorer ties them together.

pub mod loader;
pub mod migrate;
pub mod scaler;
pub mod scorer;
pub mod xgboost;

pub use loader::*;
pub use migrate::*;
pub use scaler::*;
pub use scorer::*;
pub use xgboost::*;

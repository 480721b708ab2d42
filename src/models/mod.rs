//! Models Module - Data Structures & Configuration
//!
//! Single source of truth for client records, risk tiers, errors and
//! server configuration.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

pub use client::*;
pub use config::*;
pub use errors::*;
pub use types::*;

//! Test Helper Utilities
//!
//! Shared utilities for testing pcomp-engine

pub mod log_capture;

use pcomp_engine::EngineConfig;
use std::path::PathBuf;

pub use log_capture::{capture_logs, LogCapture};

/// Bundled ruler model shipped with the crate
pub fn ruler_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/product_ruler.json")
}

/// Offline configuration: no generative service, given model files
pub fn offline_config(model_paths: Vec<PathBuf>) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.model.paths = model_paths;
    config.generative.enabled = false;
    config
}

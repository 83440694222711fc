//! # pcomp Common Library
//!
//! Shared code for the product comparator workspace:
//! - Error types
//! - TOML configuration loading
//! - Config file and API key resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};

//! Common utilities shared across all services.
//!
//! This crate provides:
//! - Unified error handling for HTTP
//! - Configuration structures
//! - JSON conversion and merge helpers
//! - Lenient date parsing

pub mod config;
pub mod date;
pub mod error;
pub mod json;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
pub use json::JsonMap;

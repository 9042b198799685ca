//! Error types for ClawCtl
//!
//! This module defines all error types used throughout the ClawCtl CLI.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for ClawCtl operations.
#[derive(Error, Debug)]
pub enum ClawError {
    /// Configuration-related errors (invalid config, unreadable files, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin errors (bad manifests, missing commands, failed executions, etc.)
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Environment composition errors (unresolvable caller path, unbound
    /// descriptor, etc.)
    #[error("Environment error: {0}")]
    Env(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found (plugins, config files, etc.)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A specialized `Result` type for ClawCtl operations.
pub type Result<T> = std::result::Result<T, ClawError>;

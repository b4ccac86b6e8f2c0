//! Error types for screenstage

use thiserror::Error;

/// Main error type for screenstage
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Scene-graph and model-loading errors
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Mesh '{mesh}' group {group} spans {start}..{end} but geometry has {len} drawable indices")]
    GroupOutOfBounds {
        mesh: String,
        group: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Capture pipeline errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Document source is not available")]
    SourceUnavailable,

    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    #[error("Failed to decode snapshot image: {0}")]
    Decode(String),
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server startup failed: {0}")]
    Startup(String),
}

/// Result type alias for screenstage operations
pub type Result<T> = std::result::Result<T, StageError>;

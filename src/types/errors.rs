//! Error types for flagtrail.

use thiserror::Error;

/// Default result type for flagtrail.
pub type FlagResult<T> = Result<T, FlagError>;

/// Errors that flagtrail can surface.
///
/// Steady-state buffer operations (`set`, `snapshot`) never fail; the only
/// error the core itself produces is [`FlagError::InvalidCapacity`]. The
/// remaining variants belong to the configuration layer and the CLI.
#[derive(Error, Debug)]
pub enum FlagError {
    #[error("Invalid buffer capacity {0}: capacity must be at least 1")]
    InvalidCapacity(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FlagError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

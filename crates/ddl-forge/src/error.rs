//! Error types for capture, definition files and script writing.

use ddl_forge_core::error::SchemaError;

/// Errors that can occur while importing, reading or writing a schema.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// Schema model, type system or ordering failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Invalid connection string, option or argument.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested dialect has no catalog importer in this build.
    #[error("Dialect not supported: {0}")]
    UnsupportedDialect(String),

    /// Database error while reading the catalog.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading definitions, writing scripts).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Definition file written by a newer format.
    #[error("Unsupported definition format version {0}")]
    DefinitionVersion(u32),
}

impl ForgeError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type for forge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

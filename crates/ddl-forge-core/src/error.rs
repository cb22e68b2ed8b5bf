//! Error types for the schema core.

/// Errors raised while building, ordering, diffing or scripting a schema.
///
/// Every variant is fatal for the run that produced it: the core never
/// downgrades or retries, it hands the error back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Structural or logical error (unresolvable lookup, broken invariant,
    /// construct the target dialect cannot express).
    #[error("Data error: {0}")]
    Data(String),

    /// Generic type system failure: unknown native type, or a generic kind
    /// and size with no rule in the target dialect.
    #[error("Datatype error: {0}")]
    Datatype(String),

    /// A dependency cycle was found while ordering objects.
    #[error("Circular dependency detected involving '{0}'")]
    CircularDependency(String),
}

impl SchemaError {
    /// Creates a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    /// Creates a datatype error.
    pub fn datatype(message: impl Into<String>) -> Self {
        Self::Datatype(message.into())
    }

    /// Returns true for every variant that is a data error, datatype errors
    /// included.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(self, Self::Data(_) | Self::Datatype(_))
    }

    /// Returns true only for generic type system failures.
    #[must_use]
    pub const fn is_datatype_error(&self) -> bool {
        matches!(self, Self::Datatype(_))
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datatype_is_a_data_error() {
        let err = SchemaError::datatype("Unknown field type bogus");
        assert!(err.is_data_error());
        assert!(err.is_datatype_error());

        let err = SchemaError::data("Could not find table dbo.Missing");
        assert!(err.is_data_error());
        assert!(!err.is_datatype_error());

        let err = SchemaError::CircularDependency("dbo.A".to_string());
        assert!(!err.is_data_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SchemaError::datatype("Unknown field type bogus").to_string(),
            "Datatype error: Unknown field type bogus"
        );
        assert_eq!(
            SchemaError::CircularDependency("dbo.A".to_string()).to_string(),
            "Circular dependency detected involving 'dbo.A'"
        );
    }
}

//! Core error types for queryloom.
//!
//! [`LoomError`] covers every failure the compiler and its collaborators can
//! report. Almost all of them are usage errors: mistakes in the calling code
//! that are deterministic and never worth retrying. See
//! [`LoomError::is_usage_error`].

use thiserror::Error;

/// The primary error type for queryloom.
#[derive(Error, Debug)]
pub enum LoomError {
    // ── Compilation ──────────────────────────────────────────────────

    /// The instruction sequence has no initializer (`INITIAL_QUERY`,
    /// `FROM_QUERY` or `PAGED_INITIAL_QUERY`).
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// A path could not be resolved against the entity tree.
    #[error("Path error: {0}")]
    PathError(String),

    /// A path resolved to an entity that is not part of the generated join,
    /// so its table alias does not appear in the FROM clause.
    #[error(
        "Entity '{entity}' is not joined into the generated query; \
         make the relation eagerly fetched before referencing its columns"
    )]
    UnjoinedEntity {
        /// The entity type name of the offending node.
        entity: String,
    },

    /// The compiler API was used incorrectly.
    #[error("Usage error: {0}")]
    UsageError(String),

    /// The number of placeholders in the generated SQL does not match the
    /// number of bound parameters.
    #[error("Parameter mismatch in {context}: {placeholders} placeholder(s) but {params} parameter(s)")]
    ParameterMismatch {
        /// Which statement failed the check ("query" or "count query").
        context: &'static str,
        /// Placeholders found in the SQL text.
        placeholders: usize,
        /// Parameters collected for the statement.
        params: usize,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Execution ────────────────────────────────────────────────────

    /// The database rejected compiled SQL or its parameters.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LoomError {
    /// Returns `true` for errors caused by the calling code rather than by
    /// configuration or the environment.
    pub const fn is_usage_error(&self) -> bool {
        match self {
            Self::InitializationError(_)
            | Self::PathError(_)
            | Self::UnjoinedEntity { .. }
            | Self::UsageError(_)
            | Self::ParameterMismatch { .. } => true,
            Self::ConfigurationError(_)
            | Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => false,
        }
    }
}

/// A convenience type alias for `Result<T, LoomError>`.
pub type LoomResult<T> = Result<T, LoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_classification() {
        assert!(LoomError::InitializationError("x".into()).is_usage_error());
        assert!(LoomError::PathError("x".into()).is_usage_error());
        assert!(LoomError::UnjoinedEntity {
            entity: "Customer".into()
        }
        .is_usage_error());
        assert!(LoomError::UsageError("x".into()).is_usage_error());
        assert!(LoomError::ParameterMismatch {
            context: "query",
            placeholders: 1,
            params: 2
        }
        .is_usage_error());
        assert!(!LoomError::ConfigurationError("x".into()).is_usage_error());
        assert!(!LoomError::SerializationError("x".into()).is_usage_error());
        assert!(!LoomError::DatabaseError("x".into()).is_usage_error());
    }

    #[test]
    fn test_unjoined_entity_names_the_entity() {
        let err = LoomError::UnjoinedEntity {
            entity: "Invoice".into(),
        };
        assert!(err.to_string().contains("'Invoice'"));
    }

    #[test]
    fn test_parameter_mismatch_display() {
        let err = LoomError::ParameterMismatch {
            context: "count query",
            placeholders: 3,
            params: 2,
        };
        assert_eq!(
            err.to_string(),
            "Parameter mismatch in count query: 3 placeholder(s) but 2 parameter(s)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "plan missing");
        let err: LoomError = io_err.into();
        assert!(!err.is_usage_error());
        assert!(err.to_string().contains("plan missing"));
    }
}

use std::path::PathBuf;

use crate::types::AnnotationId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound {
        entity: &'static str,
        id: AnnotationId,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Parse failure: {0}")]
    Parse(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for the store's missing-record error.
    pub fn annotation_not_found(id: AnnotationId) -> Self {
        Self::NotFound {
            entity: "Annotation",
            id,
        }
    }

    /// Wrap an [`std::io::Error`] together with the path that was attempted.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Engine error types.

use eda_core::{ErrorKind, WorkItemError};
use thiserror::Error;

/// Errors raised by sessions and schema files.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// A tree or schema operation failed.
    #[error(transparent)]
    WorkItem(#[from] WorkItemError),

    /// A schema file could not be read.
    #[error("failed to read schema file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A schema file or its directory could not be written.
    #[error("failed to write schema file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A session builder was missing a required piece.
    #[error("Invalid session configuration: {0}")]
    Configuration(String),

    /// The root item of a session cannot be removed.
    #[error("Cannot remove the root item of a session")]
    RootRemoval,
}

impl EngineError {
    /// Kind of the underlying tree or schema error, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::WorkItem(err) => Some(err.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_work_item_error() {
        let inner = WorkItemError::Schema("duplicate rule".to_string());
        let message = inner.to_string();
        let err = EngineError::from(inner);

        assert_eq!(err.to_string(), message);
        assert_eq!(err.kind(), Some(ErrorKind::Schema));
    }

    #[test]
    fn test_io_error_display() {
        let err = EngineError::Read {
            path: "schemas/order.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read schema file schemas/order.json: missing"
        );
        assert_eq!(err.kind(), None);
    }
}

//! Work item error types.

use crate::item_type::WorkItemType;
use crate::tree::WorkItemId;
use thiserror::Error;

/// The broad category of a [`WorkItemError`].
///
/// Several variants share a kind; callers that only care about the
/// category should match on this instead of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A type name is empty or contains forbidden characters.
    InvalidType,
    /// A cardinality bound would be violated.
    ConstraintViolation,
    /// The workflow schema is inconsistent or does not know a type.
    Schema,
    /// A path could not be parsed.
    PathParse,
    /// A path does not lead to a node.
    PathNotFound,
    /// A child or item lookup missed.
    NotFound,
    /// An ordinal or position is past the end.
    IndexOutOfRange,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Schema => "schema",
            ErrorKind::PathParse => "path_parse",
            ErrorKind::PathNotFound => "path_not_found",
            ErrorKind::NotFound => "not_found",
            ErrorKind::IndexOutOfRange => "index_out_of_range",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by work item trees, schemas and paths.
///
/// A failed mutation never leaves a partial change behind.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WorkItemError {
    /// A type name was rejected.
    #[error("Invalid work item type '{name}': {reason}")]
    InvalidType {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Adding or removing a child would break a cardinality bound.
    #[error("Constraint violation for '{child}' under '{parent}': {details}")]
    ConstraintViolation {
        /// Type of the parent whose rule applies.
        parent: WorkItemType,
        /// Type of the child being added or removed.
        child: WorkItemType,
        /// Details about the violated bound.
        details: String,
    },

    /// The schema is internally inconsistent.
    #[error("Invalid workflow schema: {0}")]
    Schema(String),

    /// The schema does not declare the requested type.
    #[error("Unknown work item type: {0}")]
    UnknownType(WorkItemType),

    /// A schema document is not valid JSON or has the wrong shape.
    #[error("Invalid schema document: {0}")]
    Document(#[from] serde_json::Error),

    /// A path has malformed syntax.
    #[error("Malformed path '{path}': {details}")]
    PathParse {
        /// The path as given.
        path: String,
        /// What is wrong with it.
        details: String,
    },

    /// A path does not lead to a node.
    #[error("Path not found: {path}, details: {details}")]
    PathNotFound {
        /// The path as given.
        path: String,
        /// Which segment failed.
        details: String,
    },

    /// The parent has no children of the requested type.
    #[error("No '{child}' children under '{parent}'")]
    ChildNotFound {
        /// Type of the parent that was searched.
        parent: WorkItemType,
        /// The requested child type.
        child: WorkItemType,
    },

    /// The handle does not refer to a live item of this tree.
    #[error("Work item not found: {0}")]
    ItemNotFound(WorkItemId),

    /// The ordinal is past the number of children of that type.
    #[error("Index {ordinal} out of range for '{workitem_type}' ({count} present)")]
    IndexOutOfRange {
        /// The child type looked up.
        workitem_type: WorkItemType,
        /// The requested ordinal.
        ordinal: usize,
        /// How many children of that type exist.
        count: usize,
    },

    /// The insert position is past the end of the children list.
    #[error("Position {position} out of range ({len} children)")]
    PositionOutOfRange {
        /// The requested position.
        position: usize,
        /// Current number of children.
        len: usize,
    },
}

impl WorkItemError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkItemError::InvalidType { .. } => ErrorKind::InvalidType,
            WorkItemError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            WorkItemError::Schema(_)
            | WorkItemError::UnknownType(_)
            | WorkItemError::Document(_) => ErrorKind::Schema,
            WorkItemError::PathParse { .. } => ErrorKind::PathParse,
            WorkItemError::PathNotFound { .. } => ErrorKind::PathNotFound,
            WorkItemError::ChildNotFound { .. } | WorkItemError::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            WorkItemError::IndexOutOfRange { .. } | WorkItemError::PositionOutOfRange { .. } => {
                ErrorKind::IndexOutOfRange
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> WorkItemType {
        WorkItemType::new(name).expect("valid type")
    }

    #[test]
    fn test_error_display() {
        let error = WorkItemError::ConstraintViolation {
            parent: ty("Order"),
            child: ty("LineItem"),
            details: "at least 1 required".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Constraint violation for 'LineItem' under 'Order': at least 1 required"
        );

        let error = WorkItemError::IndexOutOfRange {
            workitem_type: ty("Note"),
            ordinal: 3,
            count: 1,
        };
        assert_eq!(
            error.to_string(),
            "Index 3 out of range for 'Note' (1 present)"
        );
    }

    #[test]
    fn test_error_kind() {
        let error = WorkItemError::UnknownType(ty("Ghost"));
        assert_eq!(error.kind(), ErrorKind::Schema);

        let error = WorkItemError::ChildNotFound {
            parent: ty("Order"),
            child: ty("Note"),
        };
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorKind::PathNotFound.to_string(), "path_not_found");
    }
}

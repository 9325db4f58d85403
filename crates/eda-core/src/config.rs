//! Schema construction settings.

/// What a schema does with a child rule that names an undeclared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypePolicy {
    /// Register the type on the fly.
    #[default]
    Register,
    /// Reject the rule with a schema error.
    Reject,
}

/// Configuration for building and loading a [`WorkflowSchema`](crate::WorkflowSchema).
///
/// The same settings apply to the builder, to rules added to an existing
/// schema and to JSON documents.
///
/// # Examples
///
/// ```
/// use eda_core::{SchemaConfig, UnknownTypePolicy};
///
/// let strict = SchemaConfig {
///     unknown_types: UnknownTypePolicy::Reject,
/// };
/// assert_ne!(strict, SchemaConfig::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaConfig {
    /// Handling of rules that reference undeclared types. Default: register.
    pub unknown_types: UnknownTypePolicy,
}

impl SchemaConfig {
    /// Settings that treat every undeclared type as an error.
    pub fn strict() -> Self {
        Self {
            unknown_types: UnknownTypePolicy::Reject,
        }
    }
}

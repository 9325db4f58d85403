//! A schema-governed work item engine for conversational workflows.
//!
//! A [`WorkflowSchema`] says which work item types may appear under which
//! parents and how many of each. A [`WorkflowSession`] holds a tree built
//! from that schema and a cursor the orchestration layer moves around as
//! the conversation fills the tree in.
//!
//! # Example
//!
//! ```rust
//! use eda::prelude::*;
//! use std::sync::Arc;
//!
//! let schema = WorkflowSchema::builder()
//!     .child_schema("Order", "LineItem", 1, None)
//!     .child_schema("LineItem", "Note", 0, Some(2))
//!     .build()?;
//!
//! let mut session = WorkflowSession::builder()
//!     .schema(Arc::new(schema))
//!     .root_type("Order")
//!     .build()?;
//!
//! while session.advance_to_incomplete(Some("LineItem"))?.is_some() {
//!     session.current_item_mut()?.set_data("sku", "A-113");
//!     session.complete_current()?;
//! }
//! assert!(session.is_finished());
//! # Ok::<(), eda::EngineError>(())
//! ```

mod error;
mod files;
mod session;

// Re-export core types
pub use eda_core::*;

pub use error::EngineError;
pub use files::{load_schema, load_schema_with, save_schema};
pub use session::{SessionBuilder, WorkflowSession};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        define_workitem, load_schema, save_schema, ChildRef, ChildSchema, EngineError, ErrorKind,
        Navigator, Placement, SchemaConfig, SessionBuilder, UnknownTypePolicy, WorkItem,
        WorkItemError, WorkItemId, WorkItemKind, WorkItemType, WorkPath, WorkTree,
        WorkflowSchema, WorkflowSession,
    };
}

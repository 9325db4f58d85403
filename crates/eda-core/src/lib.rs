//! Core types for the eda work item engine.
//!
//! This crate holds the data model only: no logging, no file access.
//! Session handling and schema files live in the `eda` crate.
//!
//! # Core Types
//!
//! - [`WorkTree`] - Arena of [`WorkItem`]s addressed by [`WorkItemId`]
//! - [`WorkflowSchema`] - Registered types and per-parent [`ChildSchema`] rules
//! - [`WorkPath`] - Parsed `/Type[index]/...` addresses
//! - [`Navigator`] - Document-order traversal with an optional type filter
//! - [`WorkItemError`] - Error types, grouped by [`ErrorKind`]
//!
//! # Example
//!
//! ```
//! use eda_core::{Placement, WorkItem, WorkflowSchema};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     WorkflowSchema::builder()
//!         .child_schema("Order", "LineItem", 1, None)
//!         .build()?,
//! );
//!
//! let mut tree = schema.create_workitem("Order")?;
//! let root = tree.root();
//! assert_eq!(tree.child_count(root, Some("LineItem"))?, 1);
//!
//! tree.add_child(root, WorkItem::new("LineItem")?, Placement::Last)?;
//! let second = tree.resolve(root, "/LineItem[1]")?;
//! assert_eq!(tree.absolute_path(second)?.to_string(), "/LineItem[1]");
//! # Ok::<(), eda_core::WorkItemError>(())
//! ```

mod config;
mod document;
mod error;
mod item;
mod item_type;
mod navigator;
mod path;
mod schema;
mod tree;

pub use config::{SchemaConfig, UnknownTypePolicy};
pub use error::{ErrorKind, WorkItemError};
pub use item::{PositionIndex, WorkItem};
pub use item_type::{WorkItemKind, WorkItemType};
pub use navigator::{Navigator, Walk};
pub use path::{PathSegment, WorkPath};
pub use schema::{ChildSchema, WorkflowSchema, WorkflowSchemaBuilder};
pub use tree::{ChildRef, Placement, WorkItemId, WorkTree};

pub use serde_json::Value;

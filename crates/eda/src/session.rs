//! Cursor-driven sessions over a work tree.

use crate::error::EngineError;
use eda_core::{
    ErrorKind, Navigator, WorkItem, WorkItemError, WorkItemId, WorkPath, WorkTree, WorkflowSchema,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A work tree together with the item the user is currently on.
///
/// This is the surface an orchestration layer drives: move the cursor by
/// path or in document order, fill in data, mark items complete and add
/// or remove items as the conversation goes. The cursor always points at
/// a live item.
///
/// # Examples
///
/// ```
/// use eda::prelude::*;
/// use std::sync::Arc;
///
/// let schema = WorkflowSchema::builder()
///     .child_schema("Order", "LineItem", 1, None)
///     .build()?;
/// let mut session = WorkflowSession::builder()
///     .schema(Arc::new(schema))
///     .root_type("Order")
///     .build()?;
///
/// session.advance(None)?;
/// assert_eq!(session.current_path()?.to_string(), "/LineItem[0]");
/// session.complete_current()?;
///
/// assert_eq!(session.advance_to_incomplete(None)?, None);
/// assert!(session.is_finished());
/// # Ok::<(), eda::EngineError>(())
/// ```
pub struct WorkflowSession {
    tree: WorkTree,
    current: WorkItemId,
    finished: bool,
}

impl fmt::Debug for WorkflowSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowSession")
            .field("current", &self.current)
            .field("items", &self.tree.item_count())
            .field("finished", &self.finished)
            .finish()
    }
}

impl WorkflowSession {
    /// Creates a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Starts a session on an existing tree, with the cursor on its root.
    pub fn new(tree: WorkTree) -> Self {
        let current = tree.root();
        Self {
            tree,
            current,
            finished: false,
        }
    }

    pub fn tree(&self) -> &WorkTree {
        &self.tree
    }

    /// Ends the session, handing back the tree.
    pub fn into_tree(self) -> WorkTree {
        self.tree
    }

    pub fn current(&self) -> WorkItemId {
        self.current
    }

    pub fn current_item(&self) -> Result<&WorkItem, EngineError> {
        Ok(self.tree.item(self.current)?)
    }

    /// Mutable access to the current item, for its data.
    pub fn current_item_mut(&mut self) -> Result<&mut WorkItem, EngineError> {
        Ok(self.tree.item_mut(self.current)?)
    }

    pub fn current_path(&self) -> Result<WorkPath, EngineError> {
        Ok(self.tree.absolute_path(self.current)?)
    }

    /// `true` once an advance found nothing further in document order.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Moves the cursor to a path, relative to the current item unless
    /// absolute.
    pub fn goto(&mut self, path: &str) -> Result<WorkItemId, EngineError> {
        let target = self.tree.resolve(self.current, path)?;
        self.move_to(target);
        Ok(target)
    }

    /// Moves to the next item in document order, optionally of one type.
    ///
    /// Returns `None` and marks the session finished at the end of the
    /// tree; the cursor then stays where it was.
    pub fn advance(&mut self, type_filter: Option<&str>) -> Result<Option<WorkItemId>, EngineError> {
        match self.tree.next(self.current, type_filter)? {
            Some(next) => {
                self.move_to(next);
                Ok(Some(next))
            }
            None => Ok(self.finish()),
        }
    }

    /// Moves to the next item that is not yet complete.
    pub fn advance_to_incomplete(
        &mut self,
        type_filter: Option<&str>,
    ) -> Result<Option<WorkItemId>, EngineError> {
        let navigator = match type_filter {
            Some(workitem_type) => Navigator::new(&self.tree).with_type(workitem_type)?,
            None => Navigator::new(&self.tree),
        };
        let mut found = None;
        for id in navigator.walk(self.current)? {
            if !self.tree.item(id)?.is_complete() {
                found = Some(id);
                break;
            }
        }
        match found {
            Some(next) => {
                self.move_to(next);
                Ok(Some(next))
            }
            None => Ok(self.finish()),
        }
    }

    /// Marks the current item complete.
    pub fn complete_current(&mut self) -> Result<(), EngineError> {
        let item = self.tree.item_mut(self.current)?;
        item.set_complete(true);
        info!(
            "Work item '{}' {} completed",
            item.workitem_type(),
            self.current
        );
        Ok(())
    }

    /// Creates a schema-conformant child of the current item.
    ///
    /// The cursor does not move.
    pub fn add_child(&mut self, workitem_type: &str) -> Result<WorkItemId, EngineError> {
        match self.tree.create_workitem(self.current, workitem_type) {
            Ok(id) => {
                debug!("Added '{}' {} under {}", workitem_type, id, self.current);
                self.finished = false;
                Ok(id)
            }
            Err(err) => Err(self.rejected("add", err)),
        }
    }

    /// Removes the current item and its subtree, moving the cursor to
    /// the parent. The removed items are returned as their own tree.
    pub fn remove_current(&mut self) -> Result<WorkTree, EngineError> {
        let parent = self
            .tree
            .item(self.current)?
            .parent()
            .ok_or(EngineError::RootRemoval)?;
        match self.tree.remove_child(parent, self.current) {
            Ok(removed) => {
                debug!("Removed {} ({} items)", self.current, removed.item_count());
                self.move_to(parent);
                Ok(removed)
            }
            Err(err) => Err(self.rejected("remove", err)),
        }
    }

    fn move_to(&mut self, target: WorkItemId) {
        debug!("Cursor moved from {} to {}", self.current, target);
        self.current = target;
        self.finished = false;
    }

    fn finish(&mut self) -> Option<WorkItemId> {
        if !self.finished {
            info!("Traversal finished at {}", self.current);
        }
        self.finished = true;
        None
    }

    fn rejected(&self, action: &str, err: WorkItemError) -> EngineError {
        if err.kind() == ErrorKind::ConstraintViolation {
            warn!("Rejected {} at {}: {}", action, self.current, err);
        }
        err.into()
    }
}

/// Builder for constructing [`WorkflowSession`] instances.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    schema: Option<Arc<WorkflowSchema>>,
    root_type: Option<String>,
}

impl SessionBuilder {
    /// Creates a new empty session builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema the session's tree is bound to.
    pub fn schema(mut self, schema: Arc<WorkflowSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the type of the root item.
    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = Some(root_type.into());
        self
    }

    /// Builds the root item with its required children and starts the session.
    pub fn build(self) -> Result<WorkflowSession, EngineError> {
        let schema = self
            .schema
            .ok_or_else(|| EngineError::Configuration("Schema must be specified".to_string()))?;
        let root_type = self.root_type.ok_or_else(|| {
            EngineError::Configuration("Root type must be specified".to_string())
        })?;

        let tree = schema.create_workitem(&root_type)?;
        info!(
            "Session started on '{}' with {} items",
            root_type,
            tree.item_count()
        );
        Ok(WorkflowSession::new(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_session() -> WorkflowSession {
        let schema = WorkflowSchema::builder()
            .child_schema("Order", "LineItem", 1, None)
            .child_schema("LineItem", "Note", 0, Some(1))
            .build()
            .expect("valid schema");
        WorkflowSession::builder()
            .schema(Arc::new(schema))
            .root_type("Order")
            .build()
            .expect("valid session")
    }

    #[test]
    fn test_builder_requires_schema_and_root() {
        let err = WorkflowSession::builder()
            .root_type("Order")
            .build()
            .expect_err("no schema");
        assert!(matches!(err, EngineError::Configuration(_)));

        let err = WorkflowSession::builder()
            .schema(Arc::new(WorkflowSchema::new()))
            .build()
            .expect_err("no root type");
        assert!(matches!(err, EngineError::Configuration(_)));

        let err = WorkflowSession::builder()
            .schema(Arc::new(WorkflowSchema::new()))
            .root_type("Order")
            .build()
            .expect_err("type not registered");
        assert_eq!(err.kind(), Some(ErrorKind::Schema));
    }

    #[test]
    fn test_session_starts_on_root() {
        let session = order_session();
        assert_eq!(session.current(), session.tree().root());
        assert_eq!(session.current_path().expect("live").to_string(), "/");
        assert_eq!(session.tree().item_count(), 2);
        assert!(!session.is_finished());
    }

    #[test]
    fn test_goto_and_advance() {
        let mut session = order_session();
        session.goto("LineItem").expect("present");
        let note = session.add_child("Note").expect("one note allowed");

        session.goto("/").expect("root");
        assert_eq!(session.advance(Some("Note")).expect("live"), Some(note));
        assert_eq!(
            session.current_path().expect("live").to_string(),
            "/LineItem[0]/Note[0]"
        );

        assert_eq!(session.advance(None).expect("live"), None);
        assert!(session.is_finished());
        assert_eq!(session.current(), note);

        session.goto("..").expect("parent");
        assert!(!session.is_finished());

        let err = session.goto("/LineItem[3]").expect_err("only one");
        assert_eq!(err.kind(), Some(ErrorKind::PathNotFound));
    }

    #[test]
    fn test_add_child_rejected_by_schema() {
        let mut session = order_session();
        session.goto("/LineItem").expect("present");
        session.add_child("Note").expect("first note");

        let err = session.add_child("Note").expect_err("max one note");
        assert_eq!(err.kind(), Some(ErrorKind::ConstraintViolation));
        assert_eq!(session.tree().child_count(session.current(), None).expect("live"), 1);
    }

    #[test]
    fn test_advance_to_incomplete_skips_completed() {
        let mut session = order_session();
        let root = session.tree().root();
        session.add_child("LineItem").expect("unbounded");

        session.advance(None).expect("live");
        session.complete_current().expect("live");
        session.goto("/").expect("root");

        let second = session.tree().get_child(root, "LineItem", 1).expect("present");
        assert_eq!(
            session.advance_to_incomplete(Some("LineItem")).expect("live"),
            Some(second)
        );
        session.complete_current().expect("live");
        assert_eq!(session.advance_to_incomplete(None).expect("live"), None);
        assert!(session.is_finished());
    }

    #[test]
    fn test_remove_current() {
        let mut session = order_session();
        let root = session.tree().root();

        let err = session.remove_current().expect_err("root");
        assert!(matches!(err, EngineError::RootRemoval));

        session.goto("LineItem").expect("present");
        let err = session.remove_current().expect_err("last required line item");
        assert_eq!(err.kind(), Some(ErrorKind::ConstraintViolation));

        session.goto("/").expect("root");
        session.add_child("LineItem").expect("unbounded");
        session.goto("LineItem[1]").expect("present");
        let removed = session.remove_current().expect("one left behind");
        assert_eq!(removed.item_count(), 1);
        assert_eq!(session.current(), root);
    }
}

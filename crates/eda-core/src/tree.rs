//! Arena-backed work item trees.
//!
//! Items live in slots of a [`WorkTree`] and refer to each other through
//! [`WorkItemId`] handles. Parent to child is the owning direction; the
//! parent handle stored on a child is only used to walk upwards.

use crate::error::WorkItemError;
use crate::item::{PositionIndex, WorkItem};
use crate::item_type::WorkItemType;
use crate::schema::WorkflowSchema;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to an item inside a [`WorkTree`].
///
/// Handles are generational: once an item is removed, its handle stays
/// invalid even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItemId {
    index: u32,
    generation: u32,
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Where a new child goes in its parent's children list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Append after the existing children.
    #[default]
    Last,
    /// Insert before the existing children.
    First,
    /// Insert at a position; `At(len)` is the same as `Last`.
    At(usize),
}

/// Identifies a child of a given parent, by position or by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    Position(usize),
    Item(WorkItemId),
}

impl From<usize> for ChildRef {
    fn from(position: usize) -> Self {
        ChildRef::Position(position)
    }
}

impl From<WorkItemId> for ChildRef {
    fn from(id: WorkItemId) -> Self {
        ChildRef::Item(id)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    item: Option<WorkItem>,
}

/// A tree of work items bound to a [`WorkflowSchema`].
///
/// Every structural change goes through the tree, which checks the
/// schema's cardinality rules first and leaves the tree untouched when a
/// rule would be broken.
///
/// # Examples
///
/// ```
/// use eda_core::{Placement, WorkItem, WorkTree};
///
/// let mut tree = WorkTree::new(WorkItem::new("Order")?);
/// let root = tree.root();
/// let first = tree.add_child(root, WorkItem::new("LineItem")?, Placement::Last)?;
/// tree.add_child(root, WorkItem::new("LineItem")?, Placement::Last)?;
///
/// assert_eq!(tree.get_child(root, "LineItem", 0)?, first);
/// assert_eq!(tree.child_count(root, Some("LineItem"))?, 2);
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WorkTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: WorkItemId,
    len: usize,
    schema: Arc<WorkflowSchema>,
}

impl WorkTree {
    /// Creates a tree without child rules around a root item.
    pub fn new(root: WorkItem) -> Self {
        Self::with_schema(root, Arc::new(WorkflowSchema::new()))
    }

    /// Creates a tree governed by `schema` around a root item.
    ///
    /// The root's own children are not created; see
    /// [`ensure_minimum_children`](Self::ensure_minimum_children).
    pub fn with_schema(root: WorkItem, schema: Arc<WorkflowSchema>) -> Self {
        let mut tree = Self::detached(schema);
        tree.root = tree.alloc(reset_links(root, None));
        tree
    }

    fn detached(schema: Arc<WorkflowSchema>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: WorkItemId {
                index: 0,
                generation: 0,
            },
            len: 0,
            schema,
        }
    }

    pub fn root(&self) -> WorkItemId {
        self.root
    }

    pub fn schema(&self) -> &Arc<WorkflowSchema> {
        &self.schema
    }

    /// Number of live items, the root included.
    pub fn item_count(&self) -> usize {
        self.len
    }

    pub fn contains(&self, id: WorkItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_ref())
    }

    /// Mutable access to an item's data and completion flag.
    pub fn get_mut(&mut self, id: WorkItemId) -> Option<&mut WorkItem> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_mut())
    }

    /// Like [`get`](Self::get), failing with `ItemNotFound` for stale handles.
    pub fn item(&self, id: WorkItemId) -> Result<&WorkItem, WorkItemError> {
        self.get(id).ok_or(WorkItemError::ItemNotFound(id))
    }

    pub fn item_mut(&mut self, id: WorkItemId) -> Result<&mut WorkItem, WorkItemError> {
        self.get_mut(id).ok_or(WorkItemError::ItemNotFound(id))
    }

    /// Iterates over all live items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (WorkItemId, &WorkItem)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.item.as_ref().map(|item| {
                (
                    WorkItemId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    item,
                )
            })
        })
    }

    /// Handles of `top` and everything below it, in document order.
    pub fn subtree(&self, top: WorkItemId) -> Result<Vec<WorkItemId>, WorkItemError> {
        self.item(top)?;
        Ok(self.preorder(top))
    }

    /// Appends or inserts a detached item as a child of `parent`.
    ///
    /// Any parent or children links `child` carries are discarded; its data
    /// and completion flag are kept.
    pub fn add_child(
        &mut self,
        parent: WorkItemId,
        child: WorkItem,
        placement: Placement,
    ) -> Result<WorkItemId, WorkItemError> {
        let parent_item = self.item(parent)?;
        let position = placement_position(parent_item, placement)?;
        let child_type = child.workitem_type().clone();
        self.schema.check_add(
            parent_item.workitem_type(),
            &child_type,
            parent_item.position_index.count(child_type.as_str()),
        )?;

        let id = self.alloc(reset_links(child, Some(parent)));
        self.attach(parent, id, &child_type, position);
        Ok(id)
    }

    /// Moves a whole tree under `parent`, returning the new handle of its root.
    ///
    /// Every item of `subtree` must fit this tree's schema: the root against
    /// `parent`'s rules, and every inner item against its own type's rules
    /// for declared types and maxima.
    pub fn graft(
        &mut self,
        parent: WorkItemId,
        mut subtree: WorkTree,
        placement: Placement,
    ) -> Result<WorkItemId, WorkItemError> {
        let parent_item = self.item(parent)?;
        let position = placement_position(parent_item, placement)?;
        let top = subtree.root;
        let child_type = subtree.item(top)?.workitem_type().clone();
        self.schema.check_add(
            parent_item.workitem_type(),
            &child_type,
            parent_item.position_index.count(child_type.as_str()),
        )?;
        if !Arc::ptr_eq(&self.schema, &subtree.schema) {
            self.check_foreign(&subtree)?;
        }

        let id = transplant(&mut subtree, top, self, Some(parent))?;
        self.attach(parent, id, &child_type, position);
        Ok(id)
    }

    /// Creates a schema-conformant item of the given type under `parent`.
    ///
    /// The item and its required children are built first and attached in
    /// one step, so a rejected attach leaves nothing behind.
    pub fn create_workitem(
        &mut self,
        parent: WorkItemId,
        workitem_type: impl AsRef<str>,
    ) -> Result<WorkItemId, WorkItemError> {
        let subtree = self.schema.create_workitem(workitem_type)?;
        self.graft(parent, subtree, Placement::Last)
    }

    /// Removes a child and everything below it.
    ///
    /// The removed items are returned as their own tree; handles into them
    /// are no longer valid in `self`.
    pub fn remove_child(
        &mut self,
        parent: WorkItemId,
        child: impl Into<ChildRef>,
    ) -> Result<WorkTree, WorkItemError> {
        let parent_item = self.item(parent)?;
        let position = match child.into() {
            ChildRef::Position(position) if position < parent_item.children.len() => position,
            ChildRef::Position(position) => {
                return Err(WorkItemError::PositionOutOfRange {
                    position,
                    len: parent_item.children.len(),
                })
            }
            ChildRef::Item(id) => parent_item
                .children
                .iter()
                .position(|c| *c == id)
                .ok_or(WorkItemError::ItemNotFound(id))?,
        };
        let child_id = parent_item.children[position];
        let child_type = self.item(child_id)?.workitem_type();
        self.schema.check_remove(
            parent_item.workitem_type(),
            child_type,
            parent_item.position_index.count(child_type.as_str()),
            1,
        )?;

        if let Some(parent_item) = self.get_mut(parent) {
            parent_item.children.remove(position);
        }
        self.rebuild_position_index(parent);

        let mut detached = WorkTree::detached(Arc::clone(&self.schema));
        detached.root = transplant(self, child_id, &mut detached, None)?;
        Ok(detached)
    }

    /// Removes every child of `parent`, or every child of one type.
    ///
    /// Fails without removing anything if a removed type has a non-zero
    /// `min_cardinality` under `parent`. Returns how many children went.
    pub fn remove_all_children(
        &mut self,
        parent: WorkItemId,
        workitem_type: Option<&str>,
    ) -> Result<usize, WorkItemError> {
        if let Some(workitem_type) = workitem_type {
            WorkItemType::new(workitem_type)?;
        }
        let parent_item = self.item(parent)?;
        for rule in self.schema.child_schemas(parent_item.workitem_type().as_str()) {
            let rule_type = rule.workitem_type();
            if workitem_type.is_some_and(|t| rule_type != t) {
                continue;
            }
            let count = parent_item.position_index.count(rule_type.as_str());
            if count > 0 {
                self.schema
                    .check_remove(parent_item.workitem_type(), rule_type, count, count)?;
            }
        }

        let (removed, kept): (Vec<WorkItemId>, Vec<WorkItemId>) =
            parent_item.children.iter().copied().partition(|c| {
                workitem_type.map_or(true, |t| {
                    self.get(*c).is_some_and(|item| item.workitem_type() == t)
                })
            });

        if let Some(parent_item) = self.get_mut(parent) {
            parent_item.children = kept;
        }
        self.rebuild_position_index(parent);
        for id in &removed {
            self.release_subtree(*id);
        }
        Ok(removed.len())
    }

    /// Returns the `ordinal`-th child of a type (zero-based).
    pub fn get_child(
        &self,
        parent: WorkItemId,
        workitem_type: &str,
        ordinal: usize,
    ) -> Result<WorkItemId, WorkItemError> {
        let child_type = WorkItemType::new(workitem_type)?;
        let parent_item = self.item(parent)?;
        let count = parent_item.position_index.count(workitem_type);
        if count == 0 {
            return Err(WorkItemError::ChildNotFound {
                parent: parent_item.workitem_type().clone(),
                child: child_type,
            });
        }
        parent_item
            .position_index
            .position(workitem_type, ordinal)
            .and_then(|position| parent_item.children.get(position).copied())
            .ok_or(WorkItemError::IndexOutOfRange {
                workitem_type: child_type,
                ordinal,
                count,
            })
    }

    /// Number of children of `parent`, or of children of one type.
    pub fn child_count(
        &self,
        parent: WorkItemId,
        workitem_type: Option<&str>,
    ) -> Result<usize, WorkItemError> {
        if let Some(workitem_type) = workitem_type {
            WorkItemType::new(workitem_type)?;
        }
        Ok(self.item(parent)?.child_count(workitem_type))
    }

    /// Creates children until every rule's minimum is met in the subtree
    /// under `id`.
    ///
    /// Every item below `id` is visited top down, existing ones as well as
    /// those created along the way. Calling this again creates nothing.
    /// Returns the number of items created.
    pub fn ensure_minimum_children(&mut self, id: WorkItemId) -> Result<usize, WorkItemError> {
        self.item(id)?;
        let schema = Arc::clone(&self.schema);
        let mut created = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let parent_type = self.item(current)?.workitem_type().clone();
            for rule in schema.child_schemas(parent_type.as_str()) {
                let child_type = rule.workitem_type();
                while self.item(current)?.child_count(Some(child_type.as_str()))
                    < rule.min_cardinality()
                {
                    let child = WorkItem::from_type(child_type.clone());
                    self.add_child(current, child, Placement::Last)?;
                    created += 1;
                }
            }
            pending.extend(self.item(current)?.children.iter().rev().copied());
        }
        Ok(created)
    }

    /// Position of `id` among its parent's children, `None` for the root.
    pub fn position_of(&self, id: WorkItemId) -> Result<Option<usize>, WorkItemError> {
        let Some(parent) = self.item(id)?.parent() else {
            return Ok(None);
        };
        Ok(self
            .item(parent)?
            .children
            .iter()
            .position(|c| *c == id))
    }

    /// Ordinal of `id` among its parent's children of the same type.
    pub fn ordinal_of(&self, id: WorkItemId) -> Result<Option<usize>, WorkItemError> {
        let item = self.item(id)?;
        let Some(parent) = item.parent() else {
            return Ok(None);
        };
        let Some(position) = self.position_of(id)? else {
            return Ok(None);
        };
        Ok(self
            .item(parent)?
            .position_index
            .ordinal_of(item.workitem_type().as_str(), position))
    }

    /// Recomputes the position index of `id` from its children list.
    ///
    /// The result always equals [`WorkItem::position_index`]; this is the
    /// reference the incremental index is checked against.
    pub fn recompute_position_index(&self, id: WorkItemId) -> Result<PositionIndex, WorkItemError> {
        let item = self.item(id)?;
        Ok(PositionIndex::from_types(
            item.children
                .iter()
                .filter_map(|c| self.get(*c))
                .map(WorkItem::workitem_type),
        ))
    }

    fn rebuild_position_index(&mut self, id: WorkItemId) {
        if let Ok(index) = self.recompute_position_index(id) {
            if let Some(item) = self.get_mut(id) {
                item.position_index = index;
            }
        }
    }

    fn attach(
        &mut self,
        parent: WorkItemId,
        child: WorkItemId,
        child_type: &WorkItemType,
        position: usize,
    ) {
        let Some(parent_item) = self.get_mut(parent) else {
            return;
        };
        if position == parent_item.children.len() {
            parent_item.children.push(child);
            parent_item.position_index.push(child_type, position);
        } else {
            parent_item.children.insert(position, child);
            self.rebuild_position_index(parent);
        }
    }

    fn check_foreign(&self, subtree: &WorkTree) -> Result<(), WorkItemError> {
        for id in subtree.preorder(subtree.root) {
            let Some(item) = subtree.get(id) else {
                continue;
            };
            for child_type in item.position_index.types() {
                let count = item.position_index.count(child_type.as_str());
                self.schema
                    .check_add(item.workitem_type(), child_type, count.saturating_sub(1))?;
            }
        }
        Ok(())
    }

    fn preorder(&self, top: WorkItemId) -> Vec<WorkItemId> {
        let mut order = Vec::new();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if let Some(item) = self.get(id) {
                order.push(id);
                stack.extend(item.children.iter().rev().copied());
            }
        }
        order
    }

    fn alloc(&mut self, item: WorkItem) -> WorkItemId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            return WorkItemId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: Some(item),
        });
        WorkItemId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: WorkItemId) -> Option<WorkItem> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(item)
    }

    fn release_subtree(&mut self, top: WorkItemId) {
        for id in self.preorder(top) {
            self.release(id);
        }
    }
}

fn reset_links(mut item: WorkItem, parent: Option<WorkItemId>) -> WorkItem {
    item.parent = parent;
    item.children.clear();
    item.position_index = PositionIndex::default();
    item
}

fn placement_position(parent: &WorkItem, placement: Placement) -> Result<usize, WorkItemError> {
    let len = parent.children.len();
    match placement {
        Placement::Last => Ok(len),
        Placement::First => Ok(0),
        Placement::At(position) if position <= len => Ok(position),
        Placement::At(position) => Err(WorkItemError::PositionOutOfRange { position, len }),
    }
}

/// Moves `top` and its descendants from one arena into another.
///
/// Sibling order is kept, so every moved position index stays valid.
fn transplant(
    from: &mut WorkTree,
    top: WorkItemId,
    to: &mut WorkTree,
    new_parent: Option<WorkItemId>,
) -> Result<WorkItemId, WorkItemError> {
    let mut mapping = HashMap::new();
    let mut moved = Vec::new();
    for old in from.preorder(top) {
        if let Some(item) = from.release(old) {
            let new = to.alloc(item);
            mapping.insert(old, new);
            moved.push(new);
        }
    }
    let new_top = mapping
        .get(&top)
        .copied()
        .ok_or(WorkItemError::ItemNotFound(top))?;

    for id in moved {
        if let Some(item) = to.get_mut(id) {
            item.parent = if id == new_top {
                new_parent
            } else {
                item.parent.and_then(|p| mapping.get(&p).copied())
            };
            for child in item.children.iter_mut() {
                if let Some(new) = mapping.get(child) {
                    *child = *new;
                }
            }
        }
    }
    Ok(new_top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn item(name: &str) -> WorkItem {
        WorkItem::new(name).expect("valid type")
    }

    fn order_schema() -> Arc<WorkflowSchema> {
        Arc::new(
            WorkflowSchema::builder()
                .child_schema("Order", "LineItem", 1, None)
                .child_schema("Order", "Note", 0, Some(2))
                .child_schema("LineItem", "Note", 0, None)
                .build()
                .expect("valid schema"),
        )
    }

    fn assert_index_consistent(tree: &WorkTree) {
        for (id, item) in tree.iter() {
            let rebuilt = tree.recompute_position_index(id).expect("live item");
            assert_eq!(item.position_index(), &rebuilt, "stale index on {id}");
        }
    }

    #[test]
    fn test_add_child_sets_links() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let child = tree
            .add_child(root, item("LineItem"), Placement::Last)
            .expect("add");

        assert_eq!(tree.item(child).expect("live").parent(), Some(root));
        assert_eq!(tree.item(root).expect("live").children(), &[child]);
        assert_eq!(tree.item_count(), 2);
        assert_index_consistent(&tree);
    }

    #[test]
    fn test_add_child_placement() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let a = tree.add_child(root, item("A"), Placement::Last).expect("add");
        let b = tree.add_child(root, item("B"), Placement::First).expect("add");
        let c = tree.add_child(root, item("A"), Placement::At(1)).expect("add");

        assert_eq!(tree.item(root).expect("live").children(), &[b, c, a]);
        assert_eq!(tree.get_child(root, "A", 0).expect("first A"), c);
        assert_eq!(tree.get_child(root, "A", 1).expect("second A"), a);
        assert_index_consistent(&tree);

        let err = tree
            .add_child(root, item("A"), Placement::At(9))
            .expect_err("past the end");
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(tree.child_count(root, None).expect("live"), 3);
    }

    #[test]
    fn test_add_child_respects_max() {
        let mut tree = WorkTree::with_schema(item("Order"), order_schema());
        let root = tree.root();
        tree.add_child(root, item("Note"), Placement::Last).expect("1st");
        tree.add_child(root, item("Note"), Placement::Last).expect("2nd");
        let err = tree
            .add_child(root, item("Note"), Placement::Last)
            .expect_err("max is 2");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(tree.child_count(root, Some("Note")).expect("live"), 2);
        assert_eq!(tree.item_count(), 3);

        let err = tree
            .add_child(root, item("Invoice"), Placement::Last)
            .expect_err("no rule for Invoice");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_remove_from_middle_reindexes_all_types() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let mut ids = Vec::new();
        for name in ["LineItem", "Note", "LineItem", "Note", "LineItem"] {
            ids.push(tree.add_child(root, item(name), Placement::Last).expect("add"));
        }

        let removed = tree.remove_child(root, 1usize).expect("remove first Note");
        assert_eq!(removed.item_count(), 1);
        assert_eq!(removed.item(removed.root()).expect("root").workitem_type(), "Note");
        assert_index_consistent(&tree);

        assert_eq!(tree.get_child(root, "LineItem", 1).expect("live"), ids[2]);
        assert_eq!(tree.get_child(root, "LineItem", 2).expect("live"), ids[4]);
        assert_eq!(tree.get_child(root, "Note", 0).expect("live"), ids[3]);
        assert!(!tree.contains(ids[1]));

        tree.remove_child(root, ids[2]).expect("remove by handle");
        assert_index_consistent(&tree);
        assert_eq!(tree.get_child(root, "LineItem", 1).expect("live"), ids[4]);
        assert_eq!(tree.ordinal_of(ids[4]).expect("live"), Some(1));
        assert_eq!(tree.position_of(ids[4]).expect("live"), Some(2));
    }

    #[test]
    fn test_remove_child_respects_min() {
        let schema = order_schema();
        let mut tree = schema.create_workitem("Order").expect("create");
        let root = tree.root();
        assert_eq!(tree.child_count(root, Some("LineItem")).expect("live"), 1);

        let err = tree.remove_child(root, 0usize).expect_err("min is 1");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(tree.child_count(root, None).expect("live"), 1);
        assert_index_consistent(&tree);
    }

    #[test]
    fn test_remove_child_errors() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let child = tree.add_child(root, item("Note"), Placement::Last).expect("add");

        let err = tree.remove_child(root, 3usize).expect_err("no position 3");
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);

        let err = tree.remove_child(child, root).expect_err("root is not a child");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_removed_subtree_is_released() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let line = tree.add_child(root, item("LineItem"), Placement::Last).expect("add");
        let note = tree
            .add_child(line, item("Note").with_data("text", "fragile"), Placement::Last)
            .expect("add");

        let removed = tree.remove_child(root, line).expect("remove");
        assert_eq!(tree.item_count(), 1);
        assert!(!tree.contains(line));
        assert!(!tree.contains(note));
        assert!(matches!(
            tree.item(note),
            Err(WorkItemError::ItemNotFound(id)) if id == note
        ));

        let moved_root = removed.root();
        let moved_note = removed.get_child(moved_root, "Note", 0).expect("moved");
        let moved = removed.item(moved_note).expect("live");
        assert_eq!(moved.data("text"), Some(&json!("fragile")));
        assert_eq!(moved.parent(), Some(moved_root));
        assert_eq!(removed.item(moved_root).expect("live").parent(), None);

        // a reused slot does not revive the old handle
        let fresh = tree.add_child(root, item("Note"), Placement::Last).expect("add");
        assert_ne!(fresh, line);
        assert_ne!(fresh, note);
        assert!(!tree.contains(line));
        assert!(!tree.contains(note));
    }

    #[test]
    fn test_graft_moves_subtree() {
        let mut source = WorkTree::new(item("Order"));
        let root = source.root();
        let line = source.add_child(root, item("LineItem"), Placement::Last).expect("add");
        source.add_child(line, item("Note"), Placement::Last).expect("add");
        let removed = source.remove_child(root, line).expect("remove");

        let mut target = WorkTree::new(item("Order"));
        let target_root = target.root();
        target.add_child(target_root, item("Note"), Placement::Last).expect("add");
        let grafted = target
            .graft(target_root, removed, Placement::First)
            .expect("graft");

        assert_eq!(target.item_count(), 4);
        assert_eq!(target.position_of(grafted).expect("live"), Some(0));
        assert_eq!(target.child_count(grafted, Some("Note")).expect("live"), 1);
        assert_index_consistent(&target);
    }

    #[test]
    fn test_graft_checks_foreign_subtree() {
        let schema = Arc::new(
            WorkflowSchema::builder()
                .child_schema("Order", "LineItem", 0, None)
                .child_schema("LineItem", "Note", 0, Some(1))
                .build()
                .expect("valid schema"),
        );
        let mut target = WorkTree::with_schema(item("Order"), schema);
        let target_root = target.root();

        let mut loose = WorkTree::new(item("LineItem"));
        let loose_root = loose.root();
        loose.add_child(loose_root, item("Note"), Placement::Last).expect("add");
        loose.add_child(loose_root, item("Note"), Placement::Last).expect("add");

        let err = target
            .graft(target_root, loose, Placement::Last)
            .expect_err("two Notes under LineItem");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(target.item_count(), 1);
    }

    #[test]
    fn test_remove_all_children() {
        let mut tree = WorkTree::with_schema(item("Order"), order_schema());
        let root = tree.root();
        tree.ensure_minimum_children(root).expect("ensure");
        tree.add_child(root, item("Note"), Placement::Last).expect("add");
        tree.add_child(root, item("Note"), Placement::Last).expect("add");

        let err = tree
            .remove_all_children(root, None)
            .expect_err("LineItem has min 1");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(tree.child_count(root, None).expect("live"), 3);

        let removed = tree
            .remove_all_children(root, Some("Note"))
            .expect("Note has min 0");
        assert_eq!(removed, 2);
        assert_eq!(tree.child_count(root, None).expect("live"), 1);
        assert_eq!(tree.item_count(), 2);
        assert_index_consistent(&tree);
    }

    #[test]
    fn test_get_child_errors() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        tree.add_child(root, item("LineItem"), Placement::Last).expect("add");

        let err = tree.get_child(root, "LineItem", 1).expect_err("only one");
        assert!(matches!(
            err,
            WorkItemError::IndexOutOfRange { ordinal: 1, count: 1, .. }
        ));

        let err = tree.get_child(root, "Note", 0).expect_err("no Notes");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = tree.get_child(root, "Line Item", 0).expect_err("bad name");
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn test_ensure_minimum_children_is_idempotent() {
        let schema = Arc::new(
            WorkflowSchema::builder()
                .child_schema("Order", "LineItem", 2, None)
                .child_schema("LineItem", "Price", 1, Some(1))
                .child_schema("LineItem", "Note", 0, None)
                .build()
                .expect("valid schema"),
        );
        let mut tree = WorkTree::with_schema(item("Order"), schema);
        let root = tree.root();

        assert_eq!(tree.ensure_minimum_children(root).expect("ensure"), 4);
        assert_eq!(tree.item_count(), 5);
        assert_eq!(tree.ensure_minimum_children(root).expect("ensure"), 0);
        assert_eq!(tree.item_count(), 5);

        let second = tree.get_child(root, "LineItem", 1).expect("live");
        assert_eq!(tree.child_count(second, Some("Price")).expect("live"), 1);
        assert_eq!(tree.child_count(second, Some("Note")).expect("live"), 0);
        assert_index_consistent(&tree);
    }

    #[test]
    fn test_ensure_minimum_children_fills_existing_items() {
        let schema = Arc::new(
            WorkflowSchema::builder()
                .child_schema("Order", "LineItem", 1, None)
                .child_schema("LineItem", "Price", 1, Some(1))
                .build()
                .expect("valid schema"),
        );
        let mut tree = schema.create_workitem("Order").expect("create");
        let root = tree.root();
        let bare = tree
            .add_child(root, item("LineItem"), Placement::Last)
            .expect("unbounded");
        assert_eq!(tree.child_count(bare, Some("Price")).expect("live"), 0);

        assert_eq!(tree.ensure_minimum_children(root).expect("ensure"), 1);
        assert_eq!(tree.child_count(bare, Some("Price")).expect("live"), 1);
        assert_eq!(tree.ensure_minimum_children(root).expect("ensure"), 0);
        assert_index_consistent(&tree);
    }

    #[test]
    fn test_ensure_minimum_children_fills_grafted_subtree() {
        let schema = Arc::new(
            WorkflowSchema::builder()
                .child_schema("Order", "LineItem", 0, None)
                .child_schema("LineItem", "Note", 0, None)
                .child_schema("Note", "Author", 1, Some(1))
                .build()
                .expect("valid schema"),
        );
        let mut tree = WorkTree::with_schema(item("Order"), Arc::clone(&schema));
        let root = tree.root();

        let mut loose = WorkTree::new(item("LineItem"));
        let loose_root = loose.root();
        loose
            .add_child(loose_root, item("Note"), Placement::Last)
            .expect("no rules");
        let line = tree.graft(root, loose, Placement::Last).expect("fits");
        let note = tree.get_child(line, "Note", 0).expect("moved");
        assert_eq!(tree.child_count(note, Some("Author")).expect("live"), 0);

        assert_eq!(tree.ensure_minimum_children(root).expect("ensure"), 1);
        assert_eq!(tree.child_count(note, Some("Author")).expect("live"), 1);
        assert_eq!(tree.item_count(), 4);
    }

    #[test]
    fn test_type_filters_are_validated() {
        let mut tree = order_schema().create_workitem("Order").expect("create");
        let root = tree.root();

        let err = tree
            .remove_all_children(root, Some("Line Item"))
            .expect_err("whitespace");
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = tree.child_count(root, Some("")).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        assert_eq!(tree.child_count(root, Some("LineItem")).expect("valid"), 1);
    }

    #[test]
    fn test_create_workitem_under_parent() {
        let schema = order_schema();
        let mut tree = schema.create_workitem("Order").expect("create");
        let root = tree.root();

        let line = tree.create_workitem(root, "LineItem").expect("create");
        assert_eq!(tree.get_child(root, "LineItem", 1).expect("live"), line);

        tree.create_workitem(root, "Note").expect("1st note");
        tree.create_workitem(root, "Note").expect("2nd note");
        let before = tree.item_count();
        let err = tree.create_workitem(root, "Note").expect_err("max 2");
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(tree.item_count(), before);
    }

    #[test]
    fn test_stale_handle() {
        let mut tree = WorkTree::new(item("Order"));
        let root = tree.root();
        let child = tree.add_child(root, item("Note"), Placement::Last).expect("add");
        tree.remove_child(root, child).expect("remove");

        let err = tree
            .add_child(child, item("Note"), Placement::Last)
            .expect_err("stale parent");
        assert!(matches!(err, WorkItemError::ItemNotFound(_)));
        assert_eq!(err.to_string(), format!("Work item not found: {child}"));
    }
}

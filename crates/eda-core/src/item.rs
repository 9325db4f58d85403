//! Work item nodes and their positional child index.

use crate::error::WorkItemError;
use crate::item_type::{WorkItemKind, WorkItemType};
use crate::tree::WorkItemId;
use serde_json::Value;
use std::collections::HashMap;

/// Positions of each child type within a children list.
///
/// Maps a type to the ascending list of positions its children occupy, so
/// that "the nth child of type T" is a single lookup. Types with no
/// children have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex(HashMap<WorkItemType, Vec<usize>>);

impl PositionIndex {
    /// Builds an index from the children's types in list order.
    pub fn from_types<'a>(types: impl IntoIterator<Item = &'a WorkItemType>) -> Self {
        let mut index = Self::default();
        for (position, workitem_type) in types.into_iter().enumerate() {
            index.push(workitem_type, position);
        }
        index
    }

    pub(crate) fn push(&mut self, workitem_type: &WorkItemType, position: usize) {
        self.0
            .entry(workitem_type.clone())
            .or_default()
            .push(position);
    }

    /// Returns the list position of the `ordinal`-th child of a type.
    pub fn position(&self, workitem_type: &str, ordinal: usize) -> Option<usize> {
        self.0
            .get(workitem_type)
            .and_then(|positions| positions.get(ordinal))
            .copied()
    }

    /// Returns which ordinal among its type the child at `position` has.
    pub fn ordinal_of(&self, workitem_type: &str, position: usize) -> Option<usize> {
        self.0
            .get(workitem_type)
            .and_then(|positions| positions.binary_search(&position).ok())
    }

    /// Number of children of a type.
    pub fn count(&self, workitem_type: &str) -> usize {
        self.0.get(workitem_type).map_or(0, Vec::len)
    }

    /// Types that currently have children, in no particular order.
    pub fn types(&self) -> impl Iterator<Item = &WorkItemType> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A node of a work item tree.
///
/// Structure (parent, children, index) is owned by the
/// [`WorkTree`](crate::WorkTree) holding the item; a freshly constructed
/// item is detached. Data and the completion flag are free to change.
///
/// # Examples
///
/// ```
/// use eda_core::WorkItem;
/// use serde_json::json;
///
/// let mut item = WorkItem::new("LineItem")?.with_data("sku", json!("A-113"));
/// item.set_data("quantity", 2);
///
/// assert_eq!(item.data("sku"), Some(&json!("A-113")));
/// assert!(!item.is_complete());
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    workitem_type: WorkItemType,
    pub(crate) parent: Option<WorkItemId>,
    pub(crate) children: Vec<WorkItemId>,
    pub(crate) position_index: PositionIndex,
    data: HashMap<String, Value>,
    is_complete: bool,
}

impl WorkItem {
    /// Creates a detached item, validating the type name.
    pub fn new(workitem_type: impl AsRef<str>) -> Result<Self, WorkItemError> {
        Ok(Self::from_type(WorkItemType::new(workitem_type.as_ref())?))
    }

    /// Creates a detached item of an already validated type.
    pub fn from_type(workitem_type: WorkItemType) -> Self {
        Self {
            workitem_type,
            parent: None,
            children: Vec::new(),
            position_index: PositionIndex::default(),
            data: HashMap::new(),
            is_complete: false,
        }
    }

    /// Creates a detached item whose type is named after `K`.
    pub fn of<K: WorkItemKind>() -> Self {
        Self::from_type(K::workitem_type())
    }

    /// Adds a data entry, builder style.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn workitem_type(&self) -> &WorkItemType {
        &self.workitem_type
    }

    /// Handle of the parent item, `None` for a root or detached item.
    pub fn parent(&self) -> Option<WorkItemId> {
        self.parent
    }

    /// Handles of the children in order.
    pub fn children(&self) -> &[WorkItemId] {
        &self.children
    }

    pub fn position_index(&self) -> &PositionIndex {
        &self.position_index
    }

    /// Number of children, or of children of one type.
    pub fn child_count(&self, workitem_type: Option<&str>) -> usize {
        match workitem_type {
            Some(workitem_type) => self.position_index.count(workitem_type),
            None => self.children.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn set_complete(&mut self, is_complete: bool) {
        self.is_complete = is_complete;
    }

    /// Returns the value stored under `key` on this item.
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Inserts a value; the previous value under that key is returned.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove_data(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Returns the whole data map of this item.
    pub fn data_map(&self) -> &HashMap<String, Value> {
        &self.data
    }
}

//! Document-order traversal of a work tree.

use crate::error::WorkItemError;
use crate::item_type::WorkItemType;
use crate::tree::{WorkItemId, WorkTree};

/// Finds the next item in document order, optionally of one type.
///
/// Document order is a depth-first, left-to-right pre-order walk. The
/// successor of an item is its first child; a leaf's successor is the
/// next sibling of the nearest ancestor (itself included) that has one.
/// A filter never prunes the walk: a matching descendant of a
/// non-matching item is still found.
///
/// # Examples
///
/// ```
/// use eda_core::{Navigator, Placement, WorkItem, WorkTree};
///
/// let mut tree = WorkTree::new(WorkItem::new("Order")?);
/// let root = tree.root();
/// let line = tree.add_child(root, WorkItem::new("LineItem")?, Placement::Last)?;
/// let note = tree.add_child(line, WorkItem::new("Note")?, Placement::Last)?;
///
/// let notes = Navigator::new(&tree).with_type("Note")?;
/// assert_eq!(notes.next(root)?, Some(note));
/// assert_eq!(notes.next(note)?, None);
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Navigator<'t> {
    tree: &'t WorkTree,
    type_filter: Option<WorkItemType>,
}

impl<'t> Navigator<'t> {
    /// Navigator over every item of `tree`.
    pub fn new(tree: &'t WorkTree) -> Self {
        Self {
            tree,
            type_filter: None,
        }
    }

    /// Restricts results to items of one type.
    pub fn with_type(mut self, workitem_type: impl AsRef<str>) -> Result<Self, WorkItemError> {
        self.type_filter = Some(WorkItemType::new(workitem_type.as_ref())?);
        Ok(self)
    }

    pub fn type_filter(&self) -> Option<&WorkItemType> {
        self.type_filter.as_ref()
    }

    /// Returns the next matching item after `from`, or `None` at the end.
    pub fn next(&self, from: WorkItemId) -> Result<Option<WorkItemId>, WorkItemError> {
        let mut cursor = from;
        while let Some(candidate) = self.successor(cursor)? {
            if self.matches(candidate)? {
                return Ok(Some(candidate));
            }
            cursor = candidate;
        }
        Ok(None)
    }

    /// Iterates every matching item after `from` in document order.
    pub fn walk(&self, from: WorkItemId) -> Result<Walk<'_, 't>, WorkItemError> {
        self.tree.item(from)?;
        Ok(Walk {
            navigator: self,
            cursor: Some(from),
        })
    }

    fn matches(&self, id: WorkItemId) -> Result<bool, WorkItemError> {
        Ok(match &self.type_filter {
            Some(filter) => self.tree.item(id)?.workitem_type() == filter,
            None => true,
        })
    }

    fn successor(&self, id: WorkItemId) -> Result<Option<WorkItemId>, WorkItemError> {
        if let Some(first) = self.tree.item(id)?.children().first() {
            return Ok(Some(*first));
        }
        let mut current = id;
        while let Some(parent) = self.tree.item(current)?.parent() {
            let siblings = self.tree.item(parent)?.children();
            let next = siblings
                .iter()
                .position(|c| *c == current)
                .and_then(|position| siblings.get(position + 1));
            if let Some(next) = next {
                return Ok(Some(*next));
            }
            current = parent;
        }
        Ok(None)
    }
}

/// Iterator returned by [`Navigator::walk`].
#[derive(Debug)]
pub struct Walk<'n, 't> {
    navigator: &'n Navigator<'t>,
    cursor: Option<WorkItemId>,
}

impl Iterator for Walk<'_, '_> {
    type Item = WorkItemId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.navigator.next(current).ok().flatten();
        self.cursor
    }
}

impl WorkTree {
    /// Next item after `from` in document order, optionally of one type.
    ///
    /// `None` means the traversal has reached its end.
    pub fn next(
        &self,
        from: WorkItemId,
        type_filter: Option<&str>,
    ) -> Result<Option<WorkItemId>, WorkItemError> {
        let navigator = match type_filter {
            Some(workitem_type) => Navigator::new(self).with_type(workitem_type)?,
            None => Navigator::new(self),
        };
        navigator.next(from)
    }
}

//! Workflow schema: which child types each work item type may hold.

use crate::config::{SchemaConfig, UnknownTypePolicy};
use crate::error::WorkItemError;
use crate::item::WorkItem;
use crate::item_type::WorkItemType;
use crate::tree::WorkTree;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Cardinality rule for one child type under one parent type.
///
/// `max_cardinality` of `None` means unbounded; `Some(0)` forbids the
/// child type outright.
///
/// # Examples
///
/// ```
/// use eda_core::{ChildSchema, WorkItemType};
///
/// let line_items = ChildSchema::new(WorkItemType::new("LineItem")?, 1, None)?;
/// assert!(line_items.admits(1));
/// assert!(!line_items.admits(0));
///
/// // min above max is rejected
/// assert!(ChildSchema::new(WorkItemType::new("Note")?, 3, Some(2)).is_err());
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSchema {
    workitem_type: WorkItemType,
    min_cardinality: usize,
    max_cardinality: Option<usize>,
}

impl ChildSchema {
    /// Creates a rule, rejecting `min > max`.
    pub fn new(
        workitem_type: WorkItemType,
        min_cardinality: usize,
        max_cardinality: Option<usize>,
    ) -> Result<Self, WorkItemError> {
        if max_cardinality.is_some_and(|max| min_cardinality > max) {
            return Err(WorkItemError::Schema(format!(
                "rule for '{}' has min_cardinality {} above max_cardinality {}",
                workitem_type,
                min_cardinality,
                fmt_max(max_cardinality)
            )));
        }
        Ok(Self {
            workitem_type,
            min_cardinality,
            max_cardinality,
        })
    }

    /// Rule with a lower bound and no upper bound.
    pub fn at_least(workitem_type: WorkItemType, min_cardinality: usize) -> Self {
        Self {
            workitem_type,
            min_cardinality,
            max_cardinality: None,
        }
    }

    /// Rule requiring exactly `count` children.
    pub fn exactly(workitem_type: WorkItemType, count: usize) -> Self {
        Self {
            workitem_type,
            min_cardinality: count,
            max_cardinality: Some(count),
        }
    }

    /// Rule that documents a child type as not allowed.
    pub fn forbidden(workitem_type: WorkItemType) -> Self {
        Self::exactly(workitem_type, 0)
    }

    /// The child type this rule governs.
    pub fn workitem_type(&self) -> &WorkItemType {
        &self.workitem_type
    }

    pub fn min_cardinality(&self) -> usize {
        self.min_cardinality
    }

    /// Upper bound, `None` when unbounded.
    pub fn max_cardinality(&self) -> Option<usize> {
        self.max_cardinality
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_cardinality.is_none()
    }

    /// Returns `true` if `count` children of this type satisfy the rule.
    pub fn admits(&self, count: usize) -> bool {
        count >= self.min_cardinality && self.max_cardinality.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for ChildSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}..{}]",
            self.workitem_type,
            self.min_cardinality,
            fmt_max(self.max_cardinality)
        )
    }
}

fn fmt_max(max: Option<usize>) -> String {
    max.map_or_else(|| "*".to_string(), |max| max.to_string())
}

/// Registry of work item types and the child rules of each parent type.
///
/// A `WorkflowSchema` is valid whenever it is observable: every path that
/// builds or changes one runs the same checks as [`validate`](Self::validate).
///
/// # Examples
///
/// ```
/// use eda_core::WorkflowSchema;
///
/// let schema = WorkflowSchema::builder()
///     .child_schema("Order", "LineItem", 1, None)
///     .child_schema("LineItem", "Note", 0, Some(3))
///     .build()?;
///
/// assert!(schema.contains_type("Note"));
/// assert!(schema.is_governed("Order"));
/// assert!(!schema.is_governed("Note"));
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkflowSchema {
    workitem_types: BTreeSet<WorkItemType>,
    child_schemas: BTreeMap<WorkItemType, Vec<ChildSchema>>,
    config: SchemaConfig,
}

impl PartialEq for WorkflowSchema {
    fn eq(&self, other: &Self) -> bool {
        self.workitem_types == other.workitem_types && self.child_schemas == other.child_schemas
    }
}

impl Eq for WorkflowSchema {}

impl WorkflowSchema {
    /// Creates an empty schema with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty schema with the given settings.
    pub fn with_config(config: SchemaConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Creates a new schema builder.
    pub fn builder() -> WorkflowSchemaBuilder {
        WorkflowSchemaBuilder::new()
    }

    pub fn config(&self) -> SchemaConfig {
        self.config
    }

    /// Returns all registered types in name order.
    pub fn workitem_types(&self) -> impl Iterator<Item = &WorkItemType> {
        self.workitem_types.iter()
    }

    /// Returns every parent type that has rules, with its rules in order.
    pub fn all_child_schemas(&self) -> impl Iterator<Item = (&WorkItemType, &[ChildSchema])> {
        self.child_schemas
            .iter()
            .map(|(parent, rules)| (parent, rules.as_slice()))
    }

    /// Returns `true` if the type is registered.
    pub fn contains_type(&self, workitem_type: &str) -> bool {
        self.workitem_types.contains(workitem_type)
    }

    /// Returns the ordered rules for a parent type (empty if none).
    pub fn child_schemas(&self, parent: &str) -> &[ChildSchema] {
        self.child_schemas
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the rule for one child type under one parent type.
    pub fn child_schema(&self, parent: &str, child: &str) -> Option<&ChildSchema> {
        self.child_schemas(parent)
            .iter()
            .find(|rule| rule.workitem_type == *child)
    }

    /// Returns `true` if at least one rule exists for the parent type.
    pub fn is_governed(&self, parent: &str) -> bool {
        !self.child_schemas(parent).is_empty()
    }

    /// Registers a type name.
    pub fn register_type(
        &mut self,
        workitem_type: impl AsRef<str>,
    ) -> Result<WorkItemType, WorkItemError> {
        let workitem_type = WorkItemType::new(workitem_type.as_ref())?;
        self.workitem_types.insert(workitem_type.clone());
        Ok(workitem_type)
    }

    /// Appends a rule to a parent type's rule list.
    ///
    /// Undeclared types are handled per [`SchemaConfig::unknown_types`]. A
    /// second rule for the same child type, or a rule that makes required
    /// children recursive, is rejected and the schema is left unchanged.
    pub fn add_child_schema(
        &mut self,
        parent: WorkItemType,
        rule: ChildSchema,
    ) -> Result<(), WorkItemError> {
        if self.child_schema(parent.as_str(), rule.workitem_type.as_str()).is_some() {
            return Err(duplicate_rule(&parent, &rule.workitem_type));
        }

        let mut unknown = Vec::new();
        for workitem_type in [&parent, &rule.workitem_type] {
            if !self.workitem_types.contains(workitem_type) && !unknown.contains(&workitem_type) {
                unknown.push(workitem_type);
            }
        }
        if !unknown.is_empty() && self.config.unknown_types == UnknownTypePolicy::Reject {
            return Err(undeclared_types(unknown));
        }
        let unknown: Vec<WorkItemType> = unknown.into_iter().cloned().collect();

        let rules = self.child_schemas.entry(parent.clone()).or_default();
        rules.push(rule);
        if let Some(cycle) = self.find_required_cycle() {
            if let Some(rules) = self.child_schemas.get_mut(&parent) {
                rules.pop();
                if rules.is_empty() {
                    self.child_schemas.remove(&parent);
                }
            }
            return Err(required_cycle(&cycle));
        }

        self.workitem_types.extend(unknown);
        Ok(())
    }

    /// Checks internal consistency.
    ///
    /// - every rule has `min_cardinality <= max_cardinality`
    /// - no parent has two rules for the same child type
    /// - every referenced type is registered; missing ones are registered
    ///   or reported depending on [`SchemaConfig::unknown_types`]
    /// - rules with `min_cardinality > 0` do not form a cycle
    pub fn validate(&mut self) -> Result<(), WorkItemError> {
        let mut missing = BTreeSet::new();
        for (parent, rules) in &self.child_schemas {
            let mut seen = HashSet::new();
            for rule in rules {
                if rule
                    .max_cardinality
                    .is_some_and(|max| rule.min_cardinality > max)
                {
                    return Err(WorkItemError::Schema(format!(
                        "rule '{}' under '{}' has min above max",
                        rule, parent
                    )));
                }
                if !seen.insert(&rule.workitem_type) {
                    return Err(duplicate_rule(parent, &rule.workitem_type));
                }
            }
            for workitem_type in std::iter::once(parent).chain(rules.iter().map(|r| &r.workitem_type))
            {
                if !self.workitem_types.contains(workitem_type) {
                    missing.insert(workitem_type.clone());
                }
            }
        }

        if !missing.is_empty() && self.config.unknown_types == UnknownTypePolicy::Reject {
            return Err(undeclared_types(missing.iter()));
        }
        if let Some(cycle) = self.find_required_cycle() {
            return Err(required_cycle(&cycle));
        }

        self.workitem_types.extend(missing);
        Ok(())
    }

    /// Builds a work item of the given type with all required children.
    ///
    /// The item becomes the root of a new tree bound to this schema. To
    /// attach it under an existing item use [`WorkTree::create_workitem`].
    pub fn create_workitem(
        self: &Arc<Self>,
        workitem_type: impl AsRef<str>,
    ) -> Result<WorkTree, WorkItemError> {
        let workitem_type = WorkItemType::new(workitem_type.as_ref())?;
        if !self.contains_type(workitem_type.as_str()) {
            return Err(WorkItemError::UnknownType(workitem_type));
        }
        let mut tree = WorkTree::with_schema(WorkItem::from_type(workitem_type), Arc::clone(self));
        tree.ensure_minimum_children(tree.root())?;
        Ok(tree)
    }

    /// Fails if one more `child` under `parent` would break a rule.
    pub(crate) fn check_add(
        &self,
        parent: &WorkItemType,
        child: &WorkItemType,
        current: usize,
    ) -> Result<(), WorkItemError> {
        if !self.is_governed(parent.as_str()) {
            return Ok(());
        }
        match self.child_schema(parent.as_str(), child.as_str()) {
            None => Err(WorkItemError::ConstraintViolation {
                parent: parent.clone(),
                child: child.clone(),
                details: "no rule allows this child type".to_string(),
            }),
            Some(rule) if rule.max_cardinality.is_some_and(|max| current >= max) => {
                Err(WorkItemError::ConstraintViolation {
                    parent: parent.clone(),
                    child: child.clone(),
                    details: format!(
                        "at most {} allowed, {} present",
                        fmt_max(rule.max_cardinality),
                        current
                    ),
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Fails if removing `removing` of `current` children would break a rule.
    pub(crate) fn check_remove(
        &self,
        parent: &WorkItemType,
        child: &WorkItemType,
        current: usize,
        removing: usize,
    ) -> Result<(), WorkItemError> {
        match self.child_schema(parent.as_str(), child.as_str()) {
            Some(rule) if current.saturating_sub(removing) < rule.min_cardinality => {
                Err(WorkItemError::ConstraintViolation {
                    parent: parent.clone(),
                    child: child.clone(),
                    details: format!(
                        "at least {} required, removal would leave {}",
                        rule.min_cardinality,
                        current.saturating_sub(removing)
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    fn find_required_cycle(&self) -> Option<WorkItemType> {
        let mut marks = HashMap::new();
        self.child_schemas
            .keys()
            .find_map(|parent| self.visit_required(parent, &mut marks))
            .cloned()
    }

    fn visit_required<'a>(
        &'a self,
        workitem_type: &'a WorkItemType,
        marks: &mut HashMap<&'a WorkItemType, Visit>,
    ) -> Option<&'a WorkItemType> {
        match marks.get(workitem_type) {
            Some(Visit::InProgress) => return Some(workitem_type),
            Some(Visit::Done) => return None,
            None => {}
        }
        marks.insert(workitem_type, Visit::InProgress);
        for rule in self.child_schemas(workitem_type.as_str()) {
            if rule.min_cardinality > 0 {
                if let Some(found) = self.visit_required(&rule.workitem_type, marks) {
                    return Some(found);
                }
            }
        }
        marks.insert(workitem_type, Visit::Done);
        None
    }
}

#[derive(Clone, Copy)]
enum Visit {
    InProgress,
    Done,
}

fn duplicate_rule(parent: &WorkItemType, child: &WorkItemType) -> WorkItemError {
    WorkItemError::Schema(format!(
        "'{}' has more than one rule for child type '{}'",
        parent, child
    ))
}

fn undeclared_types<'a>(types: impl IntoIterator<Item = &'a WorkItemType>) -> WorkItemError {
    let names: Vec<&str> = types.into_iter().map(WorkItemType::as_str).collect();
    WorkItemError::Schema(format!("undeclared work item types: {}", names.join(", ")))
}

fn required_cycle(at: &WorkItemType) -> WorkItemError {
    WorkItemError::Schema(format!(
        "required children of '{}' lead back to itself",
        at
    ))
}

/// Builder for constructing [`WorkflowSchema`] instances.
///
/// Names are validated when [`build`](Self::build) runs.
#[derive(Debug, Default)]
pub struct WorkflowSchemaBuilder {
    workitem_types: Vec<String>,
    child_schemas: Vec<RuleDraft>,
    config: SchemaConfig,
}

#[derive(Debug)]
struct RuleDraft {
    parent: String,
    child: String,
    min_cardinality: usize,
    max_cardinality: Option<usize>,
}

impl WorkflowSchemaBuilder {
    /// Creates a new empty schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type.
    pub fn workitem_type(mut self, workitem_type: impl Into<String>) -> Self {
        self.workitem_types.push(workitem_type.into());
        self
    }

    /// Adds a child rule; `max_cardinality` of `None` means unbounded.
    pub fn child_schema(
        mut self,
        parent: impl Into<String>,
        child: impl Into<String>,
        min_cardinality: usize,
        max_cardinality: Option<usize>,
    ) -> Self {
        self.child_schemas.push(RuleDraft {
            parent: parent.into(),
            child: child.into(),
            min_cardinality,
            max_cardinality,
        });
        self
    }

    /// Sets the schema configuration.
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds and validates the schema.
    pub fn build(self) -> Result<WorkflowSchema, WorkItemError> {
        let mut schema = WorkflowSchema::with_config(self.config);
        for name in self.workitem_types {
            schema.register_type(name)?;
        }
        for draft in self.child_schemas {
            let parent = WorkItemType::new(draft.parent)?;
            let rule = ChildSchema::new(
                WorkItemType::new(draft.child)?,
                draft.min_cardinality,
                draft.max_cardinality,
            )?;
            schema.child_schemas.entry(parent).or_default().push(rule);
        }
        schema.validate()?;
        Ok(schema)
    }
}

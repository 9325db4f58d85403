//! JSON form of a [`WorkflowSchema`].
//!
//! ```json
//! {
//!   "workitem_types": ["LineItem", "Note", "Order"],
//!   "child_schemas": {
//!     "Order": [
//!       { "child_type": "LineItem", "min_cardinality": 1, "max_cardinality": null }
//!     ]
//!   }
//! }
//! ```
//!
//! A `max_cardinality` that is `null` or absent is unbounded.

use crate::config::SchemaConfig;
use crate::error::WorkItemError;
use crate::schema::WorkflowSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    workitem_types: Vec<String>,
    #[serde(default)]
    child_schemas: BTreeMap<String, Vec<RuleDocument>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDocument {
    child_type: String,
    #[serde(default)]
    min_cardinality: usize,
    #[serde(default)]
    max_cardinality: Option<usize>,
}

impl WorkflowSchema {
    /// Serializes the schema as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, WorkItemError> {
        let document = SchemaDocument {
            workitem_types: self
                .workitem_types()
                .map(|t| t.as_str().to_string())
                .collect(),
            child_schemas: self
                .all_child_schemas()
                .map(|(parent, rules)| {
                    let rules = rules
                        .iter()
                        .map(|rule| RuleDocument {
                            child_type: rule.workitem_type().as_str().to_string(),
                            min_cardinality: rule.min_cardinality(),
                            max_cardinality: rule.max_cardinality(),
                        })
                        .collect();
                    (parent.as_str().to_string(), rules)
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parses a schema document with default settings.
    pub fn from_json(json: &str) -> Result<Self, WorkItemError> {
        Self::from_json_with(json, SchemaConfig::default())
    }

    /// Parses a schema document and validates it under `config`.
    pub fn from_json_with(json: &str, config: SchemaConfig) -> Result<Self, WorkItemError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        let mut builder = WorkflowSchema::builder().config(config);
        for name in document.workitem_types {
            builder = builder.workitem_type(name);
        }
        for (parent, rules) in document.child_schemas {
            for rule in rules {
                builder = builder.child_schema(
                    parent.as_str(),
                    rule.child_type,
                    rule.min_cardinality,
                    rule.max_cardinality,
                );
            }
        }
        builder.build()
    }
}

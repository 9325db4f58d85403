//! Loading and saving schema documents.

use crate::error::EngineError;
use eda_core::{SchemaConfig, WorkflowSchema};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads and validates a schema document with default settings.
pub fn load_schema(path: impl AsRef<Path>) -> Result<WorkflowSchema, EngineError> {
    load_schema_with(path, SchemaConfig::default())
}

/// Reads and validates a schema document under `config`.
pub fn load_schema_with(
    path: impl AsRef<Path>,
    config: SchemaConfig,
) -> Result<WorkflowSchema, EngineError> {
    let path = path.as_ref();
    let body = fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let schema = WorkflowSchema::from_json_with(&body, config)?;
    debug!(
        "Loaded schema from {} ({} types)",
        path.display(),
        schema.workitem_types().count()
    );
    Ok(schema)
}

/// Writes a schema as pretty JSON, creating parent directories.
pub fn save_schema(schema: &WorkflowSchema, path: impl AsRef<Path>) -> Result<(), EngineError> {
    let path = path.as_ref();
    let body = schema.to_json()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| EngineError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(path, body).map_err(|source| EngineError::Write {
        path: path.display().to_string(),
        source,
    })?;
    debug!("Saved schema to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eda_core::ErrorKind;

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/schemas/order.json");
        let schema = WorkflowSchema::builder()
            .child_schema("Order", "LineItem", 1, None)
            .build()
            .expect("valid schema");

        save_schema(&schema, &path).expect("saved");
        assert!(path.exists());
        assert_eq!(load_schema(&path).expect("loaded"), schema);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = load_schema(dir.path().join("missing.json")).expect_err("no file");
        assert!(matches!(err, EngineError::Read { .. }));

        let path = dir.path().join("broken.json");
        fs::write(&path, "{").expect("written");
        let err = load_schema(&path).expect_err("malformed");
        assert_eq!(err.kind(), Some(ErrorKind::Schema));
    }
}

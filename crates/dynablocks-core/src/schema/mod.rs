//! Block schema model, loading and validation.
//!
//! Schemas arrive as a JSON (or YAML) array of blocks. They are validated
//! structurally first, then decoded into typed structs.

mod diagnostics;
mod model;
mod validator;

pub use diagnostics::{diagnose, is_valid_schema, DiagnosticsError};
pub use model::{
    AllowedValues, BlockDependency, BlockSchema, BlockSet, ConditionKind, ConditionSpec,
    ControlDependencyMap, FieldSchema, FieldType, DYNAMIC_FIELD_PREFIX,
};
pub use validator::{ErrorKind, SchemaValidator, ValidationError};

use thiserror::Error;

/// Errors that can occur when loading a block schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl SchemaError {
    /// Taxonomy branch of this error. Decode and I/O failures count as
    /// structural.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Validation(e) => e.kind(),
            _ => ErrorKind::SchemaStructure,
        }
    }
}

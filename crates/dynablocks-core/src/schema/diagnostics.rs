//! Exhaustive schema diagnostics backed by JSON Schema.
//!
//! [`SchemaValidator`](super::SchemaValidator) stops at the first violation;
//! this module reports every structural problem at once, with instance
//! paths, for tooling such as `dynablocks check --all`.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded dynamic blocks schema (loaded at compile time).
const BLOCKS_SCHEMA_JSON: &str = include_str!("../../schema/dynamic_blocks.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from loading the embedded schema.
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, DiagnosticsError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(BLOCKS_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(DiagnosticsError::LoadError(e.clone())),
    }
}

/// Report every schema violation in `blocks`.
///
/// Returns an empty list for a structurally valid schema.
pub fn diagnose(blocks: &serde_json::Value) -> Result<Vec<String>, DiagnosticsError> {
    let validator = get_validator()?;

    Ok(validator
        .iter_errors(blocks)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                format!("{} at /", e)
            } else {
                format!("{} at {}", e, path)
            }
        })
        .collect())
}

/// Whether `blocks` passes the embedded JSON Schema.
pub fn is_valid_schema(blocks: &serde_json::Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(blocks))
        .unwrap_or(false)
}

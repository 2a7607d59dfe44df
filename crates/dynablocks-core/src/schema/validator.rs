//! Fail-fast structural validation of raw block schemas.
//!
//! Runs on the raw JSON value, before typed decoding, so an absent property
//! is distinguishable from an empty one. The first violation aborts.

use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{ConditionKind, FieldType};

const REQUIRED_BLOCK_PROPERTIES: [&str; 3] = ["id", "title", "fields"];
const REQUIRED_FIELD_PROPERTIES: [&str; 3] = ["name", "type", "label"];

/// Branch of the schema error taxonomy a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed block/field structure
    SchemaStructure,
    /// Malformed dependency declarations
    DependencySpec,
}

/// A structural violation in a block schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid block structure at {location}: {reason}")]
    InvalidBlockShape { location: String, reason: String },

    #[error("Block {index} is missing required property `{property}` (requires id, title, fields)")]
    MissingBlockField { index: usize, property: &'static str },

    #[error("Field {index} of block `{block}` is missing required property `{property}` (requires name, type, label)")]
    MissingFieldProperty {
        block: String,
        index: usize,
        property: &'static str,
    },

    #[error("Invalid field type `{found}` for field `{field}` in block `{block}`. Must be one of: text, select, textarea, checkbox")]
    InvalidFieldType {
        block: String,
        field: String,
        found: String,
    },

    #[error("Select field `{field}` in block `{block}` must have an options array")]
    MissingSelectOptions { block: String, field: String },

    #[error("Dependencies for `{target}` in block `{block}` must be an array")]
    InvalidDependencyShape { block: String, target: String },

    #[error("Invalid condition `{condition}` for `{target}` in block `{block}`")]
    InvalidCondition {
        block: String,
        target: String,
        condition: String,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidDependencyShape { .. }
            | ValidationError::InvalidCondition { .. } => ErrorKind::DependencySpec,
            _ => ErrorKind::SchemaStructure,
        }
    }
}

/// Validates block schemas before any rule evaluation.
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a schema root: an array of blocks.
    pub fn validate(&self, blocks: &Value) -> Result<(), ValidationError> {
        let blocks = blocks
            .as_array()
            .ok_or_else(|| ValidationError::InvalidBlockShape {
                location: "root".to_string(),
                reason: "schema must be an array of blocks".to_string(),
            })?;

        for (index, block) in blocks.iter().enumerate() {
            self.validate_block(index, block)?;
        }

        Ok(())
    }

    /// Validate a single block and its fields.
    pub fn validate_block(&self, index: usize, block: &Value) -> Result<(), ValidationError> {
        let block = block
            .as_object()
            .ok_or_else(|| ValidationError::InvalidBlockShape {
                location: format!("block {}", index),
                reason: "block must be an object".to_string(),
            })?;

        if let Some(property) = first_missing(block, &REQUIRED_BLOCK_PROPERTIES) {
            return Err(ValidationError::MissingBlockField { index, property });
        }

        let block_id = display_id(&block["id"]);

        let fields = block["fields"]
            .as_array()
            .ok_or_else(|| ValidationError::InvalidBlockShape {
                location: format!("block `{}`", block_id),
                reason: "fields must be an array".to_string(),
            })?;

        for (field_index, field) in fields.iter().enumerate() {
            self.validate_field(&block_id, field_index, field)?;
        }

        match block.get("dependencies") {
            None | Some(Value::Null) => Ok(()),
            Some(dependencies) => self.validate_dependencies(&block_id, dependencies),
        }
    }

    fn validate_field(
        &self,
        block_id: &str,
        index: usize,
        field: &Value,
    ) -> Result<(), ValidationError> {
        let field = field
            .as_object()
            .ok_or_else(|| ValidationError::InvalidBlockShape {
                location: format!("block `{}` field {}", block_id, index),
                reason: "field must be an object".to_string(),
            })?;

        if let Some(property) = first_missing(field, &REQUIRED_FIELD_PROPERTIES) {
            return Err(ValidationError::MissingFieldProperty {
                block: block_id.to_string(),
                index,
                property,
            });
        }

        let field_type = field["type"].as_str().and_then(FieldType::from_tag);
        let field_name = display_id(&field["name"]);

        match field_type {
            None => Err(ValidationError::InvalidFieldType {
                block: block_id.to_string(),
                field: field_name,
                found: display_id(&field["type"]),
            }),
            Some(FieldType::Select) if !field.get("options").is_some_and(Value::is_array) => {
                Err(ValidationError::MissingSelectOptions {
                    block: block_id.to_string(),
                    field: field_name,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Validate a block's `dependencies` mapping.
    ///
    /// Only the condition kinds in [`ConditionKind::SCHEMA_ACCEPTED`] pass;
    /// `in`/`not_in` are rejected here even though the evaluator supports them.
    pub fn validate_dependencies(
        &self,
        block_id: &str,
        dependencies: &Value,
    ) -> Result<(), ValidationError> {
        let dependencies =
            dependencies
                .as_object()
                .ok_or_else(|| ValidationError::InvalidDependencyShape {
                    block: block_id.to_string(),
                    target: "<dependencies>".to_string(),
                })?;

        for (target, conditions) in dependencies {
            let conditions =
                conditions
                    .as_array()
                    .ok_or_else(|| ValidationError::InvalidDependencyShape {
                        block: block_id.to_string(),
                        target: target.clone(),
                    })?;

            for condition in conditions {
                let tag = condition.get("condition");
                let accepted = tag
                    .and_then(Value::as_str)
                    .map(|t| ConditionKind::parse(t).is_schema_accepted())
                    .unwrap_or(false);

                if !accepted {
                    return Err(ValidationError::InvalidCondition {
                        block: block_id.to_string(),
                        target: target.clone(),
                        condition: tag.map(display_id).unwrap_or_else(|| "undefined".to_string()),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn first_missing(object: &Map<String, Value>, required: &[&'static str]) -> Option<&'static str> {
    required
        .iter()
        .copied()
        .find(|property| !object.contains_key(*property))
}

fn display_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_block() -> Value {
        json!({
            "id": "claimant",
            "title": "Claimant",
            "fields": [
                { "name": "name", "type": "text", "label": "Name" },
                { "name": "kind", "type": "select", "label": "Kind", "options": ["person", "company"] },
                { "name": "notes", "type": "textarea", "label": "Notes" },
                { "name": "agree", "type": "checkbox", "label": "Agree" }
            ],
            "dependencies": {
                "notes": [
                    { "condition": "equals", "field": "kind", "value": "company" },
                    { "condition": "greater_than", "field": "amount", "value": 100 }
                ]
            }
        })
    }

    fn validate(value: Value) -> Result<(), ValidationError> {
        SchemaValidator::new().validate(&value)
    }

    #[test]
    fn test_valid_schema_passes() {
        assert!(validate(json!([valid_block()])).is_ok());
        assert!(validate(json!([])).is_ok());
    }

    #[test]
    fn test_empty_fields_allowed() {
        assert!(validate(json!([{ "id": "a", "title": "A", "fields": [] }])).is_ok());
    }

    #[test]
    fn test_missing_block_properties() {
        for property in REQUIRED_BLOCK_PROPERTIES {
            let mut block = valid_block();
            block.as_object_mut().unwrap().remove(property);
            let err = validate(json!([valid_block(), block])).unwrap_err();
            assert_eq!(err, ValidationError::MissingBlockField { index: 1, property });
            assert_eq!(err.kind(), ErrorKind::SchemaStructure);
        }
    }

    #[test]
    fn test_missing_field_properties() {
        for property in REQUIRED_FIELD_PROPERTIES {
            let mut block = valid_block();
            block["fields"][2].as_object_mut().unwrap().remove(property);
            let err = validate(json!([block])).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::MissingFieldProperty { index: 2, property: p, .. } if p == property
            ));
        }
    }

    #[test]
    fn test_invalid_field_type() {
        let mut block = valid_block();
        block["fields"][0]["type"] = json!("radio");
        let err = validate(json!([block])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFieldType {
                block: "claimant".to_string(),
                field: "name".to_string(),
                found: "radio".to_string(),
            }
        );
    }

    #[test]
    fn test_select_requires_options_array() {
        let mut missing = valid_block();
        missing["fields"][1].as_object_mut().unwrap().remove("options");
        assert!(matches!(
            validate(json!([missing])),
            Err(ValidationError::MissingSelectOptions { .. })
        ));

        let mut not_array = valid_block();
        not_array["fields"][1]["options"] = json!("person,company");
        assert!(matches!(
            validate(json!([not_array])),
            Err(ValidationError::MissingSelectOptions { .. })
        ));

        let mut empty = valid_block();
        empty["fields"][1]["options"] = json!([]);
        assert!(validate(json!([empty])).is_ok());
    }

    #[test]
    fn test_options_irrelevant_for_other_types() {
        let mut block = valid_block();
        block["fields"][0]["options"] = json!("not an array");
        assert!(validate(json!([block])).is_ok());
    }

    #[test]
    fn test_dependency_conditions_must_be_array() {
        let mut block = valid_block();
        block["dependencies"]["notes"] = json!({ "condition": "equals" });
        let err = validate(json!([block])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencySpec);
        assert!(matches!(err, ValidationError::InvalidDependencyShape { target, .. } if target == "notes"));
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let mut block = valid_block();
        block["dependencies"]["notes"][0]["condition"] = json!("matches");
        let err = validate(json!([block])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCondition { condition, .. } if condition == "matches"));
    }

    #[test]
    fn test_missing_condition_rejected() {
        let mut block = valid_block();
        block["dependencies"]["notes"][0].as_object_mut().unwrap().remove("condition");
        assert!(matches!(
            validate(json!([block])),
            Err(ValidationError::InvalidCondition { condition, .. }) if condition == "undefined"
        ));
    }

    // `in` / `not_in` are evaluated at runtime but rejected at schema-check
    // time; both behaviors are kept as-is.
    #[test]
    fn test_membership_conditions_rejected_by_validator() {
        for kind in ["in", "not_in"] {
            let mut block = valid_block();
            block["dependencies"]["notes"] =
                json!([{ "condition": kind, "field": "kind", "values": ["company"] }]);
            assert!(matches!(
                validate(json!([block])),
                Err(ValidationError::InvalidCondition { .. })
            ));
        }
    }

    #[test]
    fn test_null_dependencies_skipped() {
        let mut block = valid_block();
        block["dependencies"] = Value::Null;
        assert!(validate(json!([block])).is_ok());
    }

    #[test]
    fn test_fail_fast_reports_first_violation() {
        let mut first = valid_block();
        first["fields"][0]["type"] = json!("radio");
        let second = json!({ "title": "no id" });
        let err = validate(json!([first, second])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFieldType { .. }));
    }

    #[test]
    fn test_root_must_be_array() {
        assert!(matches!(
            validate(json!({ "id": "a" })),
            Err(ValidationError::InvalidBlockShape { .. })
        ));
    }

    #[test]
    fn test_validation_does_not_mutate() {
        let schema = json!([valid_block()]);
        let before = schema.clone();
        validate(schema.clone()).unwrap();
        assert_eq!(schema, before);
    }
}

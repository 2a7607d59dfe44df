//! Typed dynamic block schema.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::validator::SchemaValidator;
use super::SchemaError;

/// Prefix used for the form control names of block fields.
pub const DYNAMIC_FIELD_PREFIX: &str = "dynamic";

/// Kind of form input a field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Select,
    Textarea,
    Checkbox,
}

impl FieldType {
    /// Every accepted type tag, in declaration order.
    pub const ALL: [FieldType; 4] = [
        FieldType::Text,
        FieldType::Select,
        FieldType::Textarea,
        FieldType::Checkbox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
        }
    }

    /// Look up a type tag; `None` for anything outside the fixed set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a dependency condition.
///
/// Unknown tags decode into [`ConditionKind::Unrecognized`] instead of failing,
/// so runtime evaluation can fail closed while schema validation still
/// rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionKind {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    In,
    NotIn,
    Unrecognized(String),
}

impl ConditionKind {
    /// Kinds accepted by schema validation for block `dependencies`.
    ///
    /// `in` and `not_in` are evaluated at runtime but are not part of this set.
    pub const SCHEMA_ACCEPTED: [&'static str; 5] =
        ["equals", "not_equals", "contains", "greater_than", "less_than"];

    pub fn parse(tag: &str) -> Self {
        match tag {
            "equals" => ConditionKind::Equals,
            "not_equals" => ConditionKind::NotEquals,
            "contains" => ConditionKind::Contains,
            "greater_than" => ConditionKind::GreaterThan,
            "less_than" => ConditionKind::LessThan,
            "in" => ConditionKind::In,
            "not_in" => ConditionKind::NotIn,
            other => ConditionKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConditionKind::Equals => "equals",
            ConditionKind::NotEquals => "not_equals",
            ConditionKind::Contains => "contains",
            ConditionKind::GreaterThan => "greater_than",
            ConditionKind::LessThan => "less_than",
            ConditionKind::In => "in",
            ConditionKind::NotIn => "not_in",
            ConditionKind::Unrecognized(tag) => tag,
        }
    }

    /// Whether schema validation accepts this kind.
    pub fn is_schema_accepted(&self) -> bool {
        Self::SCHEMA_ACCEPTED.contains(&self.as_str())
            && !matches!(self, ConditionKind::Unrecognized(_))
    }
}

impl From<String> for ConditionKind {
    fn from(tag: String) -> Self {
        ConditionKind::parse(&tag)
    }
}

impl From<ConditionKind> for String {
    fn from(kind: ConditionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dependency condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Comparison operator
    pub condition: ConditionKind,

    /// Operand for scalar comparisons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Operand list for `in` / `not_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,

    /// Name of the controlling form field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Whether meeting the condition makes the target required
    #[serde(default)]
    pub required: bool,
}

impl ConditionSpec {
    pub fn new(condition: ConditionKind) -> Self {
        Self {
            condition,
            value: None,
            values: None,
            field: None,
            required: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Dependency attached to a whole block, evaluated against one controlling field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionSpec", into = "ConditionSpec")]
pub struct BlockDependency {
    /// Controlling field name
    pub field: String,

    /// Condition evaluated against the controlling field
    pub spec: ConditionSpec,
}

impl BlockDependency {
    pub fn new(field: impl Into<String>, spec: ConditionSpec) -> Self {
        let field = field.into();
        let spec = ConditionSpec {
            field: Some(field.clone()),
            ..spec
        };
        Self { field, spec }
    }

    pub fn required(&self) -> bool {
        self.spec.required
    }
}

impl TryFrom<ConditionSpec> for BlockDependency {
    type Error = String;

    fn try_from(spec: ConditionSpec) -> Result<Self, Self::Error> {
        match spec.field.clone() {
            Some(field) => Ok(Self { field, spec }),
            None => Err("block dependency requires a `field`".to_string()),
        }
    }
}

impl From<BlockDependency> for ConditionSpec {
    fn from(dependency: BlockDependency) -> Self {
        dependency.spec
    }
}

/// Allow-list of control values under which a target stays enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedValues {
    pub values: Vec<String>,
}

impl AllowedValues {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Per-control map from target field name to its allow-list.
pub type ControlDependencyMap = BTreeMap<String, AllowedValues>;

fn default_true() -> bool {
    true
}

/// `options` is only checked for `select` fields, so any other shape decodes
/// as absent and non-string choices keep their form-value spelling.
fn lenient_options<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(items.iter().map(crate::condition::to_js_string).collect()),
        _ => None,
    })
}

/// A field inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name, unique within its block
    pub name: String,

    /// Input kind
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Human-readable label
    pub label: String,

    /// Choices for `select` fields
    #[serde(
        default,
        deserialize_with = "lenient_options",
        skip_serializing_if = "Option::is_none"
    )]
    pub options: Option<Vec<String>>,

    /// Whether the field starts out required
    #[serde(default = "default_true")]
    pub required: bool,

    /// Help text shown under the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Initial value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A labeled group of form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    /// Block identifier
    pub id: String,

    /// Block heading
    pub title: String,

    /// Fields in display order
    pub fields: Vec<FieldSchema>,

    /// Per-target conditions governing fields of this block
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Vec<ConditionSpec>>,

    /// Document template fragment rendered for this block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Visibility before any dependency is evaluated
    #[serde(default = "default_true")]
    pub default_visible: bool,
}

impl BlockSchema {
    /// Form control name of one of this block's fields.
    pub fn qualified_name(&self, field: &str) -> String {
        format!("{}_{}_{}", DYNAMIC_FIELD_PREFIX, self.id, field)
    }

    /// Form control names of every field in the block.
    pub fn qualified_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| self.qualified_name(&f.name))
            .collect()
    }

    /// Label shown on the form: block title and field label.
    pub fn qualified_label(&self, field: &FieldSchema) -> String {
        format!("{} - {}", self.title, field.label)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve a `dependencies` key to a form control name.
    ///
    /// Keys naming a field of this block map to its qualified name; anything
    /// else is taken as a control name verbatim.
    pub fn dependency_target(&self, key: &str) -> String {
        if self.field(key).is_some() {
            self.qualified_name(key)
        } else {
            key.to_string()
        }
    }
}

/// A validated, decoded set of blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlockSet {
    blocks: Vec<BlockSchema>,
}

impl BlockSet {
    pub fn new(blocks: Vec<BlockSchema>) -> Self {
        Self { blocks }
    }

    /// Validate a raw JSON value, then decode it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        SchemaValidator::new().validate(&value)?;
        let blocks: Vec<BlockSchema> = serde_json::from_value(value)?;
        Ok(Self { blocks })
    }

    /// Parse a block set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a block set from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a block set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a block set from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a file, picking the format from its extension (YAML for
    /// `.yaml`/`.yml`, JSON otherwise).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    pub fn blocks(&self) -> &[BlockSchema] {
        &self.blocks
    }

    pub fn get(&self, id: &str) -> Option<&BlockSchema> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockSchema> {
        self.blocks.iter()
    }
}

//! State-update instructions and resolved form state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happens to a target's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueChange {
    #[default]
    Unchanged,
    /// Value is reset to the empty string
    Cleared,
}

/// Visibility change of the block enclosing a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockToggle {
    pub block: String,
    pub visible: bool,
}

/// Rule that produced a field update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateSource {
    /// Allow-list on a source control
    Control { control: String },
    /// Conditions in a block's `dependencies` mapping
    FieldRule { block: String },
}

/// Instruction to update one field. `None` leaves a flag untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStateUpdate {
    pub target: String,
    pub source: UpdateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    pub value: ValueChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockToggle>,
}

impl FieldStateUpdate {
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }

    pub fn clears_value(&self) -> bool {
        self.value == ValueChange::Cleared
    }

    pub fn hides_block(&self) -> bool {
        self.block.as_ref().is_some_and(|b| !b.visible)
    }
}

/// Instruction to update a block and the fields inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStateUpdate {
    pub block: String,
    pub visible: bool,
    /// Condition met and the dependency marks the block required
    pub required: bool,
    /// New required flag for every field in the block, if it changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_required: Option<bool>,
    /// Fields whose values are cleared
    pub fields_to_reset: Vec<String>,
    /// Every field in the block
    pub fields: Vec<String>,
}

/// All updates produced by one evaluation pass.
///
/// Applied in a fixed order: control effects, then block visibility, then
/// field rules. Later passes win on conflicting flags, so block-level
/// visibility and required-ness override control-level enable/disable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateUpdates {
    pub control: Vec<FieldStateUpdate>,
    pub blocks: Vec<BlockStateUpdate>,
    pub field_rules: Vec<FieldStateUpdate>,
}

impl StateUpdates {
    pub fn is_empty(&self) -> bool {
        self.control.is_empty() && self.blocks.is_empty() && self.field_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.control.len() + self.blocks.len() + self.field_rules.len()
    }

    pub fn extend(&mut self, other: StateUpdates) {
        self.control.extend(other.control);
        self.blocks.extend(other.blocks);
        self.field_rules.extend(other.field_rules);
    }

    /// Hand every update to `adapter`, in priority order.
    pub fn apply_to<A: crate::adapter::FormAdapter + ?Sized>(&self, adapter: &mut A) {
        for update in &self.control {
            adapter.apply_field_state(update);
        }
        for update in &self.blocks {
            adapter.apply_block_state(update);
        }
        for update in &self.field_rules {
            adapter.apply_field_state(update);
        }
    }
}

/// Resolved state of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
    pub value: String,
}

impl FieldState {
    pub fn new(value: impl Into<String>, required: bool) -> Self {
        Self {
            visible: true,
            enabled: true,
            required,
            value: value.into(),
        }
    }
}

impl Default for FieldState {
    fn default() -> Self {
        Self::new("", false)
    }
}

/// Resolved state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub visible: bool,
}

/// Complete field and block state of a form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormState {
    pub fields: BTreeMap<String, FieldState>,
    pub blocks: BTreeMap<String, BlockState>,
}

impl FormState {
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    pub fn block(&self, id: &str) -> Option<&BlockState> {
        self.blocks.get(id)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }

    pub fn apply_field(&mut self, update: &FieldStateUpdate) {
        let field = self.fields.entry(update.target.clone()).or_default();
        if let Some(visible) = update.visible {
            field.visible = visible;
        }
        if let Some(enabled) = update.enabled {
            field.enabled = enabled;
        }
        if let Some(required) = update.required {
            field.required = required;
        }
        if update.clears_value() {
            field.value.clear();
        }
        if let Some(toggle) = &update.block {
            self.blocks
                .insert(toggle.block.clone(), BlockState { visible: toggle.visible });
        }
    }

    pub fn apply_block(&mut self, update: &BlockStateUpdate) {
        self.blocks
            .insert(update.block.clone(), BlockState { visible: update.visible });

        if let Some(required) = update.fields_required {
            for name in &update.fields {
                self.fields.entry(name.clone()).or_default().required = required;
            }
        }
        for name in &update.fields_to_reset {
            self.fields.entry(name.clone()).or_default().value.clear();
        }
    }

    /// Fold a set of updates in priority order.
    pub fn apply(&mut self, updates: &StateUpdates) {
        for update in &updates.control {
            self.apply_field(update);
        }
        for update in &updates.blocks {
            self.apply_block(update);
        }
        for update in &updates.field_rules {
            self.apply_field(update);
        }
    }
}

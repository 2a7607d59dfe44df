//! Boundary between the engine and whatever renders the form.
//!
//! The engine reads values through [`FormView`] and hands state updates to a
//! [`FormAdapter`]; it never touches presentation itself. [`InMemoryForm`] is
//! a document-free adapter used by tests and the CLI.

use std::collections::BTreeMap;

use crate::engine::{BlockStateUpdate, FieldState, FieldStateUpdate, FormState};
use crate::schema::BlockSet;

/// Read access to live form values.
pub trait FormView {
    /// Current value of a control, or `None` if no such control exists.
    fn control_value(&self, name: &str) -> Option<String>;

    /// Block enclosing a control, if any.
    fn enclosing_block(&self, name: &str) -> Option<String>;

    /// Every input field inside a block.
    fn block_fields(&self, block: &str) -> Vec<String>;
}

/// Applies computed state to the form.
pub trait FormAdapter: FormView {
    fn apply_field_state(&mut self, update: &FieldStateUpdate);

    fn apply_block_state(&mut self, update: &BlockStateUpdate);
}

/// A form held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForm {
    state: FormState,
    membership: BTreeMap<String, String>,
    block_fields: BTreeMap<String, Vec<String>>,
}

impl InMemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form with every block field of `blocks` plus any extra
    /// controls named in `values`.
    ///
    /// Block fields take their value from `values` (by qualified name), then
    /// from the field default, then the empty string.
    pub fn from_schema(blocks: &BlockSet, values: &BTreeMap<String, String>) -> Self {
        let mut form = Self::new();

        for block in blocks.iter() {
            form.add_block(&block.id, block.default_visible);
            for field in &block.fields {
                let name = block.qualified_name(&field.name);
                let value = values
                    .get(&name)
                    .cloned()
                    .or_else(|| field.default.clone())
                    .unwrap_or_default();
                form.add_field(&name, Some(&block.id), FieldState::new(value, field.required));
            }
        }

        for (name, value) in values {
            if !form.state.fields.contains_key(name) {
                form.add_field(name, None, FieldState::new(value.clone(), false));
            }
        }

        form
    }

    pub fn add_block(&mut self, id: &str, visible: bool) -> &mut Self {
        self.state
            .blocks
            .insert(id.to_string(), crate::engine::BlockState { visible });
        self.block_fields.entry(id.to_string()).or_default();
        self
    }

    pub fn add_field(&mut self, name: &str, block: Option<&str>, state: FieldState) -> &mut Self {
        self.state.fields.insert(name.to_string(), state);
        if let Some(block) = block {
            self.membership.insert(name.to_string(), block.to_string());
            let fields = self.block_fields.entry(block.to_string()).or_default();
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
        self
    }

    /// Simulate user input. Returns `false` if the control does not exist.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.state.fields.get_mut(name) {
            Some(field) => {
                field.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Current values of every control, as submitted with the form.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.state
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }
}

impl FormView for InMemoryForm {
    fn control_value(&self, name: &str) -> Option<String> {
        self.state.value(name).map(str::to_string)
    }

    fn enclosing_block(&self, name: &str) -> Option<String> {
        self.membership.get(name).cloned()
    }

    fn block_fields(&self, block: &str) -> Vec<String> {
        self.block_fields.get(block).cloned().unwrap_or_default()
    }
}

impl FormAdapter for InMemoryForm {
    fn apply_field_state(&mut self, update: &FieldStateUpdate) {
        self.state.apply_field(update);
    }

    fn apply_block_state(&mut self, update: &BlockStateUpdate) {
        self.state.apply_block(update);
    }
}

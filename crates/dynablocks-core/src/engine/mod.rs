//! Dependency engine.
//!
//! Holds the static rules of a page (the block schema plus the per-control
//! and per-block dependency bindings) and turns current field values into
//! state updates. The engine keeps no derived state: every pass recomputes
//! from the values it is given, so repeating a pass with unchanged inputs
//! yields identical updates.
//!
//! Passes are applied in a fixed priority order, see [`StateUpdates`].

mod block;
mod control;
mod field_rules;
mod state;

pub use block::compute_block_visibility;
pub use control::compute_control_effects;
pub use field_rules::{compute_field_rules, compute_field_rules_for};
pub use state::{
    BlockState, BlockStateUpdate, BlockToggle, FieldState, FieldStateUpdate, FormState,
    StateUpdates, UpdateSource, ValueChange,
};

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::adapter::{FormAdapter, FormView};
use crate::schema::{BlockDependency, BlockSet, ControlDependencyMap};

/// A dependency binding that could not be parsed.
#[derive(Error, Debug)]
pub enum DependencyParseError {
    #[error("Malformed control dependencies on `{control}`: {source}")]
    Control {
        control: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed block dependency on `{block}`: {source}")]
    Block {
        block: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DependencyParseError {
    /// Name of the control or block whose binding was skipped.
    pub fn owner(&self) -> &str {
        match self {
            DependencyParseError::Control { control, .. } => control,
            DependencyParseError::Block { block, .. } => block,
        }
    }
}

/// Evaluates every dependency of a page.
#[derive(Debug, Clone, Default)]
pub struct DependencyEngine {
    blocks: BlockSet,
    controls: BTreeMap<String, ControlDependencyMap>,
    block_rules: BTreeMap<String, BlockDependency>,
    skipped: Vec<String>,
}

impl DependencyEngine {
    pub fn builder(blocks: BlockSet) -> EngineBuilder {
        EngineBuilder::new(blocks)
    }

    pub fn blocks(&self) -> &BlockSet {
        &self.blocks
    }

    pub fn control_dependencies(&self) -> &BTreeMap<String, ControlDependencyMap> {
        &self.controls
    }

    pub fn block_dependencies(&self) -> &BTreeMap<String, BlockDependency> {
        &self.block_rules
    }

    /// Controls and blocks whose bindings were malformed and skipped.
    pub fn skipped_bindings(&self) -> &[String] {
        &self.skipped
    }

    /// Every field whose change can affect some other field or block.
    pub fn subscriptions(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = self.controls.keys().cloned().collect();
        fields.extend(self.block_rules.values().map(|d| d.field.clone()));
        fields.extend(
            self.blocks
                .iter()
                .flat_map(|b| b.dependencies.values())
                .flatten()
                .filter_map(|c| c.field.clone()),
        );
        fields
    }

    /// Compute updates for every dependent target from current values.
    pub fn evaluate_all(&self, view: &(impl FormView + ?Sized)) -> StateUpdates {
        let mut updates = StateUpdates::default();

        for (control, map) in &self.controls {
            if let Some(value) = view.control_value(control) {
                updates
                    .control
                    .extend(compute_control_effects(control, &value, map, view));
            }
        }

        for (block, dependency) in &self.block_rules {
            updates
                .blocks
                .extend(compute_block_visibility(block, dependency, view));
        }

        for block in self.blocks.iter() {
            updates.field_rules.extend(compute_field_rules(block, view));
        }

        updates
    }

    /// Compute updates for the direct dependents of `changed` only.
    ///
    /// Targets of targets are never re-evaluated, so a cleared value cannot
    /// cascade. When a control toggles the block enclosing one of its
    /// targets, that block's own rules are re-applied after it so they keep
    /// priority over the control.
    pub fn evaluate_change(&self, changed: &str, view: &(impl FormView + ?Sized)) -> StateUpdates {
        let mut updates = StateUpdates::default();

        if let (Some(map), Some(value)) = (self.controls.get(changed), view.control_value(changed)) {
            updates.control = compute_control_effects(changed, &value, map, view);
        }

        let toggled: BTreeSet<&str> = updates
            .control
            .iter()
            .filter_map(|u| u.block.as_ref().map(|b| b.block.as_str()))
            .collect();

        for (block, dependency) in &self.block_rules {
            if dependency.field == changed || toggled.contains(block.as_str()) {
                updates
                    .blocks
                    .extend(compute_block_visibility(block, dependency, view));
            }
        }

        for block in self.blocks.iter() {
            let rules = if toggled.contains(block.id.as_str()) {
                compute_field_rules(block, view)
            } else {
                compute_field_rules_for(block, changed, view)
            };
            updates.field_rules.extend(rules);
        }

        debug!(field = changed, updates = updates.len(), "change evaluated");
        updates
    }

    /// Compute and apply the initial state of every dependent target.
    pub fn initialize<A: FormAdapter + ?Sized>(&self, adapter: &mut A) -> StateUpdates {
        let updates = self.evaluate_all(&*adapter);
        updates.apply_to(adapter);
        updates
    }

    /// Handle a value change of one field.
    ///
    /// All updates are computed against the values as they were when the
    /// change fired, then applied in priority order.
    pub fn on_change<A: FormAdapter + ?Sized>(&self, changed: &str, adapter: &mut A) -> StateUpdates {
        let updates = self.evaluate_change(changed, &*adapter);
        updates.apply_to(adapter);
        updates
    }

    /// Resolve the complete form state as a pure function of the schema and
    /// current values.
    pub fn resolve(&self, view: &(impl FormView + ?Sized)) -> FormState {
        let mut state = self.baseline(view);
        state.apply(&self.evaluate_all(view));
        state
    }

    fn baseline(&self, view: &(impl FormView + ?Sized)) -> FormState {
        let mut state = FormState::default();

        for block in self.blocks.iter() {
            state
                .blocks
                .insert(block.id.clone(), BlockState { visible: block.default_visible });
            for field in &block.fields {
                let name = block.qualified_name(&field.name);
                if let Some(value) = view.control_value(&name) {
                    state.fields.insert(name, FieldState::new(value, field.required));
                }
            }
        }

        for block in self.block_rules.keys() {
            state
                .blocks
                .entry(block.clone())
                .or_insert(BlockState { visible: true });
            for name in view.block_fields(block) {
                if let Some(value) = view.control_value(&name) {
                    state
                        .fields
                        .entry(name)
                        .or_insert_with(|| FieldState::new(value, false));
                }
            }
        }

        let referenced = self
            .subscriptions()
            .into_iter()
            .chain(self.controls.values().flat_map(|m| m.keys().cloned()));
        for name in referenced {
            if let Some(value) = view.control_value(&name) {
                state
                    .fields
                    .entry(name)
                    .or_insert_with(|| FieldState::new(value, false));
            }
        }

        state
    }
}

/// Builds a [`DependencyEngine`] from a schema and raw dependency bindings.
///
/// Malformed bindings are logged and skipped; the affected control or block
/// simply has no dynamic behavior.
#[derive(Debug)]
pub struct EngineBuilder {
    blocks: BlockSet,
    controls: BTreeMap<String, ControlDependencyMap>,
    block_rules: BTreeMap<String, BlockDependency>,
    errors: Vec<DependencyParseError>,
}

impl EngineBuilder {
    pub fn new(blocks: BlockSet) -> Self {
        Self {
            blocks,
            controls: BTreeMap::new(),
            block_rules: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn control(mut self, control: impl Into<String>, map: ControlDependencyMap) -> Self {
        self.controls.insert(control.into(), map);
        self
    }

    pub fn block_dependency(mut self, block: impl Into<String>, dependency: BlockDependency) -> Self {
        self.block_rules.insert(block.into(), dependency);
        self
    }

    /// Add a control's dependency map from its raw JSON attribute text.
    pub fn control_attribute(self, control: impl Into<String>, raw: &str) -> Self {
        let control = control.into();
        match serde_json::from_str(raw) {
            Ok(map) => self.control(control, map),
            Err(source) => self.skip(DependencyParseError::Control { control, source }),
        }
    }

    /// Add a control's dependency map from a JSON value, which may also be
    /// a string holding the JSON text.
    pub fn control_value(self, control: impl Into<String>, value: &Value) -> Self {
        match value {
            Value::String(raw) => self.control_attribute(control, raw),
            other => {
                let control = control.into();
                match ControlDependencyMap::deserialize(other) {
                    Ok(map) => self.control(control, map),
                    Err(source) => self.skip(DependencyParseError::Control { control, source }),
                }
            }
        }
    }

    /// Add a block's dependency from its raw JSON attribute text.
    pub fn block_attribute(self, block: impl Into<String>, raw: &str) -> Self {
        let block = block.into();
        match serde_json::from_str(raw) {
            Ok(dependency) => self.block_dependency(block, dependency),
            Err(source) => self.skip(DependencyParseError::Block { block, source }),
        }
    }

    /// Add a block's dependency from a JSON value, which may also be a
    /// string holding the JSON text.
    pub fn block_value(self, block: impl Into<String>, value: &Value) -> Self {
        match value {
            Value::String(raw) => self.block_attribute(block, raw),
            other => {
                let block = block.into();
                match BlockDependency::deserialize(other) {
                    Ok(dependency) => self.block_dependency(block, dependency),
                    Err(source) => self.skip(DependencyParseError::Block { block, source }),
                }
            }
        }
    }

    fn skip(mut self, error: DependencyParseError) -> Self {
        warn!(owner = error.owner(), error = %error, "skipping malformed dependency binding");
        self.errors.push(error);
        self
    }

    /// Parse errors collected so far.
    pub fn errors(&self) -> &[DependencyParseError] {
        &self.errors
    }

    pub fn build(self) -> DependencyEngine {
        DependencyEngine {
            blocks: self.blocks,
            controls: self.controls,
            block_rules: self.block_rules,
            skipped: self.errors.iter().map(|e| e.owner().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryForm;
    use crate::schema::{AllowedValues, ConditionKind, ConditionSpec};

    const SCHEMA: &str = r#"[
        {
            "id": "company",
            "title": "Company",
            "fields": [
                { "name": "name", "type": "text", "label": "Company name" },
                { "name": "reg", "type": "text", "label": "Registration number", "required": false }
            ]
        },
        {
            "id": "us_address",
            "title": "US address",
            "fields": [
                { "name": "state", "type": "text", "label": "State", "required": false }
            ]
        }
    ]"#;

    fn blocks() -> BlockSet {
        BlockSet::from_json(SCHEMA).unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn engine() -> DependencyEngine {
        DependencyEngine::builder(blocks())
            .control_attribute(
                "party_type",
                r#"{ "dynamic_company_name": { "values": ["company"] } }"#,
            )
            .block_attribute(
                "us_address",
                r#"{ "field": "country", "condition": "equals", "value": "US", "required": true }"#,
            )
            .build()
    }

    #[test]
    fn test_initialize_applies_all_passes() {
        let mut form = InMemoryForm::from_schema(
            &blocks(),
            &values(&[
                ("party_type", "person"),
                ("country", "FR"),
                ("dynamic_company_name", "ACME"),
                ("dynamic_us_address_state", "CA"),
            ]),
        );

        let updates = engine().initialize(&mut form);
        assert_eq!(updates.control.len(), 1);
        assert_eq!(updates.blocks.len(), 1);

        let state = form.state();
        assert!(!state.field("dynamic_company_name").unwrap().enabled);
        assert_eq!(state.value("dynamic_company_name"), Some(""));
        assert!(!state.block("company").unwrap().visible);
        assert!(!state.block("us_address").unwrap().visible);
        assert_eq!(state.value("dynamic_us_address_state"), Some(""));
    }

    #[test]
    fn test_on_change_touches_direct_dependents_only() {
        let mut form = InMemoryForm::from_schema(
            &blocks(),
            &values(&[("party_type", "company"), ("country", "FR")]),
        );
        let engine = engine();
        engine.initialize(&mut form);

        form.set_value("country", "US");
        let updates = engine.on_change("country", &mut form);
        assert!(updates.control.is_empty());
        assert_eq!(updates.blocks.len(), 1);
        assert!(form.state().block("us_address").unwrap().visible);
        assert!(form.state().field("dynamic_us_address_state").unwrap().required);

        assert!(engine.on_change("dynamic_company_name", &mut form).is_empty());
    }

    #[test]
    fn test_block_rule_keeps_priority_after_control_change() {
        let engine = DependencyEngine::builder(blocks())
            .control_attribute(
                "party_type",
                r#"{ "dynamic_us_address_state": { "values": ["company"] } }"#,
            )
            .block_attribute(
                "us_address",
                r#"{ "field": "country", "condition": "equals", "value": "US", "required": true }"#,
            )
            .build();
        let mut form = InMemoryForm::from_schema(
            &blocks(),
            &values(&[("party_type", "company"), ("country", "US")]),
        );
        engine.initialize(&mut form);
        assert!(form.state().block("us_address").unwrap().visible);

        form.set_value("party_type", "person");
        let updates = engine.on_change("party_type", &mut form);
        assert_eq!(updates.control.len(), 1);
        assert!(updates.control[0].hides_block());
        assert_eq!(updates.blocks.len(), 1);

        let state = form.state();
        assert!(state.block("us_address").unwrap().visible);
        assert!(!state.field("dynamic_us_address_state").unwrap().enabled);
        assert_eq!(state, &engine.resolve(&form));
    }

    #[test]
    fn test_resolve_matches_initialize() {
        let inputs = values(&[("party_type", "person"), ("country", "US")]);
        let engine = engine();

        let view = InMemoryForm::from_schema(&blocks(), &inputs);
        let resolved = engine.resolve(&view);

        let mut form = InMemoryForm::from_schema(&blocks(), &inputs);
        engine.initialize(&mut form);

        assert_eq!(&resolved, form.state());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let view = InMemoryForm::from_schema(&blocks(), &values(&[("party_type", "x"), ("country", "US")]));
        let engine = engine();
        assert_eq!(engine.evaluate_all(&view), engine.evaluate_all(&view));
        assert_eq!(engine.resolve(&view), engine.resolve(&view));
    }

    #[test]
    fn test_block_rule_overrides_control_rule() {
        let engine = DependencyEngine::builder(blocks())
            .control(
                "party_type",
                ControlDependencyMap::from([(
                    "dynamic_us_address_state".to_string(),
                    AllowedValues::new(["company"]),
                )]),
            )
            .block_dependency(
                "us_address",
                BlockDependency::new(
                    "country",
                    ConditionSpec::new(ConditionKind::Equals)
                        .with_value("US")
                        .required(true),
                ),
            )
            .build();

        let view = InMemoryForm::from_schema(
            &blocks(),
            &values(&[("party_type", "person"), ("country", "US")]),
        );
        let state = engine.resolve(&view);

        // The control hides the block; the block dependency shows it again.
        assert!(state.block("us_address").unwrap().visible);
        let field = state.field("dynamic_us_address_state").unwrap();
        assert!(field.required);
        assert!(!field.enabled);
    }

    #[test]
    fn test_malformed_bindings_are_skipped() {
        let builder = DependencyEngine::builder(blocks())
            .control_attribute("party_type", "{ not json")
            .block_attribute("us_address", r#"{ "condition": "equals", "value": "US" }"#)
            .block_value(
                "company",
                &serde_json::json!({ "field": "party_type", "condition": "equals", "value": "company" }),
            );
        assert_eq!(builder.errors().len(), 2);

        let engine = builder.build();
        assert_eq!(engine.skipped_bindings(), ["party_type", "us_address"]);
        assert!(engine.control_dependencies().is_empty());
        assert_eq!(engine.block_dependencies().len(), 1);

        // Without its binding the block keeps its default visibility.
        let view = InMemoryForm::from_schema(&blocks(), &values(&[("country", "FR")]));
        assert!(engine.resolve(&view).block("us_address").unwrap().visible);
    }

    #[test]
    fn test_subscriptions() {
        let subs = engine().subscriptions();
        assert_eq!(
            subs.into_iter().collect::<Vec<_>>(),
            vec!["country".to_string(), "party_type".to_string()]
        );
    }
}

//! Field rules declared in a block's `dependencies` mapping.
//!
//! Each entry maps a target field to a list of conditions, each naming its
//! own controlling field. The target is shown only while every condition
//! holds.

use tracing::debug;

use super::state::{FieldStateUpdate, UpdateSource, ValueChange};
use crate::adapter::FormView;
use crate::condition;
use crate::schema::{BlockSchema, ConditionSpec};

/// Compute the state of every dependent field declared by `block`.
pub fn compute_field_rules(
    block: &BlockSchema,
    view: &(impl FormView + ?Sized),
) -> Vec<FieldStateUpdate> {
    block
        .dependencies
        .iter()
        .filter_map(|(key, conditions)| compute_field_rule(block, key, conditions, view))
        .collect()
}

/// Compute the state of the dependent fields of `block` that `changed`
/// controls.
pub fn compute_field_rules_for(
    block: &BlockSchema,
    changed: &str,
    view: &(impl FormView + ?Sized),
) -> Vec<FieldStateUpdate> {
    block
        .dependencies
        .iter()
        .filter(|(_, conditions)| references(conditions, changed))
        .filter_map(|(key, conditions)| compute_field_rule(block, key, conditions, view))
        .collect()
}

pub(crate) fn references(conditions: &[ConditionSpec], field: &str) -> bool {
    conditions.iter().any(|c| c.field.as_deref() == Some(field))
}

fn compute_field_rule(
    block: &BlockSchema,
    key: &str,
    conditions: &[ConditionSpec],
    view: &(impl FormView + ?Sized),
) -> Option<FieldStateUpdate> {
    let target = block.dependency_target(key);
    view.control_value(&target)?;

    // A condition without a controlling field, or whose field is absent,
    // fails closed.
    let met = conditions.iter().all(|spec| {
        spec.field
            .as_deref()
            .and_then(|field| view.control_value(field))
            .is_some_and(|current| condition::evaluate(&current, spec))
    });
    let required = conditions.iter().any(|c| c.required);
    debug!(block = %block.id, target = %target, met, "field rule evaluated");

    Some(FieldStateUpdate {
        target,
        source: UpdateSource::FieldRule {
            block: block.id.clone(),
        },
        visible: Some(met),
        enabled: None,
        required: match (met, required) {
            (true, true) => Some(true),
            (true, false) => None,
            (false, _) => Some(false),
        },
        value: if met {
            ValueChange::Unchanged
        } else {
            ValueChange::Cleared
        },
        block: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryForm;
    use crate::schema::BlockSet;
    use std::collections::BTreeMap;

    fn blocks() -> BlockSet {
        BlockSet::from_json(
            r#"[{
                "id": "claim",
                "title": "Claim",
                "fields": [
                    { "name": "amount", "type": "text", "label": "Amount" },
                    { "name": "justification", "type": "textarea", "label": "Justification" }
                ],
                "dependencies": {
                    "justification": [
                        { "condition": "greater_than", "field": "dynamic_claim_amount", "value": 1000, "required": true },
                        { "condition": "not_equals", "field": "claim_type", "value": "simplified" }
                    ],
                    "ghost": [{ "condition": "equals", "field": "claim_type", "value": "x" }]
                }
            }]"#,
        )
        .unwrap()
    }

    fn form(amount: &str, claim_type: &str) -> InMemoryForm {
        let mut values = BTreeMap::new();
        values.insert("dynamic_claim_amount".to_string(), amount.to_string());
        values.insert("dynamic_claim_justification".to_string(), "because".to_string());
        values.insert("claim_type".to_string(), claim_type.to_string());
        InMemoryForm::from_schema(&blocks(), &values)
    }

    #[test]
    fn test_all_conditions_met() {
        let set = blocks();
        let updates = compute_field_rules(&set.blocks()[0], &form("5000", "full"));
        assert_eq!(updates.len(), 1);

        let update = &updates[0];
        assert_eq!(update.target, "dynamic_claim_justification");
        assert_eq!(update.visible, Some(true));
        assert_eq!(update.required, Some(true));
        assert_eq!(update.value, ValueChange::Unchanged);
    }

    #[test]
    fn test_any_condition_failing_hides_and_clears() {
        let set = blocks();
        let updates = compute_field_rules(&set.blocks()[0], &form("5000", "simplified"));
        let update = &updates[0];
        assert_eq!(update.visible, Some(false));
        assert_eq!(update.required, Some(false));
        assert_eq!(update.value, ValueChange::Cleared);
    }

    #[test]
    fn test_condition_without_field_fails_closed() {
        let set = BlockSet::from_json(
            r#"[{
                "id": "b",
                "title": "B",
                "fields": [{ "name": "x", "type": "text", "label": "X" }],
                "dependencies": { "x": [{ "condition": "equals", "value": "" }] }
            }]"#,
        )
        .unwrap();
        let view = InMemoryForm::from_schema(&set, &BTreeMap::new());
        let updates = compute_field_rules(&set.blocks()[0], &view);
        assert_eq!(updates[0].visible, Some(false));
    }

    #[test]
    fn test_only_rules_referencing_changed_field() {
        let set = blocks();
        let view = form("10", "full");
        assert_eq!(compute_field_rules_for(&set.blocks()[0], "claim_type", &view).len(), 1);
        assert!(compute_field_rules_for(&set.blocks()[0], "unrelated", &view).is_empty());
    }
}

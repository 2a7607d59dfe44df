//! Block-level dependencies: show, require or reset a whole block.

use tracing::debug;

use super::state::BlockStateUpdate;
use crate::adapter::FormView;
use crate::condition;
use crate::schema::BlockDependency;

/// Compute a block's state from its single controlling field.
///
/// Returns `None` when the controlling field does not exist in the form.
/// When the condition is met the block is shown and, if the dependency is
/// marked required, every field in it becomes required; values are left
/// alone. When it is not met the block is hidden and every field becomes
/// optional and is cleared.
pub fn compute_block_visibility(
    block: &str,
    dependency: &BlockDependency,
    view: &(impl FormView + ?Sized),
) -> Option<BlockStateUpdate> {
    let Some(current) = view.control_value(&dependency.field) else {
        debug!(block, field = %dependency.field, "controlling field not present, skipping");
        return None;
    };

    let met = condition::evaluate(&current, &dependency.spec);
    let fields = view.block_fields(block);
    debug!(block, field = %dependency.field, condition = %dependency.spec.condition, met, "block dependency evaluated");

    let fields_required = match (met, dependency.required()) {
        (true, true) => Some(true),
        (true, false) => None,
        (false, _) => Some(false),
    };

    Some(BlockStateUpdate {
        block: block.to_string(),
        visible: met,
        required: met && dependency.required(),
        fields_required,
        fields_to_reset: if met { Vec::new() } else { fields.clone() },
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryForm;
    use crate::engine::FieldState;
    use crate::schema::{ConditionKind, ConditionSpec};

    fn form(country: &str) -> InMemoryForm {
        let mut form = InMemoryForm::new();
        form.add_block("us_address", true)
            .add_field("country", None, FieldState::new(country, true))
            .add_field("state", Some("us_address"), FieldState::new("CA", false))
            .add_field("zip", Some("us_address"), FieldState::new("94105", false));
        form
    }

    fn dependency(required: bool) -> BlockDependency {
        BlockDependency::new(
            "country",
            ConditionSpec::new(ConditionKind::Equals)
                .with_value("US")
                .required(required),
        )
    }

    #[test]
    fn test_condition_met_and_required() {
        let update = compute_block_visibility("us_address", &dependency(true), &form("US")).unwrap();
        assert!(update.visible);
        assert!(update.required);
        assert_eq!(update.fields_required, Some(true));
        assert!(update.fields_to_reset.is_empty());
        assert_eq!(update.fields, vec!["state".to_string(), "zip".to_string()]);
    }

    #[test]
    fn test_condition_not_met_resets_all_fields() {
        let update = compute_block_visibility("us_address", &dependency(true), &form("FR")).unwrap();
        assert!(!update.visible);
        assert!(!update.required);
        assert_eq!(update.fields_required, Some(false));
        assert_eq!(update.fields_to_reset, vec!["state".to_string(), "zip".to_string()]);
    }

    #[test]
    fn test_met_without_required_leaves_fields_alone() {
        let update = compute_block_visibility("us_address", &dependency(false), &form("US")).unwrap();
        assert!(update.visible);
        assert!(!update.required);
        assert_eq!(update.fields_required, None);
    }

    #[test]
    fn test_missing_controlling_field() {
        let dep = BlockDependency::new("region", ConditionSpec::new(ConditionKind::Equals).with_value("EU"));
        assert!(compute_block_visibility("us_address", &dep, &form("US")).is_none());
    }

    #[test]
    fn test_repeated_evaluation_is_identical() {
        let view = form("US");
        let first = compute_block_visibility("us_address", &dependency(true), &view);
        let second = compute_block_visibility("us_address", &dependency(true), &view);
        assert_eq!(first, second);
    }
}

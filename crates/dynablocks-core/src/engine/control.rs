//! Control-level dependencies: allow-list enable/disable.

use tracing::debug;

use super::state::{BlockToggle, FieldStateUpdate, UpdateSource, ValueChange};
use crate::adapter::FormView;
use crate::schema::ControlDependencyMap;

/// Compute the effect of a control's current value on each of its targets.
///
/// A target stays enabled only while the control's value is in its
/// allow-list. Disabling also clears the target and hides its enclosing
/// block; enabling shows the block again. Targets absent from the form are
/// skipped. Membership is exact; no condition kinds apply here.
pub fn compute_control_effects(
    control: &str,
    control_value: &str,
    map: &ControlDependencyMap,
    view: &(impl FormView + ?Sized),
) -> Vec<FieldStateUpdate> {
    map.iter()
        .filter_map(|(target, allowed)| {
            if view.control_value(target).is_none() {
                debug!(control, target = %target, "dependent field not present, skipping");
                return None;
            }

            let disable = !allowed.allows(control_value);
            debug!(control, target = %target, disable, "control dependency evaluated");

            Some(FieldStateUpdate {
                target: target.clone(),
                source: UpdateSource::Control {
                    control: control.to_string(),
                },
                visible: None,
                enabled: Some(!disable),
                required: None,
                value: if disable {
                    ValueChange::Cleared
                } else {
                    ValueChange::Unchanged
                },
                block: view.enclosing_block(target).map(|block| BlockToggle {
                    block,
                    visible: !disable,
                }),
            })
        })
        .collect()
}

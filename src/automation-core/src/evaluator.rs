use alloy_primitives::Bytes;
use crate::types::{ChainFacts, TriggerRef};
use tracing::debug;

use crate::{
    errors::AutomationError,
    host::{gas::TRIGGER_CHECK_GAS, GasMeter},
    registry::adapters::AdapterLookup,
    triggers::TriggerInput,
};

/// Evaluate every trigger of a strategy against the subscription's conditions and the bot's
/// proofs. Runs before any action, against pre-action state.
///
/// Fails closed: a trigger that returns `false` or cannot evaluate its data fails with
/// `TriggerNotMet` at its index. Missing proofs are passed as empty data.
pub fn evaluate_triggers(
    adapters: &dyn AdapterLookup,
    facts: &dyn ChainFacts,
    gas: &mut GasMeter,
    trigger_refs: &[TriggerRef],
    conditions: &[Bytes],
    proofs: &[Bytes],
) -> Result<(), AutomationError> {
    if conditions.len() != trigger_refs.len() {
        return Err(AutomationError::ReferenceError(format!(
            "{} trigger conditions for {} triggers",
            conditions.len(),
            trigger_refs.len()
        )));
    }

    for (index, (trigger_ref, condition)) in trigger_refs.iter().zip(conditions).enumerate() {
        gas.charge(TRIGGER_CHECK_GAS)?;
        let trigger = adapters.trigger(trigger_ref.trigger_id)?;
        let input = TriggerInput {
            template: &trigger_ref.stored_condition_data,
            condition,
            proof: proofs.get(index).map(|p| &p[..]).unwrap_or(&[]),
        };
        match trigger.is_triggered(facts, &input) {
            Ok(true) => debug!(index, trigger = %trigger_ref.trigger_id, "trigger met"),
            Ok(false) => return Err(AutomationError::TriggerNotMet { index }),
            Err(err) => {
                debug!(index, ?err, "trigger evaluation failed");
                return Err(AutomationError::TriggerNotMet { index });
            }
        }
    }
    Ok(())
}

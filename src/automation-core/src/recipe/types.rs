use alloy_primitives::FixedBytes;
use crate::types::{ActionCall, ParamSource};

use crate::errors::AutomationError;

/// An ordered, atomically executed sequence of actions.
///
/// Construction validates the parameter wiring, so an executable `Recipe` never holds a
/// forward return-value reference or an unbound strategy slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipe {
    name: String,
    calls: Vec<ActionCall>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, calls: Vec<ActionCall>) -> Result<Self, AutomationError> {
        if calls.is_empty() {
            return Err(AutomationError::ReferenceError(
                "recipe has no actions".to_string(),
            ));
        }
        validate_return_refs(&calls)?;
        for (i, call) in calls.iter().enumerate() {
            if call.params.iter().any(ParamSource::needs_binding) {
                return Err(AutomationError::ReferenceError(format!(
                    "action {i} has an unbound sub or injected slot"
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            calls,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calls(&self) -> &[ActionCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn action_ids(&self) -> impl Iterator<Item = FixedBytes<32>> + '_ {
        self.calls.iter().map(|c| c.action_id)
    }
}

/// Every `FromAction(j)` used by action `i` must satisfy `j < i`.
pub(crate) fn validate_return_refs(calls: &[ActionCall]) -> Result<(), AutomationError> {
    for (i, call) in calls.iter().enumerate() {
        for param in &call.params {
            if let ParamSource::FromAction(j) = param {
                if *j >= i {
                    return Err(AutomationError::ReferenceError(format!(
                        "action {i} references return value {j} which is not yet executed"
                    )));
                }
            }
        }
    }
    Ok(())
}

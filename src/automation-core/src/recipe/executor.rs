use alloy_primitives::{FixedBytes, U256};
use crate::types::{ActionCall, ParamSource};
use tracing::debug;

use crate::{
    errors::{ActionError, AutomationError, HostError},
    host::gas::ACTION_CALL_GAS,
    recipe::{
        action::{ActionImpl, ActionKind},
        context::ExecutionContext,
        types::Recipe,
    },
    registry::adapters::AdapterLookup,
    utils::bytes::{address_word, u256_word},
};

/// Executes recipes inside a wallet's execution context.
///
/// Actions run strictly in order; action `i` may read the outputs of actions `0..i`. A
/// flash-loan action is only allowed in first position: the rest of the recipe becomes its
/// continuation and runs while the loan is outstanding.
pub struct RecipeExecutor<'r> {
    adapters: &'r dyn AdapterLookup,
    max_actions: usize,
}

impl<'r> RecipeExecutor<'r> {
    pub fn new(adapters: &'r dyn AdapterLookup, max_actions: usize) -> Self {
        Self {
            adapters,
            max_actions,
        }
    }

    /// Kinds of the actions in `recipe`, resolved through the adapter lookup.
    pub fn action_kinds(&self, recipe: &Recipe) -> Result<Vec<ActionKind>, AutomationError> {
        recipe
            .calls()
            .iter()
            .map(|c| self.adapters.action(c.action_id).map(|a| a.kind()))
            .collect()
    }

    /// Run `recipe`; returns the return-value buffer.
    pub fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        recipe: &Recipe,
    ) -> Result<Vec<FixedBytes<32>>, AutomationError> {
        if ctx.flash_loan_active {
            return Err(AutomationError::ReferenceError(
                "re-entrant recipe execution during a flash loan".to_string(),
            ));
        }
        if recipe.len() > self.max_actions {
            return Err(AutomationError::ReferenceError(format!(
                "recipe has {} actions, limit is {}",
                recipe.len(),
                self.max_actions
            )));
        }

        let calls = recipe.calls();
        let impls = calls
            .iter()
            .map(|c| self.adapters.action(c.action_id))
            .collect::<Result<Vec<_>, _>>()?;
        if impls.iter().skip(1).any(ActionImpl::is_flash_loan) {
            return Err(AutomationError::ReferenceError(
                "flash loan action must be the first action".to_string(),
            ));
        }

        let mut return_values = vec![FixedBytes::<32>::ZERO; calls.len()];
        debug!(recipe = recipe.name(), actions = calls.len(), wallet = %ctx.wallet, "executing recipe");

        match &impls[0] {
            ActionImpl::FlashLoan(provider) => {
                let params = resolve_params(ctx, &calls[0], &return_values, 0)?;
                ctx.charge_gas(ACTION_CALL_GAS)?;
                ctx.flash_loan_active = true;
                let mut continued = false;
                let res = provider.flash_loan(ctx, &params, &mut |inner: &mut ExecutionContext<'_>, amount: U256| {
                    if continued {
                        return Err(ActionError::Reverted(
                            "continuation already executed".to_string(),
                        ));
                    }
                    continued = true;
                    return_values[0] = u256_word(amount);
                    for i in 1..calls.len() {
                        self.run_action(inner, &calls[i], &impls[i], i, &mut return_values)
                            .map_err(|e| ActionError::Continuation(Box::new(e)))?;
                    }
                    Ok(())
                });
                ctx.flash_loan_active = false;
                match res {
                    Ok(_) if continued => {}
                    Ok(_) => {
                        return Err(AutomationError::ActionExecutionFailed {
                            index: 0,
                            source: ActionError::Reverted(
                                "flash loan continuation never executed".to_string(),
                            ),
                        })
                    }
                    Err(ActionError::Continuation(inner)) => return Err(*inner),
                    Err(source) => {
                        return Err(AutomationError::ActionExecutionFailed { index: 0, source })
                    }
                }
            }
            ActionImpl::Standard(_) => {
                for (i, (call, imp)) in calls.iter().zip(&impls).enumerate() {
                    self.run_action(ctx, call, imp, i, &mut return_values)?;
                }
            }
        }

        Ok(return_values)
    }

    fn run_action(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &ActionCall,
        imp: &ActionImpl,
        index: usize,
        return_values: &mut [FixedBytes<32>],
    ) -> Result<(), AutomationError> {
        let ActionImpl::Standard(action) = imp else {
            return Err(AutomationError::ReferenceError(
                "nested flash loan action".to_string(),
            ));
        };
        let params = resolve_params(ctx, call, return_values, index)?;
        ctx.charge_gas(ACTION_CALL_GAS)?;
        let out = action
            .execute(ctx, &params)
            .map_err(|source| match source {
                ActionError::Host(host @ HostError::OutOfGas { .. }) => AutomationError::Host(host),
                source => AutomationError::ActionExecutionFailed { index, source },
            })?;
        debug!(index, action = %call.action_id, "action executed");
        return_values[index] = out;
        Ok(())
    }
}

/// Substitute return values and wallet identities into the parameter slots of `call`.
fn resolve_params(
    ctx: &ExecutionContext<'_>,
    call: &ActionCall,
    return_values: &[FixedBytes<32>],
    index: usize,
) -> Result<Vec<FixedBytes<32>>, AutomationError> {
    call.params
        .iter()
        .map(|param| match param {
            ParamSource::Literal(word) => Ok(*word),
            ParamSource::FromAction(j) if *j < index => Ok(return_values[*j]),
            ParamSource::FromAction(j) => Err(AutomationError::ReferenceError(format!(
                "action {index} references return value {j}"
            ))),
            ParamSource::Wallet => Ok(address_word(ctx.wallet)),
            ParamSource::WalletOwner => Ok(address_word(ctx.owner)),
            ParamSource::Injected | ParamSource::FromSub(_) => Err(
                AutomationError::ReferenceError(format!("action {index} has an unbound slot")),
            ),
        })
        .collect()
}

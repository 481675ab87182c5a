//! The privileged bot entry point for automated execution of subscriptions.

use alloy_primitives::{Address, Bytes, FixedBytes};
use crate::types::{ActionCall, ParamSource};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::StrategySelectionPolicy,
    engine::Engine,
    errors::AutomationError,
    evaluator::evaluate_triggers,
    host::{gas::TX_BASE_GAS, HostEvent},
    recipe::{ExecutionContext, Recipe, RecipeExecutor},
    registry::{BundleRegistry, Resolver, Strategy, StrategyRegistry},
    subscriptions::StrategySub,
};

/// Arguments of `execute_strategy`.
#[derive(Clone, Debug, Default)]
pub struct ExecuteStrategyRequest {
    pub sub_id: u64,
    /// Index into the bundle; ignored for plain strategy subscriptions.
    pub strategy_index: usize,
    pub trigger_proof_data: Vec<Bytes>,
    /// `action_override_data[i]` fills the `Injected` slots of action `i`, in order.
    pub action_override_data: Vec<Vec<FixedBytes<32>>>,
    /// Subscription data as the bot asserts it; must hash to the stored integrity hash.
    pub sub: StrategySub,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub sub_id: u64,
    pub strategy_id: u64,
    pub bundle_id: Option<u64>,
    pub timestamp: u64,
    pub gas_used: u64,
    pub return_values: Vec<FixedBytes<32>>,
}

impl Engine {
    pub fn execute_strategy(
        &mut self,
        bot: Address,
        req: ExecuteStrategyRequest,
    ) -> Result<ExecutionRecord, AutomationError> {
        let sub_id = req.sub_id;
        let res = self.try_execute_strategy(bot, req);
        match &res {
            Ok(record) => info!(
                sub_id,
                strategy_id = record.strategy_id,
                bundle_id = ?record.bundle_id,
                gas_used = record.gas_used,
                "strategy executed"
            ),
            Err(err) => warn!(sub_id, %bot, %err, "strategy execution rejected"),
        }
        res
    }

    fn try_execute_strategy(
        &mut self,
        bot: Address,
        req: ExecuteStrategyRequest,
    ) -> Result<ExecutionRecord, AutomationError> {
        self.strategy_bots.ensure_approved(bot)?;

        let stored = self.subs.get_sub(req.sub_id)?;
        if !stored.is_enabled {
            return Err(AutomationError::SubscriptionDisabled(req.sub_id));
        }
        if req.sub.hash() != stored.integrity_hash {
            return Err(AutomationError::IntegrityCheckFailed { sub_id: req.sub_id });
        }
        let wallet = stored.wallet;
        let owner = self.host.state().wallet(wallet)?.owner;

        let (strategy_id, bundle_id) = self.select_strategy(&req.sub, req.strategy_index)?;
        let strategy = self.strategies.get_strategy(strategy_id)?;
        let recipe = bind_recipe(strategy, &req.sub.sub_data, &req.action_override_data)?;
        let continuous = strategy.continuous;
        let trigger_refs = strategy.trigger_refs.clone();

        let sub_id = req.sub_id;
        let resolver = Resolver::new(&self.contracts, &self.adapters);
        let executor = RecipeExecutor::new(&resolver, self.config.max_actions_per_recipe);
        let subs = &mut self.subs;

        self.host.transact(
            self.config.tx_gas_limit,
            |tx| -> Result<_, AutomationError> {
                tx.gas.charge(TX_BASE_GAS)?;
                // Triggers see pre-action state.
                evaluate_triggers(
                    &resolver,
                    &*tx.state,
                    &mut tx.gas,
                    &trigger_refs,
                    &req.sub.trigger_data,
                    &req.trigger_proof_data,
                )?;

                let mut ctx = ExecutionContext::new(wallet, owner, tx.state, &mut tx.gas);
                let return_values = executor.execute(&mut ctx, &recipe)?;

                let timestamp = tx.state.block_timestamp;
                tx.state.emit(HostEvent::StrategyExecuted {
                    sub_id,
                    strategy_id,
                    bundle_id,
                    wallet,
                    timestamp,
                });
                if !continuous {
                    subs.finish_one_shot(sub_id)?;
                }
                Ok(ExecutionRecord {
                    sub_id,
                    strategy_id,
                    bundle_id,
                    timestamp,
                    gas_used: tx.gas.used(),
                    return_values,
                })
            },
        )
    }

    /// Resolve the strategy to run: directly, or by index into the bundle under the policy.
    fn select_strategy(
        &self,
        sub: &StrategySub,
        index: usize,
    ) -> Result<(u64, Option<u64>), AutomationError> {
        if !sub.is_bundle {
            return Ok((sub.strategy_or_bundle_id, None));
        }
        let bundle_id = sub.strategy_or_bundle_id;
        let strategy_id = self.bundles.strategy_id_in_bundle(bundle_id, index)?;
        if self.config.bundle_selection == StrategySelectionPolicy::FirstOnly && index != 0 {
            return Err(AutomationError::ReferenceError(format!(
                "bundle {bundle_id} only allows its first strategy"
            )));
        }
        Ok((strategy_id, Some(bundle_id)))
    }
}

/// Substitute sub vars and bot-supplied values into a strategy template.
pub fn bind_recipe(
    strategy: &Strategy,
    sub_data: &[FixedBytes<32>],
    action_override_data: &[Vec<FixedBytes<32>>],
) -> Result<Recipe, AutomationError> {
    if action_override_data.len() > strategy.actions.len() {
        return Err(AutomationError::ReferenceError(format!(
            "override data for {} actions, strategy has {}",
            action_override_data.len(),
            strategy.actions.len()
        )));
    }

    let mut calls = Vec::with_capacity(strategy.actions.len());
    for (i, call) in strategy.actions.iter().enumerate() {
        let overrides = action_override_data.get(i).map(Vec::as_slice).unwrap_or(&[]);
        let mut overrides_iter = overrides.iter();
        let mut params = Vec::with_capacity(call.params.len());
        for param in &call.params {
            let bound = match param {
                ParamSource::FromSub(k) => {
                    let word = sub_data.get(*k).ok_or_else(|| {
                        AutomationError::ReferenceError(format!(
                            "action {i} uses sub slot {k}, subscription has {}",
                            sub_data.len()
                        ))
                    })?;
                    ParamSource::Literal(*word)
                }
                ParamSource::Injected => {
                    let word = overrides_iter.next().ok_or_else(|| {
                        AutomationError::ReferenceError(format!(
                            "missing injected value for action {i}"
                        ))
                    })?;
                    ParamSource::Literal(*word)
                }
                other => other.clone(),
            };
            params.push(bound);
        }
        if overrides_iter.next().is_some() {
            return Err(AutomationError::ReferenceError(format!(
                "action {i} has {} injected slots, got {} values",
                call.injected_slots(),
                overrides.len()
            )));
        }
        calls.push(ActionCall::new(call.action_id, params));
    }
    Recipe::new(strategy.name.clone(), calls)
}

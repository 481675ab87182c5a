use alloy_primitives::Address;
use tracing::{info, warn};

use crate::{
    engine::Engine,
    errors::AutomationError,
    recipe::OffchainOrder,
    relay::{envelope::FeeSource, FeePlan, FrontEnd, RelayCall, RelayReceipt},
};

impl Engine {
    /// Tx-Saver: execute a signed recipe using the bot's gas estimate for fees taken from the
    /// position, optionally with an off-chain exchange order injected into its sell action.
    pub fn execute_tx(
        &mut self,
        bot: Address,
        call: &RelayCall,
        estimated_gas: u64,
        injected_order: Option<OffchainOrder>,
    ) -> Result<RelayReceipt, AutomationError> {
        let res = self.try_tx_saver(bot, call, estimated_gas, injected_order);
        match &res {
            Ok(receipt) => info!(
                wallet = %call.wallet,
                estimated_gas,
                gas_used = receipt.gas_used,
                fee = %receipt.fee_taken,
                fee_token = %receipt.fee_token,
                "saver execution"
            ),
            Err(err) => warn!(wallet = %call.wallet, %bot, %err, "saver execution rejected"),
        }
        res
    }

    fn try_tx_saver(
        &mut self,
        bot: Address,
        call: &RelayCall,
        estimated_gas: u64,
        injected_order: Option<OffchainOrder>,
    ) -> Result<RelayReceipt, AutomationError> {
        let prepared = self.prepare_relay(FrontEnd::TxSaver, bot, call)?;
        let injected_order = injected_order.filter(|order| !order.is_empty());
        if injected_order.is_some() && !prepared.has_sell {
            return Err(AutomationError::ReferenceError(
                "injected order requires a sell action".to_string(),
            ));
        }

        let env = &prepared.env;
        let plan = if env.is_sponsored() {
            FeePlan::Sponsored
        } else {
            let source = env.fee_source();
            if source == FeeSource::Position && !prepared.has_sell {
                return Err(AutomationError::RecipeIncompatibleWithFeeFromPosition);
            }
            let overhead = self.config.fee_gas_overhead(env.fee_token);
            let estimate = self
                .fee_quote(env, estimated_gas.saturating_add(overhead))
                .fee()?;
            if estimate > env.max_tx_cost {
                return Err(AutomationError::FeeCapExceeded {
                    fee: estimate,
                    max: env.max_tx_cost,
                });
            }
            match source {
                FeeSource::Position => FeePlan::Position { amount: estimate },
                source => FeePlan::Measured {
                    source,
                    discount_pct: 0,
                },
            }
        };
        self.run_relay(prepared, plan, injected_order)
    }
}

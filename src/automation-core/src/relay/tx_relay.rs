use alloy_primitives::Address;
use tracing::{info, warn};

use crate::{
    engine::Engine,
    errors::AutomationError,
    relay::{envelope::FeeSource, FeePlan, FrontEnd, RelayCall, RelayReceipt},
};

impl Engine {
    /// Tx-Relay: execute a signed recipe and charge the measured gas from the owner's EOA or
    /// the wallet. The bot may lower the fee by `percentage_of_lowering_tx_cost` percent.
    ///
    /// Fees from position need a fee fixed before execution and are only served by the
    /// Tx-Saver.
    pub fn execute_tx_taking_fee_from_eoa_or_wallet(
        &mut self,
        bot: Address,
        call: &RelayCall,
        percentage_of_lowering_tx_cost: u8,
    ) -> Result<RelayReceipt, AutomationError> {
        let res = self.try_tx_relay(bot, call, percentage_of_lowering_tx_cost);
        match &res {
            Ok(receipt) => info!(
                wallet = %call.wallet,
                gas_used = receipt.gas_used,
                fee = %receipt.fee_taken,
                fee_token = %receipt.fee_token,
                "relayed execution"
            ),
            Err(err) => warn!(wallet = %call.wallet, %bot, %err, "relayed execution rejected"),
        }
        res
    }

    fn try_tx_relay(
        &mut self,
        bot: Address,
        call: &RelayCall,
        discount_pct: u8,
    ) -> Result<RelayReceipt, AutomationError> {
        let prepared = self.prepare_relay(FrontEnd::TxRelay, bot, call)?;
        if discount_pct > 100 {
            return Err(AutomationError::ReferenceError(format!(
                "discount of {discount_pct}% is out of range"
            )));
        }

        let plan = if prepared.env.is_sponsored() {
            FeePlan::Sponsored
        } else {
            match prepared.env.fee_source() {
                FeeSource::Position => {
                    return Err(AutomationError::RecipeIncompatibleWithFeeFromPosition)
                }
                source => FeePlan::Measured {
                    source,
                    discount_pct,
                },
            }
        };
        self.run_relay(prepared, plan, None)
    }
}

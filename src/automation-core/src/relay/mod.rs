//! Gas-relay executors: a bot submits a recipe the wallet owner signed off-chain and
//! recovers its gas cost in a fee token.
//!
//! Both front-ends share one flow. Checks that need no execution (bot, signature, deadline,
//! nonce, recipe shape, fee cap against an estimate) run first and touch nothing. Fee
//! collection runs after the recipe inside the same host transaction, so a late failure
//! undoes the recipe too.

pub mod envelope;
pub mod fee;
pub mod tx_relay;
pub mod tx_saver;

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use serde::Serialize;

use crate::{
    decoder::decode_recipe_with_limit,
    engine::Engine,
    errors::AutomationError,
    host::{
        gas::{SIGNATURE_CHECK_GAS, TX_BASE_GAS},
        HostEvent,
    },
    recipe::{ActionKind, ExecutionContext, OffchainOrder, PositionFee, Recipe, RecipeExecutor},
    registry::Resolver,
    utils::crypto::ecrecover_address,
};

use self::{
    envelope::{parse_relay_envelope, relay_digest, FeeSource, RelayEnvelope},
    fee::{apply_discount, FeeQuote},
};

/// A signed envelope as submitted by a bot for `wallet`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayCall {
    pub wallet: Address,
    pub envelope: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayReceipt {
    /// Measured gas plus the fee token's overhead.
    pub gas_used: u64,
    pub fee_taken: U256,
    pub fee_token: Address,
    pub return_values: Vec<FixedBytes<32>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrontEnd {
    TxRelay,
    TxSaver,
}

/// A relay request that passed every check not requiring execution.
pub(crate) struct PreparedRelay {
    pub env: RelayEnvelope,
    pub wallet: Address,
    pub owner: Address,
    pub recipe: Recipe,
    pub has_sell: bool,
}

/// How the fee is settled after the recipe ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeePlan {
    Sponsored,
    /// Fee from measured gas, pulled from the EOA or the wallet, optionally discounted.
    Measured { source: FeeSource, discount_pct: u8 },
    /// Fixed fee a sell action pays out of its output.
    Position { amount: U256 },
}

impl Engine {
    pub(crate) fn prepare_relay(
        &self,
        front_end: FrontEnd,
        bot: Address,
        call: &RelayCall,
    ) -> Result<PreparedRelay, AutomationError> {
        let (bots, verifying_contract) = match front_end {
            FrontEnd::TxRelay => (&self.relay_bots, self.config.tx_relay_address),
            FrontEnd::TxSaver => (&self.saver_bots, self.config.tx_saver_address),
        };
        bots.ensure_approved(bot)?;

        let env = parse_relay_envelope(&call.envelope)?;
        let wallet = call.wallet;
        let state = self.host.state();
        let account = state.wallet(wallet)?;

        let digest = relay_digest(self.config.chain_id, verifying_contract, wallet, &env);
        let signer =
            ecrecover_address(digest, &env.signature).map_err(|_| AutomationError::InvalidSignature)?;
        if signer != account.owner {
            return Err(AutomationError::InvalidSignature);
        }
        let now = state.block_timestamp;
        // Zero means no deadline.
        if env.deadline != 0 && now >= env.deadline {
            return Err(AutomationError::ExpiredSignature {
                deadline: env.deadline,
                now,
            });
        }
        if env.nonce != U256::from(account.nonce) {
            return Err(AutomationError::InvalidSignature);
        }

        let recipe = decode_recipe_with_limit(&env.recipe, self.config.max_actions_per_recipe)?;
        let resolver = Resolver::new(&self.contracts, &self.adapters);
        let kinds = RecipeExecutor::new(&resolver, self.config.max_actions_per_recipe)
            .action_kinds(&recipe)?;

        Ok(PreparedRelay {
            owner: account.owner,
            env,
            wallet,
            recipe,
            has_sell: kinds.contains(&ActionKind::Sell),
        })
    }

    /// Fee quote for `gas_used` (overhead included) in the envelope's fee token.
    pub(crate) fn fee_quote(&self, env: &RelayEnvelope, gas_used: u64) -> FeeQuote {
        let state = self.host.state();
        FeeQuote {
            gas_used,
            gas_price: state.gas_price,
            fee_token: env.fee_token,
            weth: self.config.weth_address,
            token_price_in_eth: env.token_price_in_eth,
            token_decimals: state.decimals(env.fee_token),
        }
    }

    pub(crate) fn run_relay(
        &mut self,
        prepared: PreparedRelay,
        plan: FeePlan,
        injected_order: Option<OffchainOrder>,
    ) -> Result<RelayReceipt, AutomationError> {
        let PreparedRelay {
            env,
            wallet,
            owner,
            recipe,
            ..
        } = prepared;
        let fee_token = env.fee_token;
        let fee_receiver = self.config.fee_receiver;
        let overhead = match plan {
            FeePlan::Sponsored => 0,
            _ => self.config.fee_gas_overhead(fee_token),
        };
        let base_quote = self.fee_quote(&env, 0);

        let resolver = Resolver::new(&self.contracts, &self.adapters);
        let executor = RecipeExecutor::new(&resolver, self.config.max_actions_per_recipe);

        self.host.transact(
            self.config.tx_gas_limit,
            |tx| -> Result<_, AutomationError> {
                tx.gas.charge(TX_BASE_GAS + SIGNATURE_CHECK_GAS)?;
                tx.state.bump_wallet_nonce(wallet)?;

                let mut ctx = ExecutionContext::new(wallet, owner, tx.state, &mut tx.gas);
                if let FeePlan::Position { amount } = plan {
                    ctx = ctx.with_position_fee(PositionFee {
                        token: fee_token,
                        amount,
                        receiver: fee_receiver,
                        taken: false,
                    });
                }
                if let Some(order) = injected_order {
                    ctx = ctx.with_injected_order(order);
                }
                let return_values = executor.execute(&mut ctx, &recipe)?;
                let position_fee_taken = ctx.position_fee().is_some_and(|f| f.taken);

                let gas_used = tx.gas.used().saturating_add(overhead);
                let fee_taken = match plan {
                    FeePlan::Sponsored => U256::ZERO,
                    FeePlan::Position { amount } => {
                        if !position_fee_taken {
                            return Err(AutomationError::RecipeIncompatibleWithFeeFromPosition);
                        }
                        amount
                    }
                    FeePlan::Measured {
                        source,
                        discount_pct,
                    } => {
                        let quote = FeeQuote {
                            gas_used,
                            ..base_quote
                        };
                        let fee = apply_discount(quote.fee()?, discount_pct)?;
                        if fee > env.max_tx_cost {
                            return Err(AutomationError::FeeCapExceeded {
                                fee,
                                max: env.max_tx_cost,
                            });
                        }
                        let collected = match source {
                            FeeSource::Wallet => {
                                tx.state.transfer(fee_token, wallet, fee_receiver, fee)
                            }
                            _ => tx
                                .state
                                .transfer_from(fee_token, wallet, owner, fee_receiver, fee),
                        };
                        collected.map_err(AutomationError::FeeCollectionFailed)?;
                        fee
                    }
                };

                tx.state.emit(HostEvent::RelayedExecution {
                    wallet,
                    fee_token,
                    fee: fee_taken,
                    gas_used,
                });
                Ok(RelayReceipt {
                    gas_used,
                    fee_taken,
                    fee_token,
                    return_values,
                })
            },
        )
    }
}

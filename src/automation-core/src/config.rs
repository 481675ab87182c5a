use std::path::Path;

use alloy_primitives::{address, Address};
use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::errors::AutomationError;

pub const USDC_ADDR: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const DAI_ADDR: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
pub const WETH_ADDR: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

/// How a bot may pick a strategy inside a bundle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySelectionPolicy {
    /// Any in-range index.
    #[default]
    BotChoice,
    /// Only the first strategy of each bundle.
    FirstOnly,
}

/// Extra gas added to the measured gas of a relayed transaction for a fee token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenGasOverhead {
    pub token: Address,
    pub gas: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub admin: Address,
    #[serde(default)]
    pub fee_receiver: Address,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default)]
    pub tx_relay_address: Address,
    #[serde(default)]
    pub tx_saver_address: Address,
    #[serde(default = "default_weth")]
    pub weth_address: Address,
    #[serde(default = "default_tx_gas_limit")]
    pub tx_gas_limit: u64,
    #[serde(default = "default_max_actions")]
    pub max_actions_per_recipe: usize,
    #[serde(default = "default_true")]
    pub strategies_open_to_public: bool,
    #[serde(default)]
    pub bundle_selection: StrategySelectionPolicy,
    #[serde(default)]
    pub default_fee_gas_overhead: u64,
    #[serde(default = "default_fee_token_gas_overhead")]
    pub fee_token_gas_overhead: Vec<TokenGasOverhead>,
}

fn default_chain_id() -> u64 {
    1
}
fn default_weth() -> Address {
    WETH_ADDR
}
fn default_tx_gas_limit() -> u64 {
    10_000_000
}
fn default_max_actions() -> usize {
    crate::decoder::MAX_ACTIONS_DEFAULT
}
fn default_true() -> bool {
    true
}
fn default_fee_token_gas_overhead() -> Vec<TokenGasOverhead> {
    vec![
        TokenGasOverhead { token: USDC_ADDR, gas: 64_300 },
        TokenGasOverhead { token: DAI_ADDR, gas: 90_000 },
        TokenGasOverhead { token: WETH_ADDR, gas: 10_000 },
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin: Address::ZERO,
            fee_receiver: Address::ZERO,
            chain_id: default_chain_id(),
            tx_relay_address: Address::ZERO,
            tx_saver_address: Address::ZERO,
            weth_address: default_weth(),
            tx_gas_limit: default_tx_gas_limit(),
            max_actions_per_recipe: default_max_actions(),
            strategies_open_to_public: true,
            bundle_selection: StrategySelectionPolicy::default(),
            default_fee_gas_overhead: 0,
            fee_token_gas_overhead: default_fee_token_gas_overhead(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional file, then `AUTOMATION_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AutomationError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("AUTOMATION").try_parsing(true));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Gas overhead charged on top of the measured gas when the fee is paid in `token`.
    pub fn fee_gas_overhead(&self, token: Address) -> u64 {
        self.fee_token_gas_overhead
            .iter()
            .find(|o| o.token == token)
            .map(|o| o.gas)
            .unwrap_or(self.default_fee_gas_overhead)
    }
}

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// A value that does not fit its length or index field on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} is {value}, above the wire limit of {max}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

/// Relay envelope signed by a wallet owner and submitted by a bot.
#[derive(Clone, Debug)]
pub struct RelayEnvelope {
    /// Protocol version for forwards compatibility.
    pub version: u16,
    /// Must equal the wallet's current relay nonce.
    pub nonce: U256,
    /// Unix timestamp deadline.
    pub deadline: u64,
    /// Zero address for a sponsored transaction.
    pub fee_token: Address,
    pub max_tx_cost: U256,
    /// Fee token price in ETH, 1e18-scaled.
    pub token_price_in_eth: U256,
    /// bit 0: fee from position, bit 1: fee from wallet, neither: fee from the owner's EOA.
    pub fee_flags: u8,
    /// Encoded recipe (see `encode_recipe`).
    pub recipe: Vec<u8>,

    /// ECDSA signature (r||s||v) over the EIP-712 digest.
    pub signature: Vec<u8>,

    /// Domain separation parameters (used for digest construction).
    pub domain_chain_id: u64,
    pub domain_verifying_contract: Address,

    /// Wallet the recipe executes as.
    pub wallet: Address,
}

impl RelayEnvelope {
    pub fn new(wallet: Address, chain_id: u64, verifying_contract: Address, recipe: Vec<u8>) -> Self {
        Self {
            version: 1,
            nonce: U256::ZERO,
            deadline: u64::MAX,
            fee_token: Address::ZERO,
            max_tx_cost: U256::ZERO,
            token_price_in_eth: U256::ZERO,
            fee_flags: 0,
            recipe,
            signature: Vec::new(),
            domain_chain_id: chain_id,
            domain_verifying_contract: verifying_contract,
            wallet,
        }
    }
}

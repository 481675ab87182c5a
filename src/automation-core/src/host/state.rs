//! In-memory model of the chain state the engine touches.
//!
//! Balances, allowances and raw storage words are keyed the way an EVM keys them, so mock
//! adapters can keep protocol state here and have it rolled back with everything else.

use std::collections::BTreeMap;

use alloy_primitives::{Address, FixedBytes, U256};
use crate::types::{ChainFacts, FactsError};
use serde::Serialize;

use crate::errors::HostError;

/// A smart wallet: the identity recipes execute as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmartWallet {
    pub owner: Address,
    /// Consumed by every relayed execution.
    pub nonce: u64,
}

/// Event appended to the host log by a successful transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    StrategyExecuted {
        sub_id: u64,
        strategy_id: u64,
        bundle_id: Option<u64>,
        wallet: Address,
        timestamp: u64,
    },
    RelayedExecution {
        wallet: Address,
        fee_token: Address,
        fee: U256,
        gas_used: u64,
    },
    RecipeExecuted {
        wallet: Address,
        name: String,
        actions: usize,
    },
}

#[derive(Clone, Debug, Default)]
pub struct HostState {
    pub chain_id: u64,
    pub block_timestamp: u64,
    pub gas_price: U256,
    balances: BTreeMap<(Address, Address), U256>,
    allowances: BTreeMap<(Address, Address, Address), U256>,
    decimals: BTreeMap<Address, u8>,
    storage: BTreeMap<(Address, FixedBytes<32>), U256>,
    wallets: BTreeMap<Address, SmartWallet>,
    events: Vec<HostEvent>,
}

impl HostState {
    pub fn new(chain_id: u64, block_timestamp: u64, gas_price: U256) -> Self {
        Self {
            chain_id,
            block_timestamp,
            gas_price,
            ..Default::default()
        }
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Credit `amount` out of thin air. Only setup code and mocks use this.
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), HostError> {
        let balance = self.balance(token, to);
        let next = balance.checked_add(amount).ok_or(HostError::Overflow)?;
        self.balances.insert((token, to), next);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                token,
                holder: from,
                needed: amount,
                available,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        self.balances.insert((token, from), available - amount);
        self.mint(token, to, amount)?;
        self.events.push(HostEvent::Transfer {
            token,
            from,
            to,
            amount,
        });
        Ok(())
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
    }

    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let allowed = self.allowance(token, owner, spender);
        if allowed < amount {
            return Err(HostError::InsufficientAllowance {
                token,
                owner,
                spender,
            });
        }
        self.transfer(token, owner, to, amount)?;
        if allowed != U256::MAX {
            self.allowances
                .insert((token, owner, spender), allowed - amount);
        }
        Ok(())
    }

    pub fn set_decimals(&mut self, token: Address, decimals: u8) {
        self.decimals.insert(token, decimals);
    }

    /// Token decimals; unknown tokens are treated as 18-decimal.
    pub fn decimals(&self, token: Address) -> u8 {
        self.decimals.get(&token).copied().unwrap_or(18)
    }

    pub fn sload(&self, target: Address, slot: FixedBytes<32>) -> U256 {
        self.storage
            .get(&(target, slot))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn sstore(&mut self, target: Address, slot: FixedBytes<32>, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(target, slot));
        } else {
            self.storage.insert((target, slot), value);
        }
    }

    pub fn register_wallet(&mut self, wallet: Address, owner: Address) {
        self.wallets.insert(wallet, SmartWallet { owner, nonce: 0 });
    }

    pub fn wallet(&self, wallet: Address) -> Result<&SmartWallet, HostError> {
        self.wallets
            .get(&wallet)
            .ok_or(HostError::UnknownWallet(wallet))
    }

    pub fn bump_wallet_nonce(&mut self, wallet: Address) -> Result<u64, HostError> {
        let entry = self
            .wallets
            .get_mut(&wallet)
            .ok_or(HostError::UnknownWallet(wallet))?;
        entry.nonce += 1;
        Ok(entry.nonce)
    }

    pub fn emit(&mut self, event: HostEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }
}

impl ChainFacts for HostState {
    fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, FactsError> {
        Ok(self.balance(token, holder))
    }

    fn storage_at(&self, target: Address, slot: FixedBytes<32>) -> Result<U256, FactsError> {
        Ok(self.sload(target, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TOKEN: Address = address!("00000000000000000000000000000000000000aa");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");

    #[test]
    fn transfer_moves_balance_and_logs() {
        let mut state = HostState::new(1, 100, U256::from(1u64));
        state.mint(TOKEN, ALICE, U256::from(10u64)).unwrap();
        state.transfer(TOKEN, ALICE, BOB, U256::from(4u64)).unwrap();
        assert_eq!(state.balance(TOKEN, ALICE), U256::from(6u64));
        assert_eq!(state.balance(TOKEN, BOB), U256::from(4u64));
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let mut state = HostState::default();
        let err = state
            .transfer(TOKEN, ALICE, BOB, U256::from(1u64))
            .unwrap_err();
        assert!(matches!(err, HostError::InsufficientBalance { .. }));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut state = HostState::default();
        state.mint(TOKEN, ALICE, U256::from(10u64)).unwrap();
        state.approve(TOKEN, ALICE, BOB, U256::from(5u64));
        state
            .transfer_from(TOKEN, BOB, ALICE, BOB, U256::from(3u64))
            .unwrap();
        assert_eq!(state.allowance(TOKEN, ALICE, BOB), U256::from(2u64));
        let err = state
            .transfer_from(TOKEN, BOB, ALICE, BOB, U256::from(3u64))
            .unwrap_err();
        assert!(matches!(err, HostError::InsufficientAllowance { .. }));
    }

    #[test]
    fn unknown_token_defaults_to_18_decimals() {
        let mut state = HostState::default();
        assert_eq!(state.decimals(TOKEN), 18);
        state.set_decimals(TOKEN, 6);
        assert_eq!(state.decimals(TOKEN), 6);
    }
}

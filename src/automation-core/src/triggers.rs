//! Trigger calling convention and the protocol-independent built-in triggers.
//!
//! A trigger is a pure predicate over a read-only chain view. Condition data is ABI-encoded
//! so subscriptions created by off-chain tooling decode the same way here.

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{sol, SolType};
use crate::types::{ChainFacts, CompOp, FactsError};
use crate::utils::crypto::ecrecover_address;

sol! {
    struct GasPriceCondition {
        uint256 maxGasPrice;
    }

    struct TimestampCondition {
        uint256 notBefore;
    }

    struct StorageWordCondition {
        address target;
        bytes32 slot;
        uint8 op;
        uint256 value;
    }

    struct SignedPriceCondition {
        address feed;
        address reporter;
        uint8 op;
        uint256 price;
        uint64 maxAge;
    }

    struct PriceReport {
        address feed;
        uint256 price;
        uint64 observedAt;
    }

    struct PriceProof {
        uint256 price;
        uint64 observedAt;
        bytes signature;
    }
}

/// Data a trigger is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct TriggerInput<'a> {
    /// Condition fixed by the strategy template (`TriggerRef::stored_condition_data`).
    pub template: &'a [u8],
    /// Condition stored in the subscription.
    pub condition: &'a [u8],
    /// Fresh proof supplied by the executing bot.
    pub proof: &'a [u8],
}

impl<'a> TriggerInput<'a> {
    /// Subscription condition, falling back to the template when the subscription has none.
    pub fn effective_condition(&self) -> &'a [u8] {
        if self.condition.is_empty() {
            self.template
        } else {
            self.condition
        }
    }
}

pub trait Trigger: Send + Sync {
    fn is_triggered(
        &self,
        facts: &dyn ChainFacts,
        input: &TriggerInput<'_>,
    ) -> Result<bool, FactsError>;
}

fn decode<T: SolType>(data: &[u8]) -> Result<T::RustType, FactsError> {
    T::abi_decode(data, true).map_err(|_| FactsError::MalformedData)
}

/// Fires while the network gas price is at or below a ceiling.
#[derive(Clone, Copy, Debug, Default)]
pub struct GasPriceTrigger;

impl GasPriceTrigger {
    pub fn condition(max_gas_price: U256) -> Bytes {
        GasPriceCondition::abi_encode(&GasPriceCondition {
            maxGasPrice: max_gas_price,
        })
        .into()
    }
}

impl Trigger for GasPriceTrigger {
    fn is_triggered(
        &self,
        facts: &dyn ChainFacts,
        input: &TriggerInput<'_>,
    ) -> Result<bool, FactsError> {
        let cond = decode::<GasPriceCondition>(input.effective_condition())?;
        Ok(facts.gas_price() <= cond.maxGasPrice)
    }
}

/// Fires once the block timestamp reaches a point in time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimestampTrigger;

impl TimestampTrigger {
    pub fn condition(not_before: u64) -> Bytes {
        TimestampCondition::abi_encode(&TimestampCondition {
            notBefore: U256::from(not_before),
        })
        .into()
    }
}

impl Trigger for TimestampTrigger {
    fn is_triggered(
        &self,
        facts: &dyn ChainFacts,
        input: &TriggerInput<'_>,
    ) -> Result<bool, FactsError> {
        let cond = decode::<TimestampCondition>(input.effective_condition())?;
        Ok(U256::from(facts.block_timestamp()) >= cond.notBefore)
    }
}

/// Compares a live storage word against a threshold, e.g. a position's collateral ratio.
#[derive(Clone, Copy, Debug, Default)]
pub struct StorageWordTrigger;

impl StorageWordTrigger {
    pub fn condition(target: Address, slot: FixedBytes<32>, op: CompOp, value: U256) -> Bytes {
        StorageWordCondition::abi_encode(&StorageWordCondition {
            target,
            slot,
            op: op.into(),
            value,
        })
        .into()
    }
}

impl Trigger for StorageWordTrigger {
    fn is_triggered(
        &self,
        facts: &dyn ChainFacts,
        input: &TriggerInput<'_>,
    ) -> Result<bool, FactsError> {
        let cond = decode::<StorageWordCondition>(input.effective_condition())?;
        let op = CompOp::try_from(cond.op)?;
        let live = facts.storage_at(cond.target, cond.slot)?;
        Ok(op.apply(live, cond.value))
    }
}

/// Compares a price report signed by a trusted reporter against a threshold.
///
/// The subscription fixes the feed, the reporter and the maximum report age. The bot
/// supplies the latest report as proof. A report from anyone else, for another feed, from
/// the future or older than `maxAge` never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignedPriceTrigger;

impl SignedPriceTrigger {
    pub fn condition(feed: Address, reporter: Address, op: CompOp, price: U256, max_age: u64) -> Bytes {
        SignedPriceCondition::abi_encode(&SignedPriceCondition {
            feed,
            reporter,
            op: op.into(),
            price,
            maxAge: max_age,
        })
        .into()
    }

    /// Digest the reporter signs (r||s||v) for a price observation.
    pub fn report_digest(feed: Address, price: U256, observed_at: u64) -> FixedBytes<32> {
        keccak256(PriceReport::abi_encode(&PriceReport {
            feed,
            price,
            observedAt: observed_at,
        }))
    }

    pub fn proof(price: U256, observed_at: u64, signature: &[u8]) -> Bytes {
        PriceProof::abi_encode(&PriceProof {
            price,
            observedAt: observed_at,
            signature: Bytes::copy_from_slice(signature),
        })
        .into()
    }
}

impl Trigger for SignedPriceTrigger {
    fn is_triggered(
        &self,
        facts: &dyn ChainFacts,
        input: &TriggerInput<'_>,
    ) -> Result<bool, FactsError> {
        let cond = decode::<SignedPriceCondition>(input.effective_condition())?;
        let op = CompOp::try_from(cond.op)?;
        let proof = decode::<PriceProof>(input.proof)?;
        let raw: &[u8] = &proof.signature;
        let signature = <&[u8; 65]>::try_from(raw).map_err(|_| FactsError::MalformedData)?;

        let digest = Self::report_digest(cond.feed, proof.price, proof.observedAt);
        match ecrecover_address(digest, signature) {
            Ok(signer) if signer == cond.reporter => {}
            _ => return Ok(false),
        }

        let now = facts.block_timestamp();
        if proof.observedAt > now || now - proof.observedAt > cond.maxAge {
            return Ok(false);
        }
        Ok(op.apply(proof.price, cond.price))
    }
}

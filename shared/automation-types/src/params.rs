use alloy_primitives::{Bytes, FixedBytes};
use serde::{Deserialize, Serialize};

/// Where the value of a single 32-byte action parameter comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamSource {
    /// Fixed value, part of the template or recipe.
    Literal(FixedBytes<32>),
    /// Free-form value supplied by the executing bot (flash-loan amounts, swap quotes).
    Injected,
    /// Output of an earlier action in the same recipe.
    FromAction(usize),
    /// Subscription variable at the given sub slot.
    FromSub(usize),
    /// Address of the executing wallet.
    Wallet,
    /// Owner of the executing wallet.
    WalletOwner,
}

impl ParamSource {
    /// True when the slot can only be resolved by the strategy executor.
    pub fn needs_binding(&self) -> bool {
        matches!(self, ParamSource::Injected | ParamSource::FromSub(_))
    }
}

/// Tag bytes of the parameter wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamOpcode {
    Injected = 0x00,
    Literal = 0x01,
    FromAction = 0x02,
    FromSub = 0x03,
    Wallet = 0x04,
    WalletOwner = 0x05,
}

impl ParamOpcode {
    pub fn of(source: &ParamSource) -> Self {
        match source {
            ParamSource::Literal(_) => ParamOpcode::Literal,
            ParamSource::Injected => ParamOpcode::Injected,
            ParamSource::FromAction(_) => ParamOpcode::FromAction,
            ParamSource::FromSub(_) => ParamOpcode::FromSub,
            ParamSource::Wallet => ParamOpcode::Wallet,
            ParamSource::WalletOwner => ParamOpcode::WalletOwner,
        }
    }
}

impl TryFrom<u8> for ParamOpcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ParamOpcode::*;
        let op = match value {
            0x00 => Injected,
            0x01 => Literal,
            0x02 => FromAction,
            0x03 => FromSub,
            0x04 => Wallet,
            0x05 => WalletOwner,
            _ => return Err(()),
        };
        Ok(op)
    }
}

/// One step of a recipe or strategy template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCall {
    pub action_id: FixedBytes<32>,
    pub params: Vec<ParamSource>,
}

impl ActionCall {
    pub fn new(action_id: FixedBytes<32>, params: Vec<ParamSource>) -> Self {
        Self { action_id, params }
    }

    /// Number of `Injected` slots the bot has to fill for this call.
    pub fn injected_slots(&self) -> usize {
        self.params
            .iter()
            .filter(|p| matches!(p, ParamSource::Injected))
            .count()
    }
}

/// A trigger used by a strategy, with template-level condition data.
///
/// The per-subscription condition lives in the subscription's trigger data; this field holds
/// whatever the template fixes for every subscriber (empty for most triggers).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRef {
    pub trigger_id: FixedBytes<32>,
    pub stored_condition_data: Bytes,
}

impl TriggerRef {
    pub fn new(trigger_id: FixedBytes<32>) -> Self {
        Self {
            trigger_id,
            stored_condition_data: Bytes::new(),
        }
    }
}

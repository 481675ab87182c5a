//! Calling-convention types shared with off-chain tooling.

pub use automation_types::{
    id_of, ActionCall, ChainFacts, CompOp, FactsError, ParamOpcode, ParamSource, TriggerRef,
    ETH_ADDR,
};

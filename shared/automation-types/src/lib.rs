//! Shared types for the recipe calling convention, trigger facts and well-known ids.
//!
//! These are consumed both by the engine (`automation-core`) and by off-chain tooling
//! (`automation-encoder`), so the wire-level enums live here and nowhere else.

pub mod facts;
pub mod ids;
pub mod params;

pub use facts::{ChainFacts, CompOp, FactsError};
pub use ids::{id_of, ETH_ADDR};
pub use params::{ActionCall, ParamOpcode, ParamSource, TriggerRef};

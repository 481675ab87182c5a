//! Recipe automation engine.
//!
//! Users compose recipes (ordered, atomic action sequences), publish them as strategy
//! templates, and subscribe their smart wallets with concrete parameters. Authorised bots
//! execute subscriptions when their triggers are met, or relay owner-signed recipes and
//! recover gas in a fee token.

pub mod actions;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod host;
pub mod logging;
pub mod mock;
pub mod recipe;
pub mod registry;
pub mod relay;
pub mod strategy_executor;
pub mod subscriptions;
pub mod triggers;
pub mod types;
pub mod utils;

pub use crate::config::{EngineConfig, StrategySelectionPolicy};
pub use engine::Engine;
pub use errors::{ActionError, AutomationError, DecodeError, HostError, RegistryError};
pub use recipe::{Recipe, RecipeExecutor};
pub use relay::{RelayCall, RelayReceipt};
pub use strategy_executor::{ExecuteStrategyRequest, ExecutionRecord};
pub use subscriptions::{StoredSub, StrategySub};

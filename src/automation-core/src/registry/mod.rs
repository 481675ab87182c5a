//! Registries: component addresses, adapter implementations, bot allow-lists and the
//! append-only strategy/bundle templates.

pub mod adapters;
pub mod bot_auth;
pub mod bundles;
pub mod contracts;
pub mod journal;
pub mod strategies;

pub use adapters::{Adapter, AdapterLookup, AdapterRegistry, Resolver};
pub use bot_auth::BotAuth;
pub use bundles::{Bundle, BundleRegistry, BundleStorage};
pub use contracts::ContractRegistry;
pub use journal::{FileJournal, Journal, MemoryJournal};
pub use strategies::{NewStrategy, Strategy, StrategyRegistry, StrategyStorage};

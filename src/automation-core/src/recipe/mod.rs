//! Recipe execution: the action calling convention, the wallet execution context and the
//! executor that threads return values between actions.

pub mod action;
pub mod context;
pub mod executor;
pub mod types;

pub use action::{Action, ActionImpl, ActionKind, Continuation, FlashLoanProvider};
pub use context::{ExecutionContext, OffchainOrder, PositionFee};
pub use executor::RecipeExecutor;
pub use types::Recipe;

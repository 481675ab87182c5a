//! Adapter calling convention for actions.
//!
//! An action receives its parameters as fully resolved 32-byte words and returns one word,
//! which later actions may consume through `ParamSource::FromAction`.

use std::sync::Arc;

use alloy_primitives::{FixedBytes, U256};

use crate::{errors::ActionError, recipe::context::ExecutionContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Standard,
    /// Swaps/sells whose output can carry a fee taken from the position.
    Sell,
}

pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind {
        ActionKind::Standard
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError>;
}

/// Remaining recipe tail handed to a flash-loan provider; receives the borrowed amount.
pub type Continuation<'c> =
    dyn FnMut(&mut ExecutionContext<'_>, U256) -> Result<(), ActionError> + 'c;

/// A loan provider: lends, runs the continuation exactly once, then collects repayment.
///
/// The provider returns only after the continuation (and the repayment) succeeded, so the
/// whole tail of the recipe is nested inside the loan.
pub trait FlashLoanProvider: Send + Sync {
    fn flash_loan(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
        continuation: &mut Continuation<'_>,
    ) -> Result<FixedBytes<32>, ActionError>;
}

/// A deployed action implementation.
#[derive(Clone)]
pub enum ActionImpl {
    Standard(Arc<dyn Action>),
    FlashLoan(Arc<dyn FlashLoanProvider>),
}

impl ActionImpl {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionImpl::Standard(action) => action.kind(),
            ActionImpl::FlashLoan(_) => ActionKind::Standard,
        }
    }

    pub fn is_flash_loan(&self) -> bool {
        matches!(self, ActionImpl::FlashLoan(_))
    }
}

impl std::fmt::Debug for ActionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionImpl::Standard(a) => write!(f, "Standard({:?})", a.kind()),
            ActionImpl::FlashLoan(_) => f.write_str("FlashLoan"),
        }
    }
}

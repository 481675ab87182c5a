//! Protocol-independent built-in actions.
//!
//! Parameters are positional 32-byte words; addresses are left-padded and amounts are
//! big-endian `uint256`. An amount of `U256::MAX` means "everything available".

use alloy_primitives::{FixedBytes, U256};

use crate::{
    errors::ActionError,
    recipe::{Action, ExecutionContext},
    utils::bytes::{u256_word, word_address, word_u256},
};

pub(crate) fn expect_params(params: &[FixedBytes<32>], n: usize) -> Result<(), ActionError> {
    if params.len() != n {
        return Err(ActionError::BadParams("wrong parameter count"));
    }
    Ok(())
}

/// Pull `amount` of `token` from `from` into the wallet using an allowance `from` granted
/// the wallet. Params: token, from, amount.
#[derive(Clone, Copy, Debug, Default)]
pub struct PullToken;

impl Action for PullToken {
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 3)?;
        let token = word_address(&params[0]);
        let from = word_address(&params[1]);
        let mut amount = word_u256(&params[2]);
        if amount == U256::MAX {
            amount = ctx.state.balance(token, from);
        }
        ctx.pull(token, from, amount)?;
        Ok(u256_word(amount))
    }
}

/// Send `amount` of `token` from the wallet to `to`. Params: token, to, amount.
#[derive(Clone, Copy, Debug, Default)]
pub struct SendToken;

impl Action for SendToken {
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 3)?;
        let token = word_address(&params[0]);
        let to = word_address(&params[1]);
        let mut amount = word_u256(&params[2]);
        if amount == U256::MAX {
            amount = ctx.balance(token);
        }
        ctx.transfer(token, to, amount)?;
        Ok(u256_word(amount))
    }
}

/// Adds two words. Params: a, b.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumInputs;

impl Action for SumInputs {
    fn execute(
        &self,
        _ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 2)?;
        let sum = word_u256(&params[0])
            .checked_add(word_u256(&params[1]))
            .ok_or(ActionError::BadParams("sum overflows"))?;
        Ok(u256_word(sum))
    }
}

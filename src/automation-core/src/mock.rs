//! Off-chain stand-ins for protocol adapters: a lending market, a fixed-rate exchange and a
//! flash-loan pool. Their state lives in `HostState`, so it rolls back with everything else.

use alloy_primitives::{keccak256, Address, FixedBytes, U256};

use crate::{
    actions::expect_params,
    errors::ActionError,
    recipe::{Action, ActionKind, Continuation, ExecutionContext, FlashLoanProvider},
    utils::bytes::{u256_word, word_address, word_u256},
};

const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// A single-asset-pair lending market keyed by position owner (the wallet).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockLendingMarket {
    pub address: Address,
    pub collateral_token: Address,
    pub debt_token: Address,
    /// Collateral price in debt token, 1e18-scaled.
    pub collateral_price: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LendingOp {
    Supply,
    Withdraw,
    Borrow,
    Payback,
}

impl MockLendingMarket {
    pub fn collateral_slot(wallet: Address) -> FixedBytes<32> {
        position_slot(wallet, 0)
    }

    pub fn debt_slot(wallet: Address) -> FixedBytes<32> {
        position_slot(wallet, 1)
    }

    /// Collateral value over debt, 1e18-scaled; zero while there is no debt.
    pub fn ratio_slot(wallet: Address) -> FixedBytes<32> {
        position_slot(wallet, 2)
    }

    pub fn action(&self, op: LendingOp) -> MockLendingAction {
        MockLendingAction { market: *self, op }
    }

    fn write_position(
        &self,
        ctx: &mut ExecutionContext<'_>,
        collateral: U256,
        debt: U256,
    ) -> Result<(), ActionError> {
        let wallet = ctx.wallet;
        ctx.sstore(self.address, Self::collateral_slot(wallet), collateral)?;
        ctx.sstore(self.address, Self::debt_slot(wallet), debt)?;
        let ratio = if debt.is_zero() {
            U256::ZERO
        } else {
            collateral
                .checked_mul(self.collateral_price)
                .ok_or(ActionError::BadParams("ratio overflows"))?
                / debt
        };
        ctx.sstore(self.address, Self::ratio_slot(wallet), ratio)?;
        Ok(())
    }
}

fn position_slot(wallet: Address, index: u8) -> FixedBytes<32> {
    let mut buf = [0u8; 21];
    buf[..20].copy_from_slice(wallet.as_slice());
    buf[20] = index;
    keccak256(buf)
}

/// One lending operation on the wallet's position. Param: amount (`U256::MAX` = all).
#[derive(Clone, Copy, Debug)]
pub struct MockLendingAction {
    market: MockLendingMarket,
    op: LendingOp,
}

impl Action for MockLendingAction {
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 1)?;
        let m = &self.market;
        let wallet = ctx.wallet;
        let collateral = ctx.sload(m.address, MockLendingMarket::collateral_slot(wallet))?;
        let debt = ctx.sload(m.address, MockLendingMarket::debt_slot(wallet))?;
        let requested = word_u256(&params[0]);

        let (amount, collateral, debt) = match self.op {
            LendingOp::Supply => {
                let amount = if requested == U256::MAX {
                    ctx.balance(m.collateral_token)
                } else {
                    requested
                };
                ctx.transfer(m.collateral_token, m.address, amount)?;
                (amount, collateral + amount, debt)
            }
            LendingOp::Withdraw => {
                let amount = requested.min(collateral);
                ctx.transfer_between(m.collateral_token, m.address, wallet, amount)?;
                (amount, collateral - amount, debt)
            }
            LendingOp::Borrow => {
                ctx.transfer_between(m.debt_token, m.address, wallet, requested)?;
                let debt = debt
                    .checked_add(requested)
                    .ok_or(ActionError::BadParams("debt overflows"))?;
                (requested, collateral, debt)
            }
            LendingOp::Payback => {
                let amount = requested.min(debt);
                ctx.transfer(m.debt_token, m.address, amount)?;
                (amount, collateral, debt - amount)
            }
        };

        if matches!(self.op, LendingOp::Withdraw | LendingOp::Borrow)
            && !debt.is_zero()
            && collateral.saturating_mul(m.collateral_price) / debt < WAD
        {
            return Err(ActionError::Reverted("position would be undercollateralized".into()));
        }
        m.write_position(ctx, collateral, debt)?;
        Ok(u256_word(amount))
    }
}

/// Fixed-rate exchange against a liquidity address. Params: src token, dest token, amount.
///
/// Uses the bot-injected order price when one is present; any pending position fee is taken
/// from the output.
#[derive(Clone, Copy, Debug)]
pub struct MockSell {
    pub dex: Address,
    /// Destination units per source unit, 1e18-scaled.
    pub rate: U256,
}

impl Action for MockSell {
    fn kind(&self) -> ActionKind {
        ActionKind::Sell
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 3)?;
        let src = word_address(&params[0]);
        let dest = word_address(&params[1]);
        let mut amount = word_u256(&params[2]);
        if amount == U256::MAX {
            amount = ctx.balance(src);
        }
        let rate = match ctx.injected_order() {
            Some(order) if !order.is_empty() => order.price,
            _ => self.rate,
        };
        let out = amount
            .checked_mul(rate)
            .ok_or(ActionError::BadParams("sell amount overflows"))?
            / WAD;

        ctx.transfer(src, self.dex, amount)?;
        ctx.transfer_between(dest, self.dex, ctx.wallet, out)?;
        let net = ctx.take_position_fee(dest, out)?;
        Ok(u256_word(net))
    }
}

/// Flash-loan pool. Params: token, amount. Charges `fee_bps` on repayment.
#[derive(Clone, Copy, Debug)]
pub struct MockFlashLoan {
    pub pool: Address,
    pub fee_bps: u64,
}

impl FlashLoanProvider for MockFlashLoan {
    fn flash_loan(
        &self,
        ctx: &mut ExecutionContext<'_>,
        params: &[FixedBytes<32>],
        continuation: &mut Continuation<'_>,
    ) -> Result<FixedBytes<32>, ActionError> {
        expect_params(params, 2)?;
        let token = word_address(&params[0]);
        let amount = word_u256(&params[1]);
        let fee = amount * U256::from(self.fee_bps) / U256::from(10_000u64);
        let owed = amount + fee;

        ctx.transfer_between(token, self.pool, ctx.wallet, amount)?;
        continuation(ctx, amount)?;

        let available = ctx.balance(token);
        if available < owed {
            return Err(ActionError::FlashLoanNotRepaid { owed, available });
        }
        ctx.transfer(token, self.pool, owed)?;
        Ok(u256_word(amount))
    }
}

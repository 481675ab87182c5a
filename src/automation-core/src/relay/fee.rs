//! Gas cost to fee-token conversion.

use alloy_primitives::{Address, U256};
use thiserror::Error;
use crate::types::ETH_ADDR;

use crate::errors::AutomationError;

const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Failure of fixed-point division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WadError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("multiplication overflows")]
    Overflow,
}

/// `(x * 1e18 + y / 2) / y`, rounding half up.
pub fn wdiv(x: U256, y: U256) -> Result<U256, WadError> {
    if y.is_zero() {
        return Err(WadError::DivisionByZero);
    }
    let scaled = x
        .checked_mul(WAD)
        .and_then(|n| n.checked_add(y / U256::from(2u64)))
        .ok_or(WadError::Overflow)?;
    Ok(scaled / y)
}

/// Inputs of a fee computation.
#[derive(Clone, Copy, Debug)]
pub struct FeeQuote {
    pub gas_used: u64,
    pub gas_price: U256,
    pub fee_token: Address,
    pub weth: Address,
    /// Fee token price in ETH, 1e18-scaled.
    pub token_price_in_eth: U256,
    pub token_decimals: u8,
}

impl FeeQuote {
    /// `gas_used * gas_price` expressed in the fee token.
    pub fn fee(&self) -> Result<U256, AutomationError> {
        let tx_cost = U256::from(self.gas_used)
            .checked_mul(self.gas_price)
            .ok_or_else(|| AutomationError::ReferenceError("tx cost overflows".to_string()))?;
        if self.fee_token == self.weth || self.fee_token == ETH_ADDR {
            return Ok(tx_cost);
        }
        let in_token_wad = wdiv(tx_cost, self.token_price_in_eth).map_err(|err| match err {
            WadError::DivisionByZero => {
                AutomationError::ReferenceError("fee token price must be non-zero".to_string())
            }
            WadError::Overflow => AutomationError::ReferenceError("fee conversion overflows".to_string()),
        })?;
        let fee = if self.token_decimals <= 18 {
            in_token_wad / U256::from(10u64).pow(U256::from(18 - self.token_decimals))
        } else {
            in_token_wad
                .checked_mul(U256::from(10u64).pow(U256::from(self.token_decimals - 18)))
                .ok_or_else(|| AutomationError::ReferenceError("fee overflows".to_string()))?
        };
        Ok(fee)
    }
}

/// Lower `fee` by `percentage` percent; the bot may waive part of its margin.
pub fn apply_discount(fee: U256, percentage: u8) -> Result<U256, AutomationError> {
    if percentage > 100 {
        return Err(AutomationError::ReferenceError(format!(
            "discount of {percentage}% is out of range"
        )));
    }
    Ok(fee - fee * U256::from(percentage) / U256::from(100u64))
}

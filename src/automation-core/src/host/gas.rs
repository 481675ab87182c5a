//! Deterministic gas accounting for one host transaction.

use crate::errors::HostError;

pub const TX_BASE_GAS: u64 = 21_000;
pub const ACTION_CALL_GAS: u64 = 7_500;
pub const TRIGGER_CHECK_GAS: u64 = 3_000;
pub const TRANSFER_GAS: u64 = 30_000;
pub const SLOAD_GAS: u64 = 2_100;
pub const SSTORE_GAS: u64 = 20_000;
pub const SIGNATURE_CHECK_GAS: u64 = 6_000;

#[derive(Clone, Debug)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn charge(&mut self, amount: u64) -> Result<(), HostError> {
        let required = self.used.saturating_add(amount);
        if required > self.limit {
            return Err(HostError::OutOfGas {
                limit: self.limit,
                required,
            });
        }
        self.used = required;
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

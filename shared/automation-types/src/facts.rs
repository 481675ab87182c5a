use alloy_primitives::{Address, FixedBytes, U256};

/// Errors during fact acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactsError {
    /// Used by off-chain mocks or partially implemented providers.
    NotImplemented,
    /// Condition or proof data was malformed or could not be decoded.
    MalformedData,
    /// The underlying read failed.
    ReadFailed,
}

/// Comparison operators for numeric trigger conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl CompOp {
    pub fn apply(self, lhs: U256, rhs: U256) -> bool {
        match self {
            CompOp::Lt => lhs < rhs,
            CompOp::Lte => lhs <= rhs,
            CompOp::Gt => lhs > rhs,
            CompOp::Gte => lhs >= rhs,
            CompOp::Eq => lhs == rhs,
            CompOp::Neq => lhs != rhs,
        }
    }
}

impl TryFrom<u8> for CompOp {
    type Error = FactsError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        let op = match b {
            0 => CompOp::Lt,
            1 => CompOp::Lte,
            2 => CompOp::Gt,
            3 => CompOp::Gte,
            4 => CompOp::Eq,
            5 => CompOp::Neq,
            _ => return Err(FactsError::MalformedData),
        };
        Ok(op)
    }
}

impl From<CompOp> for u8 {
    fn from(op: CompOp) -> u8 {
        match op {
            CompOp::Lt => 0,
            CompOp::Lte => 1,
            CompOp::Gt => 2,
            CompOp::Gte => 3,
            CompOp::Eq => 4,
            CompOp::Neq => 5,
        }
    }
}

/// Read-only chain view handed to triggers, implemented by the host and by off-chain mocks.
pub trait ChainFacts {
    fn block_timestamp(&self) -> u64;

    fn gas_price(&self) -> U256;

    fn balance_of(&self, _token: Address, _holder: Address) -> Result<U256, FactsError> {
        Err(FactsError::NotImplemented)
    }

    /// Raw storage word of `target` at `slot`.
    fn storage_at(&self, _target: Address, _slot: FixedBytes<32>) -> Result<U256, FactsError> {
        Err(FactsError::NotImplemented)
    }
}

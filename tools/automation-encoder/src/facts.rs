//! Mock chain facts for testing trigger conditions off-chain.

use std::collections::HashMap;

use alloy_primitives::{Address, FixedBytes, U256};
pub use automation_types::{ChainFacts, FactsError};

/// Mock chain view for off-chain testing.
///
/// Lets tooling check encoded trigger conditions without a running engine.
#[derive(Clone, Debug, Default)]
pub struct MockFacts {
    pub block_timestamp: u64,
    pub gas_price: U256,
    pub storage: HashMap<(Address, FixedBytes<32>), U256>,
}

impl MockFacts {
    pub fn new(block_timestamp: u64, gas_price: U256) -> Self {
        Self {
            block_timestamp,
            gas_price,
            storage: HashMap::new(),
        }
    }

    pub fn with_storage(mut self, target: Address, slot: FixedBytes<32>, value: U256) -> Self {
        self.storage.insert((target, slot), value);
        self
    }
}

impl ChainFacts for MockFacts {
    fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn storage_at(&self, target: Address, slot: FixedBytes<32>) -> Result<U256, FactsError> {
        Ok(self.storage.get(&(target, slot)).copied().unwrap_or(U256::ZERO))
    }
}

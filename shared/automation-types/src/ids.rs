use alloy_primitives::{address, keccak256, Address, FixedBytes};

/// Placeholder address used for the native currency in token-denominated APIs.
pub const ETH_ADDR: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Registry id of a named component: `keccak256(name)`.
pub fn id_of(name: &str) -> FixedBytes<32> {
    keccak256(name.as_bytes())
}

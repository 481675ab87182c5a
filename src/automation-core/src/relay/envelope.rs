//! Relay envelope parsing and EIP-712 digest computation.
//!
//! The wallet owner signs the envelope off-chain; a bot submits it. The digest binds the
//! chain, the relay front-end (verifying contract), the wallet and every fee term.

use alloy_primitives::{keccak256, Address, FixedBytes, U256};

use crate::{
    errors::DecodeError,
    utils::bytes::{
        address_word, read_address, read_u16_be, read_u256_be, read_u32_be, read_u64_be, read_u8,
        read_vec,
    },
};

pub const ENVELOPE_VERSION: u16 = 1;

pub const FEE_FROM_POSITION: u8 = 0b01;
pub const FEE_FROM_WALLET: u8 = 0b10;

/// Where the relay fee is collected from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeSource {
    /// Owner's externally owned account, through an allowance granted to the wallet.
    Eoa,
    Wallet,
    /// Carved out of a sell action's output.
    Position,
}

impl FeeSource {
    pub fn from_flags(flags: u8) -> Self {
        if flags & FEE_FROM_POSITION != 0 {
            FeeSource::Position
        } else if flags & FEE_FROM_WALLET != 0 {
            FeeSource::Wallet
        } else {
            FeeSource::Eoa
        }
    }
}

/// Parsed relay envelope (v1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayEnvelope {
    pub version: u16,
    pub nonce: U256,
    pub deadline: u64,
    /// Zero address means the transaction is sponsored and no fee is taken.
    pub fee_token: Address,
    pub max_tx_cost: U256,
    /// Fee token price in ETH, 1e18-scaled.
    pub token_price_in_eth: U256,
    pub fee_flags: u8,
    pub recipe: Vec<u8>,
    pub signature: [u8; 65],
}

impl RelayEnvelope {
    pub fn fee_source(&self) -> FeeSource {
        FeeSource::from_flags(self.fee_flags)
    }

    pub fn is_sponsored(&self) -> bool {
        self.fee_token == Address::ZERO
    }
}

/// Parse envelope bytes.
///
/// Layout (big-endian for integer fields):
/// - u16 version
/// - bytes32 nonce (u256)
/// - u64 deadline
/// - address fee_token (20 bytes)
/// - bytes32 max_tx_cost (u256)
/// - bytes32 token_price_in_eth (u256)
/// - u8 fee_flags
/// - u32 recipe_len
/// - bytes recipe
/// - u16 sig_len (must be 65)
/// - bytes signature (r||s||v)
pub fn parse_relay_envelope(bytes: &[u8]) -> Result<RelayEnvelope, DecodeError> {
    let mut i = 0usize;

    let version = read_u16_be(bytes, &mut i)?;
    if version != ENVELOPE_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let nonce = read_u256_be(bytes, &mut i)?;
    let deadline = read_u64_be(bytes, &mut i)?;
    let fee_token = read_address(bytes, &mut i)?;
    let max_tx_cost = read_u256_be(bytes, &mut i)?;
    let token_price_in_eth = read_u256_be(bytes, &mut i)?;
    let fee_flags = read_u8(bytes, &mut i)?;
    let recipe_len = read_u32_be(bytes, &mut i)? as usize;
    let recipe = read_vec(bytes, &mut i, recipe_len)?;
    let sig_len = read_u16_be(bytes, &mut i)? as usize;
    if sig_len != 65 {
        return Err(DecodeError::InvalidSignatureLength(sig_len));
    }
    let sig_bytes = read_vec(bytes, &mut i, sig_len)?;
    if i != bytes.len() {
        return Err(DecodeError::TrailingBytes);
    }
    let mut signature = [0u8; 65];
    signature.copy_from_slice(&sig_bytes);

    Ok(RelayEnvelope {
        version,
        nonce,
        deadline,
        fee_token,
        max_tx_cost,
        token_price_in_eth,
        fee_flags,
        recipe,
        signature,
    })
}

/// EIP-712 digest the wallet owner signs.
pub fn relay_digest(
    chain_id: u64,
    verifying_contract: Address,
    wallet: Address,
    env: &RelayEnvelope,
) -> FixedBytes<32> {
    // Hash the recipe so the typed message stays fixed-size.
    let recipe_hash = keccak256(&env.recipe);

    let domain_type_hash = keccak256(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );
    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(keccak256(b"Recipe Automation Relay").as_slice());
    domain_buf.extend_from_slice(keccak256(b"1").as_slice());
    domain_buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(address_word(verifying_contract).as_slice());
    let domain_separator = keccak256(domain_buf);

    let msg_type_hash = keccak256(
        b"RelayedRecipe(address wallet,uint256 nonce,uint64 deadline,address feeToken,uint256 maxTxCostInFeeToken,uint256 tokenPriceInEth,uint8 feeFlags,bytes32 recipeHash)",
    );
    let mut struct_buf = Vec::with_capacity(32 * 9);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(address_word(wallet).as_slice());
    struct_buf.extend_from_slice(&env.nonce.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&U256::from(env.deadline).to_be_bytes::<32>());
    struct_buf.extend_from_slice(address_word(env.fee_token).as_slice());
    struct_buf.extend_from_slice(&env.max_tx_cost.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&env.token_price_in_eth.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&U256::from(env.fee_flags).to_be_bytes::<32>());
    struct_buf.extend_from_slice(recipe_hash.as_slice());
    let struct_hash = keccak256(struct_buf);

    // keccak256("\x19\x01" || domainSeparator || structHash)
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    keccak256(final_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn envelope() -> RelayEnvelope {
        RelayEnvelope {
            version: ENVELOPE_VERSION,
            nonce: U256::from(3u64),
            deadline: 1_000,
            fee_token: address!("00000000000000000000000000000000000000aa"),
            max_tx_cost: U256::from(10u64),
            token_price_in_eth: U256::from(1u64),
            fee_flags: FEE_FROM_WALLET,
            recipe: vec![1, 2, 3],
            signature: [0u8; 65],
        }
    }

    fn encode(env: &RelayEnvelope) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&env.version.to_be_bytes());
        out.extend_from_slice(&env.nonce.to_be_bytes::<32>());
        out.extend_from_slice(&env.deadline.to_be_bytes());
        out.extend_from_slice(env.fee_token.as_slice());
        out.extend_from_slice(&env.max_tx_cost.to_be_bytes::<32>());
        out.extend_from_slice(&env.token_price_in_eth.to_be_bytes::<32>());
        out.push(env.fee_flags);
        out.extend_from_slice(&(env.recipe.len() as u32).to_be_bytes());
        out.extend_from_slice(&env.recipe);
        out.extend_from_slice(&65u16.to_be_bytes());
        out.extend_from_slice(&env.signature);
        out
    }

    #[test]
    fn parses_and_rejects_trailing_bytes() {
        let env = envelope();
        let mut bytes = encode(&env);
        assert_eq!(parse_relay_envelope(&bytes).unwrap(), env);
        bytes.push(0);
        assert_eq!(parse_relay_envelope(&bytes), Err(DecodeError::TrailingBytes));
        assert_eq!(
            parse_relay_envelope(&[0, 2]),
            Err(DecodeError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn digest_binds_front_end_and_terms() {
        let env = envelope();
        let wallet = address!("00000000000000000000000000000000000000c1");
        let relay = address!("0000000000000000000000000000000000000e01");
        let saver = address!("0000000000000000000000000000000000000e02");
        let base = relay_digest(1, relay, wallet, &env);
        assert_ne!(base, relay_digest(1, saver, wallet, &env));
        assert_ne!(base, relay_digest(2, relay, wallet, &env));
        let mut bumped = env.clone();
        bumped.max_tx_cost = U256::from(11u64);
        assert_ne!(base, relay_digest(1, relay, wallet, &bumped));
    }

    #[test]
    fn fee_flags_select_source() {
        assert_eq!(FeeSource::from_flags(0), FeeSource::Eoa);
        assert_eq!(FeeSource::from_flags(FEE_FROM_WALLET), FeeSource::Wallet);
        assert_eq!(FeeSource::from_flags(FEE_FROM_POSITION | FEE_FROM_WALLET), FeeSource::Position);
    }
}

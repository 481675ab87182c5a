use alloy_primitives::{Address, FixedBytes, U256};
use automation_types::{ActionCall, ParamOpcode, ParamSource};
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::types::{EncodeError, RelayEnvelope};

/// Encode a recipe (or strategy action list) into its wire form.
///
/// Lengths, counts and indices that overflow their wire field are rejected.
pub fn encode_recipe(name: &str, calls: &[ActionCall]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&fit_u16("recipe name length", name.len())?.to_be_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.push(fit_u8("action count", calls.len())?);
    for call in calls {
        buf.extend_from_slice(call.action_id.as_slice());
        buf.push(fit_u8("parameter count", call.params.len())?);
        for param in &call.params {
            encode_param(&mut buf, param)?;
        }
    }
    Ok(buf)
}

fn encode_param(buf: &mut Vec<u8>, param: &ParamSource) -> Result<(), EncodeError> {
    buf.push(ParamOpcode::of(param) as u8);
    match param {
        ParamSource::Literal(word) => buf.extend_from_slice(word.as_slice()),
        ParamSource::FromAction(i) => buf.push(fit_u8("return value index", *i)?),
        ParamSource::FromSub(i) => buf.push(fit_u8("subscription slot index", *i)?),
        ParamSource::Injected | ParamSource::Wallet | ParamSource::WalletOwner => {}
    }
    Ok(())
}

fn fit_u8(field: &'static str, value: usize) -> Result<u8, EncodeError> {
    u8::try_from(value).map_err(|_| EncodeError::TooLarge {
        field,
        value,
        max: u8::MAX as usize,
    })
}

fn fit_u16(field: &'static str, value: usize) -> Result<u16, EncodeError> {
    u16::try_from(value).map_err(|_| EncodeError::TooLarge {
        field,
        value,
        max: u16::MAX as usize,
    })
}

fn fit_u32(field: &'static str, value: usize) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::TooLarge {
        field,
        value,
        max: u32::MAX as usize,
    })
}

fn keccak256_bytes(bytes: &[u8]) -> FixedBytes<32> {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

fn word(addr: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(addr.as_slice());
    padded
}

/// Compute the relay EIP-712 digest (must match the engine's `relay_digest`).
pub fn relay_digest(envelope: &RelayEnvelope) -> FixedBytes<32> {
    let recipe_hash = keccak256_bytes(&envelope.recipe);

    let domain_type_hash = keccak256_bytes(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );
    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(keccak256_bytes(b"Recipe Automation Relay").as_slice());
    domain_buf.extend_from_slice(keccak256_bytes(b"1").as_slice());
    domain_buf.extend_from_slice(&U256::from(envelope.domain_chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&word(envelope.domain_verifying_contract));
    let domain_separator = keccak256_bytes(&domain_buf);

    let msg_type_hash = keccak256_bytes(
        b"RelayedRecipe(address wallet,uint256 nonce,uint64 deadline,address feeToken,uint256 maxTxCostInFeeToken,uint256 tokenPriceInEth,uint8 feeFlags,bytes32 recipeHash)",
    );
    let mut struct_buf = Vec::with_capacity(32 * 9);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(&word(envelope.wallet));
    struct_buf.extend_from_slice(&envelope.nonce.to_be_bytes::<32>());
    let mut deadline_padded = [0u8; 32];
    deadline_padded[24..32].copy_from_slice(&envelope.deadline.to_be_bytes());
    struct_buf.extend_from_slice(&deadline_padded);
    struct_buf.extend_from_slice(&word(envelope.fee_token));
    struct_buf.extend_from_slice(&envelope.max_tx_cost.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&envelope.token_price_in_eth.to_be_bytes::<32>());
    let mut flags_padded = [0u8; 32];
    flags_padded[31] = envelope.fee_flags;
    struct_buf.extend_from_slice(&flags_padded);
    struct_buf.extend_from_slice(recipe_hash.as_slice());
    let struct_hash = keccak256_bytes(&struct_buf);

    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    keccak256_bytes(&final_buf)
}

/// Sign the relay digest and write the 65-byte signature into `envelope.signature`.
pub fn sign_envelope(envelope: &mut RelayEnvelope, signing_key: &SigningKey) -> Result<(), k256::ecdsa::Error> {
    let digest = relay_digest(envelope);
    let (signature, recovery_id) = signing_key.sign_prehash_recoverable(digest.as_slice())?;
    let (r, s) = signature.split_bytes();

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(r.as_slice());
    sig_bytes.extend_from_slice(s.as_slice());
    sig_bytes.push(27 + recovery_id.to_byte());
    envelope.signature = sig_bytes;
    Ok(())
}

/// Encode a relay envelope into the bytes a bot submits.
pub fn encode_envelope(envelope: &RelayEnvelope) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();

    // u16 version
    buf.extend_from_slice(&envelope.version.to_be_bytes());
    // bytes32 nonce (u256)
    buf.extend_from_slice(&envelope.nonce.to_be_bytes::<32>());
    // u64 deadline
    buf.extend_from_slice(&envelope.deadline.to_be_bytes());
    // address fee_token
    buf.extend_from_slice(envelope.fee_token.as_slice());
    // bytes32 max_tx_cost, bytes32 token_price_in_eth
    buf.extend_from_slice(&envelope.max_tx_cost.to_be_bytes::<32>());
    buf.extend_from_slice(&envelope.token_price_in_eth.to_be_bytes::<32>());
    // u8 fee_flags
    buf.push(envelope.fee_flags);
    // u32 recipe_len, recipe
    buf.extend_from_slice(&fit_u32("recipe length", envelope.recipe.len())?.to_be_bytes());
    buf.extend_from_slice(&envelope.recipe);
    // u16 sig_len (must be 65), signature (r||s||v)
    buf.extend_from_slice(&fit_u16("signature length", envelope.signature.len())?.to_be_bytes());
    buf.extend_from_slice(&envelope.signature);

    Ok(buf)
}

/// Ethereum address controlled by `signing_key`.
pub fn address_of(signing_key: &SigningKey) -> Address {
    let verifying_key: &VerifyingKey = signing_key.verifying_key();
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Parse a hex private key (with or without `0x`).
pub fn signing_key_from_hex(key: &str) -> Result<SigningKey, k256::ecdsa::Error> {
    let raw = hex::decode(key.trim_start_matches("0x")).map_err(|_| k256::ecdsa::Error::new())?;
    SigningKey::from_slice(&raw)
}

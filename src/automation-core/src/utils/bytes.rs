//! Minimal big-endian parsing helpers and 32-byte word conversions.
//!
//! The readers back the recipe decoder and the relay envelope parser.

use alloy_primitives::{Address, FixedBytes, U256};

use crate::errors::DecodeError;

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Vec<u8>, DecodeError> {
    if bytes.len() < *i + len {
        return Err(DecodeError::Truncated);
    }
    let out = bytes[*i..*i + len].to_vec();
    *i += len;
    Ok(out)
}

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    let b = *bytes.get(*i).ok_or(DecodeError::Truncated)?;
    *i += 1;
    Ok(b)
}

pub fn read_u16_be(bytes: &[u8], i: &mut usize) -> Result<u16, DecodeError> {
    if bytes.len() < *i + 2 {
        return Err(DecodeError::Truncated);
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*i..*i + 2]);
    *i += 2;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u32_be(bytes: &[u8], i: &mut usize) -> Result<u32, DecodeError> {
    if bytes.len() < *i + 4 {
        return Err(DecodeError::Truncated);
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*i..*i + 4]);
    *i += 4;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64_be(bytes: &[u8], i: &mut usize) -> Result<u64, DecodeError> {
    if bytes.len() < *i + 8 {
        return Err(DecodeError::Truncated);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[*i..*i + 8]);
    *i += 8;
    Ok(u64::from_be_bytes(buf))
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, DecodeError> {
    if bytes.len() < *i + 32 {
        return Err(DecodeError::Truncated);
    }
    let out = U256::from_be_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(out)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Result<FixedBytes<32>, DecodeError> {
    if bytes.len() < *i + 32 {
        return Err(DecodeError::Truncated);
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(FixedBytes(buf))
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, DecodeError> {
    if bytes.len() < *i + 20 {
        return Err(DecodeError::Truncated);
    }
    let addr = Address::from_slice(&bytes[*i..*i + 20]);
    *i += 20;
    Ok(addr)
}

/// Left-pad an address into a parameter word.
pub fn address_word(addr: Address) -> FixedBytes<32> {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(addr.as_slice());
    FixedBytes(padded)
}

pub fn u256_word(value: U256) -> FixedBytes<32> {
    FixedBytes(value.to_be_bytes::<32>())
}

/// Low 20 bytes of a parameter word.
pub fn word_address(word: &FixedBytes<32>) -> Address {
    Address::from_slice(&word[12..32])
}

pub fn word_u256(word: &FixedBytes<32>) -> U256 {
    U256::from_be_slice(word.as_slice())
}

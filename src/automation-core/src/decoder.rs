use alloy_primitives::FixedBytes;
use crate::types::{ActionCall, ParamOpcode, ParamSource};

use crate::{
    errors::{AutomationError, DecodeError},
    recipe::Recipe,
    utils::bytes::{read_b32, read_u16_be, read_u8, read_vec},
};

pub const MAX_ACTIONS_DEFAULT: usize = 32;
pub const MAX_PARAMS_PER_ACTION: usize = 32;

/// Decode recipe bytes into a validated, executable `Recipe`.
pub fn decode_recipe(bytes: &[u8]) -> Result<Recipe, AutomationError> {
    decode_recipe_with_limit(bytes, MAX_ACTIONS_DEFAULT)
}

pub fn decode_recipe_with_limit(bytes: &[u8], max_actions: usize) -> Result<Recipe, AutomationError> {
    let (name, calls) = decode_calls(bytes, max_actions)?;
    Recipe::new(name, calls)
}

/// Decode the raw name and action calls without recipe-level validation.
///
/// Layout:
/// - u16 name_len, name (utf-8)
/// - u8 action_count
/// - per action: bytes32 action_id, u8 param_count, params
/// - per param: tag byte, then 32 bytes (Literal) or one index byte (FromAction/FromSub)
pub fn decode_calls(bytes: &[u8], max_actions: usize) -> Result<(String, Vec<ActionCall>), DecodeError> {
    let mut i = 0usize;

    let name_len = read_u16_be(bytes, &mut i)? as usize;
    let name = String::from_utf8(read_vec(bytes, &mut i, name_len)?)
        .map_err(|_| DecodeError::InvalidName)?;

    let action_count = read_u8(bytes, &mut i)? as usize;
    if action_count > max_actions {
        return Err(DecodeError::TooManyActions);
    }

    let mut calls = Vec::with_capacity(action_count);
    for _ in 0..action_count {
        let action_id = read_b32(bytes, &mut i)?;
        let param_count = read_u8(bytes, &mut i)? as usize;
        if param_count > MAX_PARAMS_PER_ACTION {
            return Err(DecodeError::TooManyParams);
        }
        let mut params = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            params.push(read_param(bytes, &mut i)?);
        }
        calls.push(ActionCall::new(action_id, params));
    }

    if i != bytes.len() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok((name, calls))
}

fn read_param(bytes: &[u8], i: &mut usize) -> Result<ParamSource, DecodeError> {
    let tag = read_u8(bytes, i)?;
    let opcode = ParamOpcode::try_from(tag).map_err(|_| DecodeError::UnknownTag(tag))?;
    let param = match opcode {
        ParamOpcode::Injected => ParamSource::Injected,
        ParamOpcode::Literal => {
            let word: FixedBytes<32> = read_b32(bytes, i)?;
            ParamSource::Literal(word)
        }
        ParamOpcode::FromAction => ParamSource::FromAction(read_u8(bytes, i)? as usize),
        ParamOpcode::FromSub => ParamSource::FromSub(read_u8(bytes, i)? as usize),
        ParamOpcode::Wallet => ParamSource::Wallet,
        ParamOpcode::WalletOwner => ParamSource::WalletOwner,
    };
    Ok(param)
}

//! Signature recovery for relayed payloads.
//!
//! Purpose: verify that a relay envelope was authorised by the owner of the wallet it
//! executes as.

use alloy_primitives::{keccak256, Address, FixedBytes};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Recover an EOA address from a 32-byte digest and an ECDSA signature (r||s||v).
///
/// Accepts v in {0,1,27,28}. Any other v is rejected.
pub fn ecrecover_address(digest: FixedBytes<32>, sig: &[u8; 65]) -> Result<Address, ()> {
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| ())?;
    let v = match sig[64] {
        27 | 28 => sig[64] - 27,
        0 | 1 => sig[64],
        _ => return Err(()),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(())?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id).map_err(|_| ())?;
    let recovered = public_key_address(&key);
    if recovered == Address::ZERO {
        return Err(());
    }
    Ok(recovered)
}

/// Ethereum address of a secp256k1 public key.
pub fn public_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signed(digest: FixedBytes<32>) -> (Address, [u8; 65]) {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let (sig, recid) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        (public_key_address(key.verifying_key()), out)
    }

    #[test]
    fn recovers_with_either_v_convention() {
        let digest = keccak256(b"relay");
        let (signer, mut sig) = signed(digest);
        assert_eq!(ecrecover_address(digest, &sig), Ok(signer));
        sig[64] -= 27;
        assert_eq!(ecrecover_address(digest, &sig), Ok(signer));
    }

    #[test]
    fn unknown_v_is_rejected() {
        let digest = keccak256(b"relay");
        let (_, mut sig) = signed(digest);
        for v in [2u8, 26, 29, 35, 255] {
            sig[64] = v;
            assert_eq!(ecrecover_address(digest, &sig), Err(()));
        }
    }
}

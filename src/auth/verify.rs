//! Wallet personal-message signature verification (secp256k1 + Keccak-256).
//!
//! Wallets sign `keccak256("\x19Ethereum Signed Message:\n" + len + message)`
//! and return a 65-byte `r || s || v` signature, usually with `v` in 27/28.
//! Verification recovers the signer's public key from the signature, derives
//! its address, and compares it with the claimed one.
//!
//! Every function here is total: malformed input yields `false`/`None`,
//! never a panic.

use super::address::{Address, ADDRESS_LEN};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

/// Banner prepended to every personal message before hashing.
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length of an encoded recoverable signature: r (32) || s (32) || v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Wallets encode the recovery id with this offset.
const RECOVERY_ID_OFFSET: u8 = 27;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Digest a wallet signs for `message` under the personal-sign convention.
///
/// The length is the message's byte length in decimal, unpadded.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Address controlled by a public key: last 20 bytes of keccak256(X || Y).
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    // Uncompressed SEC1 encoding is 0x04 || X || Y
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&hash[32 - ADDRESS_LEN..]);
    Address::from_bytes(bytes)
}

/// Decode a hex signature, with or without `0x`, into its 65 raw bytes.
fn decode_signature(signature: &str) -> Option<[u8; SIGNATURE_LEN]> {
    let digits = signature
        .strip_prefix("0x")
        .or_else(|| signature.strip_prefix("0X"))
        .unwrap_or(signature);

    if digits.len() != SIGNATURE_LEN * 2 {
        return None;
    }

    let mut bytes = [0u8; SIGNATURE_LEN];
    hex::decode_to_slice(digits, &mut bytes).ok()?;
    Some(bytes)
}

/// Recover the address that produced `signature` over `message`.
///
/// Returns `None` for any malformed signature or failed recovery.
pub fn recover_address(message: &str, signature: &str) -> Option<Address> {
    let bytes = decode_signature(signature)?;

    let mut v = bytes[64];
    if v >= RECOVERY_ID_OFFSET {
        v -= RECOVERY_ID_OFFSET;
    }
    // Only the y-parity bit is meaningful for wallet signatures
    if v > 1 {
        return None;
    }
    let mut recovery_id = RecoveryId::from_byte(v)?;

    let mut sig = Signature::from_slice(&bytes[..64]).ok()?;

    // k256 refuses high-S signatures; s -> n - s mirrors R, so flip the parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id).ok()?;

    Some(address_from_verifying_key(&key))
}

/// Check that `signature` over `message` was produced by `claimed_address`.
pub fn verify_signature(claimed_address: &str, message: &str, signature: &str) -> bool {
    let Ok(claimed) = claimed_address.parse::<Address>() else {
        return false;
    };

    match recover_address(message, signature) {
        Some(recovered) => recovered == claimed,
        None => false,
    }
}

/// Sign `message` the way a wallet's personal-sign does.
///
/// Returns the 0x-prefixed hex signature with `v` encoded as 27/28.
pub fn sign_personal_message(key: &SigningKey, message: &str) -> Result<String, k256::ecdsa::Error> {
    let digest = personal_message_hash(message);
    let (sig, recovery_id) = key.sign_prehash_recoverable(&digest)?;

    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[..64].copy_from_slice(&sig.to_bytes());
    bytes[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;

    Ok(format!("0x{}", hex::encode(bytes)))
}

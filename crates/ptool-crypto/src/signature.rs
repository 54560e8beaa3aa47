//! Ed25519 detached signatures.
//!
//! Private keys are accepted as the 32-byte seed or as the 64-byte
//! `seed || public` form; in the latter only the seed is used.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use tracing::debug;

use crate::codec;
use crate::error::{CryptoError, Result};

pub const SIGNATURE_LEN: usize = 64;
pub const PUBLIC_KEY_LEN: usize = 32;
const SEED_LEN: usize = 32;

/// Build a signing key from a 32-byte seed or a 64-byte expanded key.
pub fn signing_key(private_key: &[u8]) -> Result<SigningKey> {
    let seed: &[u8; SEED_LEN] = match private_key.len() {
        32 | 64 => private_key[..SEED_LEN]
            .try_into()
            .map_err(|_| invalid_private_len(private_key.len()))?,
        got => return Err(invalid_private_len(got)),
    };
    Ok(SigningKey::from_bytes(seed))
}

fn invalid_private_len(got: usize) -> CryptoError {
    CryptoError::InvalidKeyLength {
        expected: "32 or 64",
        got,
    }
}

/// Public key bytes for a private key.
pub fn public_key(private_key: &[u8]) -> Result<[u8; PUBLIC_KEY_LEN]> {
    Ok(signing_key(private_key)?.verifying_key().to_bytes())
}

/// Sign `message`. Ed25519 is deterministic: same key and message, same
/// signature.
pub fn sign(private_key: &[u8], message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
    let key = signing_key(private_key)?;
    let signature: Signature = key.sign(message);
    debug!(message_len = message.len(), "signed message");
    Ok(signature.to_bytes())
}

/// Verify a detached signature.
///
/// Returns `Ok(false)` when the signature does not match. Malformed inputs
/// (wrong public key or signature length) are errors.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
    let pub_bytes: &[u8; PUBLIC_KEY_LEN] =
        public_key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: "32",
            got: public_key.len(),
        })?;
    let sig_bytes: &[u8; SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength {
            got: signature.len(),
        })?;

    let Ok(verifying_key) = VerifyingKey::from_bytes(pub_bytes) else {
        debug!("public key is not a valid curve point");
        return Ok(false);
    };
    let sig = Signature::from_bytes(sig_bytes);
    Ok(verifying_key.verify_strict(message, &sig).is_ok())
}

/// Sign and encode the signature as base64url.
pub fn sign_to_text(private_key: &[u8], message: &[u8]) -> Result<String> {
    Ok(codec::encode(sign(private_key, message)?))
}

/// Verify a base64url-encoded signature.
pub fn verify_text(public_key: &[u8], message: &[u8], signature_text: &str) -> Result<bool> {
    verify(public_key, message, &codec::decode(signature_text)?)
}

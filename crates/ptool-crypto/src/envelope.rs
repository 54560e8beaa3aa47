//! Envelope module for one-shot sealed-box encryption.
//!
//! Wire layout: `ephemeral_public (32) || nonce (12) || ciphertext_with_tag`.
//! The ephemeral X25519 key is agreed with the recipient's static key, the
//! shared secret is expanded with HKDF-SHA256 (no salt, [`HKDF_INFO`]) and
//! the payload is sealed with ChaCha20-Poly1305 without associated data.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand_core::{CryptoRng, OsRng, RngCore};
use sha2::Sha256;
use tracing::debug;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::codec;
use crate::error::{CryptoError, Result};

/// HKDF info string. Part of the wire contract.
pub const HKDF_INFO: &[u8] = b"privateness-sms-v1";

pub const EPHEMERAL_PUBLIC_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
/// Shortest well-formed envelope: an empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = EPHEMERAL_PUBLIC_LEN + NONCE_LEN + TAG_LEN;

const X25519_KEY_LEN: usize = 32;

/// Borrowed view of a parsed envelope.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeView<'a> {
    pub ephemeral_public: &'a [u8; EPHEMERAL_PUBLIC_LEN],
    pub nonce: &'a [u8; NONCE_LEN],
    pub ciphertext: &'a [u8],
}

impl<'a> EnvelopeView<'a> {
    /// Split envelope bytes into their parts without doing any cryptography.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::MalformedEnvelope { len: bytes.len() });
        }
        let (ephemeral_public, rest) = bytes.split_at(EPHEMERAL_PUBLIC_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        Ok(Self {
            ephemeral_public: ephemeral_public
                .try_into()
                .map_err(|_| CryptoError::MalformedEnvelope { len: bytes.len() })?,
            nonce: nonce
                .try_into()
                .map_err(|_| CryptoError::MalformedEnvelope { len: bytes.len() })?,
            ciphertext,
        })
    }

    /// Length of the sealed plaintext.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len() - TAG_LEN
    }
}

/// Clamp 32 random bytes into an X25519 scalar.
pub fn clamp_scalar(mut bytes: [u8; 32]) -> [u8; 32] {
    clamp_in_place(&mut bytes);
    bytes
}

fn clamp_in_place(bytes: &mut [u8; 32]) {
    bytes[0] &= 248;
    bytes[31] &= 127;
    bytes[31] |= 64;
}

fn x25519_key(bytes: &[u8]) -> Result<[u8; X25519_KEY_LEN]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: "32",
        got: bytes.len(),
    })
}

fn derive_key(shared_secret: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, &mut key[..])
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

/// Seal `plaintext` to `recipient_public` (X25519), drawing the ephemeral key
/// and nonce from `rng`.
pub fn seal_with_rng<R: RngCore + CryptoRng>(
    recipient_public: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let recipient = X25519PublicKey::from(x25519_key(recipient_public)?);

    let mut seed = Zeroizing::new([0u8; 32]);
    rng.try_fill_bytes(&mut seed[..])
        .map_err(|_| CryptoError::Random)?;
    clamp_in_place(&mut seed);
    let ephemeral = StaticSecret::from(*seed);
    let ephemeral_public = X25519PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }
    let key = derive_key(shared.as_bytes());

    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::Random)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut envelope = Vec::with_capacity(EPHEMERAL_PUBLIC_LEN + NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(ephemeral_public.as_bytes());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);

    debug!(
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "sealed envelope"
    );
    Ok(envelope)
}

/// Seal `plaintext` to `recipient_public` using the operating system RNG.
pub fn seal(recipient_public: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    seal_with_rng(recipient_public, plaintext, &mut OsRng)
}

/// Open an envelope with the recipient's X25519 private key.
///
/// Any failure after the length check is reported as
/// [`CryptoError::AuthenticationFailed`] and no plaintext is returned.
pub fn open(recipient_private: &[u8], envelope: &[u8]) -> Result<Vec<u8>> {
    let view = EnvelopeView::parse(envelope)?;
    let secret = StaticSecret::from(x25519_key(recipient_private)?);

    let ephemeral = X25519PublicKey::from(*view.ephemeral_public);
    let shared = secret.diffie_hellman(&ephemeral);
    if !shared.was_contributory() {
        return Err(CryptoError::AuthenticationFailed);
    }
    let key = derive_key(shared.as_bytes());

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(view.nonce), view.ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    debug!(
        envelope_len = envelope.len(),
        plaintext_len = plaintext.len(),
        "opened envelope"
    );
    Ok(plaintext)
}

/// Seal and encode as base64url text.
pub fn seal_to_text(recipient_public: &[u8], plaintext: &[u8]) -> Result<String> {
    Ok(codec::encode(seal(recipient_public, plaintext)?))
}

/// Decode base64url envelope text and open it.
pub fn open_text(recipient_private: &[u8], envelope_text: &str) -> Result<Vec<u8>> {
    open(recipient_private, &codec::decode(envelope_text)?)
}

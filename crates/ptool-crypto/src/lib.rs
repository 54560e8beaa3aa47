#![forbid(unsafe_code)]

//! Core of the ptool secure-messaging toolchain.
//!
//! - `codec`: unpadded base64url used at every text boundary
//! - `keyfile`: key resolution from encoded strings or JSON keyfiles
//! - `envelope`: X25519 + HKDF-SHA256 + ChaCha20-Poly1305 sealed envelopes
//! - `signature`: Ed25519 detached signatures
//! - `receipt`: canonical, signed delivery receipts

pub mod canonical;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod keyfile;
pub mod receipt;
pub mod signature;

#[cfg(test)]
mod proptests;

pub use error::{CryptoError, Result};
pub use keyfile::KeySource;
pub use receipt::{Counterparty, Receipt};

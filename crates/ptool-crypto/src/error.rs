//! Error types for the ptool core.

use thiserror::Error;

/// Errors raised by codec, key resolution, envelope, signature and receipt
/// operations.
///
/// A signature that simply does not verify is not an error: verification
/// functions return `Ok(false)` for that case.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid base64url: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: &'static str, got: usize },

    #[error("invalid signature length: expected 64, got {got}")]
    InvalidSignatureLength { got: usize },

    #[error("key not found at '{path}'")]
    KeyNotFound { path: String },

    #[error("field '{path}' is not a base64url string")]
    InvalidKeyField { path: String },

    #[error("malformed envelope: {len} bytes is shorter than the 60 byte minimum")]
    MalformedEnvelope { len: usize },

    #[error("decryption failed: authentication failed")]
    AuthenticationFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("random number generation failed")]
    Random,

    #[error("malformed receipt: {0}")]
    MalformedReceipt(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

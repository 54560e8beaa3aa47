//! ptool CLI
//!
//! File and argument plumbing around `ptool-crypto`:
//! - Sealing and opening envelopes
//! - Detached Ed25519 signatures
//! - Building and verifying delivery receipts
//! - Reading the name-value-store node's RPC settings

pub mod cli;
pub mod config;
pub mod output;
pub mod rpc_conf;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{JsonResponse, OutputFormat, OutputFormatter};

use ptool_crypto::CryptoError;

/// Exit codes for CLI operations
///
/// - 0: Success
/// - 1: General error
/// - 2: Verification failed - signature, receipt or envelope authentication
/// - 3: Invalid input - malformed encoding, lengths, envelope or receipt
/// - 4: Key error - key missing from keyfile or not a string
/// - 5: I/O error - a file could not be read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    VerificationFailed = 2,
    InvalidInput = 3,
    KeyError = 4,
    IoError = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Classify a command error.
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(crypto) = err.downcast_ref::<CryptoError>() {
            return match crypto {
                CryptoError::AuthenticationFailed => ExitCode::VerificationFailed,
                CryptoError::KeyNotFound { .. } | CryptoError::InvalidKeyField { .. } => {
                    ExitCode::KeyError
                }
                CryptoError::Io(_) => ExitCode::IoError,
                CryptoError::Decode(_)
                | CryptoError::InvalidKeyLength { .. }
                | CryptoError::InvalidSignatureLength { .. }
                | CryptoError::MalformedEnvelope { .. }
                | CryptoError::MalformedReceipt(_)
                | CryptoError::InvalidPublicKey
                | CryptoError::Config(_)
                | CryptoError::Json(_) => ExitCode::InvalidInput,
                CryptoError::EncryptionFailed | CryptoError::Random => ExitCode::GeneralError,
            };
        }
        if err.downcast_ref::<std::io::Error>().is_some() {
            return ExitCode::IoError;
        }
        if err.downcast_ref::<rpc_conf::RpcConfError>().is_some() {
            return ExitCode::InvalidInput;
        }
        ExitCode::GeneralError
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::VerificationFailed => "VERIFICATION_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::KeyError => "KEY_ERROR",
            ExitCode::IoError => "IO_ERROR",
        }
    }
}

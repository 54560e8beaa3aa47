//! Signed delivery receipts.
//!
//! A receipt binds the SHA-256 of an envelope, a UTC timestamp, the issuer's
//! Ed25519 public key and the counterparty. The signature in `sig` covers the
//! canonical serialization (see [`crate::canonical`]) of every other member,
//! so verification depends on member values only, never on their order.

use chrono::{DateTime, SecondsFormat, Utc};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::canonical::canonicalize;
use crate::codec;
use crate::error::{CryptoError, Result};
use crate::hash::sha256;
use crate::signature;

const SIG_FIELD: &str = "sig";
const FROM_FIELD: &str = "from";
const MSG_HASH_FIELD: &str = "msg_hash";

/// Receipt recipient: a known Ed25519 key, or an opaque listing id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Counterparty {
    /// base64url Ed25519 public key
    PublicKey(String),
    Listing { listing: String },
}

impl Counterparty {
    pub fn public_key(key: &[u8]) -> Self {
        Self::PublicKey(codec::encode(key))
    }

    pub fn listing(id: impl Into<String>) -> Self {
        Self::Listing { listing: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// base64url SHA-256 of the raw envelope bytes
    pub msg_hash: String,
    /// ISO-8601 UTC timestamp with offset
    pub ts: String,
    /// base64url Ed25519 public key of the issuer
    pub from: String,
    pub to: Counterparty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

/// Build and sign a receipt for `envelope`, timestamped now.
pub fn build(
    issuer_private: &[u8],
    issuer_public: &[u8],
    to: Counterparty,
    envelope: &[u8],
) -> Result<Receipt> {
    build_at(issuer_private, issuer_public, to, envelope, Utc::now())
}

/// Build and sign a receipt with an explicit timestamp.
pub fn build_at(
    issuer_private: &[u8],
    issuer_public: &[u8],
    to: Counterparty,
    envelope: &[u8],
    now: DateTime<Utc>,
) -> Result<Receipt> {
    if issuer_public.len() != signature::PUBLIC_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: "32",
            got: issuer_public.len(),
        });
    }
    if signature::public_key(issuer_private)?.as_slice() != issuer_public {
        warn!("issuer public key does not match the issuer private key; receipt will not verify");
    }

    let mut receipt = Receipt {
        msg_hash: codec::encode(sha256(envelope)),
        ts: now.to_rfc3339_opts(SecondsFormat::Micros, false),
        from: codec::encode(issuer_public),
        to,
        sig: None,
    };
    let sig = signature::sign(issuer_private, &receipt.signing_bytes()?)?;
    receipt.sig = Some(codec::encode(sig));

    debug!(envelope_len = envelope.len(), ts = %receipt.ts, "built receipt");
    Ok(receipt)
}

impl Receipt {
    /// Canonical bytes covered by the signature (every member except `sig`).
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        signing_bytes(&serde_json::to_value(self)?)
    }

    /// Verify the signature against the `from` key.
    pub fn verify(&self) -> Result<bool> {
        verify_document(&serde_json::to_value(self)?)
    }

    /// Whether `msg_hash` is the hash of `envelope`.
    pub fn matches_envelope(&self, envelope: &[u8]) -> bool {
        hash_matches(&self.msg_hash, envelope)
    }

    /// Canonical JSON, the form receipts are persisted and transmitted in.
    pub fn to_json(&self) -> Result<String> {
        Ok(canonicalize(&serde_json::to_value(self)?))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Canonical signing bytes of a receipt document: the object without `sig`.
pub fn signing_bytes(doc: &Value) -> Result<Vec<u8>> {
    let members = as_object(doc)?;
    let unsigned: Map<String, Value> = members
        .iter()
        .filter(|(key, _)| key.as_str() != SIG_FIELD)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(canonicalize(&Value::Object(unsigned)).into_bytes())
}

/// Verify a receipt document as received.
///
/// Members other than the standard five are covered by the signature too.
/// Returns `Ok(false)` when the signature does not verify and an error when
/// the document is not a receipt (missing or non-string `from` / `sig`,
/// undecodable or wrong-length key or signature).
pub fn verify_document(doc: &Value) -> Result<bool> {
    let members = as_object(doc)?;
    let from = string_member(members, FROM_FIELD)?;
    let sig = string_member(members, SIG_FIELD)?;

    let public_key = codec::decode(from)?;
    let sig = codec::decode(sig)?;
    let valid = signature::verify(&public_key, &signing_bytes(doc)?, &sig)?;
    debug!(valid, "verified receipt");
    Ok(valid)
}

/// Whether a receipt document's `msg_hash` is the hash of `envelope`.
///
/// Only `msg_hash` is read, so documents with members of any shape can be
/// checked. A missing or non-string `msg_hash` never matches.
pub fn document_matches_envelope(doc: &Value, envelope: &[u8]) -> bool {
    doc.get(MSG_HASH_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|msg_hash| hash_matches(msg_hash, envelope))
}

fn hash_matches(msg_hash: &str, envelope: &[u8]) -> bool {
    match codec::decode(msg_hash) {
        Ok(hash) => constant_time_eq(&hash, &sha256(envelope)),
        Err(_) => false,
    }
}

/// Parse receipt JSON text and verify it.
pub fn verify_json(text: &str) -> Result<bool> {
    verify_document(&serde_json::from_str(text)?)
}

fn as_object(doc: &Value) -> Result<&Map<String, Value>> {
    doc.as_object()
        .ok_or_else(|| CryptoError::MalformedReceipt("receipt is not a JSON object".to_string()))
}

fn string_member<'a>(members: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    match members.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(CryptoError::MalformedReceipt(format!(
            "'{name}' is not a string"
        ))),
        None => Err(CryptoError::MalformedReceipt(format!("missing '{name}'"))),
    }
}

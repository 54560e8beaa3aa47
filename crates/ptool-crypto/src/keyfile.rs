//! Key resolution from encoded strings or JSON keyfiles.
//!
//! A keyfile is any JSON document. The key is located with a dot-separated
//! path whose all-digit segments index arrays and whose other segments name
//! object members, e.g. `x25519.private` or `keys.0.private`. The located
//! value must be a base64url string.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use crate::codec;
use crate::error::{CryptoError, Result};

pub const X25519_PRIVATE_FIELD: &str = "x25519.private";
pub const X25519_PUBLIC_FIELD: &str = "x25519.public";
pub const ED25519_PRIVATE_FIELD: &str = "ed25519.private";
pub const ED25519_PUBLIC_FIELD: &str = "ed25519.public";

/// Where a key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A base64url string supplied directly.
    Encoded(String),
    /// A JSON keyfile and the dot-path of the key inside it.
    Keyfile { path: PathBuf, field: String },
}

impl KeySource {
    /// Build a source from two mutually exclusive inputs.
    ///
    /// Exactly one of `encoded` and `keyfile` must be present; `field` is only
    /// used with a keyfile.
    pub fn from_options(
        encoded: Option<String>,
        keyfile: Option<PathBuf>,
        field: &str,
    ) -> Result<Self> {
        match (encoded, keyfile) {
            (Some(encoded), None) => Ok(Self::Encoded(encoded)),
            (None, Some(path)) => Ok(Self::Keyfile {
                path,
                field: field.to_string(),
            }),
            (Some(_), Some(_)) => Err(CryptoError::Config(
                "supply either an encoded key or a keyfile, not both".to_string(),
            )),
            (None, None) => Err(CryptoError::Config(
                "supply an encoded key or a keyfile".to_string(),
            )),
        }
    }

    /// Resolve to raw key bytes. Length is checked by the consumer.
    pub fn resolve(&self) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Encoded(text) => Ok(Zeroizing::new(codec::decode(text)?)),
            Self::Keyfile { path, field } => load_key(path, field),
        }
    }
}

/// Walk `path` through `doc` and return the value it names.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Result<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        let next = if is_index(segment) {
            match current {
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            }
        } else {
            match current {
                Value::Object(members) => members.get(segment),
                _ => None,
            }
        };
        current = next.ok_or_else(|| CryptoError::KeyNotFound {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

/// Resolve `path` in a parsed keyfile and decode the key it names.
pub fn key_from_document(doc: &Value, path: &str) -> Result<Zeroizing<Vec<u8>>> {
    match lookup(doc, path)? {
        Value::String(encoded) => Ok(Zeroizing::new(codec::decode(encoded)?)),
        _ => Err(CryptoError::InvalidKeyField {
            path: path.to_string(),
        }),
    }
}

/// Read a JSON keyfile from disk and decode the key at `field`.
pub fn load_key(path: &Path, field: &str) -> Result<Zeroizing<Vec<u8>>> {
    debug!(keyfile = %path.display(), field, "loading key from keyfile");
    let contents = Zeroizing::new(std::fs::read_to_string(path)?);
    let doc: Value = serde_json::from_str(&contents)?;
    key_from_document(&doc, field)
}

/// Check a dot-path for empty segments.
pub fn validate_field_path(path: &str) -> Result<()> {
    if path.split('.').any(str::is_empty) {
        return Err(CryptoError::Config(format!(
            "invalid key field path '{path}': empty segment"
        )));
    }
    Ok(())
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_array_index() {
        let doc = json!({"a": {"b": ["x", "MDEyMw"]}});
        let key = key_from_document(&doc, "a.b.1").unwrap();
        assert_eq!(key.as_slice(), b"0123");
    }

    #[test]
    fn test_lookup_index_out_of_range() {
        let doc = json!({"a": {"b": ["x", "MDEyMw"]}});
        assert!(matches!(
            key_from_document(&doc, "a.b.2"),
            Err(CryptoError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_missing_member() {
        let doc = json!({"x25519": {"public": "AAAA"}});
        assert!(matches!(
            key_from_document(&doc, X25519_PRIVATE_FIELD),
            Err(CryptoError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_wrong_container_kind() {
        let doc = json!({"keys": {"0": "MDEyMw"}, "list": ["MDEyMw"]});
        // numeric segment on an object is an index, not a member name
        assert!(matches!(
            key_from_document(&doc, "keys.0"),
            Err(CryptoError::KeyNotFound { .. })
        ));
        assert!(matches!(
            key_from_document(&doc, "list.first"),
            Err(CryptoError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_through_scalar() {
        let doc = json!({"a": "MDEyMw"});
        assert!(matches!(
            key_from_document(&doc, "a.b"),
            Err(CryptoError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_non_string_field_rejected() {
        let doc = json!({"x25519": {"private": {"nested": true}}, "n": 7, "l": ["a"]});
        for path in ["x25519.private", "x25519", "n", "l"] {
            assert!(
                matches!(
                    key_from_document(&doc, path),
                    Err(CryptoError::InvalidKeyField { .. })
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn test_bad_base64_in_field() {
        let doc = json!({"ed25519": {"public": "not base64!"}});
        assert!(matches!(
            key_from_document(&doc, ED25519_PUBLIC_FIELD),
            Err(CryptoError::Decode(_))
        ));
    }

    #[test]
    fn test_from_options_exclusive() {
        let src = KeySource::from_options(Some("MDEyMw".into()), None, "x").unwrap();
        assert_eq!(src, KeySource::Encoded("MDEyMw".into()));

        let src = KeySource::from_options(None, Some("k.json".into()), "keys.0.private").unwrap();
        assert_eq!(
            src,
            KeySource::Keyfile {
                path: "k.json".into(),
                field: "keys.0.private".into()
            }
        );

        assert!(matches!(
            KeySource::from_options(Some("MDEyMw".into()), Some("k.json".into()), "x"),
            Err(CryptoError::Config(_))
        ));
        assert!(matches!(
            KeySource::from_options(None, None, "x"),
            Err(CryptoError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_encoded() {
        let key = KeySource::Encoded(" MDEyMw\n".into()).resolve().unwrap();
        assert_eq!(key.as_slice(), b"0123");
    }

    #[test]
    fn test_resolve_keyfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, r#"{"keys":[{"private":"MDEyMw"}]}"#).unwrap();

        let src = KeySource::Keyfile {
            path,
            field: "keys.0.private".into(),
        };
        assert_eq!(src.resolve().unwrap().as_slice(), b"0123");
    }

    #[test]
    fn test_resolve_missing_keyfile() {
        let src = KeySource::Keyfile {
            path: "/nonexistent/ptool/keys.json".into(),
            field: X25519_PRIVATE_FIELD.into(),
        };
        assert!(matches!(src.resolve(), Err(CryptoError::Io(_))));
    }

    #[test]
    fn test_validate_field_path() {
        assert!(validate_field_path("x25519.private").is_ok());
        assert!(validate_field_path("keys.0.private").is_ok());
        assert!(validate_field_path("").is_err());
        assert!(validate_field_path("a..b").is_err());
        assert!(validate_field_path(".a").is_err());
    }
}

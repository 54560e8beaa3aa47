//! Command round-trips through files in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use ptool_cli::config::CliOverrides;
use ptool_cli::{Cli, Config, ExitCode};
use ptool_crypto::{codec, signature};
use serde_json::{json, Value};
use tempfile::TempDir;

// RFC 7748, section 6.1 (Alice)
const X25519_PRIVATE: &str = "dwdtCnMYpX08FsFyUbJmRd9ML4frwJkqsXf7pR25LCo";
const X25519_PUBLIC: &str = "hSDwCYkwp1R0i33ctD73Wg2_Og0mOBr066SpjqqbTmo";

fn quiet_config() -> Config {
    Config::default().with_overrides(&CliOverrides {
        output_format: Some("quiet".to_string()),
        log_level: None,
    })
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["ptool"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv)?.execute(&quiet_config())
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Keyfile holding the RFC 7748 X25519 pair and an Ed25519 key derived
    /// from `seed`, in its 64-byte keypair form.
    fn keyfile(&self, name: &str, seed: u8) -> PathBuf {
        let ed_private = [seed; 32];
        let ed_public = signature::public_key(&ed_private).unwrap();
        let keypair = [&ed_private[..], &ed_public[..]].concat();
        let doc = json!({
            "x25519": { "private": X25519_PRIVATE, "public": X25519_PUBLIC },
            "ed25519": {
                "private": codec::encode(keypair),
                "public": codec::encode(ed_public),
            },
        });
        self.write(name, doc.to_string())
    }
}

#[test]
fn test_encrypt_decrypt_with_keyfile() {
    let ws = Workspace::new();
    let keys = ws.keyfile("keys.json", 1);
    let plain = ws.write("plain.txt", "hello");
    let env = ws.path("msg.env");
    let out = ws.path("out.txt");

    let code = run(&[
        "encrypt",
        "--peer-pub-keyfile",
        path_str(&keys),
        "--in",
        path_str(&plain),
        "--out",
        path_str(&env),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let text = fs::read_to_string(&env).unwrap();
    assert!(!text.contains('='));
    assert_eq!(codec::decode(&text).unwrap().len(), 60 + 5);

    let code = run(&[
        "decrypt",
        "--priv-b64",
        X25519_PRIVATE,
        "--in",
        path_str(&env),
        "--out",
        path_str(&out),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read(&out).unwrap(), b"hello");
}

#[test]
fn test_decrypt_tampered_envelope_fails_authentication() {
    let ws = Workspace::new();
    let plain = ws.write("plain.txt", "hello");
    let env = ws.path("msg.env");

    run(&[
        "encrypt",
        "--peer-pub-b64",
        X25519_PUBLIC,
        "--in",
        path_str(&plain),
        "--out",
        path_str(&env),
    ])
    .unwrap();

    let mut bytes = codec::decode(&fs::read_to_string(&env).unwrap()).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&env, codec::encode(&bytes)).unwrap();

    let err = run(&[
        "decrypt",
        "--priv-b64",
        X25519_PRIVATE,
        "--in",
        path_str(&env),
        "--out",
        path_str(&ws.path("out.txt")),
    ])
    .unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::VerificationFailed);
    assert!(!ws.path("out.txt").exists());
}

#[test]
fn test_missing_keyfile_field_is_key_error() {
    let ws = Workspace::new();
    let keys = ws.keyfile("keys.json", 1);
    let plain = ws.write("plain.txt", "hello");

    let err = run(&[
        "encrypt",
        "--peer-pub-keyfile",
        path_str(&keys),
        "--peer-pub-field",
        "x25519.missing",
        "--in",
        path_str(&plain),
        "--out",
        path_str(&ws.path("msg.env")),
    ])
    .unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::KeyError);
}

#[test]
fn test_missing_input_file_is_io_error() {
    let ws = Workspace::new();

    let err = run(&[
        "sign",
        "--priv-b64",
        &codec::encode([5u8; 32]),
        "--in",
        path_str(&ws.path("absent.txt")),
        "--out",
        path_str(&ws.path("sig")),
    ])
    .unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::IoError);
}

#[test]
fn test_sign_verify() {
    let ws = Workspace::new();
    let keys = ws.keyfile("keys.json", 9);
    let msg = ws.write("msg.txt", "attested");
    let sig = ws.path("msg.sig");

    let code = run(&[
        "sign",
        "--priv-keyfile",
        path_str(&keys),
        "--in",
        path_str(&msg),
        "--out",
        path_str(&sig),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let verify = |message: &Path| {
        run(&[
            "verify",
            "--pub-keyfile",
            path_str(&keys),
            "--in",
            path_str(message),
            "--sig",
            path_str(&sig),
        ])
        .unwrap()
    };
    assert_eq!(verify(msg.as_path()), ExitCode::Success);

    let other = ws.write("other.txt", "attesteD");
    assert_eq!(verify(other.as_path()), ExitCode::VerificationFailed);
}

#[test]
fn test_receipt_build_and_verify() {
    let ws = Workspace::new();
    let keys = ws.keyfile("issuer.json", 3);
    let env = ws.write("msg.env", codec::encode([0x42u8; 80]));
    let receipt = ws.path("receipt.json");

    let code = run(&[
        "receipt",
        "build",
        "--from-priv-keyfile",
        path_str(&keys),
        "--from-pub-keyfile",
        path_str(&keys),
        "--to-id",
        "listing-7",
        "--envelope",
        path_str(&env),
        "--out",
        path_str(&receipt),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let doc: Value = serde_json::from_str(&fs::read_to_string(&receipt).unwrap()).unwrap();
    assert_eq!(doc["to"], json!({ "listing": "listing-7" }));

    let verify = |envelope: Option<&Path>| {
        let mut args = vec!["receipt", "verify", "--receipt", path_str(&receipt)];
        if let Some(envelope) = envelope {
            args.extend(["--envelope", path_str(envelope)]);
        }
        run(&args).unwrap()
    };
    assert_eq!(verify(None), ExitCode::Success);
    assert_eq!(verify(Some(env.as_path())), ExitCode::Success);

    let other = ws.write("other.env", codec::encode([0x43u8; 80]));
    assert_eq!(verify(Some(other.as_path())), ExitCode::VerificationFailed);

    let mut tampered = doc.clone();
    tampered["ts"] = json!("2000-01-01T00:00:00.000000+00:00");
    fs::write(&receipt, tampered.to_string()).unwrap();
    assert_eq!(verify(None), ExitCode::VerificationFailed);
}

#[test]
fn test_receipt_verify_binding_reads_msg_hash_only() {
    let ws = Workspace::new();
    let private = [6u8; 32];
    let public = signature::public_key(&private).unwrap();
    let env_bytes = [0x42u8; 80];
    let env = ws.write("msg.env", codec::encode(env_bytes));

    let mut doc = json!({
        "msg_hash": codec::encode(ptool_crypto::hash::sha256(&env_bytes)),
        "ts": "2024-03-01T12:30:00.000000+00:00",
        "from": codec::encode(public),
        "to": { "listing": 42 },
    });
    let unsigned = ptool_crypto::receipt::signing_bytes(&doc).unwrap();
    doc["sig"] = json!(codec::encode(signature::sign(&private, &unsigned).unwrap()));
    let receipt = ws.write("receipt.json", doc.to_string());

    let code = run(&[
        "receipt",
        "verify",
        "--receipt",
        path_str(&receipt),
        "--envelope",
        path_str(&env),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_receipt_to_public_key() {
    let ws = Workspace::new();
    let issuer = ws.keyfile("issuer.json", 3);
    let peer = ws.keyfile("peer.json", 4);
    let env = ws.write("msg.env", codec::encode([0x42u8; 80]));
    let receipt = ws.path("receipt.json");

    run(&[
        "receipt",
        "build",
        "--from-priv-keyfile",
        path_str(&issuer),
        "--from-pub-keyfile",
        path_str(&issuer),
        "--to-pub-keyfile",
        path_str(&peer),
        "--envelope",
        path_str(&env),
        "--out",
        path_str(&receipt),
    ])
    .unwrap();

    let doc: Value = serde_json::from_str(&fs::read_to_string(&receipt).unwrap()).unwrap();
    let peer_public = codec::encode(signature::public_key(&[4u8; 32]).unwrap());
    assert_eq!(doc["to"], json!(peer_public));
}

#[test]
fn test_rpc_conf() {
    let ws = Workspace::new();

    let code = run(&["rpc-conf", "--path", path_str(&ws.path("absent.conf"))]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let conf = ws.write("emercoin.conf", "rpcuser=alice\nrpcport=6662\n");
    let code = run(&["rpc-conf", "--path", path_str(&conf), "--raw"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let bad = ws.write("bad.conf", "rpcport=not-a-port\n");
    let err = run(&["rpc-conf", "--path", path_str(&bad)]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::InvalidInput);
}

//! CLI command definitions and argument parsing

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use zeroize::Zeroizing;

use ptool_crypto::canonical::canonicalize;
use ptool_crypto::{codec, envelope, receipt, signature, Counterparty, KeySource};

use crate::config::Config;
use crate::output::{OutputFormat, OutputFormatter, Report};
use crate::rpc_conf;
use crate::ExitCode;

/// ptool - sealed envelopes, detached signatures and delivery receipts
#[derive(Parser, Debug)]
#[command(name = "ptool")]
#[command(version, about = "Sealed envelopes, detached signatures and delivery receipts")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: table, json, quiet (default from config)
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Execute the command with a resolved configuration
    pub fn execute(self, config: &Config) -> anyhow::Result<ExitCode> {
        let formatter = OutputFormatter::new(config.output_format());
        match self.command {
            Commands::Encrypt(args) => args.execute(config, &formatter),
            Commands::Decrypt(args) => args.execute(config, &formatter),
            Commands::Sign(args) => args.execute(config, &formatter),
            Commands::Verify(args) => args.execute(config, &formatter),
            Commands::Receipt(args) => args.execute(config, &formatter),
            Commands::RpcConf(args) => args.execute(&formatter),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seal a file to a recipient's X25519 public key
    Encrypt(EncryptArgs),
    /// Open an envelope with the recipient's X25519 private key
    Decrypt(DecryptArgs),
    /// Create a detached Ed25519 signature
    Sign(SignArgs),
    /// Verify a detached Ed25519 signature
    Verify(VerifyArgs),
    /// Build or verify delivery receipts
    Receipt(ReceiptArgs),
    /// Show the name-value-store node's RPC settings
    RpcConf(RpcConfArgs),
}

impl Commands {
    /// Command name as used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Encrypt(_) => "encrypt",
            Commands::Decrypt(_) => "decrypt",
            Commands::Sign(_) => "sign",
            Commands::Verify(_) => "verify",
            Commands::Receipt(ReceiptArgs {
                command: ReceiptCommands::Build(_),
            }) => "receipt build",
            Commands::Receipt(ReceiptArgs {
                command: ReceiptCommands::Verify(_),
            }) => "receipt verify",
            Commands::RpcConf(_) => "rpc-conf",
        }
    }
}

fn resolve_key(
    encoded: Option<String>,
    keyfile: Option<PathBuf>,
    field: Option<String>,
    default_field: &str,
) -> anyhow::Result<Zeroizing<Vec<u8>>> {
    let field = field.as_deref().unwrap_or(default_field);
    let source = KeySource::from_options(encoded, keyfile, field)?;
    if let KeySource::Keyfile { path, field } = &source {
        debug!(keyfile = %path.display(), field = %field, "resolving key");
    }
    Ok(source.resolve()?)
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// encrypt / decrypt
// ---------------------------------------------------------------------------

/// Arguments for the encrypt command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("peer_pub").required(true).args(["peer_pub_b64", "peer_pub_keyfile"])))]
pub struct EncryptArgs {
    /// Recipient X25519 public key (base64url, 32 bytes)
    #[arg(long)]
    pub peer_pub_b64: Option<String>,

    /// JSON keyfile holding the recipient X25519 public key
    #[arg(long)]
    pub peer_pub_keyfile: Option<PathBuf>,

    /// Dot path of the key in the keyfile (default: x25519.public)
    #[arg(long)]
    pub peer_pub_field: Option<String>,

    /// Plaintext input file
    #[arg(long = "in")]
    pub infile: PathBuf,

    /// Envelope output file (base64url)
    #[arg(long = "out")]
    pub outfile: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct EncryptReport {
    pub output: String,
    pub plaintext_len: usize,
    pub envelope_len: usize,
}

impl Report for EncryptReport {
    fn command(&self) -> &'static str {
        "encrypt"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Envelope", self.output.clone()),
            ("Plaintext bytes", self.plaintext_len.to_string()),
            ("Envelope bytes", self.envelope_len.to_string()),
        ]
    }
}

impl EncryptArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let peer_pub = resolve_key(
            self.peer_pub_b64,
            self.peer_pub_keyfile,
            self.peer_pub_field,
            &config.keys.x25519_public,
        )?;
        let plaintext = Zeroizing::new(read_file(&self.infile)?);

        let env = envelope::seal(&peer_pub, &plaintext)?;
        write_file(&self.outfile, codec::encode(&env).as_bytes())?;
        info!(out = %self.outfile.display(), "envelope written");

        formatter.print(&EncryptReport {
            output: self.outfile.display().to_string(),
            plaintext_len: plaintext.len(),
            envelope_len: env.len(),
        });
        Ok(ExitCode::Success)
    }
}

/// Arguments for the decrypt command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("priv").required(true).args(["priv_b64", "priv_keyfile"])))]
pub struct DecryptArgs {
    /// Recipient X25519 private key (base64url, 32 bytes)
    #[arg(long)]
    pub priv_b64: Option<String>,

    /// JSON keyfile holding the recipient X25519 private key
    #[arg(long)]
    pub priv_keyfile: Option<PathBuf>,

    /// Dot path of the key in the keyfile (default: x25519.private)
    #[arg(long)]
    pub priv_field: Option<String>,

    /// Envelope input file (base64url)
    #[arg(long = "in")]
    pub infile: PathBuf,

    /// Plaintext output file
    #[arg(long = "out")]
    pub outfile: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct DecryptReport {
    pub output: String,
    pub plaintext_len: usize,
}

impl Report for DecryptReport {
    fn command(&self) -> &'static str {
        "decrypt"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Plaintext", self.output.clone()),
            ("Plaintext bytes", self.plaintext_len.to_string()),
        ]
    }
}

impl DecryptArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let private = resolve_key(
            self.priv_b64,
            self.priv_keyfile,
            self.priv_field,
            &config.keys.x25519_private,
        )?;
        let env = codec::decode(&read_text(&self.infile)?)?;

        let plaintext = Zeroizing::new(envelope::open(&private, &env)?);
        write_file(&self.outfile, &plaintext)?;
        info!(out = %self.outfile.display(), "plaintext written");

        formatter.print(&DecryptReport {
            output: self.outfile.display().to_string(),
            plaintext_len: plaintext.len(),
        });
        Ok(ExitCode::Success)
    }
}

// ---------------------------------------------------------------------------
// sign / verify
// ---------------------------------------------------------------------------

/// Arguments for the sign command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("priv").required(true).args(["priv_b64", "priv_keyfile"])))]
pub struct SignArgs {
    /// Ed25519 private key (base64url, 32 or 64 bytes)
    #[arg(long)]
    pub priv_b64: Option<String>,

    /// JSON keyfile holding the Ed25519 private key
    #[arg(long)]
    pub priv_keyfile: Option<PathBuf>,

    /// Dot path of the key in the keyfile (default: ed25519.private)
    #[arg(long)]
    pub priv_field: Option<String>,

    /// Message input file
    #[arg(long = "in")]
    pub infile: PathBuf,

    /// Signature output file (base64url)
    #[arg(long = "out")]
    pub outfile: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SignReport {
    pub output: String,
    pub signature: String,
}

impl Report for SignReport {
    fn command(&self) -> &'static str {
        "sign"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Signature file", self.output.clone()),
            ("Signature", self.signature.clone()),
        ]
    }
}

impl SignArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let private = resolve_key(
            self.priv_b64,
            self.priv_keyfile,
            self.priv_field,
            &config.keys.ed25519_private,
        )?;
        let message = read_file(&self.infile)?;

        let sig = signature::sign_to_text(&private, &message)?;
        write_file(&self.outfile, sig.as_bytes())?;

        formatter.print(&SignReport {
            output: self.outfile.display().to_string(),
            signature: sig,
        });
        Ok(ExitCode::Success)
    }
}

/// Arguments for the verify command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("pub").required(true).args(["pub_b64", "pub_keyfile"])))]
pub struct VerifyArgs {
    /// Ed25519 public key (base64url, 32 bytes)
    #[arg(long)]
    pub pub_b64: Option<String>,

    /// JSON keyfile holding the Ed25519 public key
    #[arg(long)]
    pub pub_keyfile: Option<PathBuf>,

    /// Dot path of the key in the keyfile (default: ed25519.public)
    #[arg(long)]
    pub pub_field: Option<String>,

    /// Message input file
    #[arg(long = "in")]
    pub infile: PathBuf,

    /// Signature input file (base64url)
    #[arg(long = "sig")]
    pub sigfile: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub message: String,
    pub valid: bool,
}

impl Report for VerifyReport {
    fn command(&self) -> &'static str {
        "verify"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Message", self.message.clone()),
            ("Valid", self.valid.to_string()),
        ]
    }
}

impl VerifyArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let public = resolve_key(
            self.pub_b64,
            self.pub_keyfile,
            self.pub_field,
            &config.keys.ed25519_public,
        )?;
        let message = read_file(&self.infile)?;
        let sig = read_text(&self.sigfile)?;

        let valid = signature::verify_text(&public, &message, &sig)?;
        formatter.print(&VerifyReport {
            message: self.infile.display().to_string(),
            valid,
        });
        Ok(if valid {
            ExitCode::Success
        } else {
            ExitCode::VerificationFailed
        })
    }
}

// ---------------------------------------------------------------------------
// receipt
// ---------------------------------------------------------------------------

/// Arguments for the receipt command
#[derive(Args, Debug)]
pub struct ReceiptArgs {
    #[command(subcommand)]
    pub command: ReceiptCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReceiptCommands {
    /// Build and sign a delivery receipt for an envelope
    Build(ReceiptBuildArgs),
    /// Verify a receipt's signature
    Verify(ReceiptVerifyArgs),
}

impl ReceiptArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        match self.command {
            ReceiptCommands::Build(args) => args.execute(config, formatter),
            ReceiptCommands::Verify(args) => args.execute(formatter),
        }
    }
}

/// Arguments for receipt build
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("from_priv").required(true).args(["from_priv_b64", "from_priv_keyfile"])))]
#[command(group(ArgGroup::new("from_pub").required(true).args(["from_pub_b64", "from_pub_keyfile"])))]
#[command(group(ArgGroup::new("to").required(true).args(["to_pub_b64", "to_pub_keyfile", "to_id"])))]
pub struct ReceiptBuildArgs {
    /// Issuer Ed25519 private key (base64url, 32 or 64 bytes)
    #[arg(long)]
    pub from_priv_b64: Option<String>,

    /// JSON keyfile holding the issuer Ed25519 private key
    #[arg(long)]
    pub from_priv_keyfile: Option<PathBuf>,

    /// Dot path of the issuer private key (default: ed25519.private)
    #[arg(long)]
    pub from_priv_field: Option<String>,

    /// Issuer Ed25519 public key (base64url, 32 bytes)
    #[arg(long)]
    pub from_pub_b64: Option<String>,

    /// JSON keyfile holding the issuer Ed25519 public key
    #[arg(long)]
    pub from_pub_keyfile: Option<PathBuf>,

    /// Dot path of the issuer public key (default: ed25519.public)
    #[arg(long)]
    pub from_pub_field: Option<String>,

    /// Counterparty Ed25519 public key (base64url)
    #[arg(long)]
    pub to_pub_b64: Option<String>,

    /// JSON keyfile holding the counterparty Ed25519 public key
    #[arg(long)]
    pub to_pub_keyfile: Option<PathBuf>,

    /// Dot path of the counterparty public key (default: ed25519.public)
    #[arg(long)]
    pub to_pub_field: Option<String>,

    /// Opaque listing id, when no counterparty key is known
    #[arg(long)]
    pub to_id: Option<String>,

    /// Envelope file (base64url)
    #[arg(long)]
    pub envelope: PathBuf,

    /// Receipt output file (JSON)
    #[arg(long = "out")]
    pub outfile: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ReceiptBuildReport {
    pub output: String,
    pub msg_hash: String,
    pub ts: String,
    pub to: Counterparty,
}

impl Report for ReceiptBuildReport {
    fn command(&self) -> &'static str {
        "receipt build"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let to = match &self.to {
            Counterparty::PublicKey(key) => key.clone(),
            Counterparty::Listing { listing } => format!("listing {listing}"),
        };
        vec![
            ("Receipt", self.output.clone()),
            ("Message hash", self.msg_hash.clone()),
            ("Timestamp", self.ts.clone()),
            ("To", to),
        ]
    }
}

impl ReceiptBuildArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let issuer_private = resolve_key(
            self.from_priv_b64,
            self.from_priv_keyfile,
            self.from_priv_field,
            &config.keys.ed25519_private,
        )?;
        let issuer_public = resolve_key(
            self.from_pub_b64,
            self.from_pub_keyfile,
            self.from_pub_field,
            &config.keys.ed25519_public,
        )?;

        let to = match (self.to_pub_b64, self.to_pub_keyfile, self.to_id) {
            (None, None, Some(id)) => Counterparty::listing(id),
            (encoded, keyfile, None) => Counterparty::public_key(&resolve_key(
                encoded,
                keyfile,
                self.to_pub_field,
                &config.keys.ed25519_public,
            )?),
            _ => anyhow::bail!("supply exactly one of --to-pub-b64, --to-pub-keyfile, --to-id"),
        };

        let env = codec::decode(&read_text(&self.envelope)?)?;
        let rcpt = receipt::build(&issuer_private, &issuer_public, to, &env)?;
        write_file(&self.outfile, rcpt.to_json()?.as_bytes())?;
        info!(out = %self.outfile.display(), "receipt written");

        formatter.print(&ReceiptBuildReport {
            output: self.outfile.display().to_string(),
            msg_hash: rcpt.msg_hash,
            ts: rcpt.ts,
            to: rcpt.to,
        });
        Ok(ExitCode::Success)
    }
}

/// Arguments for receipt verify
#[derive(Args, Debug)]
pub struct ReceiptVerifyArgs {
    /// Receipt file (JSON)
    #[arg(long)]
    pub receipt: PathBuf,

    /// Envelope file (base64url); also check the receipt's msg_hash against it
    #[arg(long)]
    pub envelope: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptVerifyReport {
    pub receipt: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_matches: Option<bool>,
}

impl Report for ReceiptVerifyReport {
    fn command(&self) -> &'static str {
        "receipt verify"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Receipt", self.receipt.clone()),
            ("Signature valid", self.valid.to_string()),
        ];
        if let Some(matches) = self.envelope_matches {
            rows.push(("Envelope matches", matches.to_string()));
        }
        rows
    }
}

impl ReceiptVerifyArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let doc: serde_json::Value = serde_json::from_str(&read_text(&self.receipt)?)
            .map_err(ptool_crypto::CryptoError::from)?;
        let valid = receipt::verify_document(&doc)?;

        let envelope_matches = match &self.envelope {
            Some(path) => {
                let env = codec::decode(&read_text(path)?)?;
                Some(receipt::document_matches_envelope(&doc, &env))
            }
            None => None,
        };

        formatter.print(&ReceiptVerifyReport {
            receipt: self.receipt.display().to_string(),
            valid,
            envelope_matches,
        });
        Ok(if valid && envelope_matches.unwrap_or(true) {
            ExitCode::Success
        } else {
            ExitCode::VerificationFailed
        })
    }
}

// ---------------------------------------------------------------------------
// rpc-conf
// ---------------------------------------------------------------------------

/// Arguments for the rpc-conf command
#[derive(Args, Debug)]
pub struct RpcConfArgs {
    /// Path to emercoin.conf (default: platform location)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Print the settings as one line of sorted, compact JSON
    #[arg(long)]
    pub raw: bool,
}

impl Report for rpc_conf::RpcConf {
    fn command(&self) -> &'static str {
        "rpc-conf"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let mut rows = vec![("Path", self.path.clone())];
        match &self.settings {
            Some(s) => rows.extend([
                ("RPC user", show(&s.rpcuser)),
                ("RPC password", s.rpcpassword.as_ref().map_or("-", |_| "(set)").to_string()),
                ("RPC connect", s.rpcconnect.clone()),
                ("RPC port", s.rpcport.to_string()),
                ("Data dir", show(&s.datadir)),
            ]),
            None => rows.push(("Status", "not found".to_string())),
        }
        rows
    }
}

impl RpcConfArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let path = match self.path {
            Some(path) => path,
            None => rpc_conf::default_path().context("could not determine the home directory")?,
        };
        let conf = rpc_conf::read(&path)?;

        if self.raw {
            if formatter.format() != OutputFormat::Quiet {
                println!("{}", canonicalize(&serde_json::to_value(&conf)?));
            }
        } else {
            formatter.print(&conf);
        }
        Ok(ExitCode::Success)
    }
}

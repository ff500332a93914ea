//! CLI for sealed bids.
//!
//! This binary provides commands for:
//! - Generating a bidder key file
//! - Encrypting a bid into a publishable payload
//! - Revealing a payload after close
//! - Verifying someone else's reveal
//! - Inspecting a ledger bid argument

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sealbid_client::keystore::KeyFile;
use sealbid_client::{
    create_bid, encrypt_bid, reveal_or_reuse, verify_reveal, ClientConfig, Reveal, SystemClock,
    TimeSource,
};
use sealbid_crypto::generate_key_pair;
use sealbid_types::{EncryptedPayload, PublicKeyBytes, Timestamp};

#[derive(Parser)]
#[command(name = "sealbid")]
#[command(about = "CLI for sealed-bid commitments")]
struct Cli {
    /// Client config file (JSON); defaults apply if missing
    #[arg(long, default_value = "sealbid.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair and write it to a key file
    Keygen {
        /// Key file to create
        #[arg(long, default_value = "sealbid-key.json")]
        out: PathBuf,

        /// Modulus size; overrides the config
        #[arg(long)]
        modulus_bits: Option<u64>,
    },

    /// Draft and encrypt a bid
    Bid {
        #[arg(long, default_value = "sealbid-key.json")]
        key: PathBuf,

        /// Amount in the smallest currency unit
        #[arg(long)]
        amount: String,

        /// Bidder identity (e.g. wallet address)
        #[arg(long)]
        bidder: String,

        /// Where to write the payload JSON
        #[arg(long)]
        out: PathBuf,

        /// Also print the ledger bid argument as hex
        #[arg(long)]
        ledger_hex: bool,
    },

    /// Reveal a payload after the auction closed
    Reveal {
        #[arg(long, default_value = "sealbid-key.json")]
        key: PathBuf,

        /// Payload JSON written by `bid`
        #[arg(long)]
        payload: PathBuf,

        /// Auction close time (unix ms)
        #[arg(long, conflicts_with = "open_timestamp")]
        close_timestamp: Option<Timestamp>,

        /// Auction open time (unix ms); close is derived from the configured duration
        #[arg(long)]
        open_timestamp: Option<Timestamp>,

        /// Where to write the reveal JSON
        #[arg(long)]
        out: PathBuf,
    },

    /// Verify a reveal with the bidder's public key
    Verify {
        #[arg(long)]
        payload: PathBuf,

        /// Reveal JSON written by `reveal`
        #[arg(long)]
        reveal: PathBuf,

        /// Public key JSON, or a key file
        #[arg(long)]
        public_key: PathBuf,
    },

    /// Decode a ledger bid argument (hex)
    Inspect {
        #[arg(long)]
        hex: String,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

fn read_payload(path: &Path) -> Result<EncryptedPayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(EncryptedPayload::from_json(&raw)?)
}

fn read_public_key(path: &Path) -> Result<PublicKeyBytes> {
    if let Ok(bytes) = read_json::<PublicKeyBytes>(path) {
        return Ok(bytes);
    }
    Ok(KeyFile::load(path)?.public_key.clone())
}

fn keygen_cmd(config: &ClientConfig, out: &Path, modulus_bits: Option<u64>) -> Result<()> {
    let mut sizing = config.key_sizing;
    if let Some(bits) = modulus_bits {
        sizing.modulus_bits = bits;
    }

    let keys = generate_key_pair(sizing, &mut OsRng)?;
    KeyFile::from_key_pair(&keys).save(out)?;

    info!(
        modulus_bits = sizing.modulus_bits,
        fingerprint = keys.public_key().fingerprint().to_hex(),
        "Generated key file"
    );
    println!("Key file written to {}", out.display());
    println!("  Fingerprint: {}", keys.public_key().fingerprint().to_hex());
    Ok(())
}

fn bid_cmd(key: &Path, amount: &str, bidder: &str, out: &Path, ledger_hex: bool) -> Result<()> {
    let keys = KeyFile::load(key)?.to_key_pair()?;

    let mut rng = OsRng;
    let record = create_bid(amount, bidder, &SystemClock, &mut rng)?;
    let payload = encrypt_bid(&record, &keys, &mut rng)?;
    write_json(out, &payload)?;

    println!("Bid encrypted");
    println!("  Nonce: {}", payload.nonce);
    println!("  Commitment: {}", payload.commitment_hash.to_hex());
    if ledger_hex {
        println!("  Ledger argument: {}", hex::encode(payload.to_ledger_bytes()?));
    }
    Ok(())
}

fn reveal_cmd(key: &Path, payload: &Path, close_timestamp: Timestamp, out: &Path) -> Result<()> {
    let keys = KeyFile::load(key)?.to_key_pair()?;
    let payload = read_payload(payload)?;

    // A reveal already written to `out` is kept if it still verifies.
    let previous = if out.exists() {
        read_json::<Reveal>(out)
            .map_err(|e| warn!(path = %out.display(), error = %e, "Ignoring unreadable reveal"))
            .ok()
    } else {
        None
    };

    let reveal = reveal_or_reuse(
        &payload,
        &keys,
        close_timestamp,
        previous.as_ref(),
        &SystemClock,
        &mut OsRng,
    )
    .map_err(|e| {
        if e.is_retryable() {
            anyhow!("{e}; retry after {close_timestamp}")
        } else {
            anyhow!(e)
        }
    })?;
    if previous.as_ref() != Some(&reveal) {
        write_json(out, &reveal)?;
    }

    println!("Bid revealed");
    println!("  Amount: {}", reveal.bid.amount);
    println!("  Bidder: {}", reveal.bid.bidder);
    println!("  Proof token: {}", reveal.proof.proof_token.to_hex());
    Ok(())
}

fn verify_cmd(payload: &Path, reveal: &Path, public_key: &Path) -> Result<()> {
    let payload = read_payload(payload)?;
    let reveal: Reveal = read_json(reveal)?;
    let public_key = read_public_key(public_key)?;

    if !verify_reveal(&payload, &reveal.proof, &public_key) {
        return Err(anyhow!(
            "reveal does not match commitment {}",
            payload.commitment_hash.to_hex()
        ));
    }

    println!("Reveal verified");
    println!("  Commitment: {}", payload.commitment_hash.to_hex());
    Ok(())
}

fn inspect_cmd(raw: &str) -> Result<()> {
    let bytes = hex::decode(raw.trim().trim_start_matches("0x")).context("decoding hex")?;
    let payload = EncryptedPayload::from_ledger_bytes(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("building log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Keygen { out, modulus_bits } => {
            keygen_cmd(&config, &out, modulus_bits)?;
        }

        Commands::Bid {
            key,
            amount,
            bidder,
            out,
            ledger_hex,
        } => {
            bid_cmd(&key, &amount, &bidder, &out, ledger_hex)?;
        }

        Commands::Reveal {
            key,
            payload,
            close_timestamp,
            open_timestamp,
            out,
        } => {
            let close = match (close_timestamp, open_timestamp) {
                (Some(close), _) => close,
                (None, Some(open)) => open.saturating_add(config.default_auction_duration_ms),
                (None, None) => {
                    return Err(anyhow!("one of --close-timestamp or --open-timestamp is required"))
                }
            };
            info!(close, now = SystemClock.now_ms(), "Revealing bid");
            reveal_cmd(&key, &payload, close, &out)?;
        }

        Commands::Verify {
            payload,
            reveal,
            public_key,
        } => {
            verify_cmd(&payload, &reveal, &public_key)?;
        }

        Commands::Inspect { hex } => {
            inspect_cmd(&hex)?;
        }
    }

    Ok(())
}

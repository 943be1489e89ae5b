//! tmverify: Tendermint header light client
//!
//! # Usage
//!
//! ```bash
//! # Trust block 100, then verify 101..=150
//! tmverify verify --rpc-url http://localhost:26657 --start-height 100 --count 50
//!
//! # Settings from a file, one flag overridden
//! tmverify verify --config tmverify.toml --start-height 100 --per-page 100
//!
//! # Secondary chain validator snapshot
//! tmverify snapshot --url http://localhost:8545 --hash 0xabc...
//!
//! # Store key of span 1, optionally with its raw value
//! tmverify span-key --id 1 --rpc-url http://localhost:26657
//! ```

mod config;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{Overrides, VerifyConfig};
use std::path::PathBuf;
use tmverify_core::{EpochInfo, HeaderVerifier};
use tmverify_rpc::{
    assemble_candidate, span_key, wait_for_block, BlockSource, PollingSubscription,
    SnapshotClient, TendermintRpc, SPAN_PREFIX_KEY,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tendermint header light client
///
/// Verifies block headers height by height against the validator set committed
/// by the previous verified header.
#[derive(Parser, Debug)]
#[command(name = "tmverify")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a run of consecutive headers
    Verify(VerifyArgs),
    /// Print a secondary chain validator snapshot as JSON
    Snapshot(SnapshotArgs),
    /// Print the store key of a span
    SpanKey(SpanKeyArgs),
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tendermint RPC endpoint (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Height of the trusted block; verification starts at the next height
    #[arg(long)]
    start_height: u64,

    /// Number of headers to verify
    #[arg(long, default_value_t = 1)]
    count: u64,

    /// Validators per page (overrides config)
    #[arg(long)]
    per_page: Option<u32>,

    /// Seconds to wait for a block that is not produced yet (overrides config)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Secondary chain JSON-RPC endpoint
    #[arg(long)]
    url: String,

    /// Block hash (0x-prefixed)
    #[arg(long)]
    hash: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct SpanKeyArgs {
    /// Span id
    #[arg(long)]
    id: u64,

    /// Also query the raw store value from this Tendermint RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Verify(args) => verify(args).await,
        Command::Snapshot(args) => snapshot(args).await,
        Command::SpanKey(args) => print_span_key(args).await,
    }
}

async fn verify(args: VerifyArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => VerifyConfig::load(path)?,
        None => VerifyConfig::default(),
    };
    config.apply_overrides(Overrides {
        rpc_url: args.rpc_url,
        per_page: args.per_page,
        timeout_secs: args.timeout_secs,
    });
    config.validate()?;

    let Some(last_height) = args.start_height.checked_add(args.count) else {
        bail!("start height {} plus count {} overflows", args.start_height, args.count);
    };

    let rpc = TendermintRpc::with_options(&config.rpc_url, config.per_page, config.request_timeout())?;
    info!(rpc_url = %config.rpc_url, start_height = args.start_height, count = args.count, "starting verification");

    // The one moment of trust: everything after this is checked against it.
    let trusted = rpc
        .block_header(args.start_height)
        .await
        .with_context(|| format!("Failed to fetch trusted block {}", args.start_height))?;
    let mut anchor = EpochInfo::from_trusted_header(&trusted);
    info!(
        height = trusted.height,
        chain_id = %anchor.chain_id,
        next_validators_hash = %hex::encode_upper(&anchor.next_validators_hash),
        "trusting anchor block"
    );

    let verifier = HeaderVerifier::new();
    for height in args.start_height + 1..=last_height {
        let mut events = PollingSubscription::new(&rpc, config.poll_interval())?;
        let header = wait_for_block(&rpc, &mut events, height, config.block_wait())
            .await
            .with_context(|| format!("Failed to fetch block {}", height))?;
        let candidate = assemble_candidate(&rpc, header)
            .await
            .with_context(|| format!("Failed to fetch commit and validators for {}", height))?;

        let verified = verifier
            .verify(&candidate, &anchor)
            .with_context(|| format!("Header {} failed verification", height))?;
        info!(
            height,
            hash = %hex::encode_upper(verified.hash),
            tallied_power = verified.tallied_power,
            total_power = verified.total_power,
            "header verified"
        );
        println!("{}", serde_json::to_string(&verified)?);

        anchor = verified.next_epoch_info();
    }

    info!(verified = args.count, "done");
    Ok(())
}

async fn snapshot(args: SnapshotArgs) -> Result<()> {
    let client = SnapshotClient::new(
        &args.url,
        std::time::Duration::from_secs(args.request_timeout_secs),
    )?;
    let snapshot = client
        .snapshot(&args.hash)
        .await
        .with_context(|| format!("Failed to fetch snapshot at {}", args.hash))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn print_span_key(args: SpanKeyArgs) -> Result<()> {
    let key = span_key(SPAN_PREFIX_KEY, args.id);
    println!("{}", hex::encode(&key));

    if let Some(rpc_url) = args.rpc_url {
        let rpc = TendermintRpc::new(rpc_url)?;
        let result = rpc
            .query_span(args.id, None)
            .await
            .with_context(|| format!("Failed to query span {}", args.id))?;
        if result.code != 0 {
            bail!("span query failed with code {}: {}", result.code, result.log);
        }
        println!(
            "{}",
            serde_json::json!({
                "height": result.height,
                "value": hex::encode(&result.value),
            })
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "tmverify",
            "verify",
            "--rpc-url",
            "http://localhost:26657",
            "--start-height",
            "100",
            "--count",
            "50",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Verify(args) => {
                assert_eq!(args.start_height, 100);
                assert_eq!(args.count, 50);
                assert_eq!(args.rpc_url.as_deref(), Some("http://localhost:26657"));
                assert!(args.per_page.is_none());
            }
            other => panic!("expected verify, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_requires_start_height() {
        assert!(Cli::try_parse_from(["tmverify", "verify"]).is_err());
    }

    #[test]
    fn test_parse_span_key() {
        let cli = Cli::try_parse_from(["tmverify", "span-key", "--id", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SpanKey(SpanKeyArgs { id: 7, rpc_url: None })
        ));
    }
}

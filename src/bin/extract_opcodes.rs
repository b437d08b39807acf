//! Opcode Extractor
//!
//! One-shot debug dump of router transactions touching Jetton Notify
//! (inbound) or Jetton Transfer (outbound). Fetches a single page by
//! default, no retries.
//!
//! Usage:
//!   cargo run --bin extract-opcodes
//!   cargo run --bin extract-opcodes -- --limit 50 --out data/opcode_debug.ndjson

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ton_swaps::config::ApiArgs;
use ton_swaps::emitter::NdjsonWriter;
use ton_swaps::fetcher::{fetch_all, FetchPlan};
use ton_swaps::opcodes::extract_hits;
use tracing::info;

const DEFAULT_OUT: &str = "data/opcode_debug.ndjson";

#[derive(Parser)]
#[command(name = "extract-opcodes", about = "Dump notify/transfer transactions of the router as NDJSON")]
struct Args {
    #[command(flatten)]
    api: ApiArgs,

    /// Pages to fetch
    #[arg(long, default_value = "1")]
    max_pages: u32,

    /// NDJSON output path
    #[arg(short, long, default_value = DEFAULT_OUT)]
    out: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let registry = args.api.install_registry().context("Failed to load registry")?;

    let client = args.api.client().context("Failed to build HTTP client")?;
    let plan = FetchPlan {
        before_lt: args.api.before_lt,
        max_pages: Some(args.max_pages),
        ..FetchPlan::single_page(args.api.limit)
    };

    let fetched = fetch_all(&client, &plan)
        .await
        .context("Failed to fetch txs")?;

    let hits = extract_hits(registry, &fetched.transactions);
    let written = NdjsonWriter::new(&args.out).write_all(&hits)?;

    info!("Scanned {} txs over {} page(s)", fetched.transactions.len(), fetched.pages);
    println!("extracted {} txs -> {}", written, args.out.display());
    Ok(())
}

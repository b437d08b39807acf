//! STON.fi Swap Fetcher
//!
//! Pulls router account transactions from the explorer API, correlates
//! notify/swap/pay/transfer messages by query id, resolves direction and
//! rate, and writes one swap record per line (NDJSON).
//!
//! Usage:
//!     cargo run --release --bin fetch-swaps
//!     cargo run --release --bin fetch-swaps -- --limit 100 --max-pages 20 --out data/swaps.ndjson
//!     cargo run --release --bin fetch-swaps -- --start 2026-10-17T00:00:00Z --end 2026-10-18T00:00:00Z
//!
//! Environment (.env is loaded first):
//!     TON_API_BASE_URL, TON_ROUTER, TON_API_KEY, SWAP_REGISTRY, RUST_LOG
//!
//! Notes:
//!     - Nothing is written unless the whole fetch pass succeeds
//!     - The output file is replaced on every run

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use ton_swaps::config::ApiArgs;
use ton_swaps::emitter::NdjsonWriter;
use ton_swaps::fetcher::{fetch_all, FetchPlan};
use ton_swaps::swaps::run_pipeline;
use ton_swaps::time_range::TimeRange;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_OUT: &str = "data/swaps_24h.ndjson";

/// Fetch STON.fi swaps via tonapi and output NDJSON
#[derive(Parser)]
#[command(name = "fetch-swaps")]
struct Args {
    #[command(flatten)]
    api: ApiArgs,

    /// Stop after this many pages (default: until the account is exhausted)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Window start: unix seconds or ISO-8601 (default: end - 24h)
    #[arg(long)]
    start: Option<String>,

    /// Window end: unix seconds or ISO-8601 (default: now)
    #[arg(long)]
    end: Option<String>,

    /// NDJSON output path
    #[arg(short, long, default_value = DEFAULT_OUT)]
    out: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let registry = args.api.install_registry().context("Failed to load registry")?;
    let time_range = TimeRange::resolve(args.start.as_deref(), args.end.as_deref(), Utc::now())
        .context("Invalid time range")?;

    info!("===========================================");
    info!("   STON.fi Swap Fetcher");
    info!("===========================================");
    info!("API: {}", args.api.api_url());
    info!("Router: {}", args.api.router);
    info!("Page size: {} | max pages: {:?}", args.api.limit, args.max_pages);
    if let Some(range) = &time_range {
        info!("Window: {} .. {}", range.start.to_rfc3339(), range.end.to_rfc3339());
    }

    let client = args.api.client().context("Failed to build HTTP client")?;
    let plan = FetchPlan {
        limit: args.api.limit,
        before_lt: args.api.before_lt,
        max_pages: args.max_pages,
        time_range,
    };

    let fetched = fetch_all(&client, &plan)
        .await
        .context("Failed to fetch router transactions")?;

    let output = run_pipeline(registry, &fetched.transactions);
    let written = NdjsonWriter::new(&args.out).write_all(&output.records)?;

    let (forward, reverse, unknown) = output.direction_counts();
    info!("===========================================");
    info!("Pages fetched:            {}", fetched.pages);
    info!("Transactions kept:        {}", fetched.transactions.len());
    info!("Malformed skipped:        {}", fetched.malformed);
    info!("Outside time window:      {}", fetched.out_of_range);
    info!("Dropped (no query id):    {}", output.stats.dropped_without_query_id);
    info!("Role conflicts ignored:   {}", output.stats.role_conflicts);
    info!("Empty bundles discarded:  {}", output.stats.empty_bundles_discarded);
    info!("Swaps: {} ({} forward, {} reverse, {} unknown)", written, forward, reverse, unknown);

    println!("fetched {} swaps -> {}", written, args.out.display());
    Ok(())
}

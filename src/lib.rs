//! STON.fi Swap Correlation Library
//!
//! Fetches router transactions from a TON explorer API, correlates
//! request/response messages by query id, and resolves swap direction,
//! amounts and rate for NDJSON emission.
//!
//! Created: 2026-10-18

pub mod config;
pub mod emitter;
pub mod fetcher;
pub mod opcodes;
pub mod swaps;
pub mod time_range;
pub mod types;

// Re-export commonly used types
pub use config::{ApiArgs, ConfigError, Registry};
pub use emitter::NdjsonWriter;
pub use fetcher::{fetch_all, FetchError, FetchOutcome, FetchPlan, TonApiClient, TransactionSource};
pub use opcodes::{extract_hits, OpcodeHit};
pub use swaps::{run_pipeline, Direction, PipelineOutput, SwapRecord};
pub use time_range::TimeRange;
pub use types::{Message, Transaction};

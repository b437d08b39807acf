//! Swap Correlation Pipeline
//!
//! Purpose:
//!     Classify messages by opcode, correlate them by query id into bundles,
//!     and resolve each bundle into a swap record.
//!
//! Created: 2026-10-18
//!
//! Architecture:
//!     types.rs       — Role, Bundle, RoleSlot, Direction, SwapRecord
//!     classifier.rs  — opcode -> role (pure)
//!     correlator.rs  — transactions -> bundles (first write wins)
//!     resolver.rs    — bundle -> direction, amounts, rate
//!
//! Data flows classifier -> correlator -> resolver in a single pass over one
//! fetched transaction set; nothing is flushed before the scan completes.

pub mod classifier;
pub mod correlator;
pub mod resolver;
pub mod types;

pub use classifier::{normalize_opcode, OpcodeClassifier};
pub use correlator::{correlate, CorrelationStats, Correlator};
pub use resolver::{compute_rate, Resolver, RATE_DECIMALS};
pub use types::{Bundle, Direction, DirectionSource, Role, RoleSlot, SwapRecord};

use crate::config::Registry;
use crate::types::Transaction;
use tracing::debug;

/// Output of one pipeline pass
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<SwapRecord>,
    pub stats: CorrelationStats,
}

impl PipelineOutput {
    /// Number of records per direction: (forward, reverse, unknown)
    pub fn direction_counts(&self) -> (usize, usize, usize) {
        self.records
            .iter()
            .fold((0, 0, 0), |(f, r, u), rec| match rec.direction {
                Direction::Forward => (f + 1, r, u),
                Direction::Reverse => (f, r + 1, u),
                Direction::Unknown => (f, r, u + 1),
            })
    }
}

/// Run classifier -> correlator -> resolver over one transaction set
pub fn run_pipeline(registry: &Registry, transactions: &[Transaction]) -> PipelineOutput {
    let (bundles, stats) = correlate(registry, transactions);
    debug!(
        "Correlated {} bundles from {} transactions",
        bundles.len(),
        stats.transactions_seen
    );

    let resolver = Resolver::new(registry);
    let records = bundles.into_iter().map(|b| resolver.resolve(b)).collect();

    PipelineOutput { records, stats }
}

//! Correlator
//!
//! Groups classified messages from one scanned transaction set into bundles
//! keyed by query id.
//!
//! Rules:
//!     - inbound message may only fill `notify` or `pay`
//!     - outbound messages may only fill `swap` or `transfer`
//!     - query id: inbound decoded `query_id`, else the first outbound message
//!       carrying a non-empty one; transactions without one are dropped
//!     - a populated role slot is never overwritten (first write wins)
//!     - bundles are finalized after the full scan; empty ones are discarded

use super::classifier::OpcodeClassifier;
use super::types::{Bundle, Role, RoleSlot};
use crate::config::{FieldTable, Registry};
use crate::types::{Message, Transaction};
use std::collections::HashMap;
use tracing::debug;

/// Counters surfaced in the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationStats {
    pub transactions_seen: usize,
    /// Transactions with no resolvable query id (not an error)
    pub dropped_without_query_id: usize,
    /// Later claims on an already-populated role slot
    pub role_conflicts: usize,
    pub messages_assigned: usize,
    pub empty_bundles_discarded: usize,
}

pub struct Correlator<'a> {
    classifier: OpcodeClassifier,
    fields: &'a FieldTable,
    /// Bundles in first-seen order
    bundles: Vec<Bundle>,
    index: HashMap<String, usize>,
    stats: CorrelationStats,
}

impl<'a> Correlator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            classifier: OpcodeClassifier::new(&registry.opcodes),
            fields: &registry.fields,
            bundles: Vec::new(),
            index: HashMap::new(),
            stats: CorrelationStats::default(),
        }
    }

    /// Query id of a transaction: inbound first, then the first outbound
    /// message with a non-empty decoded `query_id`.
    pub fn query_id(&self, tx: &Transaction) -> Option<String> {
        tx.in_msg
            .as_ref()
            .and_then(|m| m.body_str(&self.fields.query_id))
            .or_else(|| {
                tx.out_msgs
                    .iter()
                    .find_map(|m| m.body_str(&self.fields.query_id))
            })
    }

    /// Scan one transaction
    pub fn ingest(&mut self, tx: &Transaction) {
        self.stats.transactions_seen += 1;

        let query_id = match self.query_id(tx) {
            Some(id) => id,
            None => {
                self.stats.dropped_without_query_id += 1;
                debug!("Dropping tx {} (lt {}): no query id", tx.hash, tx.lt);
                return;
            }
        };

        let mut claims: Vec<(Role, &Message)> = Vec::new();

        if let Some(in_msg) = &tx.in_msg {
            match self.classifier.classify(in_msg.op_code()) {
                Some(role) if role.is_inbound() => claims.push((role, in_msg)),
                _ => {}
            }
        }

        for out_msg in &tx.out_msgs {
            match self.classifier.classify(out_msg.op_code()) {
                Some(role) if role.is_outbound() => claims.push((role, out_msg)),
                _ => {}
            }
        }

        let idx = self.bundle_index(&query_id);
        for (role, message) in claims {
            if self.bundles[idx].assign(role, RoleSlot::from_tx(tx, message)) {
                self.stats.messages_assigned += 1;
            } else {
                self.stats.role_conflicts += 1;
                debug!(
                    "Query {}: {} already populated, ignoring tx {}",
                    query_id, role, tx.hash
                );
            }
        }
    }

    fn bundle_index(&mut self, query_id: &str) -> usize {
        if let Some(&idx) = self.index.get(query_id) {
            return idx;
        }
        let idx = self.bundles.len();
        self.bundles.push(Bundle::new(query_id));
        self.index.insert(query_id.to_string(), idx);
        idx
    }

    /// Finalize: drop bundles where no role was ever populated
    pub fn finish(mut self) -> (Vec<Bundle>, CorrelationStats) {
        let before = self.bundles.len();
        self.bundles.retain(|b| !b.is_empty());
        self.stats.empty_bundles_discarded = before - self.bundles.len();
        (self.bundles, self.stats)
    }
}

/// Correlate a full scanned transaction set
pub fn correlate(registry: &Registry, transactions: &[Transaction]) -> (Vec<Bundle>, CorrelationStats) {
    let mut correlator = Correlator::new(registry);
    for tx in transactions {
        correlator.ingest(tx);
    }
    correlator.finish()
}

//! Opcode Extractor
//!
//! Debug view over one page of router transactions: keeps every transaction
//! whose inbound message is a Jetton Notify or which sends at least one
//! Jetton Transfer, keyed by tx hash.

use crate::config::Registry;
use crate::swaps::{OpcodeClassifier, Role};
use crate::types::{Message, Transaction};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OpcodeHit {
    pub tx_hash: String,
    pub lt: u64,
    pub utime: i64,
    pub in_op: Option<String>,
    /// Opcodes of the matching outbound transfers
    pub out_ops: Vec<Option<String>>,
    pub in_msg: Option<Message>,
    /// Matching transfers, or every outbound message when only the inbound side matched
    pub out_msgs: Vec<Message>,
}

pub fn extract_hits(registry: &Registry, transactions: &[Transaction]) -> Vec<OpcodeHit> {
    let classifier = OpcodeClassifier::new(&registry.opcodes);

    transactions
        .iter()
        .filter_map(|tx| {
            let in_op = tx.in_msg.as_ref().and_then(|m| m.op_code.clone());
            let in_match = classifier.is(in_op.as_deref(), Role::Notify);

            let transfers: Vec<&Message> = tx
                .out_msgs
                .iter()
                .filter(|m| classifier.is(m.op_code(), Role::Transfer))
                .collect();

            if !in_match && transfers.is_empty() {
                return None;
            }

            let out_msgs: Vec<Message> = if transfers.is_empty() {
                tx.out_msgs.clone()
            } else {
                transfers.iter().map(|m| (*m).clone()).collect()
            };

            Some(OpcodeHit {
                tx_hash: tx.hash.clone(),
                lt: tx.lt,
                utime: tx.utime,
                in_op,
                out_ops: transfers.iter().map(|m| m.op_code.clone()).collect(),
                in_msg: tx.in_msg.clone(),
                out_msgs,
            })
        })
        .collect()
}

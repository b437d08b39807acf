//! Opcode Classifier
//!
//! Maps a message opcode onto a bundle role. Pure; no state beyond the
//! normalised opcode table.

use super::types::Role;
use crate::config::OpcodeTable;
use tracing::trace;

/// Lowercase, trim, and ensure a `0x` prefix
pub fn normalize_opcode(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.starts_with("0x") {
        lower
    } else {
        format!("0x{}", lower)
    }
}

#[derive(Debug, Clone)]
pub struct OpcodeClassifier {
    notify: String,
    pay: String,
    swap: String,
    transfer: String,
}

impl OpcodeClassifier {
    pub fn new(table: &OpcodeTable) -> Self {
        Self {
            notify: normalize_opcode(&table.notify),
            pay: normalize_opcode(&table.pay),
            swap: normalize_opcode(&table.swap),
            transfer: normalize_opcode(&table.transfer),
        }
    }

    /// Classify an opcode. None means "unmatched" (unknown or missing code).
    pub fn classify(&self, op_code: Option<&str>) -> Option<Role> {
        let op = op_code.map(str::trim).filter(|s| !s.is_empty())?;
        let op = normalize_opcode(op);

        let role = if op == self.notify {
            Role::Notify
        } else if op == self.pay {
            Role::Pay
        } else if op == self.swap {
            Role::Swap
        } else if op == self.transfer {
            Role::Transfer
        } else {
            trace!("Unmatched opcode: {}", op);
            return None;
        };

        Some(role)
    }

    /// True when the opcode is the given role
    pub fn is(&self, op_code: Option<&str>, role: Role) -> bool {
        self.classify(op_code) == Some(role)
    }
}

//! Swap Pipeline — Type Definitions
//!
//! Purpose:
//!     Role-tagged bundles produced by the correlator and the resolved swap
//!     records produced by the resolver.
//!
//! Created: 2026-10-18

use crate::types::{serialize_opt_decimal, Message, Transaction};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::fmt;

/// Closed set of roles a message can play in one swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Jetton Notify received by the router (inbound)
    Notify,
    /// Router -> pool swap request (outbound)
    Swap,
    /// Pool -> router pay_to (inbound)
    Pay,
    /// Jetton Transfer paying out the user (outbound)
    Transfer,
}

impl Role {
    /// Roles the correlator accepts from a transaction's inbound message
    pub fn is_inbound(&self) -> bool {
        matches!(self, Role::Notify | Role::Pay)
    }

    /// Roles the correlator accepts from outbound messages
    pub fn is_outbound(&self) -> bool {
        matches!(self, Role::Swap | Role::Transfer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Notify => write!(f, "notify"),
            Role::Swap => write!(f, "swap"),
            Role::Pay => write!(f, "pay"),
            Role::Transfer => write!(f, "transfer"),
        }
    }
}

/// A message placed into a bundle, with the transaction it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSlot {
    pub tx_hash: String,
    pub lt: u64,
    pub utime: i64,
    pub message: Message,
}

impl RoleSlot {
    pub fn from_tx(tx: &Transaction, message: &Message) -> Self {
        Self {
            tx_hash: tx.hash.clone(),
            lt: tx.lt,
            utime: tx.utime,
            message: message.clone(),
        }
    }
}

/// Up to four role-tagged messages sharing one query id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    #[serde(skip)]
    pub query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<RoleSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<RoleSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay: Option<RoleSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<RoleSlot>,
}

impl Bundle {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            notify: None,
            swap: None,
            pay: None,
            transfer: None,
        }
    }

    pub fn slot(&self, role: Role) -> Option<&RoleSlot> {
        match role {
            Role::Notify => self.notify.as_ref(),
            Role::Swap => self.swap.as_ref(),
            Role::Pay => self.pay.as_ref(),
            Role::Transfer => self.transfer.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<RoleSlot> {
        match role {
            Role::Notify => &mut self.notify,
            Role::Swap => &mut self.swap,
            Role::Pay => &mut self.pay,
            Role::Transfer => &mut self.transfer,
        }
    }

    /// Message held in a role slot
    pub fn message(&self, role: Role) -> Option<&Message> {
        self.slot(role).map(|s| &s.message)
    }

    /// Fill a role slot. First write wins: returns false (and leaves the
    /// slot untouched) when the role is already populated.
    pub fn assign(&mut self, role: Role, slot: RoleSlot) -> bool {
        let target = self.slot_mut(role);
        if target.is_some() {
            return false;
        }
        *target = Some(slot);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.notify.is_none() && self.swap.is_none() && self.pay.is_none() && self.transfer.is_none()
    }

    /// First populated slot in notify, swap, pay, transfer order
    pub fn representative(&self) -> Option<&RoleSlot> {
        [Role::Notify, Role::Swap, Role::Pay, Role::Transfer]
            .into_iter()
            .find_map(|role| self.slot(role))
    }
}

/// Inferred trade direction between Wallet A and Wallet B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// A -> B
    Forward,
    /// B -> A
    Reverse,
    Unknown,
}

/// Which rule of the priority chain decided the direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSource {
    TransferDestination,
    NotifySender,
    SwapWalletHint,
    None,
}

/// One resolved swap, ready for NDJSON emission
#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub query_id: String,
    pub tx_hash: String,
    pub lt: u64,
    pub utime: i64,
    #[serde(skip)]
    pub direction: Direction,
    /// Rendered direction, e.g. "TON->USDT"
    #[serde(rename = "direction")]
    pub direction_label: String,
    pub direction_source: DirectionSource,
    pub sender: Option<String>,
    #[serde(serialize_with = "serialize_opt_decimal")]
    pub in_amount: Option<BigDecimal>,
    #[serde(serialize_with = "serialize_opt_decimal")]
    pub out_amount: Option<BigDecimal>,
    /// out/in with exactly 18 decimal places
    #[serde(serialize_with = "serialize_opt_decimal")]
    pub rate: Option<BigDecimal>,
    pub raw: Bundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(hash: &str, lt: u64) -> RoleSlot {
        RoleSlot {
            tx_hash: hash.to_string(),
            lt,
            utime: 0,
            message: Message::default(),
        }
    }

    #[test]
    fn test_assign_first_write_wins() {
        let mut bundle = Bundle::new("1");
        assert!(bundle.is_empty());
        assert!(bundle.assign(Role::Transfer, slot("first", 1)));
        assert!(!bundle.assign(Role::Transfer, slot("second", 2)));
        assert_eq!(bundle.slot(Role::Transfer).unwrap().tx_hash, "first");
        assert!(!bundle.is_empty());
    }

    #[test]
    fn test_representative_order() {
        let mut bundle = Bundle::new("1");
        bundle.assign(Role::Transfer, slot("t", 4));
        bundle.assign(Role::Pay, slot("p", 3));
        assert_eq!(bundle.representative().unwrap().tx_hash, "p");
        bundle.assign(Role::Notify, slot("n", 1));
        assert_eq!(bundle.representative().unwrap().tx_hash, "n");
    }

    #[test]
    fn test_role_sides() {
        assert!(Role::Notify.is_inbound() && Role::Pay.is_inbound());
        assert!(Role::Swap.is_outbound() && Role::Transfer.is_outbound());
        assert!(!Role::Swap.is_inbound() && !Role::Notify.is_outbound());
    }
}

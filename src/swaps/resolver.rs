//! Direction & Amount Resolver
//!
//! Purpose:
//!     Turn a populated bundle into a SwapRecord: infer direction from the
//!     two counterpart wallets, pick direction-dependent amounts, compute rate.
//!
//! Direction priority chain (first known-wallet match wins):
//!     1. transfer destination   A => Forward, B => Reverse
//!     2. notify sender          B => Reverse, A => Forward
//!     3. swap token-wallet hint A => Forward, B => Reverse
//!     4. Unknown
//!
//! Rule 1 reads the wallet receiving the payout while rule 2 reads the
//! wallet that sent the input, yet both map to the same label. This is
//! kept exactly as observed upstream.
//!
//! Amounts:
//!     Forward  in = notify.amount        | pay.ref_coins_data.amount0_out
//!     Reverse  in = swap.jetton_amount   | pay.ref_coins_data.amount1_out
//!     out = transfer.amount (any direction)
//!     rate = out / in, half-even to 18 places; null on missing or zero input

use super::types::{Bundle, Direction, DirectionSource, Role, SwapRecord};
use crate::config::{Registry, WalletPair};
use crate::types::FieldPath;
use bigdecimal::{BigDecimal, RoundingMode, Zero};

/// Fixed number of decimal places of the emitted rate
pub const RATE_DECIMALS: i64 = 18;

/// Which counterpart wallet an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn side(&self, address: Option<String>) -> Option<Side> {
        let address = address?;
        let wallets: &WalletPair = &self.registry.wallets;
        if wallets.a.matches(&address) {
            Some(Side::A)
        } else if wallets.b.matches(&address) {
            Some(Side::B)
        } else {
            None
        }
    }

    fn body_str(&self, bundle: &Bundle, role: Role, path: &FieldPath) -> Option<String> {
        bundle.message(role).and_then(|m| m.body_str(path))
    }

    fn body_decimal(&self, bundle: &Bundle, role: Role, path: &FieldPath) -> Option<BigDecimal> {
        bundle.message(role).and_then(|m| m.body_decimal(path))
    }

    /// Infer direction, stopping at the first rule with a known wallet match
    pub fn resolve_direction(&self, bundle: &Bundle) -> (Direction, DirectionSource) {
        let fields = &self.registry.fields;

        // Rule 1: payout destination
        match self.side(self.body_str(bundle, Role::Transfer, &fields.transfer_destination)) {
            Some(Side::A) => return (Direction::Forward, DirectionSource::TransferDestination),
            Some(Side::B) => return (Direction::Reverse, DirectionSource::TransferDestination),
            None => {}
        }

        // Rule 2: notify sender
        match self.side(self.body_str(bundle, Role::Notify, &fields.notify_sender)) {
            Some(Side::B) => return (Direction::Reverse, DirectionSource::NotifySender),
            Some(Side::A) => return (Direction::Forward, DirectionSource::NotifySender),
            None => {}
        }

        // Rule 3: nested token-wallet hint on the swap message
        match self.side(self.body_str(bundle, Role::Swap, &fields.swap_wallet_hint)) {
            Some(Side::A) => return (Direction::Forward, DirectionSource::SwapWalletHint),
            Some(Side::B) => return (Direction::Reverse, DirectionSource::SwapWalletHint),
            None => {}
        }

        (Direction::Unknown, DirectionSource::None)
    }

    /// Input and output amounts for a given direction
    pub fn amounts(&self, bundle: &Bundle, direction: Direction) -> (Option<BigDecimal>, Option<BigDecimal>) {
        let fields = &self.registry.fields;

        let input = match direction {
            Direction::Forward => self
                .body_decimal(bundle, Role::Notify, &fields.notify_amount)
                .or_else(|| self.body_decimal(bundle, Role::Pay, &fields.pay_forward_amount)),
            Direction::Reverse => self
                .body_decimal(bundle, Role::Swap, &fields.swap_amount)
                .or_else(|| self.body_decimal(bundle, Role::Pay, &fields.pay_reverse_amount)),
            Direction::Unknown => None,
        };
        let output = self.body_decimal(bundle, Role::Transfer, &fields.transfer_amount);

        (input, output)
    }

    pub fn direction_label(&self, direction: Direction) -> String {
        let wallets = &self.registry.wallets;
        match direction {
            Direction::Forward => format!("{}->{}", wallets.a.label, wallets.b.label),
            Direction::Reverse => format!("{}->{}", wallets.b.label, wallets.a.label),
            Direction::Unknown => "unknown".to_string(),
        }
    }

    /// Sender: notify decoded sender, else the notify message's source address
    fn sender(&self, bundle: &Bundle) -> Option<String> {
        let notify = bundle.message(Role::Notify)?;
        notify
            .body_str(&self.registry.fields.notify_sender)
            .or_else(|| notify.source_address().map(str::to_string))
    }

    pub fn resolve(&self, bundle: Bundle) -> SwapRecord {
        let (direction, direction_source) = self.resolve_direction(&bundle);
        let (in_amount, out_amount) = self.amounts(&bundle, direction);
        let rate = compute_rate(in_amount.as_ref(), out_amount.as_ref());
        let sender = self.sender(&bundle);

        let (tx_hash, lt, utime) = bundle
            .representative()
            .map(|s| (s.tx_hash.clone(), s.lt, s.utime))
            .unwrap_or_default();

        SwapRecord {
            query_id: bundle.query_id.clone(),
            tx_hash,
            lt,
            utime,
            direction,
            direction_label: self.direction_label(direction),
            direction_source,
            sender,
            in_amount,
            out_amount,
            rate,
            raw: bundle,
        }
    }
}

/// out / in rounded half-even to RATE_DECIMALS places.
/// None when either side is missing or input is zero.
pub fn compute_rate(input: Option<&BigDecimal>, output: Option<&BigDecimal>) -> Option<BigDecimal> {
    let (input, output) = (input?, output?);
    if input.is_zero() {
        return None;
    }

    Some((output / input).with_scale_round(RATE_DECIMALS, RoundingMode::HalfEven))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PTON_WALLET, USDT_WALLET};
    use crate::swaps::fixtures::*;
    use crate::swaps::types::RoleSlot;
    use crate::types::Message;
    use serde_json::{json, Value};

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn put(bundle: &mut Bundle, role: Role, op: &str, body: Value) {
        bundle.assign(
            role,
            RoleSlot {
                tx_hash: format!("{}-tx", role),
                lt: 1,
                utime: 1_760_000_000,
                message: msg(op, body),
            },
        );
    }

    #[test]
    fn test_rate_exact_eighteen_places() {
        let rate = compute_rate(Some(&dec("100")), Some(&dec("250"))).unwrap();
        assert_eq!(rate.to_plain_string(), "2.500000000000000000");
    }

    #[test]
    fn test_rate_zero_input_is_null() {
        assert_eq!(compute_rate(Some(&dec("0")), Some(&dec("250"))), None);
        assert_eq!(compute_rate(Some(&dec("0.000")), Some(&dec("0"))), None);
    }

    #[test]
    fn test_rate_missing_side_is_null() {
        assert_eq!(compute_rate(None, Some(&dec("1"))), None);
        assert_eq!(compute_rate(Some(&dec("1")), None), None);
    }

    #[test]
    fn test_rate_rounding_half_even() {
        let rate = compute_rate(Some(&dec("3")), Some(&dec("1"))).unwrap();
        assert_eq!(rate.to_plain_string(), "0.333333333333333333");
        let rate = compute_rate(Some(&dec("3")), Some(&dec("2"))).unwrap();
        assert_eq!(rate.to_plain_string(), "0.666666666666666667");

        // Exact ties at the 19th place go to the even neighbour
        let two_e18 = dec("2000000000000000000");
        let rate = compute_rate(Some(&two_e18), Some(&dec("3"))).unwrap();
        assert_eq!(rate.to_plain_string(), "0.000000000000000002");
        let rate = compute_rate(Some(&two_e18), Some(&dec("5"))).unwrap();
        assert_eq!(rate.to_plain_string(), "0.000000000000000002");
    }

    #[test]
    fn test_rate_with_amounts_beyond_28_digits() {
        let input = dec("100000000000000000000000000000");
        let output = dec("250000000000000000000000000000");
        let rate = compute_rate(Some(&input), Some(&output)).unwrap();
        assert_eq!(rate.to_plain_string(), "2.500000000000000000");

        // Largest VarUInteger 16 amount
        let max = dec("1329227995784915872903807060280344575");
        let rate = compute_rate(Some(&dec("1")), Some(&max)).unwrap();
        assert_eq!(
            rate.to_plain_string(),
            "1329227995784915872903807060280344575.000000000000000000"
        );
    }

    #[test]
    fn test_record_keeps_thirty_digit_amounts() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": PTON_WALLET, "amount": "123456789012345678901234567890" }));
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "amount": "246913578024691357802469135780" }));

        let record = resolver.resolve(bundle);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["in_amount"], json!("123456789012345678901234567890"));
        assert_eq!(value["out_amount"], json!("246913578024691357802469135780"));
        assert_eq!(value["rate"], json!("2.000000000000000000"));
    }

    #[test]
    fn test_transfer_destination_short_circuits() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "destination": PTON_WALLET }));
        assert_eq!(
            resolver.resolve_direction(&bundle),
            (Direction::Forward, DirectionSource::TransferDestination)
        );

        // Conflicting notify and swap evidence must not be consulted
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": USDT_WALLET }));
        put(
            &mut bundle,
            Role::Swap,
            SWAP,
            json!({ "ref_bodycell": { "token_wallet1": USDT_WALLET } }),
        );
        assert_eq!(resolver.resolve_direction(&bundle).0, Direction::Forward);
    }

    #[test]
    fn test_transfer_destination_wallet_b_is_reverse() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "destination": USDT_WALLET.to_uppercase() }));
        assert_eq!(resolver.resolve_direction(&bundle).0, Direction::Reverse);
    }

    /// Rule 2 looks at the wallet the input came from, rule 1 at the wallet
    /// the payout goes to; both map A to Forward. Pinned deliberately.
    #[test]
    fn test_notify_sender_polarity_pinned() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut from_b = Bundle::new("1");
        put(&mut from_b, Role::Notify, NOTIFY, json!({ "sender": USDT_WALLET }));
        assert_eq!(
            resolver.resolve_direction(&from_b),
            (Direction::Reverse, DirectionSource::NotifySender)
        );

        let mut from_a = Bundle::new("2");
        put(&mut from_a, Role::Notify, NOTIFY, json!({ "sender": PTON_WALLET }));
        assert_eq!(
            resolver.resolve_direction(&from_a),
            (Direction::Forward, DirectionSource::NotifySender)
        );

        // Same wallet on the payout side of a different bundle resolves to the
        // same label even though it is the opposite end of the trade.
        let mut paid_to_b = Bundle::new("3");
        put(&mut paid_to_b, Role::Transfer, TRANSFER, json!({ "destination": USDT_WALLET }));
        assert_eq!(
            resolver.resolve_direction(&paid_to_b).0,
            resolver.resolve_direction(&from_b).0
        );
    }

    #[test]
    fn test_unmatched_transfer_falls_through_to_swap_hint() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "destination": "0:someone" }));
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": "0:user" }));
        put(
            &mut bundle,
            Role::Swap,
            SWAP,
            json!({ "ref_bodycell": { "token_wallet1": USDT_WALLET } }),
        );

        assert_eq!(
            resolver.resolve_direction(&bundle),
            (Direction::Reverse, DirectionSource::SwapWalletHint)
        );
    }

    #[test]
    fn test_unknown_direction() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "destination": "0:x", "amount": "5" }));
        let record = resolver.resolve(bundle);

        assert_eq!(record.direction, Direction::Unknown);
        assert_eq!(record.direction_label, "unknown");
        assert_eq!(record.in_amount, None);
        assert_eq!(record.out_amount, Some(dec("5")));
        assert_eq!(record.rate, None);
    }

    #[test]
    fn test_direction_is_deterministic() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": PTON_WALLET }));
        let first = resolver.resolve_direction(&bundle);
        let second = resolver.resolve_direction(&bundle.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_forward_amounts_with_fallback() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": PTON_WALLET, "amount": "not-a-number" }));
        put(&mut bundle, Role::Pay, PAY, json!({ "ref_coins_data": { "amount0_out": "100", "amount1_out": "7" } }));
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "destination": "0:user", "amount": "250" }));

        let record = resolver.resolve(bundle);
        assert_eq!(record.direction, Direction::Forward);
        assert_eq!(record.direction_label, "TON->USDT");
        assert_eq!(record.in_amount, Some(dec("100")));
        assert_eq!(record.out_amount, Some(dec("250")));
        assert_eq!(record.rate.unwrap().to_plain_string(), "2.500000000000000000");
        assert_eq!(record.sender.as_deref(), Some(PTON_WALLET));
        assert_eq!(record.tx_hash, "notify-tx");
    }

    #[test]
    fn test_reverse_amounts() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Swap, SWAP, json!({ "jetton_amount": 4000000, "ref_bodycell": { "token_wallet1": USDT_WALLET } }));
        put(&mut bundle, Role::Pay, PAY, json!({ "ref_coins_data": { "amount0_out": "1", "amount1_out": "2" } }));
        put(&mut bundle, Role::Transfer, TRANSFER, json!({ "amount": "1000000000" }));

        let record = resolver.resolve(bundle);
        assert_eq!(record.direction, Direction::Reverse);
        assert_eq!(record.direction_label, "USDT->TON");
        assert_eq!(record.in_amount, Some(dec("4000000")));
        assert_eq!(record.rate.unwrap().to_plain_string(), "250.000000000000000000");
        assert_eq!(record.sender, None);
        assert_eq!(record.tx_hash, "swap-tx");
    }

    #[test]
    fn test_reverse_amount_falls_back_to_pay() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        put(&mut bundle, Role::Notify, NOTIFY, json!({ "sender": USDT_WALLET, "amount": "999" }));
        put(&mut bundle, Role::Pay, PAY, json!({ "ref_coins_data": { "amount0_out": "1", "amount1_out": "8" } }));

        let record = resolver.resolve(bundle);
        assert_eq!(record.direction, Direction::Reverse);
        // Reverse never reads the notify amount
        assert_eq!(record.in_amount, Some(dec("8")));
        assert_eq!(record.out_amount, None);
        assert_eq!(record.rate, None);
    }

    #[test]
    fn test_sender_falls_back_to_source_address() {
        let registry = Registry::default();
        let resolver = Resolver::new(&registry);

        let mut bundle = Bundle::new("1");
        let notify: Message = serde_json::from_value(json!({
            "op_code": NOTIFY,
            "decoded_body": { "query_id": "1" },
            "source": { "address": "0:jetton-wallet" }
        }))
        .unwrap();
        bundle.assign(
            Role::Notify,
            RoleSlot { tx_hash: "n".into(), lt: 1, utime: 1, message: notify },
        );

        let record = resolver.resolve(bundle);
        assert_eq!(record.sender.as_deref(), Some("0:jetton-wallet"));
    }
}

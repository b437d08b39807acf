//! Configuration management
//!
//! Two layers:
//! - `Registry`: the process-wide table of opcodes, counterpart wallets and
//!   decoded-body field paths. Built-in defaults, optionally overridden by a
//!   TOML file, installed once at startup.
//! - `ApiArgs`: CLI/env surface shared by the binaries (clap, `.env` via dotenv).

use crate::fetcher::TonApiClient;
use crate::types::FieldPath;
use clap::Args;
use once_cell::sync::{Lazy, OnceCell};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ── Defaults ────────────────────────────────────────────────────────────

/// STON.fi v1 router (TON/USDT pool lives behind it)
pub const DEFAULT_ROUTER: &str = "EQCS4UEa5UaJLzOyyKieqQOQ2P9M-7kXpkO5HnP3Bv250cN3";
pub const DEFAULT_API_BASE: &str = "https://tonapi.io";
pub const API_PATH_SUFFIX: &str = "/v2/blockchain";
pub const DEFAULT_PAGE_LIMIT: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Proxy TON (pTON) jetton wallet of the router
pub const PTON_WALLET: &str = "0:922d627d7d8edbd00e4e23bdb0c54a76ee5e1f46573a1af4417857fa3e23e91f";
/// Tether USD jetton wallet of the router
pub const USDT_WALLET: &str = "0:9220c181a6cfeacd11b7b8f62138df1bb9cc82b6ed2661d2f5faee204b3efb20";

pub const OP_JETTON_NOTIFY: &str = "0x7362d09c";
pub const OP_PAY_TO: &str = "0xf93bb43f";
pub const OP_SWAP: &str = "0x25938561";
pub const OP_JETTON_TRANSFER: &str = "0x0f8a7ea5";

/// Built-in registry, used when no override file is given
pub static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

static INSTALLED: OnceCell<Registry> = OnceCell::new();

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timestamp '{0}': expected unix seconds or ISO-8601")]
    InvalidTimestamp(String),
    #[error("time range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
    #[error("failed to read registry file {path}: {source}")]
    RegistryRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse registry file {path}: {source}")]
    RegistryParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ── Registry ────────────────────────────────────────────────────────────

/// Operation codes recognised by the classifier
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpcodeTable {
    pub notify: String,
    pub pay: String,
    pub swap: String,
    pub transfer: String,
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self {
            notify: OP_JETTON_NOTIFY.to_string(),
            pay: OP_PAY_TO.to_string(),
            swap: OP_SWAP.to_string(),
            transfer: OP_JETTON_TRANSFER.to_string(),
        }
    }
}

/// A well-known counterpart wallet and the asset label used in direction strings
#[derive(Debug, Clone, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub label: String,
}

impl Wallet {
    /// Case-insensitive address comparison
    pub fn matches(&self, address: &str) -> bool {
        let address = address.trim();
        !address.is_empty() && self.address.trim().eq_ignore_ascii_case(address)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletPair {
    /// Wallet A: "A->B" is the forward direction
    pub a: Wallet,
    /// Wallet B
    pub b: Wallet,
}

impl Default for WalletPair {
    fn default() -> Self {
        Self {
            a: Wallet {
                address: PTON_WALLET.to_string(),
                label: "TON".to_string(),
            },
            b: Wallet {
                address: USDT_WALLET.to_string(),
                label: "USDT".to_string(),
            },
        }
    }
}

/// Decoded-body field paths read by the correlator and resolver
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldTable {
    pub query_id: FieldPath,
    pub notify_amount: FieldPath,
    pub notify_sender: FieldPath,
    pub transfer_amount: FieldPath,
    pub transfer_destination: FieldPath,
    pub swap_amount: FieldPath,
    /// Secondary token-wallet hint, nested inside the swap body
    pub swap_wallet_hint: FieldPath,
    /// Input amount fallback for the forward direction
    pub pay_forward_amount: FieldPath,
    /// Input amount fallback for the reverse direction
    pub pay_reverse_amount: FieldPath,
}

impl Default for FieldTable {
    fn default() -> Self {
        Self {
            query_id: FieldPath::new("query_id"),
            notify_amount: FieldPath::new("amount"),
            notify_sender: FieldPath::new("sender"),
            transfer_amount: FieldPath::new("amount"),
            transfer_destination: FieldPath::new("destination"),
            swap_amount: FieldPath::new("jetton_amount"),
            swap_wallet_hint: FieldPath::new("ref_bodycell.token_wallet1"),
            pay_forward_amount: FieldPath::new("ref_coins_data.amount0_out"),
            pay_reverse_amount: FieldPath::new("ref_coins_data.amount1_out"),
        }
    }
}

/// Immutable lookup table shared by every pipeline stage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub opcodes: OpcodeTable,
    pub wallets: WalletPair,
    pub fields: FieldTable,
}

impl Registry {
    /// Load overrides from a TOML file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            ConfigError::RegistryRead {
                path: path_str.clone(),
                source,
            }
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::RegistryParse {
            path: path_str,
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Install the process-wide registry. The first call wins.
    pub fn install(self) -> &'static Registry {
        INSTALLED.get_or_init(|| self)
    }
}

// ── CLI surface ─────────────────────────────────────────────────────────

/// Explorer API arguments shared by all binaries
#[derive(Debug, Clone, Args)]
pub struct ApiArgs {
    /// Explorer base URL including the /v2/blockchain suffix
    /// (default: $TON_API_BASE_URL + /v2/blockchain, else tonapi.io)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Router account address
    #[arg(long, env = "TON_ROUTER", default_value = DEFAULT_ROUTER)]
    pub router: String,

    /// Explorer API key, sent as a bearer token
    /// (fallbacks: NEXT_PUBLIC_TON_API_KEY, TON_API_KEY_MAINNET)
    #[arg(long, env = "TON_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Page size
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Pagination anchor: only return transactions before this logical time
    #[arg(long)]
    pub before_lt: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// TOML file overriding opcodes, wallets and field paths
    #[arg(long, env = "SWAP_REGISTRY")]
    pub registry: Option<PathBuf>,
}

impl ApiArgs {
    pub fn api_url(&self) -> String {
        if let Some(url) = self.api_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }
        let base = first_env(&["TON_API_BASE_URL", "NEXT_PUBLIC_TON_API_BASE_URL"])
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        format!("{}{}", base.trim_end_matches('/'), API_PATH_SUFFIX)
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| first_env(&["NEXT_PUBLIC_TON_API_KEY", "TON_API_KEY_MAINNET"]))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load the registry override file (if any) and install it process-wide
    pub fn install_registry(&self) -> Result<&'static Registry, ConfigError> {
        let registry = match &self.registry {
            Some(path) => Registry::load(path)?,
            None => DEFAULT_REGISTRY.clone(),
        };
        Ok(registry.install())
    }

    pub fn client(&self) -> Result<TonApiClient, crate::fetcher::FetchError> {
        TonApiClient::new(&self.api_url(), &self.router, self.api_key(), self.timeout())
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = Registry::default();
        assert_eq!(registry.opcodes.notify, "0x7362d09c");
        assert_eq!(registry.opcodes.transfer, "0x0f8a7ea5");
        assert_eq!(registry.wallets.a.label, "TON");
        assert_eq!(registry.wallets.b.label, "USDT");
        assert_eq!(registry.fields.swap_wallet_hint.to_string(), "ref_bodycell.token_wallet1");
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[opcodes]
pay = "0x657B54F5"
swap = "0x6664de2a"

[fields]
swap_wallet_hint = "additional_data.token_wallet"
"#;

        let registry = Registry::from_toml(toml_str).unwrap();
        assert_eq!(registry.opcodes.pay, "0x657B54F5");
        assert_eq!(registry.opcodes.swap, "0x6664de2a");
        // Untouched sections keep defaults
        assert_eq!(registry.opcodes.notify, OP_JETTON_NOTIFY);
        assert_eq!(registry.wallets.a.address, PTON_WALLET);
        assert_eq!(registry.fields.notify_amount.to_string(), "amount");
        assert_eq!(
            registry.fields.swap_wallet_hint.to_string(),
            "additional_data.token_wallet"
        );
    }

    #[test]
    fn test_wallet_match_is_case_insensitive() {
        let wallets = WalletPair::default();
        assert!(wallets.a.matches(&PTON_WALLET.to_uppercase()));
        assert!(wallets.b.matches(&format!("  {}  ", USDT_WALLET)));
        assert!(!wallets.a.matches(USDT_WALLET));
        assert!(!wallets.a.matches(""));
    }

    #[test]
    fn test_load_missing_registry_file() {
        let err = Registry::load("/nonexistent/registry.toml").unwrap_err();
        assert!(matches!(err, ConfigError::RegistryRead { .. }));
    }

    #[test]
    fn test_explicit_api_url_wins() {
        let args = ApiArgs {
            api_url: Some("http://localhost:8081/v2/blockchain".to_string()),
            router: DEFAULT_ROUTER.to_string(),
            api_key: None,
            limit: DEFAULT_PAGE_LIMIT,
            before_lt: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            registry: None,
        };
        assert_eq!(args.api_url(), "http://localhost:8081/v2/blockchain");
        assert_eq!(args.timeout(), Duration::from_secs(30));
    }
}

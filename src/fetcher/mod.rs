//! Transaction Fetcher
//!
//! Purpose:
//!     Pull account transactions page by page from the explorer API and hand
//!     back one in-memory transaction set for the pipeline.
//!
//! Created: 2026-10-18
//!
//! Architecture:
//!     mod.rs     — TransactionSource trait, RawPage, pagination loop
//!     client.rs  — reqwest-backed TonApiClient
//!
//! Notes:
//!     - pages are fetched strictly sequentially; no retries
//!     - any transport/HTTP error aborts the whole pass
//!     - a transaction that fails typed decoding is skipped, not fatal

pub mod client;

pub use client::TonApiClient;

use crate::time_range::TimeRange;
use crate::types::{value_to_string, Transaction};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Pagination anchor for the next request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageAnchor {
    /// tonapi style: only transactions before this logical time
    BeforeLt(u64),
    /// Generic style: opaque cursor echoed back from `next_cursor`
    Cursor(String),
}

/// One response page, before typed decoding.
/// tonapi returns `transactions`; the generic variant returns `data` + `next_cursor`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub transactions: Option<Vec<Value>>,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub next_cursor: Option<Value>,
}

impl RawPage {
    pub fn from_transactions(transactions: Vec<Value>) -> Self {
        Self {
            transactions: Some(transactions),
            ..Default::default()
        }
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.next_cursor.as_ref().and_then(value_to_string)
    }

    pub fn into_records(self) -> Vec<Value> {
        match (self.transactions, self.data) {
            (Some(txs), _) if !txs.is_empty() => txs,
            (_, Some(data)) => data,
            (txs, None) => txs.unwrap_or_default(),
        }
    }
}

/// Anything that can serve one page of account transactions
#[async_trait]
pub trait TransactionSource {
    async fn fetch_page(&self, limit: u32, anchor: Option<&PageAnchor>) -> Result<RawPage, FetchError>;
}

/// Bounds of one fetch pass
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub limit: u32,
    pub before_lt: Option<u64>,
    /// None = keep paging until the account is exhausted
    pub max_pages: Option<u32>,
    pub time_range: Option<TimeRange>,
}

impl FetchPlan {
    pub fn single_page(limit: u32) -> Self {
        Self {
            limit,
            before_lt: None,
            max_pages: Some(1),
            time_range: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Transactions in the order the API returned them
    pub transactions: Vec<Transaction>,
    pub pages: u32,
    pub malformed: usize,
    pub out_of_range: usize,
}

/// Fetch pages sequentially until one of the stop conditions holds:
/// empty page, short page (< limit), repeated anchor, page budget reached,
/// or a page reaching past the start of the time range.
pub async fn fetch_all<S>(source: &S, plan: &FetchPlan) -> Result<FetchOutcome, FetchError>
where
    S: TransactionSource + ?Sized,
{
    let mut outcome = FetchOutcome::default();
    let mut anchor = plan.before_lt.filter(|lt| *lt > 0).map(PageAnchor::BeforeLt);
    let mut seen_anchors: HashSet<PageAnchor> = HashSet::new();

    loop {
        if plan.max_pages.is_some_and(|max| outcome.pages >= max) {
            info!("Page budget of {} reached", outcome.pages);
            break;
        }

        let page = source.fetch_page(plan.limit, anchor.as_ref()).await?;
        outcome.pages += 1;

        let next_cursor = page.next_cursor();
        let records = page.into_records();
        if records.is_empty() {
            break;
        }

        let count = records.len();
        let mut last_lt: Option<u64> = None;
        let mut oldest_utime: Option<i64> = None;
        let mut kept = 0usize;

        for raw in records {
            let tx: Transaction = match serde_json::from_value(raw) {
                Ok(tx) => tx,
                Err(e) => {
                    warn!("Skipping malformed transaction on page {}: {}", outcome.pages, e);
                    outcome.malformed += 1;
                    continue;
                }
            };

            last_lt = Some(tx.lt);
            oldest_utime = Some(oldest_utime.map_or(tx.utime, |u| u.min(tx.utime)));

            match &plan.time_range {
                Some(range) if !range.contains(tx.utime) => outcome.out_of_range += 1,
                _ => {
                    outcome.transactions.push(tx);
                    kept += 1;
                }
            }
        }

        info!(
            "Page {} | {} txs | {} kept | anchor {:?}",
            outcome.pages, count, kept, anchor
        );

        if let (Some(range), Some(oldest)) = (&plan.time_range, oldest_utime) {
            if range.is_before(oldest) {
                break;
            }
        }

        if count < plan.limit as usize {
            break;
        }

        let next = match next_cursor {
            Some(cursor) => PageAnchor::Cursor(cursor),
            None => match last_lt {
                Some(lt) if lt > 0 => PageAnchor::BeforeLt(lt),
                _ => break,
            },
        };

        if !seen_anchors.insert(next.clone()) {
            warn!("Anchor {:?} repeated, stopping pagination", next);
            break;
        }
        anchor = Some(next);
    }

    Ok(outcome)
}

//! tonapi HTTP client
//!
//! GET {base}/accounts/{account}/transactions?limit=N[&before_lt=LT|&cursor=C]

use super::{FetchError, PageAnchor, RawPage, TransactionSource};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Max characters of an error body kept in FetchError::Status
const ERROR_BODY_LIMIT: usize = 300;

pub struct TonApiClient {
    http: Client,
    base_url: String,
    account: String,
    api_key: Option<String>,
}

impl TonApiClient {
    pub fn new(
        base_url: &str,
        account: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account: account.to_string(),
            api_key,
        })
    }

    pub fn transactions_url(&self) -> String {
        format!("{}/accounts/{}/transactions", self.base_url, self.account)
    }

    /// Query parameters for one page request
    pub fn query_params(limit: u32, anchor: Option<&PageAnchor>) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", limit.to_string())];
        match anchor {
            Some(PageAnchor::BeforeLt(lt)) => params.push(("before_lt", lt.to_string())),
            Some(PageAnchor::Cursor(cursor)) => params.push(("cursor", cursor.clone())),
            None => {}
        }
        params
    }
}

#[async_trait]
impl TransactionSource for TonApiClient {
    async fn fetch_page(&self, limit: u32, anchor: Option<&PageAnchor>) -> Result<RawPage, FetchError> {
        let url = self.transactions_url();
        debug!("GET {} limit={} anchor={:?}", url, limit, anchor);

        let mut request = self
            .http
            .get(&url)
            .query(&Self::query_params(limit, anchor))
            .header(ACCEPT, "application/json");

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// In crates/api-client/src/hyperliquid.rs

use crate::types::{AllMids, ClearinghouseState, HyperliquidClient};
use crate::{Error, Result, build_http_client};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

impl HyperliquidClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts a query to the public `/info` endpoint.
    async fn info<T: DeserializeOwned>(&self, query: Value) -> Result<T> {
        let url = format!("{}/info", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(Error::RequestFailed)?;

        let status = response.status();
        let text = response.text().await.map_err(Error::RequestFailed)?;
        if !status.is_success() {
            return Err(Error::HttpStatus { status: status.as_u16(), body: text });
        }
        serde_json::from_str(&text).map_err(Error::DeserializationFailed)
    }

    /// Mid prices for every listed perpetual, keyed by coin.
    pub async fn all_mids(&self) -> Result<AllMids> {
        self.info(json!({ "type": "allMids" })).await
    }

    /// Margin summary and open positions of `address`.
    pub async fn clearinghouse_state(&self, address: &str) -> Result<ClearinghouseState> {
        tracing::debug!(address, "Querying clearinghouse state.");
        self.info(json!({ "type": "clearinghouseState", "user": address })).await
    }
}

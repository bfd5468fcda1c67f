// In crates/api-client/src/types.rs

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::{Error, Result};

/// The signed REST client for the OKX v5 API (the account we trade).
#[derive(Debug, Clone)]
pub struct OkxClient {
    /// The persistent HTTP client.
    pub http_client: Client,
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
    /// The base URL for the OKX REST API.
    pub base_url: String,
    /// Adds the demo-trading header to every request.
    pub simulated: bool,
}

/// The unsigned client for the Hyperliquid info endpoint (the account we copy).
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    pub http_client: Client,
    pub base_url: String,
}

/// Parses an OKX numeric string. OKX sends `""` for fields that do not apply.
pub fn parse_okx_decimal(field: &str, raw: &str) -> Result<Decimal> {
    if raw.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| Error::InvalidResponse(format!("{} = {:?}: {}", field, raw, e)))
}

/// One entry of `GET /api/v5/account/positions`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OkxPosition {
    pub inst_id: String,
    /// Signed contract count in net mode.
    #[serde(default)]
    pub pos: String,
    /// Unrealized profit and loss in the settlement currency.
    #[serde(default)]
    pub upl: String,
    #[serde(default)]
    pub lever: String,
    #[serde(default)]
    pub mgn_mode: String,
}

impl OkxPosition {
    pub fn signed_contracts(&self) -> Result<Decimal> {
        parse_okx_decimal("pos", &self.pos)
    }

    pub fn unrealized_pnl(&self) -> Result<Decimal> {
        parse_okx_decimal("upl", &self.upl)
    }
}

/// The first element of `GET /api/v5/account/balance`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OkxBalance {
    /// Total account equity in USD.
    #[serde(default)]
    pub total_eq: String,
}

impl OkxBalance {
    pub fn total_equity(&self) -> Result<Decimal> {
        parse_okx_decimal("totalEq", &self.total_eq)
    }
}

/// The per-order result of `POST /api/v5/trade/order`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OkxOrderAck {
    #[serde(default)]
    pub ord_id: String,
    #[serde(default)]
    pub cl_ord_id: String,
    #[serde(default)]
    pub s_code: String,
    #[serde(default)]
    pub s_msg: String,
}

/// Response of `{"type": "allMids"}`: coin to mid price.
pub type AllMids = HashMap<String, Decimal>;

/// Response of `{"type": "clearinghouseState", "user": ...}`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetPosition {
    pub position: PerpPosition,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PerpPosition {
    pub coin: String,
    /// Signed size in base units.
    pub szi: Decimal,
    pub leverage: Option<PerpLeverage>,
    pub unrealized_pnl: Option<Decimal>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerpLeverage {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: u32,
}

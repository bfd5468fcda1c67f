// In crates/api-client/src/lib.rs

use app_config::OkxSettings;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use core_types::{InstrumentId, MarginMode, PositionMode, Side};
use hmac::{Hmac, Mac};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha2::Sha256;
use std::time::Duration;
// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

pub mod error;
pub mod hyperliquid;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the shared HTTP client used by both venue clients.
pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::ClientBuildError(e.to_string()))
}

/// Computes the OKX request signature: base64(HMAC-SHA256(secret, ts + METHOD + path + body)).
pub fn sign_request(secret_key: &str, timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Unwraps the `{"code": "0", "msg": "", "data": [...]}` envelope every OKX endpoint returns.
pub fn parse_envelope<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    let code = value.get("code").and_then(Value::as_str).unwrap_or("-1");
    if code != "0" {
        // Per-item errors (`sCode`/`sMsg`) are more specific than the top-level message.
        let first = value.get("data").and_then(|d| d.get(0));
        let item_code = first.and_then(|d| d.get("sCode")).and_then(Value::as_str);
        let item_msg = first.and_then(|d| d.get("sMsg")).and_then(Value::as_str);
        let msg = item_msg
            .filter(|m| !m.is_empty())
            .or_else(|| value.get("msg").and_then(Value::as_str))
            .unwrap_or("Unknown error")
            .to_string();
        let code = item_code.unwrap_or(code).parse().unwrap_or(-1);
        return Err(Error::ApiError { code, msg });
    }

    let data = value.get("data").cloned().unwrap_or_else(|| Value::Array(Vec::new()));
    Ok(serde_json::from_value(data)?)
}

impl OkxClient {
    /// Constructs a new OkxClient from OkxSettings.
    pub fn new(settings: &OkxSettings) -> Result<Self> {
        Ok(OkxClient {
            http_client: build_http_client()?,
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            passphrase: settings.passphrase.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
            simulated: settings.simulated,
        })
    }

    /// Sends a signed request and unwraps the response envelope.
    ///
    /// `request_path` includes the query string, because OKX signs it verbatim.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        request_path: &str,
        body: Option<&Value>,
    ) -> Result<Vec<T>> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let body = body.map(Value::to_string).unwrap_or_default();
        let signature = sign_request(&self.secret_key, &timestamp, method.as_str(), request_path, &body);

        let url = format!("{}{}", self.base_url, request_path);
        let mut request = self
            .http_client
            .request(method, &url)
            .header("OK-ACCESS-KEY", &self.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", &timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.passphrase)
            .header("Content-Type", "application/json");
        if self.simulated {
            request = request.header("x-simulated-trading", "1");
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(Error::RequestFailed)?;
        let status = response.status();
        let text = response.text().await.map_err(Error::RequestFailed)?;

        // OKX reports business errors with a 200 and a non-zero code; anything else that
        // is not JSON is a transport-level failure.
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) if status.is_success() => return Err(Error::DeserializationFailed(e)),
            Err(_) => return Err(Error::HttpStatus { status: status.as_u16(), body: text }),
        };
        parse_envelope(value)
    }

    /// Fetches the open perpetual swap positions.
    ///
    /// This corresponds to the `GET /api/v5/account/positions` endpoint.
    pub async fn get_positions(&self) -> Result<Vec<OkxPosition>> {
        self.send(Method::GET, "/api/v5/account/positions?instType=SWAP", None).await
    }

    /// Fetches the account balance summary.
    ///
    /// This corresponds to the `GET /api/v5/account/balance` endpoint.
    pub async fn get_account_balance(&self) -> Result<OkxBalance> {
        let mut data: Vec<OkxBalance> = self.send(Method::GET, "/api/v5/account/balance", None).await?;
        if data.is_empty() {
            return Err(Error::InvalidResponse("balance response carried no data".into()));
        }
        Ok(data.swap_remove(0))
    }

    pub async fn set_leverage(&self, instrument: &InstrumentId, leverage: u32, margin_mode: MarginMode) -> Result<()> {
        let body = json!({
            "instId": instrument.0,
            "lever": leverage.to_string(),
            "mgnMode": margin_mode.as_str(),
        });
        let _: Vec<Value> = self.send(Method::POST, "/api/v5/account/set-leverage", Some(&body)).await?;
        Ok(())
    }

    pub async fn set_position_mode(&self, mode: PositionMode) -> Result<()> {
        let body = json!({ "posMode": mode.as_str() });
        let _: Vec<Value> = self.send(Method::POST, "/api/v5/account/set-position-mode", Some(&body)).await?;
        Ok(())
    }

    /// Places a new market order.
    /// Corresponds to `POST /api/v5/trade/order`.
    pub async fn place_market_order(
        &self,
        instrument: &InstrumentId,
        side: Side,
        contracts: Decimal,
        margin_mode: MarginMode,
        position_mode: PositionMode,
    ) -> Result<OkxOrderAck> {
        let body = json!({
            "instId": instrument.0,
            "tdMode": margin_mode.as_str(),
            "side": side.as_str(),
            "posSide": position_mode.order_position_side(),
            "ordType": "market",
            "sz": contracts.to_string(),
        });
        let mut acks: Vec<OkxOrderAck> = self.send(Method::POST, "/api/v5/trade/order", Some(&body)).await?;
        if acks.is_empty() {
            return Err(Error::InvalidResponse("order response carried no data".into()));
        }
        let ack = acks.swap_remove(0);
        if !ack.s_code.is_empty() && ack.s_code != "0" {
            return Err(Error::ApiError { code: ack.s_code.parse().unwrap_or(-1), msg: ack.s_msg });
        }
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "22582BD0CFF14C41EDBF1AB98506286D";

    #[test]
    fn signs_get_without_body() {
        let sig = sign_request(SECRET, "2020-12-08T09:08:57.715Z", "GET", "/api/v5/account/balance", "");
        assert_eq!(sig, "AkD5YszBhggtIyjDlmTy/9PpNVntel+1Lff8wh0qpQw=");
    }

    #[test]
    fn signs_post_with_body() {
        let sig = sign_request(
            SECRET,
            "2020-12-08T09:08:57.715Z",
            "POST",
            "/api/v5/trade/order",
            r#"{"instId":"BTC-USDT-SWAP"}"#,
        );
        assert_eq!(sig, "jJaDvhTo9Th18z7EibpnZ4RawxPiL4Py1Gj/bjkEvp4=");
    }

    #[test]
    fn envelope_success_yields_data() {
        let value = json!({
            "code": "0", "msg": "",
            "data": [{"instId": "BTC-USDT-SWAP", "pos": "-2", "upl": "1.5", "lever": "5", "mgnMode": "cross"}]
        });
        let positions: Vec<OkxPosition> = parse_envelope(value).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].signed_contracts().unwrap(), Decimal::from(-2));
    }

    #[test]
    fn envelope_prefers_item_error() {
        let value = json!({
            "code": "1", "msg": "Operation failed.",
            "data": [{"ordId": "", "sCode": "51008", "sMsg": "Order failed. Insufficient USDT margin"}]
        });
        match parse_envelope::<OkxOrderAck>(value) {
            Err(Error::ApiError { code, msg }) => {
                assert_eq!(code, 51008);
                assert!(msg.contains("Insufficient"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn envelope_falls_back_to_top_level_message() {
        let value = json!({"code": "50113", "msg": "Invalid Sign", "data": []});
        match parse_envelope::<Value>(value) {
            Err(Error::ApiError { code, msg }) => {
                assert_eq!(code, 50113);
                assert_eq!(msg, "Invalid Sign");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

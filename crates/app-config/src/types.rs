// In crates/app-config/src/types.rs

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use core_types::{InstrumentId, InstrumentRegistry, InstrumentSpec};

use crate::{Error, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Credentials and endpoint of the venue whose account we trade.
    pub okx: OkxSettings,
    /// Endpoint of the venue we copy from.
    #[serde(default)]
    pub hyperliquid: HyperliquidSettings,
    pub copy: CopySettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub pnl: PnlSettings,
    /// Entries merged over the built-in instrument table.
    #[serde(default)]
    pub instruments: Vec<InstrumentSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { environment: "development".into(), log_level: "info".into() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct OkxSettings {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
    #[serde(default = "default_okx_url")]
    pub rest_base_url: String,
    /// Route every request to the demo-trading environment.
    #[serde(default = "default_true")]
    pub simulated: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HyperliquidSettings {
    #[serde(default = "default_hyperliquid_url")]
    pub rest_base_url: String,
}

impl Default for HyperliquidSettings {
    fn default() -> Self {
        Self { rest_base_url: default_hyperliquid_url() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CopySettings {
    /// The reference account whose positions are mirrored.
    pub target_address: String,
    /// Total quote-currency notional the local account should carry.
    pub budget_usd: Decimal,
    /// Stop the loop once the local account holds no positions.
    #[serde(default = "default_true")]
    pub stop_when_flat: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    #[serde(default = "default_network_backoff")]
    pub network_backoff_secs: u64,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn network_backoff(&self) -> Duration {
        Duration::from_secs(self.network_backoff_secs)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            error_backoff_secs: default_error_backoff(),
            network_backoff_secs: default_network_backoff(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PnlSettings {
    #[serde(default = "default_pnl_path")]
    pub log_path: String,
}

impl Default for PnlSettings {
    fn default() -> Self {
        Self { log_path: default_pnl_path() }
    }
}

/// One row of the instrument table as written in the settings file.
#[derive(Deserialize, Debug, Clone)]
pub struct InstrumentSettings {
    pub instrument_id: String,
    pub min_base_increment: Decimal,
    pub face_value: Decimal,
    pub lot_increment: Decimal,
}

impl Settings {
    /// Rejects settings the engine cannot start with.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("okx.api_key", &self.okx.api_key),
            ("okx.secret_key", &self.okx.secret_key),
            ("okx.passphrase", &self.okx.passphrase),
            ("copy.target_address", &self.copy.target_address),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Invalid(format!("{} must not be empty", name)));
            }
        }
        if self.copy.budget_usd <= Decimal::ZERO {
            return Err(Error::Invalid(format!(
                "copy.budget_usd must be positive, got {}",
                self.copy.budget_usd
            )));
        }
        if self.polling.interval_secs == 0 {
            return Err(Error::Invalid("polling.interval_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Builds the instrument registry: the curated table with configured overrides applied.
    pub fn instrument_registry(&self) -> Result<InstrumentRegistry> {
        let overrides = self
            .instruments
            .iter()
            .map(|row| {
                InstrumentSpec::new(
                    InstrumentId::new(row.instrument_id.clone()),
                    row.min_base_increment,
                    row.face_value,
                    row.lot_increment,
                )
            })
            .collect::<core_types::Result<Vec<_>>>()?;
        Ok(InstrumentRegistry::curated().with_overrides(overrides))
    }
}

/// Helper functions for serde defaults
fn default_okx_url() -> String { "https://www.okx.com".into() }
fn default_hyperliquid_url() -> String { "https://api.hyperliquid.xyz".into() }
fn default_true() -> bool { true }
fn default_interval() -> u64 { 15 }
fn default_error_backoff() -> u64 { 60 }
fn default_network_backoff() -> u64 { 120 }
fn default_pnl_path() -> String { "pnl_log.csv".into() }

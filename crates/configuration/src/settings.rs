use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    /// Per-symbol metadata served to the order ticket, keyed by symbol.
    #[serde(default)]
    pub symbols: HashMap<String, SymbolSettings>,
}

/// The single simulated account.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Shown as the account manager title and used as the account id.
    pub title: String,
    /// Cash the account starts with.
    pub initial_balance: Decimal,
    pub currency: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            title: "Trading Sample".to_string(),
            initial_balance: dec!(10000000),
            currency: "USD".to_string(),
        }
    }
}

/// Parameters for the broker engine itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Prefix of every quote subscription id the broker registers.
    pub subscription_prefix: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            subscription_prefix: "SampleBroker".to_string(),
        }
    }
}

/// Instrument metadata for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolSettings {
    #[serde(default)]
    pub description: String,
    /// Minimal price movement, in units of `1 / pricescale`.
    pub minmov: Decimal,
    pub pricescale: Decimal,
}

impl Config {
    /// Looks up symbol metadata. Keys are matched case-insensitively because
    /// environment overrides arrive lower-cased.
    pub fn symbol(&self, symbol: &str) -> Option<&SymbolSettings> {
        self.symbols.get(symbol).or_else(|| {
            self.symbols
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(symbol))
                .map(|(_, settings)| settings)
        })
    }

    /// Checks values that deserialize fine but make no sense to the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.initial_balance.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "account.initial_balance must not be negative, got {}",
                self.account.initial_balance
            )));
        }
        if self.broker.subscription_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "broker.subscription_prefix must not be empty".to_string(),
            ));
        }
        for (symbol, settings) in &self.symbols {
            if settings.pricescale <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "symbols.{}.pricescale must be positive",
                    symbol
                )));
            }
        }
        Ok(())
    }
}

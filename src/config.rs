use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

/// Whether trades hit a live exchange or only the simulated ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    Live,
    #[serde(alias = "backtest")]
    Simulation,
}

impl TradeMode {
    pub fn is_live(self) -> bool {
        matches!(self, TradeMode::Live)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuySettings {
    /// RSI below this reading classifies a pair as hot (oversold).
    pub rsi_threshold: f64,
    /// Maximum volume of an asset that one trade may dispose of.
    /// Shared by both trade directions, keyed by the spent asset.
    #[serde(default)]
    pub trade_limits: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SellSettings {
    /// RSI above this reading classifies a pair as cold (overbought).
    pub rsi_threshold: f64,
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_open_order_max_hours() -> i64 {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub mode: TradeMode,
    pub buy: BuySettings,
    pub sell: SellSettings,
    /// Candle interval fed to the classifier.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Open orders older than this many hours are cancelled in live mode.
    #[serde(default = "default_open_order_max_hours")]
    pub open_order_max_hours: i64,
    /// Exchange ids the gateway is configured for.
    pub exchanges: Vec<String>,
    /// Base URL of the exchange gateway sidecar.
    pub gateway_url: String,
    /// Base URL of the market-data (OHLCV) gateway.
    pub candle_api_url: String,
    /// When set, holdings and transactions persist to Postgres;
    /// otherwise an in-memory store is used (simulation only).
    #[serde(default)]
    pub database_url: Option<String>,
}

impl BotConfig {
    /// Load from an optional `Rsibot.toml` next to the binary plus
    /// `RSIBOT_`-prefixed environment variables (`__` as separator,
    /// e.g. `RSIBOT_BUY__RSI_THRESHOLD=30`).
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Rsibot").required(false))
            .add_source(Environment::with_prefix("RSIBOT").separator("__"));

        let config: BotConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buy.rsi_threshold >= self.sell.rsi_threshold {
            return Err(ConfigError::Message(format!(
                "buy.rsi_threshold ({}) must be below sell.rsi_threshold ({})",
                self.buy.rsi_threshold, self.sell.rsi_threshold
            )));
        }
        if self.exchanges.is_empty() {
            return Err(ConfigError::Message(
                "at least one exchange must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Trade limit for the asset being disposed of, if configured.
    pub fn trade_limit(&self, symbol: &str) -> Option<f64> {
        self.buy.trade_limits.get(symbol).copied()
    }
}

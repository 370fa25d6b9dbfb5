use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by balance bookkeeping.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{field} balance for {exchange}/{symbol} would become negative ({result})")]
    NegativeBalance {
        exchange: String,
        symbol: String,
        field: &'static str,
        result: f64,
    },
    #[error("no holding found for {exchange}/{symbol}")]
    MissingHolding { exchange: String, symbol: String },
}

/// A cached account balance for one asset on one exchange.
///
/// `volume_total` is always derived, so `volume_total ==
/// volume_free + volume_used` holds by construction. The only mutation
/// path is [`Holding::apply`], which re-validates on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub exchange: String,
    pub symbol: String,
    pub volume_free: f64,
    pub volume_used: f64,
    pub volume_total: f64,
}

impl Holding {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        volume_free: f64,
        volume_used: f64,
    ) -> Result<Self, LedgerError> {
        let exchange = exchange.into();
        let symbol = symbol.into();

        if volume_free < 0.0 {
            return Err(LedgerError::NegativeBalance {
                exchange,
                symbol,
                field: "free",
                result: volume_free,
            });
        }
        if volume_used < 0.0 {
            return Err(LedgerError::NegativeBalance {
                exchange,
                symbol,
                field: "used",
                result: volume_used,
            });
        }

        Ok(Self {
            exchange,
            symbol,
            volume_free,
            volume_used,
            volume_total: volume_free + volume_used,
        })
    }

    /// Apply a signed balance delta, returning the updated holding.
    ///
    /// Rejects any delta that would take a balance below zero; the
    /// original holding is left untouched in that case.
    pub fn apply(&self, delta: &BalanceDelta) -> Result<Holding, LedgerError> {
        Holding::new(
            self.exchange.clone(),
            self.symbol.clone(),
            self.volume_free + delta.free,
            self.volume_used + delta.used,
        )
    }
}

/// Signed free/used adjustment applied to a [`Holding`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BalanceDelta {
    pub free: f64,
    pub used: f64,
}

impl BalanceDelta {
    /// Delta that adds `amount` to the free balance.
    pub fn credit_free(amount: f64) -> Self {
        Self {
            free: amount,
            used: 0.0,
        }
    }

    /// Delta that removes `amount` from the free balance.
    pub fn debit_free(amount: f64) -> Self {
        Self {
            free: -amount,
            used: 0.0,
        }
    }
}

/// Optional predicate for holdings reads.
#[derive(Debug, Clone, Default)]
pub struct HoldingFilter {
    pub exchange: Option<String>,
    pub symbol: Option<String>,
}

impl HoldingFilter {
    pub fn by_symbol(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            exchange: Some(exchange.into()),
            symbol: Some(symbol.into()),
        }
    }

    pub fn matches(&self, holding: &Holding) -> bool {
        self.exchange
            .as_deref()
            .map_or(true, |e| e == holding.exchange)
            && self.symbol.as_deref().map_or(true, |s| s == holding.symbol)
    }
}

/// A tradable base/quote pair, identified by its `"BASE/QUOTE"` symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPair {
    pub symbol: String,
    pub base: String,
    pub quote: String,
}

impl MarketPair {
    /// Parse a `"BASE/QUOTE"` composite symbol.
    pub fn parse(symbol: &str) -> crate::Result<Self> {
        match symbol.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                symbol: symbol.to_string(),
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(format!("invalid market pair symbol: {symbol:?}").into()),
        }
    }
}

/// Indicator series for one market pair, most recent value first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub values: Vec<f64>,
    pub is_hot: bool,
    pub is_cold: bool,
}

impl IndicatorResult {
    /// Most recent indicator reading.
    pub fn latest(&self) -> f64 {
        self.values[0]
    }
}

/// Direction of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    BuyBase,
    SellBase,
}

/// Immutable record of one executed trade decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub exchange: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub action: TradeAction,
    /// Unit price the trade was valued at (ask for buys, bid for sells).
    pub base_value: f64,
    /// Counter-asset amount moved by the trade.
    pub quote_value: f64,
    pub fee_rate: f64,
    pub base_volume: f64,
    pub quote_volume: f64,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        exchange: impl Into<String>,
        base_symbol: impl Into<String>,
        quote_symbol: impl Into<String>,
        action: TradeAction,
        base_value: f64,
        quote_value: f64,
        base_volume: f64,
        quote_volume: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            exchange: exchange.into(),
            base_symbol: base_symbol.into(),
            quote_symbol: quote_symbol.into(),
            action,
            base_value,
            quote_value,
            fee_rate: 0.0,
            base_volume,
            quote_volume,
            executed_at: Utc::now(),
        }
    }
}

/// An order the exchange reports as still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    pub exchange: String,
    pub symbol: String,
    pub placed_at: DateTime<Utc>,
}

/// OHLCV candlestick consumed by the indicator classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// Exchange-access collaborator seam
pub mod rest;

pub use rest::RestExchangeGateway;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::{MarketPair, OpenOrder};

/// Market pairs available for trading, keyed by exchange id.
pub type MarketIndex = HashMap<String, Vec<MarketPair>>;

/// Top-of-book snapshot; price levels are `[price, size]`, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub asks: Vec<[f64; 2]>,
    pub bids: Vec<[f64; 2]>,
}

impl OrderBook {
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|level| level[0])
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|level| level[0])
    }
}

/// Free/used/total account balances keyed by asset symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountBalances {
    pub free: HashMap<String, f64>,
    pub used: HashMap<String, f64>,
    pub total: HashMap<String, f64>,
}

impl AccountBalances {
    pub fn free_for(&self, symbol: &str) -> f64 {
        self.free.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn used_for(&self, symbol: &str) -> f64 {
        self.used.get(symbol).copied().unwrap_or(0.0)
    }
}

/// Access to exchange state: markets, orders, books and balances.
///
/// Every call is a single blocking request; retry policy, if any, is
/// the implementation's concern.
#[async_trait]
pub trait ExchangeInterface: Send + Sync {
    /// Exchange ids this interface is configured for.
    fn exchanges(&self) -> Vec<String>;

    /// Market metadata restricted to the given `"BASE/QUOTE"` symbols.
    async fn get_symbol_markets(&self, pairs: &[String]) -> crate::Result<MarketIndex>;

    /// Market metadata for every pair the exchanges list.
    async fn get_exchange_markets(&self) -> crate::Result<MarketIndex>;

    /// Currently open orders, keyed by exchange id.
    async fn get_open_orders(&self) -> crate::Result<HashMap<String, Vec<OpenOrder>>>;

    async fn cancel_order(&self, exchange: &str, order_id: &str) -> crate::Result<()>;

    async fn get_order_book(&self, pair: &str, exchange: &str) -> crate::Result<OrderBook>;

    /// Account balance snapshot for one exchange.
    async fn get_account_markets(&self, exchange: &str) -> crate::Result<AccountBalances>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_ask_and_bid() {
        let book = OrderBook {
            asks: vec![[0.05, 3.0], [0.06, 1.0]],
            bids: vec![[0.04, 2.0]],
        };

        assert_eq!(book.best_ask(), Some(0.05));
        assert_eq!(book.best_bid(), Some(0.04));
    }

    #[test]
    fn test_empty_book_sides() {
        let book = OrderBook::default();
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_missing_balance_reads_zero() {
        let balances = AccountBalances::default();
        assert_eq!(balances.free_for("BTC"), 0.0);
    }
}

#[cfg(test)]
pub(crate) mod testing;

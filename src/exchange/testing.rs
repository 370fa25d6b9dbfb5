//! Scripted exchange stub shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AccountBalances, ExchangeInterface, MarketIndex, OrderBook};
use crate::models::{MarketPair, OpenOrder};

#[derive(Default)]
pub(crate) struct StubExchange {
    exchanges: Vec<String>,
    markets: HashMap<String, Vec<String>>,
    balances: HashMap<String, AccountBalances>,
    books: HashMap<(String, String), OrderBook>,
    open_orders: HashMap<String, Vec<OpenOrder>>,
    failing_cancels: HashSet<String>,
    pub(crate) cancelled: Mutex<Vec<(String, String)>>,
    pub(crate) account_calls: AtomicUsize,
}

impl StubExchange {
    pub(crate) fn new(exchanges: &[&str]) -> Self {
        Self {
            exchanges: exchanges.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn with_market(mut self, exchange: &str, symbol: &str) -> Self {
        self.markets
            .entry(exchange.to_string())
            .or_default()
            .push(symbol.to_string());
        self
    }

    pub(crate) fn with_balance(
        mut self,
        exchange: &str,
        symbol: &str,
        free: f64,
        used: f64,
    ) -> Self {
        let balances = self.balances.entry(exchange.to_string()).or_default();
        balances.free.insert(symbol.to_string(), free);
        balances.used.insert(symbol.to_string(), used);
        balances.total.insert(symbol.to_string(), free + used);
        self
    }

    pub(crate) fn with_book(
        mut self,
        exchange: &str,
        pair: &str,
        asks: Vec<[f64; 2]>,
        bids: Vec<[f64; 2]>,
    ) -> Self {
        self.books
            .insert((exchange.to_string(), pair.to_string()), OrderBook { asks, bids });
        self
    }

    pub(crate) fn with_open_order(
        mut self,
        exchange: &str,
        id: &str,
        symbol: &str,
        placed_at: DateTime<Utc>,
    ) -> Self {
        self.open_orders
            .entry(exchange.to_string())
            .or_default()
            .push(OpenOrder {
                id: id.to_string(),
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
                placed_at,
            });
        self
    }

    pub(crate) fn with_failing_cancel(mut self, order_id: &str) -> Self {
        self.failing_cancels.insert(order_id.to_string());
        self
    }

    pub(crate) fn cancelled_ids(&self) -> Vec<String> {
        self.cancelled
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait]
impl ExchangeInterface for StubExchange {
    fn exchanges(&self) -> Vec<String> {
        self.exchanges.clone()
    }

    async fn get_symbol_markets(&self, pairs: &[String]) -> crate::Result<MarketIndex> {
        let mut index = MarketIndex::new();
        for exchange in &self.exchanges {
            let listed = self.markets.get(exchange).cloned().unwrap_or_default();
            let mut parsed = Vec::new();
            for symbol in listed {
                if pairs.contains(&symbol) {
                    parsed.push(MarketPair::parse(&symbol)?);
                }
            }
            index.insert(exchange.clone(), parsed);
        }
        Ok(index)
    }

    async fn get_exchange_markets(&self) -> crate::Result<MarketIndex> {
        let mut index = MarketIndex::new();
        for exchange in &self.exchanges {
            let listed = self.markets.get(exchange).cloned().unwrap_or_default();
            let parsed = listed
                .iter()
                .map(|s| MarketPair::parse(s))
                .collect::<crate::Result<Vec<_>>>()?;
            index.insert(exchange.clone(), parsed);
        }
        Ok(index)
    }

    async fn get_open_orders(&self) -> crate::Result<HashMap<String, Vec<OpenOrder>>> {
        Ok(self.open_orders.clone())
    }

    async fn cancel_order(&self, exchange: &str, order_id: &str) -> crate::Result<()> {
        if self.failing_cancels.contains(order_id) {
            return Err(format!("exchange rejected cancel of {order_id}").into());
        }
        self.cancelled
            .lock()
            .unwrap()
            .push((exchange.to_string(), order_id.to_string()));
        Ok(())
    }

    async fn get_order_book(&self, pair: &str, exchange: &str) -> crate::Result<OrderBook> {
        Ok(self
            .books
            .get(&(exchange.to_string(), pair.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_account_markets(&self, exchange: &str) -> crate::Result<AccountBalances> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        self.balances
            .get(exchange)
            .cloned()
            .ok_or_else(|| format!("unknown exchange: {exchange}").into())
    }
}

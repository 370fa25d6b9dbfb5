use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::{AccountBalances, ExchangeInterface, MarketIndex, OrderBook};
use crate::models::{MarketPair, OpenOrder};

/// REST client for a ccxt-style exchange gateway sidecar.
///
/// The gateway multiplexes one or more exchange accounts behind a plain
/// HTTP surface; which exchanges exist is configuration, not discovery.
/// No exchange-specific semantics live here.
#[derive(Clone)]
pub struct RestExchangeGateway {
    client: Client,
    base_url: String,
    exchanges: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrderBookResponse {
    #[serde(default)]
    asks: Vec<[f64; 2]>,
    #[serde(default)]
    bids: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    free: HashMap<String, f64>,
    #[serde(default)]
    used: HashMap<String, f64>,
    #[serde(default)]
    total: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct OpenOrderResponse {
    id: String,
    symbol: String,
    /// Milliseconds since the epoch, as ccxt reports order timestamps.
    timestamp: i64,
}

impl RestExchangeGateway {
    pub fn new(base_url: impl Into<String>, exchanges: Vec<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            exchanges,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> crate::Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("gateway error ({status}): {body}").into());
        }
        Ok(response.json().await?)
    }

    /// Pair symbols one exchange lists, e.g. `["ETH/BTC", "XRP/BTC"]`.
    async fn list_markets(&self, exchange: &str) -> crate::Result<Vec<String>> {
        let url = format!("{}/markets?exchange={exchange}", self.base_url);
        self.get_json(&url).await
    }

    async fn market_index(&self, restrict_to: Option<&[String]>) -> crate::Result<MarketIndex> {
        let wanted: Option<HashSet<&str>> =
            restrict_to.map(|pairs| pairs.iter().map(String::as_str).collect());

        let mut index = MarketIndex::new();
        for exchange in &self.exchanges {
            let mut pairs = Vec::new();
            for symbol in self.list_markets(exchange).await? {
                if let Some(wanted) = &wanted {
                    if !wanted.contains(symbol.as_str()) {
                        continue;
                    }
                }
                pairs.push(MarketPair::parse(&symbol)?);
            }
            index.insert(exchange.clone(), pairs);
        }

        Ok(index)
    }
}

#[async_trait]
impl ExchangeInterface for RestExchangeGateway {
    fn exchanges(&self) -> Vec<String> {
        self.exchanges.clone()
    }

    async fn get_symbol_markets(&self, pairs: &[String]) -> crate::Result<MarketIndex> {
        self.market_index(Some(pairs)).await
    }

    async fn get_exchange_markets(&self) -> crate::Result<MarketIndex> {
        self.market_index(None).await
    }

    async fn get_open_orders(&self) -> crate::Result<HashMap<String, Vec<OpenOrder>>> {
        let mut all = HashMap::new();

        for exchange in &self.exchanges {
            let url = format!("{}/orders/open?exchange={exchange}", self.base_url);
            let rows: Vec<OpenOrderResponse> = self.get_json(&url).await?;

            let mut orders = Vec::with_capacity(rows.len());
            for row in rows {
                let placed_at = Utc
                    .timestamp_millis_opt(row.timestamp)
                    .single()
                    .ok_or_else(|| {
                        anyhow::anyhow!("invalid order timestamp {} on {exchange}", row.timestamp)
                    })?;
                orders.push(OpenOrder {
                    id: row.id,
                    exchange: exchange.clone(),
                    symbol: row.symbol,
                    placed_at,
                });
            }
            all.insert(exchange.clone(), orders);
        }

        Ok(all)
    }

    async fn cancel_order(&self, exchange: &str, order_id: &str) -> crate::Result<()> {
        let url = format!(
            "{}/orders/{order_id}?exchange={exchange}",
            self.base_url
        );
        let response = self.client.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("cancel failed ({status}): {body}").into());
        }

        tracing::info!("Cancelled order {} on {}", order_id, exchange);
        Ok(())
    }

    async fn get_order_book(&self, pair: &str, exchange: &str) -> crate::Result<OrderBook> {
        let url = format!(
            "{}/order-book?exchange={exchange}&symbol={}",
            self.base_url,
            pair.replace('/', "%2F")
        );
        let book: OrderBookResponse = self.get_json(&url).await?;

        Ok(OrderBook {
            asks: book.asks,
            bids: book.bids,
        })
    }

    async fn get_account_markets(&self, exchange: &str) -> crate::Result<AccountBalances> {
        let url = format!("{}/balances?exchange={exchange}", self.base_url);
        let balances: BalancesResponse = self.get_json(&url).await?;

        Ok(AccountBalances {
            free: balances.free,
            used: balances.used,
            total: balances.total,
        })
    }
}

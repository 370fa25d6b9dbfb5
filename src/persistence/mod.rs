use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::models::{Holding, HoldingFilter, LedgerError, Transaction};

/// Durable storage for holdings and transaction records.
///
/// `record_trade` is the commit point for a trade: every mutated
/// holding plus the transaction row land together. The default
/// implementation composes the granular calls; stores with real
/// transactions should override it.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    async fn read_holdings(&self, filter: Option<&HoldingFilter>) -> crate::Result<Vec<Holding>>;

    async fn create_holding(&self, holding: &Holding) -> crate::Result<()>;

    async fn update_holding(&self, holding: &Holding) -> crate::Result<()>;

    async fn create_transaction(&self, transaction: &Transaction) -> crate::Result<()>;

    async fn record_trade(
        &self,
        holdings: &[Holding],
        transaction: &Transaction,
    ) -> crate::Result<()> {
        for holding in holdings {
            let filter = HoldingFilter::by_symbol(&holding.exchange, &holding.symbol);
            if self.read_holdings(Some(&filter)).await?.is_empty() {
                self.create_holding(holding).await?;
            } else {
                self.update_holding(holding).await?;
            }
        }
        self.create_transaction(transaction).await
    }
}

/// In-memory store used in simulation mode and tests.
///
/// Keyed by `(exchange, symbol)`; iteration order is deterministic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    holdings: BTreeMap<(String, String), Holding>,
    transactions: Vec<Transaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transactions recorded so far, oldest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock().await.transactions.clone()
    }
}

#[async_trait]
impl HoldingsStore for MemoryStore {
    async fn read_holdings(&self, filter: Option<&HoldingFilter>) -> crate::Result<Vec<Holding>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .holdings
            .values()
            .filter(|h| filter.map_or(true, |f| f.matches(h)))
            .cloned()
            .collect())
    }

    async fn create_holding(&self, holding: &Holding) -> crate::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.holdings.insert(
            (holding.exchange.clone(), holding.symbol.clone()),
            holding.clone(),
        );
        Ok(())
    }

    async fn update_holding(&self, holding: &Holding) -> crate::Result<()> {
        let mut inner = self.inner.lock().await;
        let key = (holding.exchange.clone(), holding.symbol.clone());
        match inner.holdings.get_mut(&key) {
            Some(existing) => {
                *existing = holding.clone();
                Ok(())
            }
            None => Err(LedgerError::MissingHolding {
                exchange: holding.exchange.clone(),
                symbol: holding.symbol.clone(),
            }
            .into()),
        }
    }

    async fn create_transaction(&self, transaction: &Transaction) -> crate::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.transactions.push(transaction.clone());
        tracing::debug!(
            "Recorded {:?} transaction for {}/{} on {}",
            transaction.action,
            transaction.base_symbol,
            transaction.quote_symbol,
            transaction.exchange
        );
        Ok(())
    }

    async fn record_trade(
        &self,
        holdings: &[Holding],
        transaction: &Transaction,
    ) -> crate::Result<()> {
        // one lock for the whole commit
        let mut inner = self.inner.lock().await;
        for holding in holdings {
            inner.holdings.insert(
                (holding.exchange.clone(), holding.symbol.clone()),
                holding.clone(),
            );
        }
        inner.transactions.push(transaction.clone());
        Ok(())
    }
}

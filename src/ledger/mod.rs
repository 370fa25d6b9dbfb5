// Holdings ledger: the single source of truth for balances during a cycle
pub mod reconciler;

pub use reconciler::{reconcile, ReconcileOutcome};

use std::sync::Arc;

use crate::models::{BalanceDelta, Holding, HoldingFilter, Transaction};
use crate::persistence::HoldingsStore;

/// Balance ledger backed by a [`HoldingsStore`].
///
/// Reads always go through the store, so callers observe every prior
/// mutation; trade mutations are expressed as deltas and committed in
/// one store call, never by mutating a previously read row.
pub struct HoldingsLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for HoldingsLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: HoldingsStore> HoldingsLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every holding currently on the ledger.
    pub async fn holdings(&self) -> crate::Result<Vec<Holding>> {
        self.store.read_holdings(None).await
    }

    /// Fresh read of one holding, if it exists.
    pub async fn holding(&self, exchange: &str, symbol: &str) -> crate::Result<Option<Holding>> {
        let filter = HoldingFilter::by_symbol(exchange, symbol);
        Ok(self
            .store
            .read_holdings(Some(&filter))
            .await?
            .into_iter()
            .next())
    }

    pub async fn is_empty(&self) -> crate::Result<bool> {
        Ok(self.holdings().await?.is_empty())
    }

    /// Add a newly observed holding row (bootstrap path).
    pub async fn insert(&self, holding: Holding) -> crate::Result<()> {
        self.store.create_holding(&holding).await
    }

    /// Replace an existing holding row with external truth (sync path).
    pub async fn overwrite(&self, holding: Holding) -> crate::Result<()> {
        self.store.update_holding(&holding).await
    }

    /// Append a transaction without touching balances (live order
    /// routing owns the real balance change).
    pub async fn record_transaction(&self, transaction: &Transaction) -> crate::Result<()> {
        self.store.create_transaction(transaction).await
    }

    /// Apply every leg of a trade and record its transaction as one
    /// commit. All legs are validated against current balances before
    /// anything is written; on any validation failure nothing changes.
    ///
    /// A leg for a symbol with no existing row creates that row, which
    /// requires a pure credit (`used` starts at zero).
    pub async fn apply_trade(
        &self,
        exchange: &str,
        legs: &[(&str, BalanceDelta)],
        transaction: &Transaction,
    ) -> crate::Result<Vec<Holding>> {
        let mut updated = Vec::with_capacity(legs.len());

        for (symbol, delta) in legs {
            let next = match self.holding(exchange, symbol).await? {
                Some(current) => current.apply(delta)?,
                None => Holding::new(exchange, *symbol, delta.free, delta.used)?,
            };
            updated.push(next);
        }

        self.store.record_trade(&updated, transaction).await?;

        Ok(updated)
    }
}

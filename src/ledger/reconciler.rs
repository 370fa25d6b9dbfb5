use std::collections::HashMap;

use super::HoldingsLedger;
use crate::config::TradeMode;
use crate::exchange::{AccountBalances, ExchangeInterface};
use crate::models::Holding;
use crate::persistence::HoldingsStore;

/// What the reconciliation pass did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Empty ledger populated from exchange account state.
    Bootstrapped { created: usize },
    /// Live mode: every row overwritten from exchange account state.
    Synced { updated: usize },
    /// Simulation mode with a populated ledger: left alone.
    Unchanged,
}

/// Bring the ledger to its authoritative state for this cycle.
///
/// An empty ledger is bootstrapped from account balances regardless of
/// mode. A populated ledger is refreshed from the exchanges only in
/// live mode; in simulation the ledger itself is the record of reality
/// and must not be clobbered by live account data.
pub async fn reconcile<S: HoldingsStore>(
    ledger: &HoldingsLedger<S>,
    exchange_interface: &dyn ExchangeInterface,
    mode: TradeMode,
) -> crate::Result<ReconcileOutcome> {
    let holdings = ledger.holdings().await?;

    if holdings.is_empty() {
        let mut created = 0;

        for exchange in exchange_interface.exchanges() {
            let account = exchange_interface.get_account_markets(&exchange).await?;

            let mut symbols: Vec<&String> = account.free.keys().collect();
            symbols.sort();

            for symbol in symbols {
                let holding = Holding::new(
                    exchange.clone(),
                    symbol.clone(),
                    account.free_for(symbol),
                    account.used_for(symbol),
                )?;
                ledger.insert(holding).await?;
                created += 1;
            }
        }

        tracing::info!("Bootstrapped holdings ledger with {} rows", created);
        return Ok(ReconcileOutcome::Bootstrapped { created });
    }

    if !mode.is_live() {
        return Ok(ReconcileOutcome::Unchanged);
    }

    // Live refresh: fetch each exchange's snapshot at most once even
    // though several symbols are updated from it.
    let mut snapshots: HashMap<String, AccountBalances> = HashMap::new();
    let mut updated = 0;

    for holding in holdings {
        if !snapshots.contains_key(&holding.exchange) {
            let account = exchange_interface
                .get_account_markets(&holding.exchange)
                .await?;
            snapshots.insert(holding.exchange.clone(), account);
        }
        let account = &snapshots[&holding.exchange];

        let refreshed = Holding::new(
            holding.exchange.clone(),
            holding.symbol.clone(),
            account.free_for(&holding.symbol),
            account.used_for(&holding.symbol),
        )?;
        ledger.overwrite(refreshed).await?;
        updated += 1;
    }

    tracing::info!("Synced {} holdings from exchange account state", updated);
    Ok(ReconcileOutcome::Synced { updated })
}

use std::sync::Arc;

use crate::analysis::{classify_markets, ClassificationReport, MarketAnalyzer};
use crate::config::BotConfig;
use crate::exchange::ExchangeInterface;
use crate::execution::decision::{decide, ranked_pairs, Decision};
use crate::execution::janitor::{sweep_stale_orders, JanitorReport};
use crate::execution::trader::TradeExecutor;
use crate::ledger::{reconcile, HoldingsLedger, ReconcileOutcome};
use crate::models::{MarketPair, Transaction};
use crate::persistence::HoldingsStore;

/// Everything one cycle did, for logging and inspection.
#[derive(Debug)]
pub struct CycleReport {
    pub classification: ClassificationReport,
    pub janitor: JanitorReport,
    pub reconcile: ReconcileOutcome,
    pub transactions: Vec<Transaction>,
}

/// One full decision-and-reconciliation cycle.
///
/// Classification fans out first; everything after it runs strictly in
/// sequence because each trade changes the balances the next decision
/// must see.
pub struct TradingCycle<S> {
    config: BotConfig,
    exchange_interface: Arc<dyn ExchangeInterface>,
    analyzer: Arc<dyn MarketAnalyzer>,
    ledger: HoldingsLedger<S>,
}

impl<S: HoldingsStore> TradingCycle<S> {
    pub fn new(
        config: BotConfig,
        exchange_interface: Arc<dyn ExchangeInterface>,
        analyzer: Arc<dyn MarketAnalyzer>,
        ledger: HoldingsLedger<S>,
    ) -> Self {
        Self {
            config,
            exchange_interface,
            analyzer,
            ledger,
        }
    }

    /// Run one cycle over the given pairs, or over every pair the
    /// exchanges list when `market_pairs` is empty.
    pub async fn run(&self, market_pairs: &[String]) -> crate::Result<CycleReport> {
        let markets = if market_pairs.is_empty() {
            self.exchange_interface.get_exchange_markets().await?
        } else {
            self.exchange_interface.get_symbol_markets(market_pairs).await?
        };

        let classification =
            classify_markets(self.analyzer.clone(), &markets, &self.config.interval).await?;
        tracing::info!(
            "Classified {} pairs ({} skipped)",
            classification.classified_count(),
            classification.skipped.len()
        );

        let janitor = sweep_stale_orders(
            self.exchange_interface.as_ref(),
            self.config.mode,
            self.config.open_order_max_hours,
        )
        .await?;

        let reconcile_outcome = reconcile(
            &self.ledger,
            self.exchange_interface.as_ref(),
            self.config.mode,
        )
        .await?;

        let trader = TradeExecutor::new(
            self.exchange_interface.as_ref(),
            &self.ledger,
            &self.config,
        );
        let mut transactions = Vec::new();

        let mut exchanges: Vec<&String> = classification.classified.keys().collect();
        exchanges.sort();

        for exchange in exchanges {
            let classified = &classification.classified[exchange];

            for symbol in ranked_pairs(classified) {
                let result = &classified[symbol];
                let pair = MarketPair::parse(symbol)?;

                // fresh reads: earlier trades in this cycle may have
                // moved this exchange's balances
                let base = self.ledger.holding(exchange, &pair.base).await?;
                let quote = self.ledger.holding(exchange, &pair.quote).await?;

                match decide(result, base.as_ref(), quote.as_ref()) {
                    Decision::Buy => {
                        tracing::debug!("{} is hot at {}", symbol, result.latest());
                        if let Some(tx) = trader.buy(&pair, exchange).await? {
                            transactions.push(tx);
                        }
                    }
                    Decision::Sell => {
                        tracing::debug!("{} is cold at {}", symbol, result.latest());
                        if let Some(tx) = trader.sell(&pair, exchange).await? {
                            transactions.push(tx);
                        }
                    }
                    Decision::Hold => {}
                }
            }
        }

        tracing::info!("Cycle complete: {} transactions", transactions.len());

        Ok(CycleReport {
            classification,
            janitor,
            reconcile: reconcile_outcome,
            transactions,
        })
    }
}

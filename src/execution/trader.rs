use crate::config::BotConfig;
use crate::exchange::ExchangeInterface;
use crate::ledger::HoldingsLedger;
use crate::models::{BalanceDelta, MarketPair, TradeAction, Transaction};
use crate::persistence::HoldingsStore;

/// Executes buy/sell decisions against top-of-book prices.
///
/// In simulation mode both balance legs and the transaction record
/// commit through the ledger in one step; in live mode order routing
/// is an integration point and only the transaction is recorded.
pub struct TradeExecutor<'a, S> {
    exchange_interface: &'a dyn ExchangeInterface,
    ledger: &'a HoldingsLedger<S>,
    config: &'a BotConfig,
}

impl<'a, S: HoldingsStore> TradeExecutor<'a, S> {
    pub fn new(
        exchange_interface: &'a dyn ExchangeInterface,
        ledger: &'a HoldingsLedger<S>,
        config: &'a BotConfig,
    ) -> Self {
        Self {
            exchange_interface,
            ledger,
            config,
        }
    }

    /// Buy the base asset with the quote asset's free balance, capped
    /// at the quote asset's trade limit. Returns `None` without any
    /// state change when the book has no asks.
    pub async fn buy(
        &self,
        pair: &MarketPair,
        exchange: &str,
    ) -> crate::Result<Option<Transaction>> {
        let book = self
            .exchange_interface
            .get_order_book(&pair.symbol, exchange)
            .await?;

        let Some(ask) = book.best_ask() else {
            tracing::debug!("No asks for {} on {}, skipping buy", pair.symbol, exchange);
            return Ok(None);
        };

        let quote_free = self
            .ledger
            .holding(exchange, &pair.quote)
            .await?
            .map_or(0.0, |h| h.volume_free);

        let mut spendable = quote_free;
        if let Some(limit) = self.config.trade_limit(&pair.quote) {
            if spendable > limit {
                spendable = limit;
            }
        }

        let base_volume = spendable / ask;

        let transaction = Transaction::new(
            exchange,
            &pair.base,
            &pair.quote,
            TradeAction::BuyBase,
            ask,
            spendable,
            base_volume,
            spendable,
        );

        if self.config.mode.is_live() {
            // Live order routing is an integration point; only the
            // decision record is kept.
            tracing::warn!(
                "Live order placement for {} on {} not implemented, recording decision only",
                pair.symbol,
                exchange
            );
            self.ledger.record_transaction(&transaction).await?;
        } else {
            self.ledger
                .apply_trade(
                    exchange,
                    &[
                        (pair.base.as_str(), BalanceDelta::credit_free(base_volume)),
                        (pair.quote.as_str(), BalanceDelta::debit_free(spendable)),
                    ],
                    &transaction,
                )
                .await?;
        }

        tracing::info!(
            "Bought {:.8} {} for {:.8} {} at {} on {}",
            base_volume,
            pair.base,
            spendable,
            pair.quote,
            ask,
            exchange
        );

        Ok(Some(transaction))
    }

    /// Sell the base asset's free balance, capped at the base asset's
    /// trade limit, for the quote asset. Returns `None` without any
    /// state change when the book has no bids.
    pub async fn sell(
        &self,
        pair: &MarketPair,
        exchange: &str,
    ) -> crate::Result<Option<Transaction>> {
        let book = self
            .exchange_interface
            .get_order_book(&pair.symbol, exchange)
            .await?;

        let Some(bid) = book.best_bid() else {
            tracing::debug!("No bids for {} on {}, skipping sell", pair.symbol, exchange);
            return Ok(None);
        };

        let base_free = self
            .ledger
            .holding(exchange, &pair.base)
            .await?
            .map_or(0.0, |h| h.volume_free);

        let mut base_sold = base_free;
        if let Some(limit) = self.config.trade_limit(&pair.base) {
            if base_sold > limit {
                base_sold = limit;
            }
        }

        let quote_volume = base_sold * bid;

        let transaction = Transaction::new(
            exchange,
            &pair.base,
            &pair.quote,
            TradeAction::SellBase,
            bid,
            quote_volume,
            base_sold,
            quote_volume,
        );

        if self.config.mode.is_live() {
            tracing::warn!(
                "Live order placement for {} on {} not implemented, recording decision only",
                pair.symbol,
                exchange
            );
            self.ledger.record_transaction(&transaction).await?;
        } else {
            self.ledger
                .apply_trade(
                    exchange,
                    &[
                        (pair.base.as_str(), BalanceDelta::debit_free(base_sold)),
                        (pair.quote.as_str(), BalanceDelta::credit_free(quote_volume)),
                    ],
                    &transaction,
                )
                .await?;
        }

        tracing::info!(
            "Sold {:.8} {} for {:.8} {} at {} on {}",
            base_sold,
            pair.base,
            quote_volume,
            pair.quote,
            bid,
            exchange
        );

        Ok(Some(transaction))
    }
}

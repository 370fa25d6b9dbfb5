use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::api::{ApiError, CandleSource};
use crate::exchange::MarketIndex;
use crate::indicators::rsi_series;
use crate::models::IndicatorResult;

/// Why a pair could not be classified this cycle.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("market data error: {0}")]
    Api(String),
    #[error("insufficient history: need {needed} closes, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

impl From<ApiError> for AnalysisError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => AnalysisError::Network(msg),
            other => AnalysisError::Api(other.to_string()),
        }
    }
}

/// Classifies one market pair from its price history.
#[async_trait]
pub trait MarketAnalyzer: Send + Sync {
    async fn classify(
        &self,
        symbol: &str,
        exchange: &str,
        interval: &str,
    ) -> Result<IndicatorResult, AnalysisError>;
}

/// RSI classifier: hot below the buy threshold (oversold), cold above
/// the sell threshold (overbought).
pub struct RsiAnalyzer<C> {
    source: C,
    period: usize,
    hot_thresh: f64,
    cold_thresh: f64,
}

impl<C> RsiAnalyzer<C> {
    pub const DEFAULT_PERIOD: usize = 14;

    pub fn new(source: C, hot_thresh: f64, cold_thresh: f64) -> Self {
        Self {
            source,
            period: Self::DEFAULT_PERIOD,
            hot_thresh,
            cold_thresh,
        }
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }
}

#[async_trait]
impl<C: CandleSource> MarketAnalyzer for RsiAnalyzer<C> {
    async fn classify(
        &self,
        symbol: &str,
        exchange: &str,
        interval: &str,
    ) -> Result<IndicatorResult, AnalysisError> {
        let candles = self.source.fetch_ohlcv(symbol, exchange, interval).await?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let values = rsi_series(&closes, self.period);
        if values.is_empty() {
            return Err(AnalysisError::InsufficientData {
                needed: self.period + 1,
                got: closes.len(),
            });
        }

        let latest = values[0];
        Ok(IndicatorResult {
            is_hot: latest < self.hot_thresh,
            is_cold: latest > self.cold_thresh,
            values,
        })
    }
}

/// A pair dropped from the cycle, with the reason it was dropped.
#[derive(Debug)]
pub struct SkippedPair {
    pub exchange: String,
    pub symbol: String,
    pub reason: AnalysisError,
}

/// Per-cycle classification outcome: results per exchange and pair,
/// plus every pair that had to be skipped.
#[derive(Debug, Default)]
pub struct ClassificationReport {
    pub classified: HashMap<String, HashMap<String, IndicatorResult>>,
    pub skipped: Vec<SkippedPair>,
}

impl ClassificationReport {
    pub fn classified_count(&self) -> usize {
        self.classified.values().map(HashMap::len).sum()
    }
}

/// Classify every pair in the index. Pairs are independent, so the
/// fan-out runs concurrently; a failed pair is recorded and skipped
/// rather than aborting the cycle.
pub async fn classify_markets(
    analyzer: Arc<dyn MarketAnalyzer>,
    markets: &MarketIndex,
    interval: &str,
) -> crate::Result<ClassificationReport> {
    let mut tasks = JoinSet::new();

    for (exchange, pairs) in markets {
        for pair in pairs {
            let analyzer = analyzer.clone();
            let exchange = exchange.clone();
            let symbol = pair.symbol.clone();
            let interval = interval.to_string();

            tasks.spawn(async move {
                let result = analyzer.classify(&symbol, &exchange, &interval).await;
                (exchange, symbol, result)
            });
        }
    }

    let mut report = ClassificationReport::default();
    while let Some(joined) = tasks.join_next().await {
        let (exchange, symbol, result) = joined?;
        match result {
            Ok(indicator) => {
                report
                    .classified
                    .entry(exchange)
                    .or_default()
                    .insert(symbol, indicator);
            }
            Err(reason) => {
                tracing::warn!(
                    "Skipping {} on {} this cycle: {}",
                    symbol,
                    exchange,
                    reason
                );
                report.skipped.push(SkippedPair {
                    exchange,
                    symbol,
                    reason,
                });
            }
        }
    }

    Ok(report)
}

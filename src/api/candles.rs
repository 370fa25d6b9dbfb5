use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Candle;

const RATE_LIMIT_RPM: u32 = 60;
const MAX_RETRIES: u32 = 3;

// Type alias for the rate limiter to simplify signatures
type GatewayRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Failures talking to the market-data gateway.
///
/// `Network` marks transport-level problems the caller may treat as
/// transient; everything else is a hard failure for the request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("gateway error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Source of historical OHLCV data for one market pair.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        exchange: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, ApiError>;
}

/// REST client for a market-data gateway exposing ccxt-style OHLCV rows
/// (`[[timestamp_ms, open, high, low, close, volume], …]`).
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct CandleRestClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<GatewayRateLimiter>,
}

impl CandleRestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Make a rate-limited request with retry on 429/5xx/transport errors.
    async fn make_request(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if (status.as_u16() == 429 || status.is_server_error())
                        && attempt < MAX_RETRIES
                    {
                        let backoff_secs = 2u64.pow(attempt);
                        tracing::warn!(
                            "Gateway returned {}, retrying in {}s (attempt {}/{})",
                            status,
                            backoff_secs,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        continue;
                    }

                    // Remaining 4xx and exhausted retries - surface the status
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff_secs = 2u64.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {}s (attempt {}/{})",
                        e,
                        backoff_secs,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => return Err(ApiError::Network(e.to_string())),
            }
        }

        Err(ApiError::Network(format!(
            "failed after {MAX_RETRIES} retries"
        )))
    }

    fn parse_rows(rows: Vec<[f64; 6]>) -> Result<Vec<Candle>, ApiError> {
        rows.into_iter()
            .map(|[ts, open, high, low, close, volume]| {
                let timestamp = Utc
                    .timestamp_millis_opt(ts as i64)
                    .single()
                    .ok_or_else(|| ApiError::Decode(format!("invalid timestamp: {ts}")))?;
                Ok(Candle {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CandleSource for CandleRestClient {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        exchange: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, ApiError> {
        let url = format!(
            "{}/ohlcv?exchange={}&symbol={}&interval={}",
            self.base_url,
            exchange,
            urlencode(symbol),
            interval
        );

        let response = self.make_request(&url).await?;
        let rows: Vec<[f64; 6]> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        tracing::debug!(
            "Fetched {} {} candles for {} on {}",
            rows.len(),
            interval,
            symbol,
            exchange
        );

        Self::parse_rows(rows)
    }
}

/// Percent-encode the pair separator; gateway symbols are `BASE/QUOTE`.
fn urlencode(symbol: &str) -> String {
    symbol.replace('/', "%2F")
}

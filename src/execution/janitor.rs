use chrono::{Duration, Utc};

use crate::config::TradeMode;
use crate::exchange::ExchangeInterface;
use crate::models::OpenOrder;

/// A cancel attempt the exchange rejected; the sweep carries on.
#[derive(Debug)]
pub struct CancelFailure {
    pub exchange: String,
    pub order_id: String,
    pub error: String,
}

/// Outcome of one stale-order sweep.
#[derive(Debug, Default)]
pub struct JanitorReport {
    pub cancelled: Vec<OpenOrder>,
    pub failures: Vec<CancelFailure>,
}

/// Cancel every open order older than `max_open_hours`.
///
/// Runs only in live mode; a simulated session places no real orders,
/// so there is nothing to cancel. Listing failures are fatal, cancel
/// failures are reported per order and do not stop the sweep.
pub async fn sweep_stale_orders(
    exchange_interface: &dyn ExchangeInterface,
    mode: TradeMode,
    max_open_hours: i64,
) -> crate::Result<JanitorReport> {
    let mut report = JanitorReport::default();

    if !mode.is_live() {
        return Ok(report);
    }

    let open_orders = exchange_interface.get_open_orders().await?;
    let cutoff = Utc::now() - Duration::hours(max_open_hours);

    let mut exchanges: Vec<&String> = open_orders.keys().collect();
    exchanges.sort();

    for exchange in exchanges {
        for order in &open_orders[exchange] {
            if order.placed_at >= cutoff {
                continue;
            }

            match exchange_interface.cancel_order(exchange, &order.id).await {
                Ok(()) => {
                    tracing::info!(
                        "Cancelled stale order {} ({}) on {}, open since {}",
                        order.id,
                        order.symbol,
                        exchange,
                        order.placed_at
                    );
                    report.cancelled.push(order.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to cancel stale order {} on {}: {}",
                        order.id,
                        exchange,
                        e
                    );
                    report.failures.push(CancelFailure {
                        exchange: exchange.clone(),
                        order_id: order.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    Ok(report)
}

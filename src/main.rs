use clap::Parser;
use std::sync::Arc;
use tokio::time::{interval, Duration};

use rsibot::analysis::RsiAnalyzer;
use rsibot::api::CandleRestClient;
use rsibot::config::BotConfig;
use rsibot::db::PostgresStore;
use rsibot::exchange::RestExchangeGateway;
use rsibot::execution::{CycleReport, TradingCycle};
use rsibot::ledger::HoldingsLedger;
use rsibot::persistence::{HoldingsStore, MemoryStore};
use rsibot::Result;

#[derive(Parser)]
#[command(name = "rsibot", about = "RSI-driven trading decision cycle")]
struct Cli {
    /// Market pairs to trade (comma separated, e.g. ETH/BTC,XRP/BTC).
    /// When omitted, every pair the exchanges list is considered.
    #[arg(long, value_delimiter = ',')]
    pairs: Vec<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Minutes between cycles
    #[arg(long, default_value_t = 60)]
    every_minutes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = BotConfig::load()?;

    tracing::info!(
        "rsibot starting in {:?} mode on {:?}",
        config.mode,
        config.exchanges
    );

    match config.database_url.clone() {
        Some(database_url) => {
            let store = Arc::new(PostgresStore::new(&database_url).await?);
            run(cli, config, store).await
        }
        None => {
            if config.mode.is_live() {
                tracing::warn!(
                    "Live mode without database_url: holdings will not survive a restart"
                );
            }
            let store = Arc::new(MemoryStore::new());
            run(cli, config, store).await
        }
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "rsibot=info".to_string()))
        .init();
}

async fn run<S: HoldingsStore + 'static>(
    cli: Cli,
    config: BotConfig,
    store: Arc<S>,
) -> Result<()> {
    let gateway = Arc::new(RestExchangeGateway::new(
        config.gateway_url.clone(),
        config.exchanges.clone(),
    )?);
    let candle_client = CandleRestClient::new(config.candle_api_url.clone())?;
    let analyzer = Arc::new(RsiAnalyzer::new(
        candle_client,
        config.buy.rsi_threshold,
        config.sell.rsi_threshold,
    ));
    let ledger = HoldingsLedger::new(store);

    let cycle = TradingCycle::new(config, gateway, analyzer, ledger);

    if cli.once {
        let report = cycle.run(&cli.pairs).await?;
        log_report(&report);
        return Ok(());
    }

    let mut ticker = interval(Duration::from_secs(cli.every_minutes * 60));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {
                match cycle.run(&cli.pairs).await {
                    Ok(report) => log_report(&report),
                    Err(e) => tracing::error!("Cycle failed: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn log_report(report: &CycleReport) {
    tracing::info!(
        "Cycle report: {} classified, {} skipped, {} orders cancelled ({} cancel failures), {} transactions, reconcile: {:?}",
        report.classification.classified_count(),
        report.classification.skipped.len(),
        report.janitor.cancelled.len(),
        report.janitor.failures.len(),
        report.transactions.len(),
        report.reconcile
    );

    for skipped in &report.classification.skipped {
        tracing::warn!(
            "  skipped {} on {}: {}",
            skipped.symbol,
            skipped.exchange,
            skipped.reason
        );
    }

    for tx in &report.transactions {
        tracing::info!(
            "  {:?} {}/{} on {}: {} {} at {}",
            tx.action,
            tx.base_symbol,
            tx.quote_symbol,
            tx.exchange,
            tx.base_volume,
            tx.base_symbol,
            tx.base_value
        );
    }
}

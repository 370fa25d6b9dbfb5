use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::models::{Holding, HoldingFilter, LedgerError, TradeAction, Transaction};
use crate::persistence::HoldingsStore;
use crate::Result;

/// Postgres-backed holdings and transaction store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to Postgres and run pending migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to Postgres at {}", database_url);

        Ok(Self { pool })
    }

    fn action_str(action: TradeAction) -> &'static str {
        match action {
            TradeAction::BuyBase => "buy_base",
            TradeAction::SellBase => "sell_base",
        }
    }

    fn row_to_holding(row: &sqlx::postgres::PgRow) -> Result<Holding> {
        let exchange: String = row.get("exchange");
        let symbol: String = row.get("symbol");
        let volume_free: rust_decimal::Decimal = row.get("volume_free");
        let volume_used: rust_decimal::Decimal = row.get("volume_used");

        Ok(Holding::new(
            exchange,
            symbol,
            volume_free.to_string().parse()?,
            volume_used.to_string().parse()?,
        )?)
    }

    /// Delete all rows (testing only)
    #[cfg(test)]
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM holdings")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl HoldingsStore for PostgresStore {
    async fn read_holdings(&self, filter: Option<&HoldingFilter>) -> Result<Vec<Holding>> {
        let (exchange, symbol) = match filter {
            Some(f) => (f.exchange.as_deref(), f.symbol.as_deref()),
            None => (None, None),
        };

        let rows = sqlx::query(
            r#"
            SELECT exchange, symbol, volume_free, volume_used
            FROM holdings
            WHERE ($1::text IS NULL OR exchange = $1)
              AND ($2::text IS NULL OR symbol = $2)
            ORDER BY exchange ASC, symbol ASC
            "#,
        )
        .bind(exchange)
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_holding).collect()
    }

    async fn create_holding(&self, holding: &Holding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO holdings (exchange, symbol, volume_free, volume_used, volume_total)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&holding.exchange)
        .bind(&holding.symbol)
        .bind(holding.volume_free)
        .bind(holding.volume_used)
        .bind(holding.volume_total)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Created holding {}/{} in Postgres",
            holding.exchange,
            holding.symbol
        );

        Ok(())
    }

    async fn update_holding(&self, holding: &Holding) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE holdings
            SET volume_free = $3, volume_used = $4, volume_total = $5, updated_at = NOW()
            WHERE exchange = $1 AND symbol = $2
            "#,
        )
        .bind(&holding.exchange)
        .bind(&holding.symbol)
        .bind(holding.volume_free)
        .bind(holding.volume_used)
        .bind(holding.volume_total)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MissingHolding {
                exchange: holding.exchange.clone(),
                symbol: holding.symbol.clone(),
            }
            .into());
        }

        Ok(())
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, exchange, base_symbol, quote_symbol, action,
                base_value, quote_value, fee_rate, base_volume, quote_volume,
                executed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.exchange)
        .bind(&transaction.base_symbol)
        .bind(&transaction.quote_symbol)
        .bind(Self::action_str(transaction.action))
        .bind(transaction.base_value)
        .bind(transaction.quote_value)
        .bind(transaction.fee_rate)
        .bind(transaction.base_volume)
        .bind(transaction.quote_volume)
        .bind(transaction.executed_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Recorded {} transaction {} in Postgres",
            Self::action_str(transaction.action),
            transaction.id
        );

        Ok(())
    }

    /// Commit every leg of a trade plus its transaction row in one
    /// database transaction.
    async fn record_trade(&self, holdings: &[Holding], transaction: &Transaction) -> Result<()> {
        let mut db_tx = self.pool.begin().await?;

        for holding in holdings {
            sqlx::query(
                r#"
                INSERT INTO holdings (exchange, symbol, volume_free, volume_used, volume_total)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (exchange, symbol) DO UPDATE SET
                    volume_free = EXCLUDED.volume_free,
                    volume_used = EXCLUDED.volume_used,
                    volume_total = EXCLUDED.volume_total,
                    updated_at = NOW()
                "#,
            )
            .bind(&holding.exchange)
            .bind(&holding.symbol)
            .bind(holding.volume_free)
            .bind(holding.volume_used)
            .bind(holding.volume_total)
            .execute(&mut *db_tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, exchange, base_symbol, quote_symbol, action,
                base_value, quote_value, fee_rate, base_volume, quote_volume,
                executed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.exchange)
        .bind(&transaction.base_symbol)
        .bind(&transaction.quote_symbol)
        .bind(Self::action_str(transaction.action))
        .bind(transaction.base_value)
        .bind(transaction.quote_value)
        .bind(transaction.fee_rate)
        .bind(transaction.base_volume)
        .bind(transaction.quote_volume)
        .bind(transaction.executed_at)
        .execute(&mut *db_tx)
        .await?;

        db_tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BalanceDelta;

    async fn connect() -> PostgresStore {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/rsibot_test".to_string());
        PostgresStore::new(&database_url)
            .await
            .expect("Postgres should be running")
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_holding_round_trip() {
        let store = connect().await;
        store.clear_all().await.unwrap();

        let holding = Holding::new("binance", "BTC", 1.5, 0.5).unwrap();
        store.create_holding(&holding).await.unwrap();

        let read = store
            .read_holdings(Some(&HoldingFilter::by_symbol("binance", "BTC")))
            .await
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0], holding);

        let updated = holding.apply(&BalanceDelta::debit_free(0.5)).unwrap();
        store.update_holding(&updated).await.unwrap();

        let read = store.read_holdings(None).await.unwrap();
        assert_eq!(read[0].volume_free, 1.0);
        assert_eq!(read[0].volume_total, 1.5);

        store.clear_all().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_record_trade_commits_both_legs() {
        let store = connect().await;
        store.clear_all().await.unwrap();

        let quote = Holding::new("binance", "BTC", 0.6, 0.0).unwrap();
        let base = Holding::new("binance", "ETH", 20.0, 0.0).unwrap();
        let tx = Transaction::new(
            "binance",
            "ETH",
            "BTC",
            TradeAction::BuyBase,
            0.02,
            0.4,
            20.0,
            0.4,
        );

        store.record_trade(&[quote, base], &tx).await.unwrap();

        let holdings = store.read_holdings(None).await.unwrap();
        assert_eq!(holdings.len(), 2);

        store.clear_all().await.unwrap();
    }
}

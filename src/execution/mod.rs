// The decision-and-execution core of the trading cycle
pub mod cycle;
pub mod decision;
pub mod janitor;
pub mod trader;

pub use cycle::{CycleReport, TradingCycle};
pub use decision::{decide, ranked_pairs, Decision};
pub use janitor::{sweep_stale_orders, CancelFailure, JanitorReport};
pub use trader::TradeExecutor;

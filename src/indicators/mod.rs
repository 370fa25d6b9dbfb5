// Momentum indicator calculations
pub mod rsi;

pub use rsi::{calculate_rsi, rsi_series};

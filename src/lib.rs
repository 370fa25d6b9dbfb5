// Core modules
pub mod analysis;
pub mod api;
pub mod config;
pub mod db;
pub mod exchange;
pub mod execution;
pub mod indicators;
pub mod ledger;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use crate::config::{BotConfig, TradeMode};
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

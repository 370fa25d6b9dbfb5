pub mod candles;

pub use candles::{ApiError, CandleRestClient, CandleSource};

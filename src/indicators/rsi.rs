/// Calculate Relative Strength Index (RSI)
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let avg_gain: f64 = gains.iter().rev().take(period).sum::<f64>() / period as f64;
    let avg_loss: f64 = losses.iter().rev().take(period).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - (100.0 / (1.0 + rs));

    Some(rsi)
}

/// Rolling RSI over a close-price series, most recent reading first.
///
/// `prices` is oldest-first as fetched from the candle source; one RSI
/// value is produced per window, so the result has
/// `prices.len() - period` entries. Empty when the series is too short.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.len() < period + 1 {
        return Vec::new();
    }

    let mut series: Vec<f64> = (period..prices.len())
        .filter_map(|end| calculate_rsi(&prices[..=end], period))
        .collect();

    series.reverse();
    series
}

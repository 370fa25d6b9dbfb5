use std::collections::HashMap;

use crate::models::{Holding, IndicatorResult};

/// What to do with one market pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

/// Pair symbols ordered by most recent indicator value, ascending;
/// ties broken by symbol. The most oversold candidates come first, so
/// they get first claim on the quote balance within a cycle.
pub fn ranked_pairs(classified: &HashMap<String, IndicatorResult>) -> Vec<&str> {
    let mut pairs: Vec<(&str, f64)> = classified
        .iter()
        .map(|(symbol, result)| (symbol.as_str(), result.latest()))
        .collect();

    pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    pairs.into_iter().map(|(symbol, _)| symbol).collect()
}

/// Buy/sell/hold guard for one pair, evaluated against fresh ledger
/// reads of the base and quote holdings.
///
/// A hot pair is bought only when quote liquidity exists and the base
/// asset is not already held (in any amount); a cold pair is sold only
/// when there is a free base balance to dispose of. Hot is checked
/// first, so it wins if an analyzer ever reports both flags.
pub fn decide(
    result: &IndicatorResult,
    base: Option<&Holding>,
    quote: Option<&Holding>,
) -> Decision {
    if result.is_hot {
        let quote_free = quote.map_or(0.0, |h| h.volume_free);
        let base_total = base.map_or(0.0, |h| h.volume_total);

        if quote_free != 0.0 && base_total == 0.0 {
            return Decision::Buy;
        }
    } else if result.is_cold {
        if base.map_or(false, |h| h.volume_free != 0.0) {
            return Decision::Sell;
        }
    }

    Decision::Hold
}

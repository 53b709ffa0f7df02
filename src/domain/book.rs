//! Order book snapshots and the microstructure diagnostics derived from
//! them.
//!
//! A [`BookSnapshot`] is an immutable top-of-book view for one symbol:
//! bids sorted by price descending, asks ascending. The diagnostic
//! helpers (`imbalance_pct`, `spread_ticks`, `top_depth`, `content_hash`)
//! produce exactly the values the orders table captures at placement
//! time, and `fill_limit` walks the opposing side to price an aggressive
//! limit order.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Depth levels covered by `top_depth` and `content_hash` by default.
pub const DEFAULT_HASH_DEPTH: usize = 5;

/// A single price level in an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    price: Decimal,
    size: Decimal,
}

impl PriceLevel {
    /// Creates a new price level.
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Returns the price at this level.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Returns the total volume available at this level.
    #[must_use]
    pub const fn size(&self) -> Decimal {
        self.size
    }
}

/// Order book snapshot for a single symbol.
///
/// Bids are sorted by price descending, asks ascending; constructors do
/// not re-sort.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    symbol: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl BookSnapshot {
    /// Creates a snapshot with initial price levels.
    #[must_use]
    pub fn with_levels(
        symbol: impl Into<String>,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            bids,
            asks,
        }
    }

    /// Returns the symbol this book represents.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns all bid levels (sorted by price descending).
    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Returns all ask levels (sorted by price ascending).
    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Returns the best bid (highest buy price).
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Returns the best ask (lowest sell price).
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Midpoint between best bid and best ask.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price();
        let ask = self.best_ask()?.price();
        Some((bid + ask) / Decimal::TWO)
    }

    /// Best-level bid share of displayed volume, 0-100.
    ///
    /// Values above 50 mean buy pressure at the touch. `None` when either
    /// side is empty or the touch carries no volume.
    #[must_use]
    pub fn imbalance_pct(&self) -> Option<f32> {
        let bid = self.best_bid()?.size();
        let ask = self.best_ask()?.size();
        let total = bid + ask;
        if total <= Decimal::ZERO {
            return None;
        }
        (bid / total * Decimal::ONE_HUNDRED).to_f32()
    }

    /// Spread between best ask and best bid, in ticks.
    #[must_use]
    pub fn spread_ticks(&self, tick: Decimal) -> Option<f32> {
        if tick <= Decimal::ZERO {
            return None;
        }
        let bid = self.best_bid()?.price();
        let ask = self.best_ask()?.price();
        ((ask - bid) / tick).to_f32()
    }

    /// Top `depth` levels per side as JSON: `{"asks": [[p, q], ...], "bids": ...}`.
    #[must_use]
    pub fn top_depth(&self, depth: usize) -> serde_json::Value {
        let side = |levels: &[PriceLevel]| -> Vec<serde_json::Value> {
            levels
                .iter()
                .take(depth)
                .map(|level| {
                    json!([
                        level.price().to_f64().unwrap_or(0.0),
                        level.size().to_f64().unwrap_or(0.0)
                    ])
                })
                .collect()
        };
        json!({
            "asks": side(&self.asks),
            "bids": side(&self.bids),
        })
    }

    /// Content hash of the top `depth` levels.
    ///
    /// Sha256 over the canonical (sorted-key, compact) JSON of
    /// `top_depth`, hex encoded. Two snapshots with identical top levels
    /// hash identically regardless of deeper book state.
    #[must_use]
    pub fn content_hash(&self, depth: usize) -> String {
        let canonical = self.top_depth(depth).to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")
    }

    /// Price an aggressive limit order against the opposing side.
    ///
    /// Walks asks (for a buy) or bids (for a sell) while the level price
    /// is within the limit, and returns the filled quantity with its
    /// volume-weighted average price. The filled quantity is zero when
    /// the limit does not cross.
    #[must_use]
    pub fn fill_limit(
        &self,
        side: super::order::Side,
        limit_price: Decimal,
        qty: Decimal,
    ) -> (Decimal, Option<Decimal>) {
        let levels: &[PriceLevel] = match side {
            super::order::Side::Buy => &self.asks,
            super::order::Side::Sell => &self.bids,
        };

        let mut remaining = qty;
        let mut filled = Decimal::ZERO;
        let mut notional = Decimal::ZERO;

        for level in levels {
            let crosses = match side {
                super::order::Side::Buy => level.price() <= limit_price,
                super::order::Side::Sell => level.price() >= limit_price,
            };
            if !crosses || remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level.size());
            filled += take;
            notional += take * level.price();
            remaining -= take;
        }

        if filled > Decimal::ZERO {
            (filled, Some(notional / filled))
        } else {
            (Decimal::ZERO, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Side;
    use rust_decimal_macros::dec;

    fn sample_book() -> BookSnapshot {
        BookSnapshot::with_levels(
            "BTCUSDT",
            vec![
                PriceLevel::new(dec!(65000.00), dec!(1.5)),
                PriceLevel::new(dec!(64999.99), dec!(2.0)),
                PriceLevel::new(dec!(64999.98), dec!(0.8)),
            ],
            vec![
                PriceLevel::new(dec!(65000.02), dec!(0.5)),
                PriceLevel::new(dec!(65000.03), dec!(1.2)),
                PriceLevel::new(dec!(65000.05), dec!(3.0)),
            ],
        )
    }

    #[test]
    fn best_levels_and_mid() {
        let book = sample_book();
        assert_eq!(book.best_bid().unwrap().price(), dec!(65000.00));
        assert_eq!(book.best_ask().unwrap().price(), dec!(65000.02));
        assert_eq!(book.mid().unwrap(), dec!(65000.01));
    }

    #[test]
    fn imbalance_uses_touch_volume_only() {
        let book = sample_book();
        // 1.5 / (1.5 + 0.5) = 75%
        let imbalance = book.imbalance_pct().unwrap();
        assert!((imbalance - 75.0).abs() < 0.001);
    }

    #[test]
    fn imbalance_is_none_for_one_sided_book() {
        let book = BookSnapshot::with_levels(
            "ETHUSDT",
            vec![PriceLevel::new(dec!(3000), dec!(1))],
            vec![],
        );
        assert_eq!(book.imbalance_pct(), None);
    }

    #[test]
    fn spread_in_ticks() {
        let book = sample_book();
        let spread = book.spread_ticks(dec!(0.01)).unwrap();
        assert!((spread - 2.0).abs() < 0.001);
        assert_eq!(book.spread_ticks(dec!(0)), None);
    }

    #[test]
    fn top_depth_truncates_and_orders_sides() {
        let book = sample_book();
        let depth = book.top_depth(2);
        assert_eq!(depth["bids"].as_array().unwrap().len(), 2);
        assert_eq!(depth["asks"].as_array().unwrap().len(), 2);
        assert_eq!(depth["bids"][0][0].as_f64().unwrap(), 65000.00);
    }

    #[test]
    fn content_hash_ignores_deep_levels() {
        let book = sample_book();
        let mut deeper_bids = book.bids().to_vec();
        deeper_bids.push(PriceLevel::new(dec!(64000.00), dec!(10)));
        let deeper = BookSnapshot::with_levels("BTCUSDT", deeper_bids, book.asks().to_vec());

        assert_eq!(book.content_hash(3), deeper.content_hash(3));
        assert_ne!(book.content_hash(3), deeper.content_hash(4));
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let hash = sample_book().content_hash(DEFAULT_HASH_DEPTH);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn aggressive_buy_walks_asks_with_vwap() {
        let book = sample_book();
        let (filled, vwap) = book.fill_limit(Side::Buy, dec!(65000.03), dec!(1.0));
        assert_eq!(filled, dec!(1.0));
        // 0.5 @ 65000.02 + 0.5 @ 65000.03
        assert_eq!(vwap.unwrap(), dec!(65000.025));
    }

    #[test]
    fn passive_limit_does_not_fill() {
        let book = sample_book();
        let (filled, vwap) = book.fill_limit(Side::Buy, dec!(64999.00), dec!(1.0));
        assert_eq!(filled, Decimal::ZERO);
        assert_eq!(vwap, None);
    }

    #[test]
    fn partial_fill_when_limit_stops_crossing() {
        let book = sample_book();
        let (filled, vwap) = book.fill_limit(Side::Buy, dec!(65000.02), dec!(2.0));
        assert_eq!(filled, dec!(0.5));
        assert_eq!(vwap.unwrap(), dec!(65000.02));
    }

    #[test]
    fn aggressive_sell_walks_bids() {
        let book = sample_book();
        let (filled, vwap) = book.fill_limit(Side::Sell, dec!(64999.99), dec!(3.0));
        assert_eq!(filled, dec!(3.0));
        assert!(vwap.unwrap() < dec!(65000.00));
    }
}

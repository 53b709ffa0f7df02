//! Deterministic synthetic market data.
//!
//! A seeded random walk over an integer tick grid. Every price the feed
//! emits is a whole multiple of the configured tick, so profit targets
//! and slippage measured in ticks never drift off grid.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::app::config::SimulationConfig;
use crate::domain::book::{BookSnapshot, PriceLevel};

/// Random-walk book generator shared by every bot in a cycle.
pub struct SyntheticFeed {
    symbol: String,
    tick: Decimal,
    levels: usize,
    level_qty: Decimal,
    mid_ticks: i64,
    rng: StdRng,
}

impl SyntheticFeed {
    /// Seed from the config, falling back to a random seed per run.
    pub fn new(config: &SimulationConfig, symbol: impl Into<String>) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self::with_seed(config, symbol, seed)
    }

    /// Build a feed with an explicit seed, ignoring the config's.
    pub fn with_seed(config: &SimulationConfig, symbol: impl Into<String>, seed: u64) -> Self {
        let mid_ticks = (config.start_price / config.tick_size)
            .round()
            .to_i64()
            .unwrap_or(1)
            .max(1);

        Self {
            symbol: symbol.into(),
            tick: config.tick_size,
            levels: config.book_levels.max(1),
            level_qty: config.level_qty,
            mid_ticks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn tick_size(&self) -> Decimal {
        self.tick
    }

    /// Advance the walk one step and return the resulting book.
    pub fn step(&mut self) -> BookSnapshot {
        // Mostly quiet one-tick drift with the occasional jump.
        let drift: i64 = if self.rng.gen_bool(0.08) {
            let magnitude = self.rng.gen_range(3..=9);
            if self.rng.gen_bool(0.5) {
                magnitude
            } else {
                -magnitude
            }
        } else {
            self.rng.gen_range(-1..=1)
        };
        // Keep the whole ladder above zero.
        self.mid_ticks = (self.mid_ticks + drift).max(self.levels as i64 + 2);

        let half_spread = self.rng.gen_range(1..=2);
        let best_bid = self.mid_ticks - half_spread;
        let best_ask = self.mid_ticks + half_spread;

        let mut bids = Vec::with_capacity(self.levels);
        let mut asks = Vec::with_capacity(self.levels);
        for i in 0..self.levels as i64 {
            let bid_size = self.level_size();
            bids.push(PriceLevel::new(self.price_at(best_bid - i), bid_size));
            let ask_size = self.level_size();
            asks.push(PriceLevel::new(self.price_at(best_ask + i), ask_size));
        }

        BookSnapshot::with_levels(self.symbol.clone(), bids, asks)
    }

    /// Feed-to-decision latency sample for order diagnostics.
    pub fn latency_sample(&mut self) -> i32 {
        self.rng.gen_range(3..45)
    }

    fn price_at(&self, ticks: i64) -> Decimal {
        Decimal::from(ticks) * self.tick
    }

    /// 30%..200% of the nominal level size, so imbalance actually varies.
    fn level_size(&mut self) -> Decimal {
        let factor = Decimal::from(self.rng.gen_range(30i64..=200)) / Decimal::from(100);
        (self.level_qty * factor).round_dp(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::DEFAULT_HASH_DEPTH;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn same_seed_replays_the_same_books() {
        let config = config();
        let mut a = SyntheticFeed::with_seed(&config, "BTCUSDT", 7);
        let mut b = SyntheticFeed::with_seed(&config, "BTCUSDT", 7);

        for _ in 0..50 {
            let left = a.step();
            let right = b.step();
            assert_eq!(
                left.content_hash(DEFAULT_HASH_DEPTH),
                right.content_hash(DEFAULT_HASH_DEPTH)
            );
        }
    }

    #[test]
    fn books_keep_their_shape() {
        let config = config();
        let mut feed = SyntheticFeed::with_seed(&config, "BTCUSDT", 11);

        for _ in 0..200 {
            let book = feed.step();
            assert_eq!(book.bids().len(), config.book_levels);
            assert_eq!(book.asks().len(), config.book_levels);

            let best_bid = book.best_bid().unwrap().price();
            let best_ask = book.best_ask().unwrap().price();
            assert!(best_bid < best_ask);

            for pair in book.bids().windows(2) {
                assert!(pair[0].price() > pair[1].price());
            }
            for pair in book.asks().windows(2) {
                assert!(pair[0].price() < pair[1].price());
            }
            for level in book.bids().iter().chain(book.asks()) {
                assert!(level.size() > Decimal::ZERO);
            }
        }
    }

    #[test]
    fn prices_stay_on_the_tick_grid() {
        let config = config();
        let mut feed = SyntheticFeed::with_seed(&config, "BTCUSDT", 3);

        for _ in 0..50 {
            let book = feed.step();
            for level in book.bids().iter().chain(book.asks()) {
                assert_eq!(level.price() % config.tick_size, Decimal::ZERO);
            }
        }
    }

    #[test]
    fn the_walk_actually_moves() {
        let config = config();
        let mut feed = SyntheticFeed::with_seed(&config, "BTCUSDT", 42);

        let mids: Vec<_> = (0..200).map(|_| feed.step().mid().unwrap()).collect();
        let distinct = {
            let mut sorted = mids.clone();
            sorted.sort();
            sorted.dedup();
            sorted.len()
        };
        assert!(distinct > 5, "expected a moving mid, got {distinct} values");
    }
}

//! Aggregate types: per-bot cycle performance, cycle reports, and the
//! ledger-wide summary.

use rust_decimal::Decimal;
use serde::Serialize;

use super::bot::BotRecord;
use super::id::{BotId, CycleId};
use super::order::Side;

/// Running aggregate for one bot within one cycle.
///
/// Maps one-to-one onto a bot_stats row; the (bot, cycle) pair is the
/// identity and later writes replace earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotPerformance {
    pub bot_id: BotId,
    pub cycle_id: CycleId,
    pub orders: i32,
    pub buys: i32,
    pub sells: i32,
    pub pnl: Decimal,
    pub pnl_pct: f32,
    pub runtime_s: i32,
    pub wins: i32,
    pub losses: i32,
}

impl BotPerformance {
    /// Zeroed aggregate for a bot starting its session.
    #[must_use]
    pub fn new(bot_id: BotId, cycle_id: CycleId) -> Self {
        Self {
            bot_id,
            cycle_id,
            orders: 0,
            buys: 0,
            sells: 0,
            pnl: Decimal::ZERO,
            pnl_pct: 0.0,
            runtime_s: 0,
            wins: 0,
            losses: 0,
        }
    }

    /// Count a placed order.
    pub fn record_order(&mut self, side: Side) {
        self.orders += 1;
        match side {
            Side::Buy => self.buys += 1,
            Side::Sell => self.sells += 1,
        }
    }

    /// Fold in a completed buy/sell round trip.
    pub fn record_round_trip(&mut self, pnl: Decimal) {
        self.pnl += pnl;
        if pnl > Decimal::ZERO {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }

    /// Win percentage over closed round trips.
    ///
    /// `None` when nothing has closed yet, so callers can distinguish
    /// "no data" from 0%.
    #[must_use]
    pub fn win_rate(&self) -> Option<f64> {
        let total = self.wins + self.losses;
        if total == 0 {
            return None;
        }
        Some(f64::from(self.wins) / f64::from(total) * 100.0)
    }
}

/// A cycle row read back from the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub cycle_id: CycleId,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub winner_bot_id: Option<BotId>,
    pub winner_reason: Option<String>,
}

impl CycleRecord {
    /// Whether the cycle is still running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }
}

/// One bot's slice of a cycle report: identity, aggregate stats, and the
/// order-derived execution-quality metrics.
#[derive(Debug, Clone, Serialize)]
pub struct BotCycleEntry {
    pub bot: BotRecord,
    pub stats: Option<BotPerformance>,
    pub orders_recorded: i64,
    pub fills: i64,
    pub avg_hold_s: Option<f64>,
    /// Mean of (expected - actual) profit ticks; positive is worse.
    pub avg_slippage_ticks: Option<f64>,
    pub cancel_replaces: i64,
}

impl BotCycleEntry {
    /// Fill rate over recorded orders, 0-100.
    #[must_use]
    pub fn fill_rate(&self) -> Option<f64> {
        if self.orders_recorded == 0 {
            return None;
        }
        Some(self.fills as f64 / self.orders_recorded as f64 * 100.0)
    }
}

/// Aggregated result of one cycle, the input handed to the winner
/// selector and to report export.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: CycleRecord,
    pub entries: Vec<BotCycleEntry>,
    pub generated_at: String,
}

impl CycleReport {
    /// Look up an entry by bot id.
    #[must_use]
    pub fn entry(&self, bot_id: BotId) -> Option<&BotCycleEntry> {
        self.entries.iter().find(|e| e.bot.bot_id == bot_id)
    }
}

/// Ledger-wide totals for the status surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalSummary {
    pub cycles_total: i64,
    pub cycles_open: i64,
    pub bots_total: i64,
    pub orders_total: i64,
    pub fills_total: i64,
    pub events_total: i64,
    pub net_pnl: Decimal,
    pub last_activity: Option<String>,
}

//! Experiment ledger port.
//!
//! The ledger is the single source of truth for tournament history:
//! cycles, bot lineage, per-cycle performance, order lifecycles, and the
//! append-only event stream. Every method is one logical operation and
//! implementations must apply it atomically.

use crate::domain::bot::{BotRecord, BotSpec};
use crate::domain::event::{EventRecord, LedgerEvent};
use crate::domain::id::{BotId, CycleId, OrderId};
use crate::domain::order::{OrderRecord, OrderTicket, OrderUpdate};
use crate::domain::stats::{BotPerformance, CycleRecord, GlobalSummary};
use crate::error::Result;

/// Port for persisting tournament state.
///
/// Implementations own id allocation for cycles, bots, and events.
/// Order ids are caller-supplied and write-once.
pub trait ExperimentLedger: Send + Sync {
    /// Open a new cycle and return its id.
    fn begin_cycle(&self) -> Result<CycleId>;

    /// Close a cycle, optionally crowning a winner.
    ///
    /// Fails if the cycle is already closed or the winner did not
    /// compete in it.
    fn close_cycle(&self, cycle_id: CycleId, winner: Option<BotId>, reason: &str) -> Result<()>;

    /// Fetch a single cycle.
    fn cycle(&self, cycle_id: CycleId) -> Result<Option<CycleRecord>>;

    /// List cycles, newest first.
    fn cycles(&self, limit: i64) -> Result<Vec<CycleRecord>>;

    /// Register a bot in a cycle and return its id.
    fn register_bot(&self, cycle_id: CycleId, spec: &BotSpec) -> Result<BotId>;

    /// Fetch a single bot.
    fn bot(&self, bot_id: BotId) -> Result<Option<BotRecord>>;

    /// List all bots registered in a cycle.
    fn bots_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotRecord>>;

    /// Write a bot's per-cycle performance, replacing any prior row.
    fn upsert_bot_stats(&self, stats: &BotPerformance) -> Result<()>;

    /// Fetch one bot's performance in one cycle.
    fn stats_for(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Option<BotPerformance>>;

    /// List all performance rows for a cycle.
    fn stats_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotPerformance>>;

    /// Record a freshly placed order with its book diagnostics.
    fn record_order(&self, ticket: &OrderTicket) -> Result<()>;

    /// Apply a lifecycle transition to an existing order, in place.
    fn update_order(&self, order_id: &OrderId, update: &OrderUpdate) -> Result<()>;

    /// Fetch a single order.
    fn order(&self, order_id: &OrderId) -> Result<Option<OrderRecord>>;

    /// List a cycle's orders, newest first.
    fn orders_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<OrderRecord>>;

    /// List one bot's orders in one cycle, newest first.
    fn orders_for_bot(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Vec<OrderRecord>>;

    /// List orders still live (open or partially filled) in a cycle.
    fn open_orders(&self, cycle_id: CycleId) -> Result<Vec<OrderRecord>>;

    /// Append an event and return its row id. Events are never updated
    /// or deleted.
    fn append_event(&self, event: &LedgerEvent) -> Result<i64>;

    /// Tail of the event stream, newest first.
    fn events_tail(&self, limit: i64) -> Result<Vec<EventRecord>>;

    /// Events attached to a cycle, newest first.
    fn events_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<EventRecord>>;

    /// Whole-ledger aggregates for the status surface.
    fn global_summary(&self) -> Result<GlobalSummary>;
}

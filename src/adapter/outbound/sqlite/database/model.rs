//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{bot_stats, bots, cycles, events, orders};

/// Database row for a cycle.
///
/// Cycle ids are allocated by the ledger (max + 1), so the insertable
/// and queryable shapes are the same struct.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = cycles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CycleRow {
    pub cycle_id: i32,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub winner_bot_id: Option<i32>,
    pub winner_reason: Option<String>,
}

/// Database row for a bot variant.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = bots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BotRow {
    pub bot_id: i32,
    pub cycle_id: i32,
    pub name: String,
    pub seed_parent: Option<String>,
    pub mutations_json: String,
    pub created_at: String,
}

/// Database row for per-cycle bot statistics.
///
/// One row per (bot, cycle); written with `replace_into` so refreshes
/// overwrite in place.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = bot_stats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BotStatsRow {
    pub bot_id: i32,
    pub cycle_id: i32,
    pub orders: i32,
    pub buys: i32,
    pub sells: i32,
    pub pnl: f32,
    pub pnl_pct: f32,
    pub runtime_s: i32,
    pub wins: i32,
    pub losses: i32,
    pub updated_at: String,
}

/// Database row for an order.
///
/// The id is caller-supplied, so one struct serves insert and query.
/// Book diagnostics are written at insert time and never re-derived.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub order_id: String,
    pub bot_id: i32,
    pub cycle_id: i32,
    pub symbol: String,
    pub side: String,
    pub qty: f32,
    pub price: f32,
    pub resulting_fill_price: Option<f32>,
    pub fee_asset: Option<String>,
    pub fee_amount: Option<f32>,
    pub ts: String,
    pub status: String,
    pub pnl: Option<f32>,
    pub pnl_pct: Option<f32>,
    pub notes: Option<String>,
    pub raw_json: Option<String>,
    pub expected_profit_ticks: Option<i32>,
    pub actual_profit_ticks: Option<i32>,
    pub spread_ticks: Option<f32>,
    pub imbalance_pct: Option<f32>,
    pub top3_depth: Option<String>,
    pub book_hash: Option<String>,
    pub latency_ms: Option<i32>,
    pub cancel_replace_count: i32,
    pub time_in_force: Option<String>,
    pub hold_time_s: Option<f32>,
}

/// Partial order update applied on a status transition.
///
/// `None` fields are skipped by `AsChangeset`, leaving the stored value
/// untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = orders)]
pub struct OrderChanges {
    pub status: Option<String>,
    pub resulting_fill_price: Option<f32>,
    pub fee_asset: Option<String>,
    pub fee_amount: Option<f32>,
    pub pnl: Option<f32>,
    pub pnl_pct: Option<f32>,
    pub actual_profit_ticks: Option<i32>,
    pub hold_time_s: Option<f32>,
    pub cancel_replace_count: Option<i32>,
    pub notes: Option<String>,
    pub raw_json: Option<String>,
}

/// Database row for an event (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub ts: String,
    pub level: String,
    pub scope: String,
    pub bot_id: Option<i32>,
    pub cycle_id: Option<i32>,
    pub message: String,
    pub payload_json: Option<String>,
}

/// Database row for an event (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventRow {
    pub id: Option<i32>,
    pub ts: String,
    pub level: String,
    pub scope: String,
    pub bot_id: Option<i32>,
    pub cycle_id: Option<i32>,
    pub message: String,
    pub payload_json: Option<String>,
}

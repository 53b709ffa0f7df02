//! SQLite experiment ledger.
//!
//! Persists cycles, bot lineage, per-cycle aggregates, orders, and the
//! event stream. Implements the
//! [`ExperimentLedger`](crate::port::outbound::ledger::ExperimentLedger)
//! trait for the ledger port.
//!
//! Every public operation runs as one transaction on one pooled
//! connection, so a crash never leaves a half-written record.

use chrono::Utc;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::DatabaseErrorKind;
use diesel::OptionalExtension;
use diesel::SqliteConnection;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::{
    configure_sqlite_connection, create_pool, run_migrations, DbPool,
};
use crate::adapter::outbound::sqlite::database::model::{
    BotRow, BotStatsRow, CycleRow, EventRow, NewEventRow, OrderChanges, OrderRow,
};
use crate::adapter::outbound::sqlite::database::schema::{bot_stats, bots, cycles, events, orders};
use crate::domain::bot::{BotRecord, BotSpec, Mutations};
use crate::domain::event::{EventRecord, LedgerEvent};
use crate::domain::id::{BotId, CycleId, OrderId};
use crate::domain::order::{BookContext, OrderRecord, OrderTicket, OrderUpdate};
use crate::domain::stats::{BotPerformance, CycleRecord, GlobalSummary};
use crate::error::{Error, LedgerError, Result};
use crate::port::outbound::ledger::ExperimentLedger;

/// Convert a decimal to f32 for storage.
fn decimal_to_f32(d: Decimal) -> f32 {
    d.to_f32().unwrap_or(0.0)
}

/// Convert f32 to Decimal for summary calculations.
#[must_use]
pub fn f32_to_decimal(f: f32) -> Decimal {
    Decimal::from_f32(f).unwrap_or(Decimal::ZERO)
}

/// SQLite-backed experiment ledger.
pub struct SqliteLedger {
    /// Database connection pool.
    pool: DbPool,
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    #[diesel(column_name = "id")]
    id: i64,
}

impl SqliteLedger {
    /// Create a ledger over an existing connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the ledger at the given database URL.
    pub fn open(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url)?;
        run_migrations(&pool)?;
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        configure_sqlite_connection(&mut conn)?;
        Ok(conn)
    }

    /// Open a new cycle, allocating the next cycle id.
    pub fn begin_cycle(&self) -> Result<CycleId> {
        let mut conn = self.conn()?;
        let id = conn.transaction(|conn| {
            let next = cycles::table
                .select(max(cycles::cycle_id))
                .first::<Option<i32>>(conn)?
                .unwrap_or(0)
                + 1;
            let row = CycleRow {
                cycle_id: next,
                started_at: Utc::now().to_rfc3339(),
                finished_at: None,
                winner_bot_id: None,
                winner_reason: None,
            };
            diesel::insert_into(cycles::table).values(&row).execute(conn)?;
            Ok::<i32, diesel::result::Error>(next)
        })?;

        debug!(cycle_id = id, "Opened cycle");
        Ok(CycleId::new(id))
    }

    /// Close a cycle, recording the winner if one was crowned.
    ///
    /// The winner membership check and the update run in the same
    /// transaction, so a bot from another cycle can never be written.
    pub fn close_cycle(&self, cycle_id: CycleId, winner: Option<BotId>, reason: &str) -> Result<()> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let cycle: CycleRow = cycles::table
                .find(cycle_id.get())
                .first(conn)
                .optional()?
                .ok_or(LedgerError::CycleNotFound {
                    cycle_id: cycle_id.get(),
                })?;

            if cycle.finished_at.is_some() {
                return Err(LedgerError::CycleAlreadyClosed {
                    cycle_id: cycle_id.get(),
                }
                .into());
            }

            if let Some(bot_id) = winner {
                let belongs: Option<i32> = bots::table
                    .filter(bots::bot_id.eq(bot_id.get()))
                    .filter(bots::cycle_id.eq(cycle_id.get()))
                    .select(bots::bot_id)
                    .first(conn)
                    .optional()?;
                if belongs.is_none() {
                    return Err(LedgerError::WinnerOutsideCycle {
                        bot_id: bot_id.get(),
                        cycle_id: cycle_id.get(),
                    }
                    .into());
                }
            }

            diesel::update(cycles::table.find(cycle_id.get()))
                .set((
                    cycles::finished_at.eq(Some(Utc::now().to_rfc3339())),
                    cycles::winner_bot_id.eq(winner.map(BotId::get)),
                    cycles::winner_reason.eq(if reason.is_empty() {
                        None
                    } else {
                        Some(reason.to_string())
                    }),
                ))
                .execute(conn)?;
            Ok::<(), Error>(())
        })?;

        debug!(cycle_id = cycle_id.get(), winner = ?winner.map(BotId::get), "Closed cycle");
        Ok(())
    }

    pub fn cycle(&self, cycle_id: CycleId) -> Result<Option<CycleRecord>> {
        let mut conn = self.conn()?;
        let row: Option<CycleRow> = cycles::table
            .find(cycle_id.get())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(cycle_from_row))
    }

    pub fn cycles(&self, limit: i64) -> Result<Vec<CycleRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<CycleRow> = cycles::table
            .order(cycles::cycle_id.desc())
            .limit(limit)
            .load(&mut conn)?;
        Ok(rows.into_iter().map(cycle_from_row).collect())
    }

    /// Register a bot variant in a cycle, allocating the next bot id.
    pub fn register_bot(&self, cycle_id: CycleId, spec: &BotSpec) -> Result<BotId> {
        let mut conn = self.conn()?;
        let id = conn.transaction(|conn| {
            let cycle: Option<i32> = cycles::table
                .find(cycle_id.get())
                .select(cycles::cycle_id)
                .first(conn)
                .optional()?;
            if cycle.is_none() {
                return Err(Error::from(LedgerError::CycleNotFound {
                    cycle_id: cycle_id.get(),
                }));
            }

            let next = bots::table
                .select(max(bots::bot_id))
                .first::<Option<i32>>(conn)?
                .unwrap_or(0)
                + 1;
            let row = BotRow {
                bot_id: next,
                cycle_id: cycle_id.get(),
                name: spec.name.clone(),
                seed_parent: spec.seed_parent.clone(),
                mutations_json: spec.mutations.to_canonical_json(),
                created_at: Utc::now().to_rfc3339(),
            };
            diesel::insert_into(bots::table).values(&row).execute(conn)?;
            Ok::<i32, Error>(next)
        })?;

        debug!(bot_id = id, cycle_id = cycle_id.get(), name = %spec.name, "Registered bot");
        Ok(BotId::new(id))
    }

    pub fn bot(&self, bot_id: BotId) -> Result<Option<BotRecord>> {
        let mut conn = self.conn()?;
        let row: Option<BotRow> = bots::table.find(bot_id.get()).first(&mut conn).optional()?;
        row.map(bot_record_from_row).transpose()
    }

    pub fn bots_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<BotRow> = bots::table
            .filter(bots::cycle_id.eq(cycle_id.get()))
            .order(bots::bot_id.asc())
            .load(&mut conn)?;
        rows.into_iter().map(bot_record_from_row).collect()
    }

    /// Write a bot's aggregates for a cycle, replacing any prior row.
    ///
    /// `replace_into` keeps the (bot, cycle) key unique: refreshes
    /// overwrite, they never accumulate.
    pub fn upsert_bot_stats(&self, stats: &BotPerformance) -> Result<()> {
        let row = BotStatsRow {
            bot_id: stats.bot_id.get(),
            cycle_id: stats.cycle_id.get(),
            orders: stats.orders,
            buys: stats.buys,
            sells: stats.sells,
            pnl: decimal_to_f32(stats.pnl),
            pnl_pct: stats.pnl_pct,
            runtime_s: stats.runtime_s,
            wins: stats.wins,
            losses: stats.losses,
            updated_at: Utc::now().to_rfc3339(),
        };

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            diesel::replace_into(bot_stats::table)
                .values(&row)
                .execute(conn)?;
            Ok::<(), diesel::result::Error>(())
        })?;
        Ok(())
    }

    pub fn stats_for(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Option<BotPerformance>> {
        let mut conn = self.conn()?;
        let row: Option<BotStatsRow> = bot_stats::table
            .find((bot_id.get(), cycle_id.get()))
            .first(&mut conn)
            .optional()?;
        Ok(row.map(performance_from_row))
    }

    pub fn stats_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotPerformance>> {
        let mut conn = self.conn()?;
        let rows: Vec<BotStatsRow> = bot_stats::table
            .filter(bot_stats::cycle_id.eq(cycle_id.get()))
            .order(bot_stats::bot_id.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(performance_from_row).collect())
    }

    /// Insert an order with its decision-time book diagnostics.
    ///
    /// The diagnostics land in the same insert as the core fields; they
    /// cannot be reconstructed later.
    pub fn record_order(&self, ticket: &OrderTicket) -> Result<()> {
        let row = order_row_from_ticket(ticket)?;
        let mut conn = self.conn()?;
        let result = conn.transaction(|conn| {
            diesel::insert_into(orders::table).values(&row).execute(conn)?;
            Ok::<(), diesel::result::Error>(())
        });

        match result {
            Ok(()) => {
                debug!(order_id = %ticket.order_id, bot_id = ticket.bot_id.get(), "Recorded order");
                Ok(())
            }
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(LedgerError::DuplicateOrder {
                    order_id: ticket.order_id.to_string(),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a status transition to an order row in place.
    pub fn update_order(&self, order_id: &OrderId, update: &OrderUpdate) -> Result<()> {
        let changes = OrderChanges {
            status: Some(update.status.as_str().to_string()),
            resulting_fill_price: update.resulting_fill_price.map(decimal_to_f32),
            fee_asset: update.fee_asset.clone(),
            fee_amount: update.fee_amount.map(decimal_to_f32),
            pnl: update.pnl.map(decimal_to_f32),
            pnl_pct: update.pnl_pct,
            actual_profit_ticks: update.actual_profit_ticks,
            hold_time_s: update.hold_time_s,
            cancel_replace_count: update.cancel_replace_count,
            notes: update.notes.clone(),
            raw_json: match &update.raw {
                Some(v) => Some(serde_json::to_string(v)?),
                None => None,
            },
        };

        let mut conn = self.conn()?;
        let affected = conn.transaction(|conn| {
            diesel::update(orders::table.find(order_id.as_str()))
                .set(&changes)
                .execute(conn)
        })?;

        if affected == 0 {
            return Err(LedgerError::OrderNotFound {
                order_id: order_id.to_string(),
            }
            .into());
        }

        debug!(order_id = %order_id, status = %update.status, "Updated order");
        Ok(())
    }

    pub fn order(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        let mut conn = self.conn()?;
        let row: Option<OrderRow> = orders::table
            .find(order_id.as_str())
            .first(&mut conn)
            .optional()?;
        row.map(order_record_from_row).transpose()
    }

    pub fn orders_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<OrderRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::cycle_id.eq(cycle_id.get()))
            .order(orders::ts.desc())
            .limit(limit)
            .load(&mut conn)?;
        rows.into_iter().map(order_record_from_row).collect()
    }

    pub fn orders_for_bot(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Vec<OrderRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::bot_id.eq(bot_id.get()))
            .filter(orders::cycle_id.eq(cycle_id.get()))
            .order(orders::ts.desc())
            .load(&mut conn)?;
        rows.into_iter().map(order_record_from_row).collect()
    }

    pub fn open_orders(&self, cycle_id: CycleId) -> Result<Vec<OrderRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::cycle_id.eq(cycle_id.get()))
            .filter(orders::status.eq_any(["open", "partially_filled"]))
            .order(orders::ts.asc())
            .load(&mut conn)?;
        rows.into_iter().map(order_record_from_row).collect()
    }

    /// Append one event and return its row id.
    ///
    /// This is the only write path for events; there is no update or
    /// delete counterpart.
    pub fn append_event(&self, event: &LedgerEvent) -> Result<i64> {
        let row = NewEventRow {
            ts: event.ts.to_rfc3339(),
            level: event.level.as_str().to_string(),
            scope: event.scope.clone(),
            bot_id: event.bot_id.map(BotId::get),
            cycle_id: event.cycle_id.map(CycleId::get),
            message: event.message.clone(),
            payload_json: match &event.payload {
                Some(v) => Some(serde_json::to_string(v)?),
                None => None,
            },
        };

        let mut conn = self.conn()?;
        let id = conn.transaction(|conn| {
            diesel::insert_into(events::table).values(&row).execute(conn)?;
            let id: i64 = diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|row| row.id)?;
            Ok::<i64, diesel::result::Error>(id)
        })?;
        Ok(id)
    }

    pub fn events_tail(&self, limit: i64) -> Result<Vec<EventRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<EventRow> = events::table
            .order(events::id.desc())
            .limit(limit)
            .load(&mut conn)?;
        rows.into_iter().map(event_record_from_row).collect()
    }

    pub fn events_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<EventRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<EventRow> = events::table
            .filter(events::cycle_id.eq(cycle_id.get()))
            .order(events::id.desc())
            .limit(limit)
            .load(&mut conn)?;
        rows.into_iter().map(event_record_from_row).collect()
    }

    /// Fold whole-ledger aggregates for the status surface.
    pub fn global_summary(&self) -> Result<GlobalSummary> {
        let mut conn = self.conn()?;

        let cycle_rows: Vec<CycleRow> = cycles::table.load(&mut conn)?;
        let bots_total: i64 = bots::table.count().get_result(&mut conn)?;
        let order_rows: Vec<(String, Option<f32>)> = orders::table
            .select((orders::status, orders::pnl))
            .load(&mut conn)?;
        let events_total: i64 = events::table.count().get_result(&mut conn)?;
        let last_activity: Option<String> = events::table
            .select(events::ts)
            .order(events::id.desc())
            .first(&mut conn)
            .optional()?;

        let mut summary = GlobalSummary {
            cycles_total: cycle_rows.len() as i64,
            cycles_open: cycle_rows.iter().filter(|c| c.finished_at.is_none()).count() as i64,
            bots_total,
            orders_total: order_rows.len() as i64,
            events_total,
            last_activity,
            ..GlobalSummary::default()
        };
        for (status, pnl) in order_rows {
            if status == "filled" {
                summary.fills_total += 1;
            }
            if let Some(p) = pnl {
                summary.net_pnl += f32_to_decimal(p);
            }
        }
        Ok(summary)
    }
}

impl ExperimentLedger for SqliteLedger {
    fn begin_cycle(&self) -> Result<CycleId> {
        SqliteLedger::begin_cycle(self)
    }

    fn close_cycle(&self, cycle_id: CycleId, winner: Option<BotId>, reason: &str) -> Result<()> {
        SqliteLedger::close_cycle(self, cycle_id, winner, reason)
    }

    fn cycle(&self, cycle_id: CycleId) -> Result<Option<CycleRecord>> {
        SqliteLedger::cycle(self, cycle_id)
    }

    fn cycles(&self, limit: i64) -> Result<Vec<CycleRecord>> {
        SqliteLedger::cycles(self, limit)
    }

    fn register_bot(&self, cycle_id: CycleId, spec: &BotSpec) -> Result<BotId> {
        SqliteLedger::register_bot(self, cycle_id, spec)
    }

    fn bot(&self, bot_id: BotId) -> Result<Option<BotRecord>> {
        SqliteLedger::bot(self, bot_id)
    }

    fn bots_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotRecord>> {
        SqliteLedger::bots_in_cycle(self, cycle_id)
    }

    fn upsert_bot_stats(&self, stats: &BotPerformance) -> Result<()> {
        SqliteLedger::upsert_bot_stats(self, stats)
    }

    fn stats_for(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Option<BotPerformance>> {
        SqliteLedger::stats_for(self, bot_id, cycle_id)
    }

    fn stats_in_cycle(&self, cycle_id: CycleId) -> Result<Vec<BotPerformance>> {
        SqliteLedger::stats_in_cycle(self, cycle_id)
    }

    fn record_order(&self, ticket: &OrderTicket) -> Result<()> {
        SqliteLedger::record_order(self, ticket)
    }

    fn update_order(&self, order_id: &OrderId, update: &OrderUpdate) -> Result<()> {
        SqliteLedger::update_order(self, order_id, update)
    }

    fn order(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        SqliteLedger::order(self, order_id)
    }

    fn orders_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<OrderRecord>> {
        SqliteLedger::orders_in_cycle(self, cycle_id, limit)
    }

    fn orders_for_bot(&self, bot_id: BotId, cycle_id: CycleId) -> Result<Vec<OrderRecord>> {
        SqliteLedger::orders_for_bot(self, bot_id, cycle_id)
    }

    fn open_orders(&self, cycle_id: CycleId) -> Result<Vec<OrderRecord>> {
        SqliteLedger::open_orders(self, cycle_id)
    }

    fn append_event(&self, event: &LedgerEvent) -> Result<i64> {
        SqliteLedger::append_event(self, event)
    }

    fn events_tail(&self, limit: i64) -> Result<Vec<EventRecord>> {
        SqliteLedger::events_tail(self, limit)
    }

    fn events_in_cycle(&self, cycle_id: CycleId, limit: i64) -> Result<Vec<EventRecord>> {
        SqliteLedger::events_in_cycle(self, cycle_id, limit)
    }

    fn global_summary(&self) -> Result<GlobalSummary> {
        SqliteLedger::global_summary(self)
    }
}

fn cycle_from_row(row: CycleRow) -> CycleRecord {
    CycleRecord {
        cycle_id: CycleId::new(row.cycle_id),
        started_at: row.started_at,
        finished_at: row.finished_at,
        winner_bot_id: row.winner_bot_id.map(BotId::new),
        winner_reason: row.winner_reason,
    }
}

fn bot_record_from_row(row: BotRow) -> Result<BotRecord> {
    Ok(BotRecord {
        bot_id: BotId::new(row.bot_id),
        cycle_id: CycleId::new(row.cycle_id),
        name: row.name,
        seed_parent: row.seed_parent,
        mutations: Mutations::from_json(&row.mutations_json)?,
        created_at: row.created_at,
    })
}

fn performance_from_row(row: BotStatsRow) -> BotPerformance {
    BotPerformance {
        bot_id: BotId::new(row.bot_id),
        cycle_id: CycleId::new(row.cycle_id),
        orders: row.orders,
        buys: row.buys,
        sells: row.sells,
        pnl: f32_to_decimal(row.pnl),
        pnl_pct: row.pnl_pct,
        runtime_s: row.runtime_s,
        wins: row.wins,
        losses: row.losses,
    }
}

fn order_row_from_ticket(ticket: &OrderTicket) -> Result<OrderRow> {
    Ok(OrderRow {
        order_id: ticket.order_id.to_string(),
        bot_id: ticket.bot_id.get(),
        cycle_id: ticket.cycle_id.get(),
        symbol: ticket.symbol.clone(),
        side: ticket.side.as_str().to_string(),
        qty: decimal_to_f32(ticket.qty),
        price: decimal_to_f32(ticket.price),
        resulting_fill_price: None,
        fee_asset: None,
        fee_amount: None,
        ts: ticket.placed_at.to_rfc3339(),
        status: ticket.status.as_str().to_string(),
        pnl: None,
        pnl_pct: None,
        notes: ticket.notes.clone(),
        raw_json: match &ticket.raw {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        },
        expected_profit_ticks: ticket.context.expected_profit_ticks,
        actual_profit_ticks: None,
        spread_ticks: ticket.context.spread_ticks,
        imbalance_pct: ticket.context.imbalance_pct,
        top3_depth: match &ticket.context.top3_depth {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        },
        book_hash: ticket.context.book_hash.clone(),
        latency_ms: ticket.context.latency_ms,
        cancel_replace_count: 0,
        time_in_force: ticket.time_in_force.map(|t| t.as_str().to_string()),
        hold_time_s: None,
    })
}

fn order_record_from_row(row: OrderRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        order_id: OrderId::new(row.order_id),
        bot_id: BotId::new(row.bot_id),
        cycle_id: CycleId::new(row.cycle_id),
        symbol: row.symbol,
        side: row.side.parse()?,
        qty: f32_to_decimal(row.qty),
        price: f32_to_decimal(row.price),
        resulting_fill_price: row.resulting_fill_price.map(f32_to_decimal),
        fee_asset: row.fee_asset,
        fee_amount: row.fee_amount.map(f32_to_decimal),
        ts: row.ts,
        status: row.status.parse()?,
        pnl: row.pnl.map(f32_to_decimal),
        pnl_pct: row.pnl_pct,
        notes: row.notes,
        raw_json: row.raw_json,
        context: BookContext {
            expected_profit_ticks: row.expected_profit_ticks,
            spread_ticks: row.spread_ticks,
            imbalance_pct: row.imbalance_pct,
            top3_depth: row
                .top3_depth
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?,
            book_hash: row.book_hash,
            latency_ms: row.latency_ms,
        },
        actual_profit_ticks: row.actual_profit_ticks,
        cancel_replace_count: row.cancel_replace_count,
        time_in_force: row
            .time_in_force
            .as_deref()
            .map(str::parse)
            .transpose()?,
        hold_time_s: row.hold_time_s,
    })
}

fn event_record_from_row(row: EventRow) -> Result<EventRecord> {
    Ok(EventRecord {
        id: i64::from(row.id.unwrap_or(0)),
        ts: row.ts,
        level: row.level.parse()?,
        scope: row.scope,
        bot_id: row.bot_id.map(BotId::new),
        cycle_id: row.cycle_id.map(CycleId::new),
        message: row.message,
        payload_json: row.payload_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, Side, TimeInForce};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn test_ledger() -> SqliteLedger {
        SqliteLedger::open(":memory:").unwrap()
    }

    fn open_ticket(ledger: &SqliteLedger, order_id: &str) -> (CycleId, BotId, OrderTicket) {
        let cycle_id = ledger.begin_cycle().unwrap();
        let bot_id = ledger
            .register_bot(cycle_id, &BotSpec::new("gen0-seed", Mutations::empty()))
            .unwrap();
        let ticket = OrderTicket::new(
            OrderId::new(order_id),
            bot_id,
            cycle_id,
            "BTCUSDT",
            Side::Buy,
            dec!(0.002),
            dec!(65000.00),
        )
        .with_time_in_force(TimeInForce::Gtc)
        .with_context(BookContext {
            expected_profit_ticks: Some(3),
            spread_ticks: Some(1.0),
            imbalance_pct: Some(64.2),
            top3_depth: Some(json!({"asks": [[65000.1, 0.5]], "bids": [[65000.0, 1.2]]})),
            book_hash: Some("cafe".to_string()),
            latency_ms: Some(9),
        });
        (cycle_id, bot_id, ticket)
    }

    #[test]
    fn begin_cycle_allocates_sequential_ids() {
        let ledger = test_ledger();
        let first = ledger.begin_cycle().unwrap();
        let second = ledger.begin_cycle().unwrap();
        assert_eq!(first.get() + 1, second.get());

        let record = ledger.cycle(first).unwrap().unwrap();
        assert!(record.is_open());
        assert!(record.winner_bot_id.is_none());
    }

    #[test]
    fn register_bot_requires_existing_cycle() {
        let ledger = test_ledger();
        let err = ledger
            .register_bot(CycleId::new(99), &BotSpec::new("orphan", Mutations::empty()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::CycleNotFound { cycle_id: 99 })
        ));
    }

    #[test]
    fn register_bot_keeps_lineage() {
        let ledger = test_ledger();
        let cycle_id = ledger.begin_cycle().unwrap();

        let mut mutations = Mutations::empty();
        mutations.set("sell_ticks", json!(4));
        let spec = BotSpec::new("gen1-m1", mutations).with_parent("gen0-seed");
        let bot_id = ledger.register_bot(cycle_id, &spec).unwrap();

        let record = ledger.bot(bot_id).unwrap().unwrap();
        assert_eq!(record.seed_parent.as_deref(), Some("gen0-seed"));
        assert_eq!(record.mutations.get("sell_ticks"), Some(&json!(4)));
    }

    #[test]
    fn duplicate_order_is_rejected_and_first_row_survives() {
        let ledger = test_ledger();
        let (_, _, ticket) = open_ticket(&ledger, "SIM-dup");
        ledger.record_order(&ticket).unwrap();

        let mut second = ticket.clone();
        second.symbol = "ETHUSDT".to_string();
        let err = ledger.record_order(&second).unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::DuplicateOrder { .. })
        ));

        let stored = ledger.order(&ticket.order_id).unwrap().unwrap();
        assert_eq!(stored.symbol, "BTCUSDT");
    }

    #[test]
    fn order_keeps_identity_through_fill() {
        let ledger = test_ledger();
        let (cycle_id, _, ticket) = open_ticket(&ledger, "SIM-o1");
        ledger.record_order(&ticket).unwrap();

        let update = OrderUpdate::to_status(OrderStatus::Filled)
            .filled_at(dec!(65001.50))
            .with_outcome(dec!(0.75), 0.57, 2)
            .with_hold_time(12.5);
        ledger.update_order(&ticket.order_id, &update).unwrap();

        let rows = ledger.orders_in_cycle(cycle_id, 10).unwrap();
        assert_eq!(rows.len(), 1);
        let stored = &rows[0];
        assert_eq!(stored.order_id, ticket.order_id);
        assert_eq!(stored.status, OrderStatus::Filled);
        assert_eq!(stored.actual_profit_ticks, Some(2));
        assert_eq!(stored.slippage_ticks(), Some(1));
        // Insert-time diagnostics survive the update untouched.
        assert_eq!(stored.context.book_hash.as_deref(), Some("cafe"));
        assert_eq!(stored.context.latency_ms, Some(9));
    }

    #[test]
    fn update_missing_order_fails() {
        let ledger = test_ledger();
        let err = ledger
            .update_order(
                &OrderId::new("SIM-nope"),
                &OrderUpdate::to_status(OrderStatus::Cancelled),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::OrderNotFound { .. })
        ));
    }

    #[test]
    fn open_orders_excludes_terminal_states() {
        let ledger = test_ledger();
        let (cycle_id, bot_id, first) = open_ticket(&ledger, "SIM-a");
        ledger.record_order(&first).unwrap();

        let second = OrderTicket::new(
            OrderId::new("SIM-b"),
            bot_id,
            cycle_id,
            "BTCUSDT",
            Side::Sell,
            dec!(0.002),
            dec!(65010.00),
        );
        ledger.record_order(&second).unwrap();
        ledger
            .update_order(&second.order_id, &OrderUpdate::to_status(OrderStatus::Filled))
            .unwrap();

        let open = ledger.open_orders(cycle_id).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].order_id, first.order_id);
    }

    #[test]
    fn stats_upsert_keeps_one_row_per_pair() {
        let ledger = test_ledger();
        let cycle_id = ledger.begin_cycle().unwrap();
        let bot_id = ledger
            .register_bot(cycle_id, &BotSpec::new("gen0-seed", Mutations::empty()))
            .unwrap();

        let mut perf = BotPerformance::new(bot_id, cycle_id);
        perf.record_order(Side::Buy);
        ledger.upsert_bot_stats(&perf).unwrap();

        perf.record_order(Side::Sell);
        perf.record_round_trip(dec!(0.40));
        ledger.upsert_bot_stats(&perf).unwrap();

        let all = ledger.stats_in_cycle(cycle_id).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].orders, 2);
        assert_eq!(all[0].wins, 1);
        assert_eq!(all[0].pnl, dec!(0.40));
    }

    #[test]
    fn close_cycle_enforces_winner_membership() {
        let ledger = test_ledger();
        let first = ledger.begin_cycle().unwrap();
        let second = ledger.begin_cycle().unwrap();
        let outsider = ledger
            .register_bot(second, &BotSpec::new("other-cycle", Mutations::empty()))
            .unwrap();

        let err = ledger
            .close_cycle(first, Some(outsider), "best pnl")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::WinnerOutsideCycle { .. })
        ));

        // The failed close leaves the cycle open.
        assert!(ledger.cycle(first).unwrap().unwrap().is_open());
    }

    #[test]
    fn close_cycle_is_one_shot() {
        let ledger = test_ledger();
        let cycle_id = ledger.begin_cycle().unwrap();
        let bot_id = ledger
            .register_bot(cycle_id, &BotSpec::new("gen0-seed", Mutations::empty()))
            .unwrap();

        ledger
            .close_cycle(cycle_id, Some(bot_id), "only contender")
            .unwrap();
        let record = ledger.cycle(cycle_id).unwrap().unwrap();
        assert!(!record.is_open());
        assert_eq!(record.winner_bot_id, Some(bot_id));
        assert_eq!(record.winner_reason.as_deref(), Some("only contender"));

        let err = ledger.close_cycle(cycle_id, None, "").unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::CycleAlreadyClosed { .. })
        ));
    }

    #[test]
    fn close_cycle_without_winner_is_allowed() {
        let ledger = test_ledger();
        let cycle_id = ledger.begin_cycle().unwrap();
        ledger.close_cycle(cycle_id, None, "").unwrap();

        let record = ledger.cycle(cycle_id).unwrap().unwrap();
        assert!(!record.is_open());
        assert!(record.winner_bot_id.is_none());
        assert!(record.winner_reason.is_none());
    }

    #[test]
    fn events_append_in_order() {
        let ledger = test_ledger();
        let cycle_id = ledger.begin_cycle().unwrap();

        let first = ledger
            .append_event(&LedgerEvent::info("cycle", "cycle opened").with_cycle(cycle_id))
            .unwrap();
        let second = ledger
            .append_event(
                &LedgerEvent::warning("runner", "fill timeout")
                    .with_cycle(cycle_id)
                    .with_payload(json!({"order_id": "SIM-x"})),
            )
            .unwrap();
        assert_eq!(first + 1, second);

        let tail = ledger.events_tail(10).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, second);
        assert_eq!(tail[0].message, "fill timeout");
        assert!(tail[0].payload_json.as_deref().unwrap().contains("SIM-x"));
    }

    #[test]
    fn global_summary_counts_whole_ledger() {
        let ledger = test_ledger();
        let (cycle_id, _, ticket) = open_ticket(&ledger, "SIM-g");
        ledger.record_order(&ticket).unwrap();
        ledger
            .update_order(
                &ticket.order_id,
                &OrderUpdate::to_status(OrderStatus::Filled).with_outcome(dec!(0.5), 0.4, 2),
            )
            .unwrap();
        ledger
            .append_event(&LedgerEvent::info("cycle", "cycle opened").with_cycle(cycle_id))
            .unwrap();

        let summary = ledger.global_summary().unwrap();
        assert_eq!(summary.cycles_total, 1);
        assert_eq!(summary.cycles_open, 1);
        assert_eq!(summary.bots_total, 1);
        assert_eq!(summary.orders_total, 1);
        assert_eq!(summary.fills_total, 1);
        assert_eq!(summary.events_total, 1);
        assert_eq!(summary.net_pnl, dec!(0.5));
        assert!(summary.last_activity.is_some());
    }
}

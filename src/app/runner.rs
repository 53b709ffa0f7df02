//! One bot's trading session inside a cycle.
//!
//! The runner is a state machine driven by book snapshots: scout for an
//! imbalanced touch, rest a bid there, chase it with bounded re-pegs,
//! then work a tick-target exit for the inventory. Every decision leaves
//! an order row carrying the book diagnostics that motivated it.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::debug;

use crate::app::config::SimulationConfig;
use crate::app::events::EventBroadcaster;
use crate::app::sim::{FillOutcome, FillSimulator};
use crate::domain::book::{BookSnapshot, DEFAULT_HASH_DEPTH};
use crate::domain::bot::{BotRecord, StrategyParams};
use crate::domain::event::LedgerEvent;
use crate::domain::id::{BotId, CycleId, OrderId};
use crate::domain::order::{BookContext, OrderStatus, OrderTicket, OrderUpdate, Side, TimeInForce};
use crate::domain::stats::BotPerformance;
use crate::error::Result;
use crate::port::outbound::ledger::ExperimentLedger;

/// Depth stored in the `top3_depth` diagnostic column.
const CONTEXT_DEPTH: usize = 3;

enum Phase {
    Scouting,
    Entering(RestingEntry),
    Holding(Position),
}

struct RestingEntry {
    order_id: OrderId,
    limit: Decimal,
    qty: Decimal,
    placed_step: u64,
    replaces: i32,
    seen_partial: bool,
}

struct Position {
    qty: Decimal,
    entry_price: Decimal,
    opened_step: u64,
    exit_order: OrderId,
    exit_limit: Decimal,
    exit_placed_step: u64,
    exit_seen_partial: bool,
}

/// Per-bot session state. One runner per registered bot per cycle.
pub struct BotRunner {
    ledger: Arc<dyn ExperimentLedger>,
    events: Arc<EventBroadcaster>,
    sim: FillSimulator,
    params: StrategyParams,
    bot_id: BotId,
    cycle_id: CycleId,
    name: String,
    symbol: String,
    seconds_per_step: f32,
    max_wait_steps: u64,
    perf: BotPerformance,
    phase: Phase,
    step: u64,
}

impl BotRunner {
    pub fn new(
        ledger: Arc<dyn ExperimentLedger>,
        events: Arc<EventBroadcaster>,
        config: &SimulationConfig,
        bot: &BotRecord,
        params: StrategyParams,
        symbol: impl Into<String>,
    ) -> Self {
        let seconds_per_step = config.step_ms as f32 / 1000.0;
        let max_wait_steps = ((params.max_wait_s / seconds_per_step).ceil() as u64).max(1);

        Self {
            sim: FillSimulator::new(config),
            perf: BotPerformance::new(bot.bot_id, bot.cycle_id),
            bot_id: bot.bot_id,
            cycle_id: bot.cycle_id,
            name: bot.name.clone(),
            symbol: symbol.into(),
            seconds_per_step,
            max_wait_steps,
            phase: Phase::Scouting,
            step: 0,
            ledger,
            events,
            params,
        }
    }

    pub fn bot_id(&self) -> BotId {
        self.bot_id
    }

    /// Feed one book snapshot through the state machine.
    pub fn on_book(&mut self, book: &BookSnapshot, latency_ms: i32) -> Result<()> {
        self.step += 1;
        let phase = std::mem::replace(&mut self.phase, Phase::Scouting);
        self.phase = match phase {
            Phase::Scouting => self.scout(book, latency_ms)?,
            Phase::Entering(entry) => self.chase_entry(entry, book)?,
            Phase::Holding(position) => self.work_exit(position, book, latency_ms)?,
        };
        Ok(())
    }

    /// End the session: pull the resting entry, flatten any inventory,
    /// persist final stats.
    pub fn finish(&mut self, book: &BookSnapshot) -> Result<BotPerformance> {
        let phase = std::mem::replace(&mut self.phase, Phase::Scouting);
        match phase {
            Phase::Scouting => {}
            Phase::Entering(entry) => {
                self.ledger.update_order(
                    &entry.order_id,
                    &OrderUpdate::to_status(OrderStatus::Cancelled).with_notes("cycle ended"),
                )?;
            }
            Phase::Holding(position) => {
                self.phase = self.flatten(position, book, None, "cycle ended")?;
            }
        }

        self.perf.runtime_s = self.elapsed_seconds();
        self.ledger.upsert_bot_stats(&self.perf)?;
        Ok(self.perf.clone())
    }

    fn scout(&mut self, book: &BookSnapshot, latency_ms: i32) -> Result<Phase> {
        let (Some(best_bid), Some(imbalance)) = (book.best_bid(), book.imbalance_pct()) else {
            return Ok(Phase::Scouting);
        };
        if imbalance < self.params.imbalance_threshold_pct {
            return Ok(Phase::Scouting);
        }

        let limit = best_bid.price();
        let qty = (self.params.order_size_usd / limit).round_dp(6);
        if qty <= Decimal::ZERO {
            return Ok(Phase::Scouting);
        }

        let order_id = OrderId::simulated();
        let ticket = OrderTicket::new(
            order_id.clone(),
            self.bot_id,
            self.cycle_id,
            &self.symbol,
            Side::Buy,
            qty,
            limit,
        )
        .with_context(self.context_from(book, Some(latency_ms)))
        .with_time_in_force(TimeInForce::Gtc)
        .with_notes(format!("bid imbalance {imbalance:.1}%"));

        self.ledger.record_order(&ticket)?;
        self.perf.record_order(Side::Buy);
        self.flush_stats()?;
        debug!(bot = %self.name, order = %order_id, %limit, "entry placed");

        Ok(Phase::Entering(RestingEntry {
            order_id,
            limit,
            qty,
            placed_step: self.step,
            replaces: 0,
            seen_partial: false,
        }))
    }

    fn chase_entry(&mut self, mut entry: RestingEntry, book: &BookSnapshot) -> Result<Phase> {
        match self.sim.evaluate(book, Side::Buy, entry.limit, entry.qty) {
            FillOutcome::Filled { vwap } => {
                let fee = self.sim.fee(entry.qty, vwap);
                self.ledger.update_order(
                    &entry.order_id,
                    &OrderUpdate::to_status(OrderStatus::Filled)
                        .filled_at(vwap)
                        .with_fee(quote_asset(&self.symbol), fee)
                        .with_hold_time(self.steps_to_seconds(self.step - entry.placed_step)),
                )?;
                self.open_position(&entry, vwap, book)
            }
            FillOutcome::Partial { .. } => {
                if !entry.seen_partial {
                    entry.seen_partial = true;
                    self.ledger.update_order(
                        &entry.order_id,
                        &OrderUpdate::to_status(OrderStatus::PartiallyFilled),
                    )?;
                }
                Ok(Phase::Entering(entry))
            }
            FillOutcome::Unfilled => {
                if self.step - entry.placed_step < self.max_wait_steps {
                    return Ok(Phase::Entering(entry));
                }
                // A partially displayed fill keeps resting until done or
                // cancelled; re-pegs only move untouched orders.
                if !entry.seen_partial && entry.replaces < self.params.cancel_replace_limit {
                    let new_limit = book.best_bid().map_or(entry.limit, |level| level.price());
                    entry.replaces += 1;
                    self.ledger.update_order(
                        &entry.order_id,
                        &OrderUpdate::to_status(OrderStatus::Open)
                            .with_cancel_replace_count(entry.replaces)
                            .with_notes(format!("re-pegged to {new_limit}")),
                    )?;
                    entry.limit = new_limit;
                    entry.placed_step = self.step;
                    Ok(Phase::Entering(entry))
                } else {
                    self.ledger.update_order(
                        &entry.order_id,
                        &OrderUpdate::to_status(OrderStatus::Cancelled)
                            .with_notes("entry wait exhausted"),
                    )?;
                    Ok(Phase::Scouting)
                }
            }
        }
    }

    /// Place the tick-target exit for freshly filled inventory.
    ///
    /// Inventory exists only after a full fill; a cancelled partial
    /// leaves none in this model.
    fn open_position(
        &mut self,
        entry: &RestingEntry,
        entry_vwap: Decimal,
        book: &BookSnapshot,
    ) -> Result<Phase> {
        let target = entry_vwap + Decimal::from(self.params.sell_ticks) * self.params.tick_size;

        let order_id = OrderId::simulated();
        let ticket = OrderTicket::new(
            order_id.clone(),
            self.bot_id,
            self.cycle_id,
            &self.symbol,
            Side::Sell,
            entry.qty,
            target,
        )
        .with_context(self.context_from(book, None))
        .with_time_in_force(TimeInForce::Gtc)
        .with_notes(format!(
            "target {} ticks over {entry_vwap}",
            self.params.sell_ticks
        ));

        self.ledger.record_order(&ticket)?;
        self.perf.record_order(Side::Sell);
        self.flush_stats()?;
        debug!(bot = %self.name, order = %order_id, %target, "exit placed");

        Ok(Phase::Holding(Position {
            qty: entry.qty,
            entry_price: entry_vwap,
            opened_step: self.step,
            exit_order: order_id,
            exit_limit: target,
            exit_placed_step: self.step,
            exit_seen_partial: false,
        }))
    }

    fn work_exit(
        &mut self,
        mut position: Position,
        book: &BookSnapshot,
        latency_ms: i32,
    ) -> Result<Phase> {
        match self
            .sim
            .evaluate(book, Side::Sell, position.exit_limit, position.qty)
        {
            FillOutcome::Filled { vwap } => {
                let exit_order = position.exit_order.clone();
                self.settle_close(&position, &exit_order, vwap)?;
                Ok(Phase::Scouting)
            }
            FillOutcome::Partial { .. } => {
                if !position.exit_seen_partial {
                    position.exit_seen_partial = true;
                    self.ledger.update_order(
                        &position.exit_order,
                        &OrderUpdate::to_status(OrderStatus::PartiallyFilled),
                    )?;
                }
                Ok(Phase::Holding(position))
            }
            FillOutcome::Unfilled => {
                if self.step - position.exit_placed_step < self.exit_patience_steps() {
                    return Ok(Phase::Holding(position));
                }
                self.events.emit(
                    LedgerEvent::warning(
                        "runner",
                        format!("{}: profit target abandoned, flattening", self.name),
                    )
                    .with_bot(self.bot_id)
                    .with_cycle(self.cycle_id)
                    .with_payload(json!({ "target": position.exit_limit.to_string() })),
                );
                self.flatten(position, book, Some(latency_ms), "profit target abandoned")
            }
        }
    }

    /// Cancel the resting exit and hit the bid with an IOC sell.
    fn flatten(
        &mut self,
        position: Position,
        book: &BookSnapshot,
        latency_ms: Option<i32>,
        reason: &str,
    ) -> Result<Phase> {
        let Some(best_bid) = book.best_bid() else {
            return Ok(Phase::Holding(position));
        };
        let bid_price = best_bid.price();
        let (_, vwap) = book.fill_limit(Side::Sell, bid_price, position.qty);
        let Some(vwap) = vwap else {
            return Ok(Phase::Holding(position));
        };

        self.ledger.update_order(
            &position.exit_order,
            &OrderUpdate::to_status(OrderStatus::Cancelled).with_notes(reason),
        )?;

        let order_id = OrderId::simulated();
        let ticket = OrderTicket::new(
            order_id.clone(),
            self.bot_id,
            self.cycle_id,
            &self.symbol,
            Side::Sell,
            position.qty,
            bid_price,
        )
        .with_context(self.context_from(book, latency_ms))
        .with_time_in_force(TimeInForce::Ioc)
        .with_notes(format!("{reason}; hitting {bid_price}"));

        self.ledger.record_order(&ticket)?;
        self.perf.record_order(Side::Sell);

        self.settle_close(&position, &order_id, vwap)?;
        Ok(Phase::Scouting)
    }

    /// Fill the closing order and book the round trip.
    fn settle_close(
        &mut self,
        position: &Position,
        closing: &OrderId,
        exit_vwap: Decimal,
    ) -> Result<()> {
        let trip = self
            .sim
            .round_trip(position.qty, position.entry_price, exit_vwap);
        let exit_fee = self.sim.fee(position.qty, exit_vwap);
        let hold = self.steps_to_seconds(self.step - position.opened_step);

        self.ledger.update_order(
            closing,
            &OrderUpdate::to_status(OrderStatus::Filled)
                .filled_at(exit_vwap)
                .with_fee(quote_asset(&self.symbol), exit_fee)
                .with_outcome(trip.pnl, trip.pnl_pct, trip.actual_profit_ticks)
                .with_hold_time(hold),
        )?;

        self.perf.record_round_trip(trip.pnl);
        self.flush_stats()?;
        debug!(bot = %self.name, pnl = %trip.pnl, "round trip closed");
        Ok(())
    }

    fn context_from(&self, book: &BookSnapshot, latency_ms: Option<i32>) -> BookContext {
        BookContext {
            expected_profit_ticks: Some(self.params.sell_ticks),
            spread_ticks: book.spread_ticks(self.params.tick_size),
            imbalance_pct: book.imbalance_pct(),
            top3_depth: Some(book.top_depth(CONTEXT_DEPTH)),
            book_hash: Some(book.content_hash(DEFAULT_HASH_DEPTH)),
            latency_ms,
        }
    }

    fn exit_patience_steps(&self) -> u64 {
        self.max_wait_steps * 2
    }

    fn steps_to_seconds(&self, steps: u64) -> f32 {
        steps as f32 * self.seconds_per_step
    }

    fn elapsed_seconds(&self) -> i32 {
        (self.step as f32 * self.seconds_per_step).round() as i32
    }

    fn flush_stats(&mut self) -> Result<()> {
        self.perf.runtime_s = self.elapsed_seconds();
        self.ledger.upsert_bot_stats(&self.perf)
    }
}

/// Quote asset inferred from the symbol suffix, for fee rows.
fn quote_asset(symbol: &str) -> &'static str {
    for quote in ["USDT", "USDC", "FDUSD", "USD"] {
        if symbol.len() > quote.len() && symbol.ends_with(quote) {
            return quote;
        }
    }
    "USDT"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::ledger::SqliteLedger;
    use crate::domain::book::PriceLevel;
    use crate::domain::bot::{BotSpec, Mutations};
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<SqliteLedger>, Arc<EventBroadcaster>, BotRecord) {
        let ledger = Arc::new(SqliteLedger::open(":memory:").unwrap());
        let cycle_id = ledger.begin_cycle().unwrap();
        let bot_id = ledger
            .register_bot(cycle_id, &BotSpec::new("gen0-seed", Mutations::empty()))
            .unwrap();
        let bot = ledger.bot(bot_id).unwrap().unwrap();
        let events = Arc::new(EventBroadcaster::new(ledger.clone()));
        (ledger, events, bot)
    }

    fn params() -> StrategyParams {
        StrategyParams {
            order_size_usd: dec!(50),
            sell_ticks: 3,
            imbalance_threshold_pct: 60.0,
            max_wait_s: 0.25, // one step at the default cadence
            cancel_replace_limit: 1,
            tick_size: dec!(0.01),
        }
    }

    fn runner(
        ledger: &Arc<SqliteLedger>,
        events: &Arc<EventBroadcaster>,
        bot: &BotRecord,
    ) -> BotRunner {
        BotRunner::new(
            ledger.clone(),
            events.clone(),
            &SimulationConfig::default(),
            bot,
            params(),
            "BTCUSDT",
        )
    }

    fn book(bid: (Decimal, Decimal), ask: (Decimal, Decimal)) -> BookSnapshot {
        BookSnapshot::with_levels(
            "BTCUSDT",
            vec![PriceLevel::new(bid.0, bid.1)],
            vec![PriceLevel::new(ask.0, ask.1)],
        )
    }

    #[test]
    fn imbalanced_touch_entry_reaches_its_target() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        // Imbalance 75% places a bid at the touch.
        runner
            .on_book(&book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1))), 7)
            .unwrap();
        // Asks come down to the limit: entry fills.
        runner
            .on_book(&book((dec!(99.99), dec!(1)), (dec!(100.00), dec!(2))), 7)
            .unwrap();
        // Bids reach the 3-tick target: exit fills.
        runner
            .on_book(&book((dec!(100.03), dec!(2)), (dec!(100.05), dec!(1))), 7)
            .unwrap();

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        assert_eq!(orders.len(), 2);

        let entry = orders.iter().find(|o| o.side == Side::Buy).unwrap();
        assert_eq!(entry.status, OrderStatus::Filled);
        assert_eq!(entry.resulting_fill_price, Some(dec!(100.00)));
        assert_eq!(entry.fee_amount, Some(dec!(0.005)));
        assert_eq!(entry.fee_asset.as_deref(), Some("USDT"));
        assert_eq!(entry.context.latency_ms, Some(7));
        assert!(entry.context.book_hash.is_some());

        let exit = orders.iter().find(|o| o.side == Side::Sell).unwrap();
        assert_eq!(exit.status, OrderStatus::Filled);
        assert_eq!(exit.price, dec!(100.03));
        assert_eq!(exit.pnl, Some(dec!(0.0049985)));
        assert_eq!(exit.actual_profit_ticks, Some(3));
        assert_eq!(exit.slippage_ticks(), Some(0));

        let stats = ledger.stats_for(bot.bot_id, bot.cycle_id).unwrap().unwrap();
        assert_eq!(stats.orders, 2);
        assert_eq!(stats.buys, 1);
        assert_eq!(stats.sells, 1);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.pnl, dec!(0.0049985));
    }

    #[test]
    fn stale_entries_are_repegged_then_cancelled() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        let imbalanced = book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1)));
        let drifted = book((dec!(99.97), dec!(3)), (dec!(100.02), dec!(1)));

        runner.on_book(&imbalanced, 5).unwrap();
        // One step of waiting exhausts max_wait: re-peg to the new touch.
        runner.on_book(&drifted, 5).unwrap();
        // Replace budget is spent: the next timeout cancels.
        runner.on_book(&drifted, 5).unwrap();

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancel_replace_count, 1);
        assert_eq!(order.notes.as_deref(), Some("entry wait exhausted"));
        // Placement price is the original peg; the move lives in notes.
        assert_eq!(order.price, dec!(100.00));
    }

    #[test]
    fn abandoned_targets_are_flattened_at_the_bid() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        runner
            .on_book(&book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1))), 4)
            .unwrap();
        runner
            .on_book(&book((dec!(99.99), dec!(1)), (dec!(100.00), dec!(2))), 4)
            .unwrap();

        // The market walks away from the 100.03 target.
        let away = book((dec!(99.95), dec!(2)), (dec!(100.10), dec!(1)));
        runner.on_book(&away, 4).unwrap();
        runner.on_book(&away, 4).unwrap();

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        assert_eq!(orders.len(), 3);

        let target = orders
            .iter()
            .find(|o| o.side == Side::Sell && o.status == OrderStatus::Cancelled)
            .unwrap();
        assert_eq!(target.notes.as_deref(), Some("profit target abandoned"));

        let ioc = orders
            .iter()
            .find(|o| o.time_in_force == Some(TimeInForce::Ioc))
            .unwrap();
        assert_eq!(ioc.status, OrderStatus::Filled);
        assert_eq!(ioc.resulting_fill_price, Some(dec!(99.95)));
        assert!(ioc.pnl.unwrap() < Decimal::ZERO);

        let stats = ledger.stats_for(bot.bot_id, bot.cycle_id).unwrap().unwrap();
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.wins, 0);

        let tail = ledger.events_tail(10).unwrap();
        assert!(tail.iter().any(|event| event.scope == "runner"));
    }

    #[test]
    fn partial_display_walks_one_row_to_filled() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        runner
            .on_book(&book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1))), 6)
            .unwrap();
        // Only 0.2 of the 0.5 shows up at the limit.
        runner
            .on_book(&book((dec!(99.99), dec!(1)), (dec!(100.00), dec!(0.2))), 6)
            .unwrap();

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::PartiallyFilled);
        let order_id = orders[0].order_id.clone();

        // Full size arrives: the same row finishes as filled.
        runner
            .on_book(&book((dec!(99.99), dec!(1)), (dec!(100.00), dec!(2))), 6)
            .unwrap();

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        let entry = orders.iter().find(|o| o.side == Side::Buy).unwrap();
        assert_eq!(entry.order_id, order_id);
        assert_eq!(entry.status, OrderStatus::Filled);
    }

    #[test]
    fn finish_cancels_resting_entries() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        let imbalanced = book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1)));
        runner.on_book(&imbalanced, 5).unwrap();

        let perf = runner.finish(&imbalanced).unwrap();
        assert_eq!(perf.orders, 1);

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        assert_eq!(orders[0].status, OrderStatus::Cancelled);
        assert_eq!(orders[0].notes.as_deref(), Some("cycle ended"));
        assert!(ledger.open_orders(bot.cycle_id).unwrap().is_empty());
    }

    #[test]
    fn finish_flattens_open_inventory() {
        let (ledger, events, bot) = setup();
        let mut runner = runner(&ledger, &events, &bot);

        runner
            .on_book(&book((dec!(100.00), dec!(3)), (dec!(100.02), dec!(1))), 5)
            .unwrap();
        runner
            .on_book(&book((dec!(99.99), dec!(1)), (dec!(100.00), dec!(2))), 5)
            .unwrap();

        let last = book((dec!(100.01), dec!(2)), (dec!(100.04), dec!(1)));
        let perf = runner.finish(&last).unwrap();

        // Entry, abandoned target, and the closing IOC.
        assert_eq!(perf.orders, 3);
        assert_eq!(perf.wins + perf.losses, 1);
        assert!(ledger.open_orders(bot.cycle_id).unwrap().is_empty());

        let orders = ledger.orders_for_bot(bot.bot_id, bot.cycle_id).unwrap();
        let ioc = orders
            .iter()
            .find(|o| o.time_in_force == Some(TimeInForce::Ioc))
            .unwrap();
        // Sold at 100.01 off a 100.00 entry: one tick kept.
        assert_eq!(ioc.resulting_fill_price, Some(dec!(100.01)));
        assert_eq!(ioc.actual_profit_ticks, Some(1));
    }

    #[test]
    fn quote_asset_follows_the_symbol_suffix() {
        assert_eq!(quote_asset("BTCUSDT"), "USDT");
        assert_eq!(quote_asset("ETHUSDC"), "USDC");
        assert_eq!(quote_asset("SOLFDUSD"), "FDUSD");
        assert_eq!(quote_asset("WEIRD"), "USDT");
    }
}

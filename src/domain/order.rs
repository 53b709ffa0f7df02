//! Order types for the experiment ledger.
//!
//! An order goes through the ledger in two steps:
//!
//! - [`OrderTicket`] - everything known at placement time, including the
//!   [`BookContext`] diagnostics captured from the book that triggered the
//!   order. Inserted exactly once.
//! - [`OrderUpdate`] - the delta applied on a status transition (fill,
//!   cancel, cancel/replace). Updates the same logical row in place.
//!
//! [`OrderRecord`] is the full row read back from the ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{BotId, CycleId, OrderId};
use crate::error::Error;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Stable string used in ledger rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(Error::Parse(format!("unknown order side: {other}"))),
        }
    }
}

/// Order lifecycle status.
///
/// `Open` and `PartiallyFilled` are live states; the rest are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Stable string used in ledger rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the order can still transition.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "partially_filled" => Ok(Self::PartiallyFilled),
            "filled" => Ok(Self::Filled),
            "cancelled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Parse(format!("unknown order status: {other}"))),
        }
    }
}

/// Time-in-force instruction attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

impl TimeInForce {
    /// Venue-style string used in ledger rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gtc => "GTC",
            Self::Ioc => "IOC",
            Self::Fok => "FOK",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInForce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GTC" => Ok(Self::Gtc),
            "IOC" => Ok(Self::Ioc),
            "FOK" => Ok(Self::Fok),
            other => Err(Error::Parse(format!("unknown time in force: {other}"))),
        }
    }
}

/// Book diagnostics captured when the order decision was made.
///
/// Snapshotted atomically with the order insert so fills can later be
/// correlated with the market state that motivated them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookContext {
    /// Profit target in ticks implied by the strategy plan.
    pub expected_profit_ticks: Option<i32>,
    /// Spread at decision time, in ticks.
    pub spread_ticks: Option<f32>,
    /// Best-level bid share of displayed volume, 0-100.
    pub imbalance_pct: Option<f32>,
    /// Top-of-book depth per side, JSON `{"asks": [...], "bids": [...]}`.
    pub top3_depth: Option<serde_json::Value>,
    /// Content hash of the top levels, for joining with captured books.
    pub book_hash: Option<String>,
    /// Feed-to-decision latency in milliseconds.
    pub latency_ms: Option<i32>,
}

/// Placement-time order payload.
///
/// One ticket maps to exactly one ledger row; re-recording the same
/// `order_id` is rejected by the ledger.
#[derive(Debug, Clone)]
pub struct OrderTicket {
    pub order_id: OrderId,
    pub bot_id: BotId,
    pub cycle_id: CycleId,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    /// Placement timestamp, caller-owned (decision time, not write time).
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub time_in_force: Option<TimeInForce>,
    pub context: BookContext,
    /// Free-form annotation (entry reason, replaced-from id, ...).
    pub notes: Option<String>,
    /// Venue payload echo for audit.
    pub raw: Option<serde_json::Value>,
}

impl OrderTicket {
    /// Create a ticket in the `Open` state with an empty context.
    pub fn new(
        order_id: OrderId,
        bot_id: BotId,
        cycle_id: CycleId,
        symbol: impl Into<String>,
        side: Side,
        qty: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            order_id,
            bot_id,
            cycle_id,
            symbol: symbol.into(),
            side,
            qty,
            price,
            placed_at: Utc::now(),
            status: OrderStatus::Open,
            time_in_force: None,
            context: BookContext::default(),
            notes: None,
            raw: None,
        }
    }

    /// Attach book diagnostics to the ticket.
    #[must_use]
    pub fn with_context(mut self, context: BookContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Delta applied to an order row on a status transition.
///
/// `None` fields are left untouched in the ledger.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub resulting_fill_price: Option<Decimal>,
    pub fee_asset: Option<String>,
    pub fee_amount: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub pnl_pct: Option<f32>,
    pub actual_profit_ticks: Option<i32>,
    pub hold_time_s: Option<f32>,
    pub cancel_replace_count: Option<i32>,
    pub notes: Option<String>,
    pub raw: Option<serde_json::Value>,
}

impl OrderUpdate {
    /// Start an update that only moves the status.
    #[must_use]
    pub fn to_status(status: OrderStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Record the average fill price.
    #[must_use]
    pub fn filled_at(mut self, price: Decimal) -> Self {
        self.resulting_fill_price = Some(price);
        self
    }

    /// Record the fee charged by the venue.
    #[must_use]
    pub fn with_fee(mut self, asset: impl Into<String>, amount: Decimal) -> Self {
        self.fee_asset = Some(asset.into());
        self.fee_amount = Some(amount);
        self
    }

    /// Record the realized round-trip outcome on the closing order.
    #[must_use]
    pub fn with_outcome(mut self, pnl: Decimal, pnl_pct: f32, actual_profit_ticks: i32) -> Self {
        self.pnl = Some(pnl);
        self.pnl_pct = Some(pnl_pct);
        self.actual_profit_ticks = Some(actual_profit_ticks);
        self
    }

    #[must_use]
    pub fn with_hold_time(mut self, seconds: f32) -> Self {
        self.hold_time_s = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_cancel_replace_count(mut self, count: i32) -> Self {
        self.cancel_replace_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Full order row read back from the ledger.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub bot_id: BotId,
    pub cycle_id: CycleId,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    pub resulting_fill_price: Option<Decimal>,
    pub fee_asset: Option<String>,
    pub fee_amount: Option<Decimal>,
    pub ts: String,
    pub status: OrderStatus,
    pub pnl: Option<Decimal>,
    pub pnl_pct: Option<f32>,
    pub notes: Option<String>,
    pub raw_json: Option<String>,
    pub context: BookContext,
    pub actual_profit_ticks: Option<i32>,
    pub cancel_replace_count: i32,
    pub time_in_force: Option<TimeInForce>,
    pub hold_time_s: Option<f32>,
}

impl OrderRecord {
    /// Slippage between planned and realized profit, in ticks.
    ///
    /// Positive means the fill was worse than planned.
    #[must_use]
    pub fn slippage_ticks(&self) -> Option<i32> {
        match (self.context.expected_profit_ticks, self.actual_profit_ticks) {
            (Some(expected), Some(actual)) => Some(expected - actual),
            _ => None,
        }
    }
}

//! Fill evaluation for resting orders against synthetic books.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::app::config::SimulationConfig;
use crate::domain::book::BookSnapshot;
use crate::domain::order::Side;

/// What happened to a resting order when a new book arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    /// The book never crossed the limit price.
    Unfilled,
    /// Displayed size crossed, but less than the full quantity.
    Partial { filled: Decimal, vwap: Decimal },
    /// The full quantity crossed the limit.
    Filled { vwap: Decimal },
}

/// Realized economics of a completed entry/exit pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    /// Net profit in quote units, both fees deducted.
    pub pnl: Decimal,
    /// Net profit relative to entry notional, in percent.
    pub pnl_pct: f32,
    /// Realized price distance in ticks, before fees.
    pub actual_profit_ticks: i32,
}

/// Stateless fill and fee arithmetic shared by every runner.
pub struct FillSimulator {
    fee_pct: Decimal,
    tick: Decimal,
}

impl FillSimulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            fee_pct: config.fee_pct,
            tick: config.tick_size,
        }
    }

    /// Evaluate a resting limit order against the current book.
    ///
    /// Fills consume displayed size only; anything beyond the visible
    /// ladder stays unfilled until a later book crosses again.
    pub fn evaluate(
        &self,
        book: &BookSnapshot,
        side: Side,
        limit: Decimal,
        qty: Decimal,
    ) -> FillOutcome {
        let (filled, vwap) = book.fill_limit(side, limit, qty);
        match vwap {
            None => FillOutcome::Unfilled,
            Some(vwap) if filled >= qty => FillOutcome::Filled { vwap },
            Some(vwap) => FillOutcome::Partial { filled, vwap },
        }
    }

    /// Quote-denominated fee for a fill of `qty` at `price`.
    pub fn fee(&self, qty: Decimal, price: Decimal) -> Decimal {
        (qty * price * self.fee_pct).round_dp(8)
    }

    /// Net outcome of a buy at `entry` closed by a sell at `exit`.
    pub fn round_trip(&self, qty: Decimal, entry: Decimal, exit: Decimal) -> RoundTrip {
        let gross = (exit - entry) * qty;
        let fees = self.fee(qty, entry) + self.fee(qty, exit);
        let pnl = gross - fees;

        let notional = entry * qty;
        let pnl_pct = if notional > Decimal::ZERO {
            (pnl / notional * Decimal::from(100))
                .to_f32()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let actual_profit_ticks = ((exit - entry) / self.tick)
            .round()
            .to_i32()
            .unwrap_or(0);

        RoundTrip {
            pnl,
            pnl_pct,
            actual_profit_ticks,
        }
    }
}

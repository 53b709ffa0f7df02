//! Deterministic generation scoring.
//!
//! Ranks the bots of a finished cycle with a weighted sum of min-max
//! normalized metrics. Pnl and win rate score positively; slippage, hold
//! time and cancel/replace churn score negatively. The ranking is fully
//! deterministic so a cycle can be re-scored from the ledger at any time
//! and produce the same winner.

use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use super::id::BotId;
use super::stats::{BotCycleEntry, CycleReport};

/// Relative weight of each metric in the generation score.
///
/// Weights are renormalized before use, so any non-negative values work.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MetricWeights {
    #[serde(default = "default_pnl_weight")]
    pub pnl: f64,
    #[serde(default = "default_slippage_weight")]
    pub slippage: f64,
    #[serde(default = "default_win_rate_weight")]
    pub win_rate: f64,
    #[serde(default = "default_hold_time_weight")]
    pub hold_time: f64,
    #[serde(default = "default_cancel_replace_weight")]
    pub cancel_replace: f64,
}

fn default_pnl_weight() -> f64 {
    0.45
}

fn default_slippage_weight() -> f64 {
    0.25
}

fn default_win_rate_weight() -> f64 {
    0.15
}

fn default_hold_time_weight() -> f64 {
    0.10
}

fn default_cancel_replace_weight() -> f64 {
    0.05
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            pnl: default_pnl_weight(),
            slippage: default_slippage_weight(),
            win_rate: default_win_rate_weight(),
            hold_time: default_hold_time_weight(),
            cancel_replace: default_cancel_replace_weight(),
        }
    }
}

impl MetricWeights {
    /// Weights scaled to sum to 1. Falls back to defaults when all
    /// weights are zero.
    #[must_use]
    pub fn normalized(self) -> Self {
        let sum = self.pnl + self.slippage + self.win_rate + self.hold_time + self.cancel_replace;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            pnl: self.pnl / sum,
            slippage: self.slippage / sum,
            win_rate: self.win_rate / sum,
            hold_time: self.hold_time / sum,
            cancel_replace: self.cancel_replace / sum,
        }
    }
}

/// A bot with its final generation score, highest first after `rank`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBot {
    pub bot_id: BotId,
    pub name: String,
    pub score: f64,
}

/// Raw metric vector extracted from one report entry.
fn metrics(entry: &BotCycleEntry) -> [f64; 5] {
    let pnl = entry
        .stats
        .as_ref()
        .and_then(|s| s.pnl.to_f64())
        .unwrap_or(0.0);
    let win_rate = entry
        .stats
        .as_ref()
        .and_then(super::stats::BotPerformance::win_rate)
        .unwrap_or(0.0);
    let slippage = entry.avg_slippage_ticks.unwrap_or(0.0);
    let hold = entry.avg_hold_s.unwrap_or(0.0);
    let churn = entry.cancel_replaces as f64;
    [pnl, win_rate, slippage, hold, churn]
}

/// Min-max normalize `value` within `[min, max]`; flat ranges score 0.5.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        0.5
    } else {
        (value - min) / (max - min)
    }
}

/// Rank a cycle's bots by weighted score, best first.
///
/// Ties break toward the lower bot id so re-runs stay stable.
#[must_use]
pub fn rank(report: &CycleReport, weights: &MetricWeights) -> Vec<ScoredBot> {
    let weights = weights.normalized();
    let rows: Vec<(&BotCycleEntry, [f64; 5])> =
        report.entries.iter().map(|e| (e, metrics(e))).collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut mins = rows[0].1;
    let mut maxs = rows[0].1;
    for (_, m) in &rows {
        for i in 0..5 {
            mins[i] = mins[i].min(m[i]);
            maxs[i] = maxs[i].max(m[i]);
        }
    }

    let mut scored: Vec<ScoredBot> = rows
        .iter()
        .map(|(entry, m)| {
            let pnl_n = normalize(m[0], mins[0], maxs[0]);
            let win_n = normalize(m[1], mins[1], maxs[1]);
            let slip_n = normalize(m[2], mins[2], maxs[2]);
            let hold_n = normalize(m[3], mins[3], maxs[3]);
            let churn_n = normalize(m[4], mins[4], maxs[4]);

            let score = weights.pnl * pnl_n
                + weights.win_rate * win_n
                + weights.slippage * (1.0 - slip_n)
                + weights.hold_time * (1.0 - hold_n)
                + weights.cancel_replace * (1.0 - churn_n);

            ScoredBot {
                bot_id: entry.bot.bot_id,
                name: entry.bot.name.clone(),
                score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.bot_id.cmp(&b.bot_id))
    });
    scored
}

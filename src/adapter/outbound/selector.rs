//! Weighted-score winner selection.

use std::sync::Arc;

use tracing::debug;

use crate::domain::score::{rank, MetricWeights};
use crate::domain::stats::CycleReport;
use crate::error::Result;
use crate::port::outbound::selector::{WinnerDecision, WinnerSelector};

/// Picks the bot with the best weighted metric score.
///
/// Bots that recorded no orders are skipped; a cycle where nothing
/// traded closes without a winner.
pub struct WeightedScoreSelector {
    weights: MetricWeights,
}

impl WeightedScoreSelector {
    #[must_use]
    pub fn new(weights: MetricWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }
}

impl Default for WeightedScoreSelector {
    fn default() -> Self {
        Self::new(MetricWeights::default())
    }
}

impl WinnerSelector for WeightedScoreSelector {
    fn pick(&self, report: &CycleReport) -> Result<Option<WinnerDecision>> {
        let active: Vec<_> = report
            .entries
            .iter()
            .filter(|e| e.orders_recorded > 0)
            .cloned()
            .collect();
        if active.is_empty() {
            return Ok(None);
        }

        let trimmed = CycleReport {
            cycle: report.cycle.clone(),
            entries: active,
            generated_at: report.generated_at.clone(),
        };
        let ranked = rank(&trimmed, &self.weights);
        let Some(best) = ranked.first() else {
            return Ok(None);
        };

        let entry = trimmed
            .entry(best.bot_id)
            .map(|e| {
                let pnl = e.stats.as_ref().map(|s| s.pnl.to_string()).unwrap_or_default();
                format!(
                    "top weighted score {:.3} across {} bots (pnl {})",
                    best.score,
                    ranked.len(),
                    pnl
                )
            })
            .unwrap_or_else(|| format!("top weighted score {:.3}", best.score));

        debug!(bot_id = best.bot_id.get(), score = best.score, "Selected winner");
        Ok(Some(WinnerDecision {
            bot_id: best.bot_id,
            reason: entry,
        }))
    }
}

/// Create a winner selector with the given metric weights.
#[must_use]
pub fn create_selector(weights: MetricWeights) -> Arc<dyn WinnerSelector> {
    Arc::new(WeightedScoreSelector::new(weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bot::{BotRecord, Mutations};
    use crate::domain::id::{BotId, CycleId};
    use crate::domain::stats::{BotCycleEntry, BotPerformance, CycleRecord};
    use rust_decimal_macros::dec;

    fn entry(bot_id: i32, orders: i64, pnl: rust_decimal::Decimal) -> BotCycleEntry {
        let id = BotId::new(bot_id);
        let cycle = CycleId::new(1);
        let mut stats = BotPerformance::new(id, cycle);
        stats.pnl = pnl;
        stats.orders = orders as i32;
        BotCycleEntry {
            bot: BotRecord {
                bot_id: id,
                cycle_id: cycle,
                name: format!("bot-{bot_id}"),
                seed_parent: None,
                mutations: Mutations::empty(),
                created_at: String::new(),
            },
            stats: Some(stats),
            orders_recorded: orders,
            fills: orders,
            avg_hold_s: None,
            avg_slippage_ticks: None,
            cancel_replaces: 0,
        }
    }

    fn report(entries: Vec<BotCycleEntry>) -> CycleReport {
        CycleReport {
            cycle: CycleRecord {
                cycle_id: CycleId::new(1),
                started_at: "2026-02-01T00:00:00Z".to_string(),
                finished_at: None,
                winner_bot_id: None,
                winner_reason: None,
            },
            entries,
            generated_at: "2026-02-01T01:00:00Z".to_string(),
        }
    }

    #[test]
    fn picks_highest_scoring_active_bot() {
        let selector = WeightedScoreSelector::default();
        let report = report(vec![
            entry(1, 10, dec!(-0.5)),
            entry(2, 10, dec!(2.0)),
            entry(3, 10, dec!(0.3)),
        ]);

        let decision = selector.pick(&report).unwrap().unwrap();
        assert_eq!(decision.bot_id, BotId::new(2));
        assert!(decision.reason.contains("weighted score"));
    }

    #[test]
    fn silent_bots_cannot_win() {
        let selector = WeightedScoreSelector::default();
        let report = report(vec![entry(1, 0, dec!(0)), entry(2, 5, dec!(-1.0))]);

        let decision = selector.pick(&report).unwrap().unwrap();
        // Losing money still beats never trading.
        assert_eq!(decision.bot_id, BotId::new(2));
    }

    #[test]
    fn no_activity_means_no_winner() {
        let selector = WeightedScoreSelector::default();
        let report = report(vec![entry(1, 0, dec!(0)), entry(2, 0, dec!(0))]);

        assert!(selector.pick(&report).unwrap().is_none());
    }
}

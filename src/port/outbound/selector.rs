//! Winner selection port.

use crate::domain::id::BotId;
use crate::domain::stats::CycleReport;
use crate::error::Result;

/// A crowned bot and the human-readable reason it won.
#[derive(Debug, Clone, PartialEq)]
pub struct WinnerDecision {
    pub bot_id: BotId,
    pub reason: String,
}

/// Port for choosing a cycle winner from its final report.
///
/// Returning `Ok(None)` means no bot qualified; the cycle closes
/// without a winner.
pub trait WinnerSelector: Send + Sync {
    fn pick(&self, report: &CycleReport) -> Result<Option<WinnerDecision>>;
}

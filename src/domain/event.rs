//! Supervisor events: structured, append-only breadcrumbs.
//!
//! Events are the audit trail of a tournament: cycle opened, bot
//! registered, order anomalies, winner picked. They are write-once; the
//! ledger exposes no way to update or delete them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::id::{BotId, CycleId};
use crate::error::Error;

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    /// Stable string used in ledger rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(Error::Parse(format!("unknown event level: {other}"))),
        }
    }
}

/// An event ready to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEvent {
    pub ts: DateTime<Utc>,
    pub level: EventLevel,
    /// Coarse source tag: "cycle", "bot", "selector", "runner", ...
    pub scope: String,
    pub bot_id: Option<BotId>,
    pub cycle_id: Option<CycleId>,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

impl LedgerEvent {
    fn new(level: EventLevel, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            scope: scope.into(),
            bot_id: None,
            cycle_id: None,
            message: message.into(),
            payload: None,
        }
    }

    pub fn info(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, scope, message)
    }

    pub fn warning(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, scope, message)
    }

    pub fn error(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, scope, message)
    }

    #[must_use]
    pub fn with_cycle(mut self, cycle_id: CycleId) -> Self {
        self.cycle_id = Some(cycle_id);
        self
    }

    #[must_use]
    pub fn with_bot(mut self, bot_id: BotId) -> Self {
        self.bot_id = Some(bot_id);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// An event row read back from the ledger.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub ts: String,
    pub level: EventLevel,
    pub scope: String,
    pub bot_id: Option<BotId>,
    pub cycle_id: Option<CycleId>,
    pub message: String,
    pub payload_json: Option<String>,
}

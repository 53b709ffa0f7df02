//! Gauntlet - self-breeding trading-bot tournaments on a durable ledger.
//!
//! This crate runs generations of bot variants against a synthetic order
//! book and records every cycle, bot, order, stat row, and event in an
//! append-friendly SQLite experiment ledger.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **`domain`** - Tournament types: ids, order tickets and records, book
//!   snapshots, bot specs and mutations, performance stats, scoring
//! - **`port`** - Trait seams: [`port::outbound::ledger::ExperimentLedger`]
//!   guards all database access, [`port::outbound::selector::WinnerSelector`]
//!   crowns a cycle's winner
//! - **`adapter`** - Implementations: the Diesel/SQLite ledger, the
//!   weighted-score selector, and the clap CLI
//! - **`app`** - Orchestration: config, the synthetic feed, the fill
//!   simulator, bot runners, and the cycle supervisor
//!
//! # Ledger guarantees
//!
//! - Order ids are unique; a duplicate insert is rejected, never merged.
//! - One stats row per (bot, cycle); retries update in place.
//! - Events are append-only; nothing updates or deletes them.
//! - A cycle's winner must be a bot registered in that cycle.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gauntlet::adapter::outbound::selector::create_selector;
//! use gauntlet::adapter::outbound::sqlite::ledger::SqliteLedger;
//! use gauntlet::app::config::Config;
//! use gauntlet::app::supervisor::Supervisor;
//!
//! # async fn demo() -> gauntlet::error::Result<()> {
//! let config = Config::default();
//! let ledger = Arc::new(SqliteLedger::open("sqlite://gauntlet.db")?);
//! let selector = create_selector(config.scoring);
//!
//! let outcome = Supervisor::new(config, ledger, selector).run().await?;
//! println!("cycles completed: {}", outcome.cycles.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod domain;
pub mod error;
pub mod port;

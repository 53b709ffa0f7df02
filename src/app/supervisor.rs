//! Tournament orchestration.
//!
//! One supervisor drives the whole run: open a cycle, breed and register
//! a generation, push every feed step through every runner, then score,
//! crown, and close. Lineage carries across cycles through the winner.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::app::config::Config;
use crate::app::events::EventBroadcaster;
use crate::app::feed::SyntheticFeed;
use crate::app::report::{build_cycle_report, write_report_files};
use crate::app::runner::BotRunner;
use crate::app::variation::{next_generation, seed_generation};
use crate::domain::bot::{BotRecord, StrategyParams};
use crate::domain::event::LedgerEvent;
use crate::domain::id::{BotId, CycleId};
use crate::error::{LedgerError, Result};
use crate::port::outbound::ledger::ExperimentLedger;
use crate::port::outbound::selector::WinnerSelector;

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub cycle_id: CycleId,
    pub winner_bot_id: Option<BotId>,
    pub winner_name: Option<String>,
}

/// Outcome of a whole tournament run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TournamentOutcome {
    pub cycles: Vec<CycleOutcome>,
}

pub struct Supervisor {
    config: Config,
    ledger: Arc<dyn ExperimentLedger>,
    selector: Arc<dyn WinnerSelector>,
    events: Arc<EventBroadcaster>,
    pace: bool,
    reports_dir: Option<PathBuf>,
    stop: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(
        config: Config,
        ledger: Arc<dyn ExperimentLedger>,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        let events = Arc::new(EventBroadcaster::new(ledger.clone()));
        Self {
            config,
            ledger,
            selector,
            events,
            pace: true,
            reports_dir: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Disable inter-step sleeps. Logical time still advances by
    /// `step_ms`, so hold times and runtimes stay meaningful.
    #[must_use]
    pub fn with_pacing(mut self, pace: bool) -> Self {
        self.pace = pace;
        self
    }

    /// Export each closed cycle's JSON/CSV report into `dir`.
    #[must_use]
    pub fn with_reports_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.reports_dir = dir;
        self
    }

    /// Broadcaster for live progress subscriptions.
    pub fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }

    /// Flag that ends the tournament after the current cycle closes.
    ///
    /// Cycles are never abandoned half-open; a requested stop takes
    /// effect at the next cycle boundary.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run the configured number of cycles to completion.
    pub async fn run(&self) -> Result<TournamentOutcome> {
        let mut outcome = TournamentOutcome::default();
        let mut lineage: Option<(BotRecord, StrategyParams)> = None;
        let mut rng = StdRng::seed_from_u64(
            self.config.simulation.seed.unwrap_or_else(rand::random),
        );

        for generation in 0..self.config.tournament.cycles {
            if self.stop.load(Ordering::SeqCst) {
                info!(
                    completed = outcome.cycles.len(),
                    "stop requested; ending tournament early"
                );
                break;
            }
            let cycle = self.run_cycle(generation, &mut lineage, &mut rng).await?;
            outcome.cycles.push(cycle);
        }

        Ok(outcome)
    }

    async fn run_cycle(
        &self,
        generation: u32,
        lineage: &mut Option<(BotRecord, StrategyParams)>,
        rng: &mut StdRng,
    ) -> Result<CycleOutcome> {
        let tournament = &self.config.tournament;
        let simulation = &self.config.simulation;

        let cycle_id = self.ledger.begin_cycle()?;
        info!(%cycle_id, generation, symbol = %tournament.symbol, "cycle opened");
        self.events.emit(
            LedgerEvent::info("cycle", format!("cycle {cycle_id} opened"))
                .with_cycle(cycle_id)
                .with_payload(json!({
                    "generation": generation,
                    "symbol": tournament.symbol,
                    "bots": tournament.bots_per_cycle,
                })),
        );

        let base_params = match lineage {
            Some((_, params)) => params.clone(),
            None => StrategyParams::default(),
        };
        let specs = match lineage {
            Some((winner, params)) => {
                next_generation(winner, params, tournament.bots_per_cycle, generation, rng)
            }
            None => seed_generation(tournament.bots_per_cycle, rng),
        };

        let mut runners = Vec::with_capacity(specs.len());
        for spec in &specs {
            let bot_id = self.ledger.register_bot(cycle_id, spec)?;
            let bot = self.ledger.bot(bot_id)?.ok_or(LedgerError::BotNotFound {
                bot_id: bot_id.get(),
            })?;

            let mut params = base_params.with_mutations(&spec.mutations);
            // The strategy reasons in venue ticks.
            params.tick_size = simulation.tick_size;

            self.events.emit(
                LedgerEvent::info("bot", format!("{} registered", spec.name))
                    .with_bot(bot_id)
                    .with_cycle(cycle_id)
                    .with_payload(json!({
                        "seed_parent": spec.seed_parent,
                        "mutations": spec.mutations,
                    })),
            );

            runners.push(BotRunner::new(
                self.ledger.clone(),
                self.events.clone(),
                simulation,
                &bot,
                params,
                tournament.symbol.clone(),
            ));
        }

        // Every bot sees the same tape.
        let cycle_seed = simulation
            .seed
            .map(|seed| seed.wrapping_add(u64::from(generation)))
            .unwrap_or_else(rand::random);
        let mut feed = SyntheticFeed::with_seed(simulation, &tournament.symbol, cycle_seed);

        let steps = (tournament.cycle_seconds * 1000 / simulation.step_ms).max(1);
        for _ in 0..steps {
            let book = feed.step();
            let latency_ms = feed.latency_sample();
            for runner in &mut runners {
                runner.on_book(&book, latency_ms)?;
            }
            if self.pace {
                tokio::time::sleep(Duration::from_millis(simulation.step_ms)).await;
            }
        }

        let last_book = feed.step();
        for runner in &mut runners {
            runner.finish(&last_book)?;
        }

        let report = build_cycle_report(self.ledger.as_ref(), cycle_id)?;
        let decision = self.selector.pick(&report)?;

        let outcome = match decision {
            Some(decision) => {
                let winner = report
                    .entry(decision.bot_id)
                    .map(|entry| entry.bot.clone())
                    .ok_or(LedgerError::BotNotFound {
                        bot_id: decision.bot_id.get(),
                    })?;

                self.ledger
                    .close_cycle(cycle_id, Some(decision.bot_id), &decision.reason)?;
                info!(%cycle_id, winner = %winner.name, reason = %decision.reason, "cycle closed");
                self.events.emit(
                    LedgerEvent::info(
                        "selector",
                        format!("{} wins cycle {cycle_id}", winner.name),
                    )
                    .with_cycle(cycle_id)
                    .with_bot(decision.bot_id)
                    .with_payload(json!({ "reason": decision.reason })),
                );

                let winner_params = base_params.with_mutations(&winner.mutations);
                let outcome = CycleOutcome {
                    cycle_id,
                    winner_bot_id: Some(decision.bot_id),
                    winner_name: Some(winner.name.clone()),
                };
                *lineage = Some((winner, winner_params));
                outcome
            }
            None => {
                self.ledger
                    .close_cycle(cycle_id, None, "no qualified winner")?;
                warn!(%cycle_id, "cycle closed without a winner");
                self.events.emit(
                    LedgerEvent::warning(
                        "selector",
                        format!("cycle {cycle_id} closed without a winner"),
                    )
                    .with_cycle(cycle_id),
                );
                CycleOutcome {
                    cycle_id,
                    winner_bot_id: None,
                    winner_name: None,
                }
            }
        };

        if let Some(dir) = &self.reports_dir {
            // Rebuilt after the close so the export carries the final
            // cycle row, winner included.
            let report = build_cycle_report(self.ledger.as_ref(), cycle_id)?;
            let (json_path, csv_path) = write_report_files(&report, dir)?;
            info!(
                json = %json_path.display(),
                csv = %csv_path.display(),
                "cycle report exported"
            );
            self.events.emit(
                LedgerEvent::info("report", format!("cycle {cycle_id} report exported"))
                    .with_cycle(cycle_id)
                    .with_payload(json!({
                        "json": json_path.display().to_string(),
                        "csv": csv_path.display().to_string(),
                    })),
            );
        }

        Ok(outcome)
    }
}

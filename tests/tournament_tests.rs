//! End-to-end tournament runs against a file-backed ledger.
//!
//! The supervisor unit tests cover cycle mechanics in memory; these
//! tests prove the same run survives on disk and can be read back
//! through a fresh connection pool, the way the CLI reads it.

mod harness;

use std::collections::HashSet;
use std::sync::Arc;

use gauntlet::adapter::outbound::selector::create_selector;
use gauntlet::adapter::outbound::sqlite::ledger::SqliteLedger;
use gauntlet::app::config::Config;
use gauntlet::app::supervisor::Supervisor;
use gauntlet::domain::score::MetricWeights;

fn small_config() -> Config {
    let mut config = Config::default();
    config.tournament.bots_per_cycle = 3;
    config.tournament.cycle_seconds = 15;
    config.tournament.cycles = 2;
    config.simulation.seed = Some(99);
    config
}

#[tokio::test]
async fn tournament_state_survives_a_reopened_ledger() {
    let db = harness::temp_db::TempDb::create("tournament-reopen");
    let ledger = Arc::new(SqliteLedger::new(db.pool().clone()));
    let selector = create_selector(MetricWeights::default());

    let supervisor = Supervisor::new(small_config(), ledger, selector).with_pacing(false);
    let outcome = supervisor.run().await.unwrap();
    assert_eq!(outcome.cycles.len(), 2);

    // Read everything back through a brand-new pool, like `gauntlet status`.
    let url = format!("sqlite://{}", db.path().display());
    let reopened = SqliteLedger::open(&url).unwrap();

    let summary = reopened.global_summary().unwrap();
    assert_eq!(summary.cycles_total, 2);
    assert_eq!(summary.cycles_open, 0);
    assert_eq!(summary.bots_total, 6);
    assert!(summary.events_total > 0);

    for cycle in &outcome.cycles {
        let record = reopened.cycle(cycle.cycle_id).unwrap().unwrap();
        assert!(!record.is_open());
        assert_eq!(record.winner_bot_id, cycle.winner_bot_id);
        assert!(reopened.open_orders(cycle.cycle_id).unwrap().is_empty());
    }
}

#[tokio::test]
async fn every_bot_keeps_exactly_one_stats_row_per_cycle() {
    let db = harness::temp_db::TempDb::create("tournament-stats");
    let ledger = Arc::new(SqliteLedger::new(db.pool().clone()));
    let selector = create_selector(MetricWeights::default());

    let supervisor =
        Supervisor::new(small_config(), ledger.clone(), selector).with_pacing(false);
    let outcome = supervisor.run().await.unwrap();

    for cycle in &outcome.cycles {
        let bots = ledger.bots_in_cycle(cycle.cycle_id).unwrap();
        let stats = ledger.stats_in_cycle(cycle.cycle_id).unwrap();

        // Runners flush stats after every book, yet each bot holds one row.
        assert_eq!(stats.len(), bots.len());
        let distinct: HashSet<_> = stats.iter().map(|s| (s.bot_id, s.cycle_id)).collect();
        assert_eq!(distinct.len(), stats.len());
    }
}

#[tokio::test]
async fn exported_reports_parse_and_carry_the_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = harness::temp_db::TempDb::create("tournament-report");
    let ledger = Arc::new(SqliteLedger::new(db.pool().clone()));
    let selector = create_selector(MetricWeights::default());

    let supervisor = Supervisor::new(small_config(), ledger, selector)
        .with_pacing(false)
        .with_reports_dir(Some(dir.path().to_path_buf()));
    let outcome = supervisor.run().await.unwrap();

    for cycle in &outcome.cycles {
        let json_path = dir.path().join(format!("cycle-{}.json", cycle.cycle_id));
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();

        assert_eq!(
            parsed["cycle"]["cycle_id"],
            serde_json::json!(cycle.cycle_id.get())
        );
        assert_eq!(
            parsed["cycle"]["winner_bot_id"],
            serde_json::json!(cycle.winner_bot_id.map(|id| id.get()))
        );
        assert_eq!(parsed["entries"].as_array().unwrap().len(), 3);

        let csv = std::fs::read_to_string(dir.path().join(format!("cycle-{}.csv", cycle.cycle_id)))
            .unwrap();
        // Header plus one line per bot.
        assert_eq!(csv.lines().count(), 4);
    }
}

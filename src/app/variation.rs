//! Generation building: seed bots, mutation, lineage naming.
//!
//! Each bot records only the delta against its parent, so the full
//! parameter set of any variant is reconstructable by walking lineage
//! from the seed down.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;

use crate::domain::bot::{BotRecord, BotSpec, Mutations, StrategyParams};

/// Keys `mutate` may touch. Tick size is a venue property, never mutated.
const MUTABLE_KEYS: [&str; 5] = [
    "order_size_usd",
    "sell_ticks",
    "imbalance_threshold_pct",
    "max_wait_s",
    "cancel_replace_limit",
];

/// First generation: one unmutated seed plus mutated siblings.
pub fn seed_generation(count: usize, rng: &mut StdRng) -> Vec<BotSpec> {
    let seed_name = "gen0-seed";
    let mut specs = vec![BotSpec::new(seed_name, Mutations::empty())];
    extend_with_mutants(
        &mut specs,
        &StrategyParams::default(),
        seed_name,
        0,
        count,
        rng,
    );
    specs
}

/// Breed the next generation from a cycle winner.
///
/// The winner re-enters unchanged, so a lucky mutant has to beat its
/// own parameters on a fresh tape to stay on top.
pub fn next_generation(
    winner: &BotRecord,
    winner_params: &StrategyParams,
    count: usize,
    generation: u32,
    rng: &mut StdRng,
) -> Vec<BotSpec> {
    let carry = BotSpec::new(format!("gen{generation}-carry"), Mutations::empty())
        .with_parent(winner.name.clone());
    let mut specs = vec![carry];
    extend_with_mutants(&mut specs, winner_params, &winner.name, generation, count, rng);
    specs
}

/// Fill `specs` up to `count` with fingerprint-distinct mutants.
fn extend_with_mutants(
    specs: &mut Vec<BotSpec>,
    base: &StrategyParams,
    parent: &str,
    generation: u32,
    count: usize,
    rng: &mut StdRng,
) {
    let mut seen: HashSet<String> = specs.iter().map(|s| s.mutations.fingerprint()).collect();
    let mut index = 1;
    let mut attempts = 0;

    // Bounded retries; tiny parameter spaces can exhaust distinct deltas.
    while specs.len() < count && attempts < count * 20 {
        attempts += 1;
        let delta = mutate(base, rng);
        if !seen.insert(delta.fingerprint()) {
            continue;
        }

        specs.push(
            BotSpec::new(format!("gen{generation}-m{index}"), delta).with_parent(parent),
        );
        index += 1;
    }
}

/// Jitter one or two parameters, keeping each inside its sane range.
fn mutate(base: &StrategyParams, rng: &mut StdRng) -> Mutations {
    let mut delta = Mutations::empty();
    let picks = rng.gen_range(1..=2usize);
    let mut added = 0;

    while added < picks {
        let key = MUTABLE_KEYS[rng.gen_range(0..MUTABLE_KEYS.len())];
        if delta.get(key).is_some() {
            continue;
        }

        let value = match key {
            "order_size_usd" => {
                let size = base.order_size_usd.to_f64().unwrap_or(50.0);
                let next = (size * rng.gen_range(0.5..1.6)).clamp(10.0, 500.0);
                json!(round2(next))
            }
            "sell_ticks" => {
                let step = [-2, -1, 1, 2][rng.gen_range(0..4)];
                json!((base.sell_ticks + step).max(1))
            }
            "imbalance_threshold_pct" => {
                let next = (f64::from(base.imbalance_threshold_pct)
                    + rng.gen_range(-8.0..8.0))
                .clamp(52.0, 90.0);
                json!(round1(next))
            }
            "max_wait_s" => {
                let next =
                    (f64::from(base.max_wait_s) * rng.gen_range(0.6..1.6)).clamp(2.0, 120.0);
                json!(round1(next))
            }
            _ => json!(rng.gen_range(0..=4)),
        };
        delta.set(key, value);
        added += 1;
    }

    delta
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

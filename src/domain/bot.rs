//! Bot variants: the mutation record that defines them and the typed
//! strategy parameters derived from it.
//!
//! Variants are defined entirely by their mutations: a flat JSON object
//! of parameter overrides on top of the seed strategy. The object is the
//! unit of lineage (generations mutate the winner's object) and of
//! deduplication (fingerprints of already-tried objects are skipped).

use std::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::id::{BotId, CycleId};
use crate::error::{Error, Result};

/// Parameter overrides defining a bot variant.
///
/// Stored canonically: keys sorted, compact separators. Two semantically
/// equal objects always serialize and fingerprint identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mutations(serde_json::Map<String, serde_json::Value>);

impl Mutations {
    /// Empty mutation set (the unmodified seed strategy).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(Error::Parse(format!(
                "mutations must be a JSON object, got {other}"
            ))),
        }
    }

    /// Parse from the canonical string stored in the ledger.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Canonical JSON string (sorted keys, compact).
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }

    /// Sha256 hex of the canonical JSON.
    ///
    /// Used to skip variants a previous generation already tried.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_canonical_json().as_bytes());
        format!("{digest:x}")
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the overrides.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    fn f64_key(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(serde_json::Value::as_f64)
    }
}

impl fmt::Display for Mutations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_json())
    }
}

/// A variant ready for registration: name, lineage, overrides.
#[derive(Debug, Clone)]
pub struct BotSpec {
    pub name: String,
    /// Name of the variant this one was mutated from, if any.
    pub seed_parent: Option<String>,
    pub mutations: Mutations,
}

impl BotSpec {
    pub fn new(name: impl Into<String>, mutations: Mutations) -> Self {
        Self {
            name: name.into(),
            seed_parent: None,
            mutations,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.seed_parent = Some(parent.into());
        self
    }
}

/// A registered bot read back from the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct BotRecord {
    pub bot_id: BotId,
    pub cycle_id: CycleId,
    pub name: String,
    pub seed_parent: Option<String>,
    pub mutations: Mutations,
    pub created_at: String,
}

/// Typed view of the parameters a runner actually uses.
///
/// Unknown mutation keys are ignored; missing keys keep their defaults,
/// so partial mutation objects stay valid across parameter renames.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Quote-denominated size per entry order.
    pub order_size_usd: Decimal,
    /// Profit target distance for the paired exit, in ticks.
    pub sell_ticks: i32,
    /// Minimum touch imbalance (0-100) required to enter.
    pub imbalance_threshold_pct: f32,
    /// Seconds an unfilled entry may rest before cancel/replace.
    pub max_wait_s: f32,
    /// Cancel/replace attempts allowed per order.
    pub cancel_replace_limit: i32,
    /// Price increment of the traded symbol.
    pub tick_size: Decimal,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            order_size_usd: dec!(50),
            sell_ticks: 3,
            imbalance_threshold_pct: 62.0,
            max_wait_s: 20.0,
            cancel_replace_limit: 2,
            tick_size: dec!(0.01),
        }
    }
}

impl StrategyParams {
    /// Apply mutation overrides on top of the defaults.
    #[must_use]
    pub fn from_mutations(mutations: &Mutations) -> Self {
        Self::default().with_mutations(mutations)
    }

    /// Apply mutation overrides on top of these parameters.
    ///
    /// Children inherit the parent's parameters and only the recorded
    /// delta is applied, so lineage stays reconstructable from the ledger.
    #[must_use]
    pub fn with_mutations(&self, mutations: &Mutations) -> Self {
        let mut params = self.clone();

        if let Some(size) = mutations
            .f64_key("order_size_usd")
            .and_then(Decimal::from_f64)
        {
            params.order_size_usd = size;
        }
        if let Some(ticks) = mutations.f64_key("sell_ticks") {
            params.sell_ticks = ticks as i32;
        }
        if let Some(threshold) = mutations.f64_key("imbalance_threshold_pct") {
            params.imbalance_threshold_pct = threshold as f32;
        }
        if let Some(wait) = mutations.f64_key("max_wait_s") {
            params.max_wait_s = wait as f32;
        }
        if let Some(limit) = mutations.f64_key("cancel_replace_limit") {
            params.cancel_replace_limit = limit as i32;
        }
        if let Some(tick) = mutations.f64_key("tick_size").and_then(Decimal::from_f64) {
            params.tick_size = tick;
        }

        params
    }
}

//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; every field has a default so
//! a missing file still yields a runnable tournament.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::score::MetricWeights;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tournament: TournamentConfig,
    /// Winner scoring weights, normalized at use.
    #[serde(default)]
    pub scoring: MetricWeights,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Ledger storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path. `None` resolves to the data directory default.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Tournament shape: how many bots compete, for how long, on what symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TournamentConfig {
    /// Variants competing per cycle, including the seed.
    #[serde(default = "default_bots_per_cycle")]
    pub bots_per_cycle: usize,
    /// Wall-clock budget per cycle.
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: u64,
    /// Cycles to run before stopping.
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

fn default_bots_per_cycle() -> usize {
    4
}

fn default_cycle_seconds() -> u64 {
    60
}

fn default_cycles() -> u32 {
    1
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            bots_per_cycle: default_bots_per_cycle(),
            cycle_seconds: default_cycle_seconds(),
            cycles: default_cycles(),
            symbol: default_symbol(),
        }
    }
}

/// Synthetic market parameters for the fill simulator.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,
    #[serde(default = "default_start_price")]
    pub start_price: Decimal,
    /// Displayed book levels per side.
    #[serde(default = "default_book_levels")]
    pub book_levels: usize,
    /// Base displayed quantity per level.
    #[serde(default = "default_level_qty")]
    pub level_qty: Decimal,
    /// Feed step interval in milliseconds.
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Fee charged per fill, as a fraction of notional.
    #[serde(default = "default_fee_pct")]
    pub fee_pct: Decimal,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_tick_size() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_start_price() -> Decimal {
    // Reference price of the synthetic instrument. At 100.00 with a 0.01
    // tick, one tick is a basis point and tick targets clear the fee.
    Decimal::from(100)
}

fn default_book_levels() -> usize {
    5
}

fn default_level_qty() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_step_ms() -> u64 {
    250
}

fn default_fee_pct() -> Decimal {
    Decimal::new(1, 4) // 0.01% per side, maker-tier
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_size: default_tick_size(),
            start_price: default_start_price(),
            book_levels: default_book_levels(),
            level_qty: default_level_qty(),
            step_ms: default_step_ms(),
            fee_pct: default_fee_pct(),
            seed: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.tournament.bots_per_cycle == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tournament.bots_per_cycle",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.tournament.cycle_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tournament.cycle_seconds",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.tournament.symbol.is_empty() {
            return Err(ConfigError::MissingField {
                field: "tournament.symbol",
            }
            .into());
        }
        if self.simulation.tick_size <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "simulation.tick_size",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.simulation.start_price <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "simulation.start_price",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.simulation.book_levels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "simulation.book_levels",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.simulation.step_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "simulation.step_ms",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

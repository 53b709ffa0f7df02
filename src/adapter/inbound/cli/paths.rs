//! Path utilities for gauntlet.
//!
//! All data lives under `~/.gauntlet/`:
//! - `~/.gauntlet/config.toml` - main configuration
//! - `~/.gauntlet/gauntlet.db` - experiment ledger database
//! - `~/.gauntlet/reports/` - per-cycle report exports

use std::path::PathBuf;

/// Returns the gauntlet home directory (`~/.gauntlet/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gauntlet")
}

/// Returns the default config file path (`~/.gauntlet/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

/// Returns the default ledger database path (`~/.gauntlet/gauntlet.db`).
pub fn default_database() -> PathBuf {
    home_dir().join("gauntlet.db")
}

/// Returns the default report export directory (`~/.gauntlet/reports/`).
pub fn default_reports_dir() -> PathBuf {
    home_dir().join("reports")
}

/// Ensures the gauntlet home directory exists.
pub fn ensure_home_dir() -> std::io::Result<()> {
    std::fs::create_dir_all(home_dir())
}

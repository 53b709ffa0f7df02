use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Ledger write rejections. Each one is a caller-visible contract
/// violation, not a storage fault.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Order ids are write-once; a second insert is a caller bug, never
    /// an upsert.
    #[error("order '{order_id}' already recorded")]
    DuplicateOrder { order_id: String },

    #[error("order '{order_id}' not found")]
    OrderNotFound { order_id: String },

    #[error("cycle {cycle_id} not found")]
    CycleNotFound { cycle_id: i32 },

    /// The finish mutation is one-shot; a closed cycle stays closed.
    #[error("cycle {cycle_id} is already closed")]
    CycleAlreadyClosed { cycle_id: i32 },

    #[error("bot {bot_id} not found")]
    BotNotFound { bot_id: i32 },

    /// A winner must have competed in the cycle it wins.
    #[error("bot {bot_id} does not belong to cycle {cycle_id}")]
    WinnerOutsideCycle { bot_id: i32, cycle_id: i32 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

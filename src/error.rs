//! Error types for wallet persistence.

use thiserror::Error;

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

/// Errors that can surface from the local persistence path or the CLI.
///
/// Remote mirror failures never appear here; see [`crate::remote::RemoteError`].
#[derive(Error, Debug)]
pub enum WalletError {
    /// Failed to write the snapshot file or create its directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a snapshot
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to write CSV output
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing command argument
    #[error("Missing argument. Usage: wallet-sync <show|reconcile|reset|pull> [amounts]")]
    MissingArgument,

    /// An argument that should be an amount was not one
    #[error("Invalid value for {name}: {value:?}")]
    InvalidArgument { name: &'static str, value: String },

    /// Unrecognized command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

//! Environment-driven configuration.
//!
//! Every setting is read from the first non-empty key in its list, so
//! deployments can use either the wallet-specific names or the generic ones.

use crate::remote::{RemoteConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
use crate::store::DEFAULT_FILE_NAME;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Keys probed, in order, for the data directory.
pub const DATA_DIR_KEYS: &[&str] = &["WALLET_DATA_DIR", "PERSISTENT_DATA_DIR", "DATA_DIR"];
pub const IDENTITY_KEYS: &[&str] = &["WALLET_IDENTITY"];
pub const FILE_NAME_KEYS: &[&str] = &["WALLET_FILE_NAME"];
pub const TOKEN_KEYS: &[&str] = &["WALLET_GITHUB_TOKEN", "GIST_TOKEN"];
pub const DOCUMENT_ID_KEYS: &[&str] = &["WALLET_GIST_ID", "GIST_ID"];
pub const REMOTE_FILE_NAME_KEYS: &[&str] = &["WALLET_GIST_FILENAME"];
pub const API_BASE_KEYS: &[&str] = &["WALLET_GIST_API"];
pub const TIMEOUT_KEYS: &[&str] = &["WALLET_REMOTE_TIMEOUT_SECS"];

/// Fallback data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "runtime_data";

/// Fallback account identity.
pub const DEFAULT_IDENTITY: &str = "owner";

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub data_dir: PathBuf,
    pub identity: String,
    pub file_name: String,
    pub remote: RemoteConfig,
}

impl WalletConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|&key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let timeout = first(TIMEOUT_KEYS)
            .and_then(|secs| secs.parse::<f64>().ok())
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_TIMEOUT);

        WalletConfig {
            data_dir: first(DATA_DIR_KEYS)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            identity: first(IDENTITY_KEYS).unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
            file_name: first(FILE_NAME_KEYS).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            remote: RemoteConfig {
                token: first(TOKEN_KEYS),
                document_id: first(DOCUMENT_ID_KEYS),
                file_name: first(REMOTE_FILE_NAME_KEYS)
                    .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
                api_base: first(API_BASE_KEYS).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                timeout,
            },
        }
    }
}

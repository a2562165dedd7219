//! Optional remote mirror of the wallet snapshot.
//!
//! The snapshot is stored as the text content of one file inside a remote
//! gist-style document (`GET`/`PATCH {api}/gists/{id}`). The mirror is a
//! secondary durability layer for hosts whose local disk does not survive a
//! redeploy. Every failure is swallowed: from the caller's point of view an
//! unreachable remote behaves exactly like an unconfigured one.

use crate::pool::{PoolError, WorkerPool};
use crate::snapshot::WalletSnapshot;
use crate::store::DEFAULT_FILE_NAME;
use log::{debug, trace, warn};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default API root for the document store.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Upper bound on how long `fetch` blocks its caller.
pub const MAX_FETCH_WAIT: Duration = Duration::from_secs(5);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("wallet-sync/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const WORKERS: usize = 2;
const QUEUE_CAPACITY: usize = 32;

/// Credentials and location of the remote document.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Bearer token. The mirror is disabled without one.
    pub token: Option<String>,

    /// Document identifier. The mirror is disabled without one.
    pub document_id: Option<String>,

    /// Name of the file inside the document that holds the snapshot.
    pub file_name: String,

    /// API root, without a trailing slash.
    pub api_base: String,

    /// Per-request timeout used by the ledger when pushing.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            token: None,
            document_id: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteConfig {
    /// Returns `true` when both the token and the document id are set.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.token) && present(&self.document_id)
    }

    fn document_url(&self) -> String {
        format!(
            "{}/gists/{}",
            self.api_base.trim_end_matches('/'),
            self.document_id.as_deref().unwrap_or_default().trim()
        )
    }
}

// Keeps the token out of logs.
impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("document_id", &self.document_id)
            .field("file_name", &self.file_name)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Why a remote operation did not complete.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Connection, TLS, or timeout error from the HTTP client
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("remote returned status {0}")]
    Status(u16),

    /// The document has no usable content for the snapshot file
    #[error("remote document has no content for {0:?}")]
    MissingFile(String),

    /// The response or the file content could not be parsed
    #[error("malformed remote payload")]
    Malformed,

    /// The caller stopped waiting
    #[error("remote fetch timed out after {0:?}")]
    TimedOut(Duration),

    /// The worker queue was full
    #[error("remote worker queue is full")]
    Rejected,

    /// The mirror has been shut down
    #[error("remote mirror is shut down")]
    Closed,

    /// The worker threads could not be started
    #[error("failed to start remote workers: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<PoolError> for RemoteError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Full => RemoteError::Rejected,
            PoolError::Closed => RemoteError::Closed,
        }
    }
}

/// Result of a mirror operation.
///
/// Callers usually collapse this through [`RemoteMirror::fetch`] or
/// [`RemoteMirror::persist`]; the variants exist for diagnostics.
#[derive(Debug)]
pub enum RemoteOutcome<T> {
    /// The operation completed (or, for persist, was queued).
    Done(T),
    /// The mirror is disabled; nothing was attempted.
    NotConfigured,
    /// Best-effort attempt failed.
    Failed(RemoteError),
}

impl<T> RemoteOutcome<T> {
    /// Logs the outcome and converts it into an `Option`.
    pub fn into_option(self, operation: &str) -> Option<T> {
        match self {
            RemoteOutcome::Done(value) => Some(value),
            RemoteOutcome::NotConfigured => {
                trace!("Remote {} skipped: mirror not configured", operation);
                None
            }
            RemoteOutcome::Failed(e) => {
                warn!("Remote {} failed: {}", operation, e);
                None
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RemoteDocument {
    #[serde(default)]
    files: BTreeMap<String, Option<RemoteFile>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RemoteFile {
    #[serde(default)]
    content: Option<String>,
}

struct Enabled {
    config: RemoteConfig,
    client: Client,
    pool: WorkerPool,
}

/// Best-effort replication of the snapshot to a remote document.
///
/// A mirror built from an incomplete [`RemoteConfig`] is disabled: it owns no
/// threads, makes no network calls, and every operation is a no-op.
pub struct RemoteMirror {
    inner: Option<Enabled>,
}

impl RemoteMirror {
    /// Builds a mirror, enabled only if `config` has credentials.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        if !config.is_complete() {
            debug!("Remote mirror disabled: missing token or document id");
            return Ok(Self::disabled());
        }

        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let pool = WorkerPool::new("wallet-remote", WORKERS, QUEUE_CAPACITY)?;
        debug!("Remote mirror enabled for {}", config.document_url());

        Ok(RemoteMirror {
            inner: Some(Enabled {
                config,
                client,
                pool,
            }),
        })
    }

    /// A mirror that does nothing.
    pub fn disabled() -> Self {
        RemoteMirror { inner: None }
    }

    /// Returns `true` when credentials are configured.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Configured request timeout, or the default when disabled.
    pub fn default_timeout(&self) -> Duration {
        self.inner
            .as_ref()
            .map(|e| e.config.timeout)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Fetches the remote snapshot, blocking for at most
    /// `min(timeout, MAX_FETCH_WAIT)`.
    pub fn fetch(&self, timeout: Duration) -> Option<WalletSnapshot> {
        self.try_fetch(timeout).into_option("fetch")
    }

    /// Queues a push of `snapshot` and returns without waiting.
    ///
    /// Returns `true` if the mirror is enabled and the push was accepted.
    pub fn persist(&self, snapshot: &WalletSnapshot, timeout: Duration) -> bool {
        self.try_persist(snapshot, timeout)
            .into_option("persist")
            .is_some()
    }

    pub fn try_fetch(&self, timeout: Duration) -> RemoteOutcome<WalletSnapshot> {
        let enabled = match &self.inner {
            Some(enabled) => enabled,
            None => return RemoteOutcome::NotConfigured,
        };

        let wait = fetch_wait(timeout);
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let job_cancelled = Arc::clone(&cancelled);
        let client = enabled.client.clone();
        let config = enabled.config.clone();
        let submitted = enabled.pool.execute(move || {
            if job_cancelled.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(fetch_document(&client, &config, wait));
        });
        if let Err(e) = submitted {
            return RemoteOutcome::Failed(e.into());
        }

        match rx.recv_timeout(wait) {
            Ok(Ok(snapshot)) => {
                debug!(
                    "Fetched remote snapshot: available={} total={}",
                    snapshot.available_balance, snapshot.total_earned
                );
                RemoteOutcome::Done(snapshot)
            }
            Ok(Err(e)) => RemoteOutcome::Failed(e),
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::SeqCst);
                RemoteOutcome::Failed(RemoteError::TimedOut(wait))
            }
            Err(RecvTimeoutError::Disconnected) => RemoteOutcome::Failed(RemoteError::Closed),
        }
    }

    pub fn try_persist(&self, snapshot: &WalletSnapshot, timeout: Duration) -> RemoteOutcome<()> {
        let enabled = match &self.inner {
            Some(enabled) => enabled,
            None => return RemoteOutcome::NotConfigured,
        };

        let client = enabled.client.clone();
        let config = enabled.config.clone();
        let snapshot = *snapshot;
        let submitted = enabled.pool.execute(move || {
            match push_document(&client, &config, &snapshot, timeout) {
                Ok(()) => debug!("Pushed snapshot to remote mirror"),
                Err(e) => warn!("Remote persist failed: {}", e),
            }
        });

        match submitted {
            Ok(()) => RemoteOutcome::Done(()),
            Err(e) => RemoteOutcome::Failed(e.into()),
        }
    }

    /// Finishes queued pushes and stops the workers.
    ///
    /// Afterwards `persist` returns `false` and `fetch` returns `None`.
    pub fn shutdown(&self) {
        if let Some(enabled) = &self.inner {
            enabled.pool.shutdown();
        }
    }
}

fn fetch_wait(timeout: Duration) -> Duration {
    timeout.min(MAX_FETCH_WAIT)
}

fn authorized(request: RequestBuilder, config: &RemoteConfig) -> RequestBuilder {
    request
        .bearer_auth(config.token.as_deref().unwrap_or_default().trim())
        .header(reqwest::header::ACCEPT, ACCEPT)
}

fn fetch_document(
    client: &Client,
    config: &RemoteConfig,
    timeout: Duration,
) -> Result<WalletSnapshot, RemoteError> {
    let response = authorized(client.get(config.document_url()), config)
        .timeout(timeout)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }

    let body = response.bytes()?;
    let document: RemoteDocument =
        serde_json::from_slice(&body).map_err(|_| RemoteError::Malformed)?;
    let content = document
        .files
        .get(&config.file_name)
        .and_then(|file| file.as_ref())
        .and_then(|file| file.content.as_deref())
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| RemoteError::MissingFile(config.file_name.clone()))?;

    WalletSnapshot::from_json(content.as_bytes()).ok_or(RemoteError::Malformed)
}

fn push_document(
    client: &Client,
    config: &RemoteConfig,
    snapshot: &WalletSnapshot,
    timeout: Duration,
) -> Result<(), RemoteError> {
    let content = snapshot.to_json().map_err(|_| RemoteError::Malformed)?;
    let mut files = HashMap::new();
    files.insert(
        config.file_name.as_str(),
        RemoteFile {
            content: Some(content),
        },
    );

    #[derive(Serialize)]
    struct Patch<'a> {
        files: HashMap<&'a str, RemoteFile>,
    }

    let response = authorized(client.patch(config.document_url()), config)
        .json(&Patch { files })
        .timeout(timeout)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }
    Ok(())
}

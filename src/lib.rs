//! # Wallet Sync
//!
//! Crash-safe persistence of a single wallet snapshot (available balance and
//! lifetime earnings) for hosts whose local disk may vanish between deploys.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: 2 decimal places via `rust_decimal`, banker's rounding
//! - **Atomic writes**: temp file, fsync, rename; readers never see torn files
//! - **Anti-regression**: the lifetime total never drops except via reset
//! - **Best-effort mirror**: remote replication never blocks or fails the local path
//!
//! ## Example
//!
//! ```no_run
//! use std::str::FromStr;
//! use wallet_sync::{Decimal2, SnapshotStore, WalletLedger, WalletSnapshot};
//!
//! let ledger = WalletLedger::new(SnapshotStore::new("runtime_data"), "owner");
//! let computed = WalletSnapshot::new(
//!     Decimal2::from_str("5.00").unwrap(),
//!     Decimal2::from_str("12.34").unwrap(),
//! );
//! let durable = ledger.reconcile(computed).unwrap();
//! println!("{} / {}", durable.available_balance, durable.total_earned);
//! ```

pub mod config;
pub mod decimal;
pub mod error;
pub mod ledger;
pub mod pool;
pub mod remote;
pub mod snapshot;
pub mod store;

pub use config::WalletConfig;
pub use decimal::Decimal2;
pub use error::{Result, WalletError};
pub use ledger::{merge, Reconciliation, WalletLedger};
pub use pool::{PoolError, WorkerPool};
pub use remote::{RemoteConfig, RemoteError, RemoteMirror, RemoteOutcome};
pub use snapshot::WalletSnapshot;
pub use store::{SnapshotStore, WriteOutcome};

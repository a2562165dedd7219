//! Wallet Sync CLI
//!
//! Reconciles a computed wallet value against the persisted snapshot and
//! prints the durable result as CSV.
//!
//! # Usage
//!
//! ```bash
//! wallet-sync show
//! wallet-sync reconcile 5.00 12.34
//! wallet-sync reset 25
//! wallet-sync pull
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `WALLET_DATA_DIR` / `PERSISTENT_DATA_DIR` / `DATA_DIR`: snapshot directory
//! - `WALLET_GITHUB_TOKEN` + `WALLET_GIST_ID`: enable the remote mirror

use log::warn;
use std::env;
use std::io::{self, Write};
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use wallet_sync::{
    Decimal2, RemoteMirror, Result, SnapshotStore, WalletConfig, WalletError, WalletLedger,
    WalletSnapshot,
};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().ok_or(WalletError::MissingArgument)?;

    let config = WalletConfig::from_env();
    let mirror = match RemoteMirror::new(config.remote.clone()) {
        Ok(mirror) => mirror,
        Err(e) => {
            warn!("Remote mirror unavailable: {}", e);
            RemoteMirror::disabled()
        }
    };
    let mirror = Arc::new(mirror);

    let store = SnapshotStore::with_file_name(&config.data_dir, config.file_name.as_str());
    let ledger = WalletLedger::new(store, &config.identity).with_mirror(Arc::clone(&mirror));

    let result = execute(&ledger, command, &args[1..], config.remote.timeout);

    // Queued pushes must finish before the process exits.
    mirror.shutdown();

    let snapshot = result?;
    let stdout = io::stdout();
    let handle = stdout.lock();
    write_output(handle, snapshot.as_ref())
}

fn execute(
    ledger: &WalletLedger,
    command: &str,
    args: &[String],
    timeout: Duration,
) -> Result<Option<WalletSnapshot>> {
    match command {
        "show" => Ok(ledger.current()),
        "reconcile" => {
            let available = parse_amount("available_balance", args.first())?;
            let total = parse_amount("total_earned", args.get(1))?;
            ledger
                .reconcile(WalletSnapshot::new(available, total))
                .map(Some)
        }
        "reset" => {
            let baseline = args
                .first()
                .map(|s| Decimal2::parse_lenient(s))
                .unwrap_or(Decimal2::ZERO);
            ledger.reset(baseline).map(Some)
        }
        "pull" => match ledger.restore_from_remote(timeout)? {
            Some(snapshot) => Ok(Some(snapshot)),
            None => Ok(ledger.current()),
        },
        other => Err(WalletError::UnknownCommand(other.to_string())),
    }
}

fn parse_amount(name: &'static str, arg: Option<&String>) -> Result<Decimal2> {
    let value = arg.ok_or(WalletError::MissingArgument)?;
    Decimal2::from_str(value).map_err(|_| WalletError::InvalidArgument {
        name,
        value: value.clone(),
    })
}

/// Writes the snapshot as a one-row CSV with a fixed header.
fn write_output<W: Write>(writer: W, snapshot: Option<&WalletSnapshot>) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["available_balance", "total_earned"])?;
    if let Some(snapshot) = snapshot {
        csv_writer.write_record([
            snapshot.available_balance.to_string(),
            snapshot.total_earned.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

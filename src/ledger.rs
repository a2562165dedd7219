//! Reconciliation of freshly computed wallet values against the persisted
//! snapshot.
//!
//! The policy is one-sided trust. A computed value that keeps or grows the
//! lifetime total is accepted. A computed value whose total drops by more
//! than one cent is treated as upstream data loss (for example a redeploy that
//! wiped the computing side's history), and the persisted snapshot is kept.
//! The persisted total is never lowered by reconciliation.

use crate::decimal::Decimal2;
use crate::error::Result;
use crate::remote::RemoteMirror;
use crate::snapshot::WalletSnapshot;
use crate::store::SnapshotStore;
use log::{debug, info, warn};
use std::cmp;
use std::sync::Arc;
use std::time::Duration;

/// The decision taken for one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was persisted; the computed value became the truth.
    Seeded(WalletSnapshot),

    /// The computed total regressed past tolerance; the persisted value stays.
    Retained(WalletSnapshot),

    /// Computed and persisted values were merged.
    Merged(WalletSnapshot),
}

impl Reconciliation {
    /// The snapshot that should become durable.
    pub fn snapshot(&self) -> WalletSnapshot {
        match *self {
            Reconciliation::Seeded(s) | Reconciliation::Retained(s) | Reconciliation::Merged(s) => s,
        }
    }
}

/// Decides the new durable snapshot without touching storage.
///
/// # Rules
///
/// - Negative computed totals count as zero
/// - With nothing persisted, `computed` wins (balance clamped to its total)
/// - If `persisted.total_earned - computed.total_earned > 0.01`, `persisted`
///   is returned unchanged
/// - Otherwise the total is the larger of the two and the balance is the
///   computed balance clamped into `[0, total]`
pub fn merge(computed: WalletSnapshot, persisted: Option<WalletSnapshot>) -> Reconciliation {
    let computed = WalletSnapshot::new(
        computed.available_balance,
        computed.total_earned.non_negative(),
    );

    let persisted = match persisted {
        Some(persisted) => persisted,
        None => return Reconciliation::Seeded(computed.clamped()),
    };

    // Saturates, so extreme hand-edited totals cannot overflow.
    let drop = persisted.total_earned - computed.total_earned;
    if drop > Decimal2::EPSILON {
        return Reconciliation::Retained(persisted);
    }

    let total_earned = cmp::max(persisted.total_earned, computed.total_earned);
    let available_balance = computed
        .available_balance
        .clamp(Decimal2::ZERO, total_earned);
    Reconciliation::Merged(WalletSnapshot::new(available_balance, total_earned))
}

fn normalize_identity(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Reconciliation engine for the single tracked account.
///
/// Runs synchronously on the caller's thread. When a [`RemoteMirror`] is
/// attached, every committed snapshot is also queued for a background push.
pub struct WalletLedger {
    store: SnapshotStore,
    identity: String,
    mirror: Option<Arc<RemoteMirror>>,
}

impl WalletLedger {
    /// Creates a ledger persisting through `store` for account `identity`.
    pub fn new(store: SnapshotStore, identity: &str) -> Self {
        WalletLedger {
            store,
            identity: normalize_identity(identity),
            mirror: None,
        }
    }

    /// Attaches a remote mirror that receives every committed snapshot.
    pub fn with_mirror(mut self, mirror: Arc<RemoteMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The normalized account identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Returns `true` if `name` refers to the tracked account.
    ///
    /// Comparison ignores case and surrounding whitespace.
    pub fn matches_identity(&self, name: &str) -> bool {
        !self.identity.is_empty() && normalize_identity(name) == self.identity
    }

    /// The currently persisted snapshot, if any.
    pub fn current(&self) -> Option<WalletSnapshot> {
        self.store.read()
    }

    /// Merges `computed` with the persisted snapshot and commits the result.
    ///
    /// Only local write failures are returned as errors.
    pub fn reconcile(&self, computed: WalletSnapshot) -> Result<WalletSnapshot> {
        let decision = merge(computed, self.store.read());
        match decision {
            Reconciliation::Seeded(s) => debug!(
                "Seeding wallet for {}: available={} total={}",
                self.identity, s.available_balance, s.total_earned
            ),
            Reconciliation::Retained(s) => warn!(
                "Computed total {} for {} is below persisted {}; keeping persisted snapshot",
                computed.total_earned, self.identity, s.total_earned
            ),
            Reconciliation::Merged(s) => debug!(
                "Merged wallet for {}: available={} total={}",
                self.identity, s.available_balance, s.total_earned
            ),
        }
        self.commit(decision.snapshot())
    }

    /// Forces the wallet to `{available: 0, total: total_earned}`.
    ///
    /// This is the only way to lower the lifetime total. Negative baselines
    /// are treated as zero.
    pub fn reset(&self, total_earned: Decimal2) -> Result<WalletSnapshot> {
        let baseline = WalletSnapshot::new(Decimal2::ZERO, total_earned.non_negative());
        info!(
            "Resetting wallet for {} to total={}",
            self.identity, baseline.total_earned
        );
        self.commit(baseline)
    }

    /// Seeds local state from the remote mirror.
    ///
    /// The remote snapshot, if any, is reconciled as the computed value.
    /// Returns `None` without touching local state when there is no mirror or
    /// it yields nothing.
    pub fn restore_from_remote(&self, timeout: Duration) -> Result<Option<WalletSnapshot>> {
        let remote = match self.mirror.as_ref().and_then(|m| m.fetch(timeout)) {
            Some(remote) => remote,
            None => return Ok(None),
        };
        self.reconcile(remote).map(Some)
    }

    fn commit(&self, snapshot: WalletSnapshot) -> Result<WalletSnapshot> {
        self.store.write(&snapshot)?;
        if let Some(mirror) = &self.mirror {
            mirror.persist(&snapshot, mirror.default_timeout());
        }
        Ok(snapshot)
    }
}

//! Wallet snapshot model and its canonical JSON form.

use crate::decimal::Decimal2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The durable two-field representation of wallet state.
///
/// # Invariants
///
/// - Both amounts carry exactly 2 decimal places
/// - `available_balance <= total_earned` for every snapshot produced by
///   reconciliation (persisted input is taken as-is)
///
/// Missing or malformed fields read as zero, so any JSON object parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Funds that can currently be withdrawn.
    #[serde(default)]
    pub available_balance: Decimal2,

    /// Lifetime earnings. Never decreases outside of an explicit reset.
    #[serde(default)]
    pub total_earned: Decimal2,
}

impl WalletSnapshot {
    /// Creates a snapshot from the given amounts.
    pub fn new(available_balance: Decimal2, total_earned: Decimal2) -> Self {
        WalletSnapshot {
            available_balance,
            total_earned,
        }
    }

    /// Returns a copy with the lifetime total made non-negative and the
    /// balance clamped into `[0, total_earned]`.
    pub fn clamped(self) -> Self {
        let total_earned = self.total_earned.non_negative();
        WalletSnapshot {
            available_balance: self.available_balance.clamp(Decimal2::ZERO, total_earned),
            total_earned,
        }
    }

    /// Renders the canonical document written to disk and to the mirror.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a snapshot document.
    ///
    /// Returns `None` if `bytes` is not a JSON object.
    pub fn from_json(bytes: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(bytes).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

//! Seat ledger policy configuration.

use serde::{Deserialize, Serialize};

/// Policy knobs for the seat allocation and audit engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Accept a `total_seats` edit that drops below the seats currently in use.
    ///
    /// When `false` such an edit is rejected with a validation error.
    #[serde(default)]
    pub allow_capacity_below_usage: bool,
    /// Reject assignments to users or groups whose directory entry is inactive.
    #[serde(default = "default_true")]
    pub require_active_principals: bool,
    /// Number of entries returned by the "recent history" query.
    #[serde(default = "default_recent_history_limit")]
    pub recent_history_limit: u64,
    /// Actor recorded as `performed_by` when the caller does not name one.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allow_capacity_below_usage: false,
            require_active_principals: true,
            recent_history_limit: default_recent_history_limit(),
            system_actor: default_system_actor(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_recent_history_limit() -> u64 {
    50
}

fn default_system_actor() -> String {
    "system".to_string()
}

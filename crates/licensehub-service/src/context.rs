//! Request context carrying the acting principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use licensehub_core::config::LedgerConfig;

/// Context for one ledger operation.
///
/// Passed into every mutating service method so that history entries know
/// *who* acted and share one timestamp with the records they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Recorded as `performed_by` in history.
    pub actor: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for a named actor.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            request_time: Utc::now(),
        }
    }

    /// Creates a context for the configured system actor.
    pub fn system(config: &LedgerConfig) -> Self {
        Self::new(config.system_actor.clone())
    }
}

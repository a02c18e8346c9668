//! Wires the ledger services onto one backend.

use licensehub_core::config::{AppConfig, LedgerConfig};
use licensehub_core::result::AppResult;
use licensehub_database::LedgerBackend;

use crate::assignment::AssignmentService;
use crate::audit::AuditRecorder;
use crate::context::RequestContext;
use crate::license::LicenseService;
use crate::seat::{SeatAccountant, SeatVerifier};

/// Every ledger service, sharing one store, one directory, and one set of
/// per-license locks.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    backend: LedgerBackend,
    licenses: LicenseService,
    assignments: AssignmentService,
    audit: AuditRecorder,
    verifier: SeatVerifier,
}

impl Ledger {
    /// Build the services over an opened backend.
    pub fn new(backend: LedgerBackend, config: &LedgerConfig) -> Self {
        let accountant = SeatAccountant::new(backend.store.clone(), config);
        let audit = AuditRecorder::new(backend.store.clone(), config);
        let licenses = LicenseService::new(backend.store.clone(), accountant.clone(), audit.clone());
        let assignments = AssignmentService::new(
            backend.store.clone(),
            backend.directory.clone(),
            accountant.clone(),
            audit.clone(),
            config,
        );
        let verifier = SeatVerifier::new(accountant);

        Self {
            config: config.clone(),
            backend,
            licenses,
            assignments,
            audit,
            verifier,
        }
    }

    /// Open the configured backend and build the services over it.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        let backend = LedgerBackend::open(config).await?;
        Ok(Self::new(backend, &config.ledger))
    }

    /// License lifecycle operations.
    pub fn licenses(&self) -> &LicenseService {
        &self.licenses
    }

    /// Assignment and revocation operations.
    pub fn assignments(&self) -> &AssignmentService {
        &self.assignments
    }

    /// History queries.
    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    /// Seat invariant checks.
    pub fn verifier(&self) -> &SeatVerifier {
        &self.verifier
    }

    /// The backend the services run on.
    pub fn backend(&self) -> &LedgerBackend {
        &self.backend
    }

    /// A context acting as `actor`, or as the configured system actor.
    pub fn context(&self, actor: Option<&str>) -> RequestContext {
        match actor {
            Some(actor) => RequestContext::new(actor),
            None => RequestContext::system(&self.config),
        }
    }
}

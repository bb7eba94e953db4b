//! In-memory store helpers
//!
//! Each call opens a private in-memory SQLite database with the schema
//! applied, so tests never share state. [`CandidateLookupFailure`] wraps a
//! real store to fail just the duplicate-candidate query.

use std::sync::Arc;

use async_trait::async_trait;

use core_kernel::{ClaimId, DomainPort, PortError, WorkflowRunId};
use domain_claims::{
    AuditLogEntry, Claim, ClaimInput, ClaimSearch, ClaimStore, NewWorkflowRun, StatusUpdate,
    WorkflowRun,
};
use infra_db::{DatabaseConfig, SqliteClaimStore};

pub async fn in_memory_store() -> Arc<SqliteClaimStore> {
    Arc::new(
        SqliteClaimStore::connect(DatabaseConfig::in_memory())
            .await
            .expect("in-memory SQLite store"),
    )
}

/// Creates a claim and walks it to `status` through `processing`
pub async fn seed_claim(
    store: &SqliteClaimStore,
    input: &ClaimInput,
    update: StatusUpdate,
) -> ClaimId {
    let id = store.create_claim(input).await.expect("seed claim");
    store.begin_processing(&id).await.expect("begin processing");
    store.update_status(&id, update).await.expect("seed status");
    id
}

/// Delegates to SQLite except for `find_duplicate_candidates`, which always
/// fails with a connection error
pub struct CandidateLookupFailure {
    inner: Arc<SqliteClaimStore>,
}

impl CandidateLookupFailure {
    pub fn new(inner: Arc<SqliteClaimStore>) -> Self {
        Self { inner }
    }
}

impl DomainPort for CandidateLookupFailure {}

#[async_trait]
impl ClaimStore for CandidateLookupFailure {
    async fn create_claim(&self, input: &ClaimInput) -> Result<ClaimId, PortError> {
        self.inner.create_claim(input).await
    }

    async fn get_claim(&self, id: &ClaimId) -> Result<Claim, PortError> {
        self.inner.get_claim(id).await
    }

    async fn update_status(&self, id: &ClaimId, update: StatusUpdate) -> Result<Claim, PortError> {
        self.inner.update_status(id, update).await
    }

    async fn begin_processing(&self, id: &ClaimId) -> Result<Claim, PortError> {
        self.inner.begin_processing(id).await
    }

    async fn record_workflow_run(&self, run: NewWorkflowRun) -> Result<WorkflowRunId, PortError> {
        self.inner.record_workflow_run(run).await
    }

    async fn workflow_runs(&self, id: &ClaimId) -> Result<Vec<WorkflowRun>, PortError> {
        self.inner.workflow_runs(id).await
    }

    async fn get_history(&self, id: &ClaimId) -> Result<Vec<AuditLogEntry>, PortError> {
        self.inner.get_history(id).await
    }

    async fn search_claims(&self, search: &ClaimSearch) -> Result<Vec<Claim>, PortError> {
        self.inner.search_claims(search).await
    }

    async fn find_duplicate_candidates(&self, _claim: &Claim, _window_days: u32) -> Result<Vec<Claim>, PortError> {
        Err(PortError::connection("candidate index unavailable"))
    }

    async fn vin_history(&self, vin: &str) -> Result<Vec<Claim>, PortError> {
        self.inner.vin_history(vin).await
    }
}

//! SQLite Claim Store Adapter
//!
//! Implements the [`ClaimStore`] port on top of [`ClaimsRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, SqliteClaimStore};
//! use domain_claims::ClaimStore;
//!
//! let store = SqliteClaimStore::connect(DatabaseConfig::in_memory()).await?;
//! let id = store.create_claim(&input).await?;
//! let history = store.get_history(&id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
    WorkflowRunId,
};
use domain_claims::sanitize::sanitize_claim_input;
use domain_claims::{
    AuditLogEntry, Claim, ClaimInput, ClaimSearch, ClaimStatus, ClaimStore, NewWorkflowRun,
    StatusUpdate, WorkflowRun,
};

use crate::error::DatabaseError;
use crate::pool::{create_pool, DatabaseConfig, DatabasePool};
use crate::repositories::claims::ClaimsRepository;
use crate::schema::apply_schema;

const ADAPTER_ID: &str = "sqlite-claim-store";

/// SQLite-backed implementation of the ClaimStore port
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::Conflict` -> `PortError::Conflict`
/// - constraint violations -> `PortError::Validation`
/// - busy / connection failures -> `PortError::Connection`
#[derive(Debug, Clone)]
pub struct SqliteClaimStore {
    repository: ClaimsRepository,
}

impl SqliteClaimStore {
    /// Opens the pool and applies the schema
    pub async fn connect(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = create_pool(config).await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool. The schema is applied here, once per store.
    pub async fn from_pool(pool: DatabasePool) -> Result<Self, DatabaseError> {
        apply_schema(&pool).await?;
        info!("Claim store ready");
        Ok(Self {
            repository: ClaimsRepository::new(pool),
        })
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for SqliteClaimStore {}

#[async_trait]
impl HealthCheckable for SqliteClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(self.repository.pool())
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ClaimStore for SqliteClaimStore {
    #[instrument(skip(self, input), fields(vin = %input.vin))]
    async fn create_claim(&self, input: &ClaimInput) -> Result<ClaimId, PortError> {
        let input = sanitize_claim_input(input);
        input
            .check()
            .map_err(|e| PortError::validation(e.to_string()))?;

        let id = ClaimId::generate();
        self.repository.insert(&id, &input).await?;
        info!(claim_id = %id, "Claim created");
        Ok(id)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: &ClaimId) -> Result<Claim, PortError> {
        let row = self
            .repository
            .get_by_id(id.as_str())
            .await
            .map_err(|e| claim_error(e, id))?;
        Ok(Claim::try_from(row)?)
    }

    #[instrument(skip(self, update), fields(claim_id = %id, status = %update.status))]
    async fn update_status(&self, id: &ClaimId, update: StatusUpdate) -> Result<Claim, PortError> {
        let row = self
            .repository
            .update_status(id.as_str(), &update)
            .await
            .map_err(|e| {
                if matches!(e, DatabaseError::Conflict(_)) {
                    warn!(error = %e, "Status update rejected");
                }
                claim_error(e, id)
            })?;
        debug!("Status updated");
        Ok(Claim::try_from(row)?)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn begin_processing(&self, id: &ClaimId) -> Result<Claim, PortError> {
        self.update_status(id, StatusUpdate::to(ClaimStatus::Processing))
            .await
    }

    #[instrument(skip(self, run), fields(claim_id = %run.claim_id, claim_type = %run.claim_type))]
    async fn record_workflow_run(&self, run: NewWorkflowRun) -> Result<WorkflowRunId, PortError> {
        let id = self
            .repository
            .insert_workflow_run(&run)
            .await
            .map_err(|e| match e {
                DatabaseError::ForeignKeyViolation(_) => PortError::not_found("Claim", &run.claim_id),
                other => other.into(),
            })?;
        debug!(run_id = id, "Workflow run recorded");
        Ok(WorkflowRunId::new(id))
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn workflow_runs(&self, id: &ClaimId) -> Result<Vec<WorkflowRun>, PortError> {
        let rows = self.repository.workflow_runs(id.as_str()).await?;
        rows.into_iter()
            .map(|row| WorkflowRun::try_from(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_history(&self, id: &ClaimId) -> Result<Vec<AuditLogEntry>, PortError> {
        let rows = self.repository.audit_entries(id.as_str()).await?;
        if rows.is_empty() {
            // every stored claim has at least its `created` entry
            return Err(PortError::not_found("Claim", id));
        }
        rows.into_iter()
            .map(|row| AuditLogEntry::try_from(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn search_claims(&self, search: &ClaimSearch) -> Result<Vec<Claim>, PortError> {
        if search.is_empty() {
            return Ok(Vec::new());
        }
        let vin = search
            .vin
            .as_deref()
            .map(str::trim)
            .filter(|vin| !vin.is_empty());
        let rows = self.repository.search(vin, search.incident_date).await?;
        into_claims(rows)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn find_duplicate_candidates(
        &self,
        claim: &Claim,
        window_days: u32,
    ) -> Result<Vec<Claim>, PortError> {
        let rows = self
            .repository
            .duplicate_candidates(
                claim.id.as_str(),
                &claim.details.vin,
                claim.details.incident_date,
                window_days,
            )
            .await?;
        debug!(candidates = rows.len(), "Duplicate candidates fetched");
        into_claims(rows)
    }

    #[instrument(skip(self))]
    async fn vin_history(&self, vin: &str) -> Result<Vec<Claim>, PortError> {
        let rows = self.repository.find_by_vin(vin).await?;
        into_claims(rows)
    }
}

fn claim_error(error: DatabaseError, id: &ClaimId) -> PortError {
    match error {
        DatabaseError::NotFound(_) => PortError::not_found("Claim", id),
        other => other.into(),
    }
}

fn into_claims(rows: Vec<crate::repositories::claims::ClaimRow>) -> Result<Vec<Claim>, PortError> {
    rows.into_iter()
        .map(|row| Claim::try_from(row).map_err(PortError::from))
        .collect()
}

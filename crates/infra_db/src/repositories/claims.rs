//! Claims repository implementation
//!
//! This module provides database access for the claim aggregate, its
//! append-only audit log, and the workflow runs recorded against it. Amounts
//! are stored as decimal text so they round-trip exactly.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use core_kernel::{AuditEntryId, ClaimId, WorkflowRunId};
use domain_claims::{
    AuditAction, AuditLogEntry, Claim, ClaimError, ClaimInput, ClaimStatus, ClaimType,
    NewWorkflowRun, StatusUpdate, WorkflowRun,
};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

const CLAIM_COLUMNS: &str = "id, policy_number, vin, vehicle_year, vehicle_make, vehicle_model, \
     incident_date, incident_description, damage_description, estimated_damage, claim_type, \
     status, payout_amount, created_at, updated_at";

/// Repository for managing claims data
///
/// Every write that changes a claim's status also appends its audit entry in
/// the same transaction.
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: DatabasePool,
}

impl ClaimsRepository {
    /// Creates a new ClaimsRepository with the given connection pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Inserts a `pending` claim and its `created` audit entry
    ///
    /// The input is expected to be sanitized and validated already.
    pub async fn insert(&self, id: &ClaimId, input: &ClaimInput) -> Result<ClaimRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO claims (
                id, policy_number, vin, vehicle_year, vehicle_make, vehicle_model,
                incident_date, incident_description, damage_description, estimated_damage,
                claim_type, status, payout_amount, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, NULL, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(&input.policy_number)
        .bind(&input.vin)
        .bind(input.vehicle_year)
        .bind(&input.vehicle_make)
        .bind(&input.vehicle_model)
        .bind(input.incident_date)
        .bind(&input.incident_description)
        .bind(&input.damage_description)
        .bind(input.estimated_damage.map(|amount| amount.to_string()))
        .bind(ClaimStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO claim_audit_log (claim_id, action, old_status, new_status, details, created_at)
            VALUES (?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(AuditAction::Created.as_str())
        .bind(ClaimStatus::Pending.as_str())
        .bind("Claim submitted")
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = fetch_claim(&mut *tx, id.as_str()).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Retrieves a claim by its identifier
    pub async fn get_by_id(&self, id: &str) -> Result<ClaimRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fetch_claim(&mut *conn, id).await
    }

    /// Applies a status change and appends its audit entry atomically
    ///
    /// The current status is read inside the transaction and the transition
    /// checked against the claim state machine. The update itself is guarded
    /// on the status that was read, so a concurrent writer makes this call
    /// fail with `Conflict` rather than overwrite.
    pub async fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<ClaimRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Take the write lock before reading so concurrent writers queue on
        // busy_timeout instead of failing the lock upgrade.
        let touched = sqlx::query("UPDATE claims SET updated_at = updated_at WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", id));
        }

        let current: String = sqlx::query_scalar("SELECT status FROM claims WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let current = parse_status("status", &current)?;
        current.check_transition(update.status).map_err(|e| match e {
            ClaimError::AlreadyProcessing => {
                DatabaseError::Conflict(format!("claim {id} is already processing"))
            }
            other => DatabaseError::Conflict(other.to_string()),
        })?;

        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = ?,
                claim_type = COALESCE(?, claim_type),
                payout_amount = COALESCE(?, payout_amount),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.claim_type.map(|t| t.as_str()))
        .bind(update.payout_amount.map(|amount| amount.to_string()))
        .bind(now)
        .bind(id)
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            return Err(DatabaseError::Conflict(format!(
                "claim {id} changed status while updating to {}",
                update.status
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO claim_audit_log (claim_id, action, old_status, new_status, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(AuditAction::StatusChanged.as_str())
        .bind(current.as_str())
        .bind(update.status.as_str())
        .bind(&update.details)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = fetch_claim(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn insert_workflow_run(&self, run: &NewWorkflowRun) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO workflow_runs (claim_id, claim_type, classifier_output, pipeline_output, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.claim_id.as_str())
        .bind(run.claim_type.as_str())
        .bind(&run.classifier_output)
        .bind(&run.pipeline_output)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn workflow_runs(&self, claim_id: &str) -> Result<Vec<WorkflowRunRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, WorkflowRunRow>(
            r#"
            SELECT id, claim_id, claim_type, classifier_output, pipeline_output, created_at
            FROM workflow_runs
            WHERE claim_id = ?
            ORDER BY id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Audit entries for a claim, in insertion order
    pub async fn audit_entries(&self, claim_id: &str) -> Result<Vec<AuditRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, claim_id, action, old_status, new_status, details, created_at
            FROM claim_audit_log
            WHERE claim_id = ?
            ORDER BY id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Exact VIN and/or exact incident date; at least one must be given
    pub async fn search(
        &self,
        vin: Option<&str>,
        incident_date: Option<NaiveDate>,
    ) -> Result<Vec<ClaimRow>, DatabaseError> {
        if vin.is_none() && incident_date.is_none() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE (?1 IS NULL OR vin = ?1) AND (?2 IS NULL OR incident_date = ?2) \
             ORDER BY rowid"
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(vin)
            .bind(incident_date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Same VIN, incident date within `window_days` either side, other ids
    pub async fn duplicate_candidates(
        &self,
        claim_id: &str,
        vin: &str,
        incident_date: NaiveDate,
        window_days: u32,
    ) -> Result<Vec<ClaimRow>, DatabaseError> {
        let window = Duration::days(i64::from(window_days));
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE vin = ? AND id <> ? AND incident_date BETWEEN ? AND ? \
             ORDER BY rowid"
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(vin)
            .bind(claim_id)
            .bind(incident_date - window)
            .bind(incident_date + window)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every claim on a VIN, oldest first
    pub async fn find_by_vin(&self, vin: &str) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE vin = ? ORDER BY rowid");
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(vin)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

async fn fetch_claim<'c, E>(executor: E, id: &str) -> Result<ClaimRow, DatabaseError>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = ?");
    sqlx::query_as::<_, ClaimRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", id))
}

fn parse_status(column: &str, value: &str) -> Result<ClaimStatus, DatabaseError> {
    ClaimStatus::from_str(value).map_err(|e| DatabaseError::serialization(column, e))
}

fn parse_claim_type(value: &str) -> Result<ClaimType, DatabaseError> {
    ClaimType::from_str(value).map_err(|e| DatabaseError::serialization("claim_type", e))
}

fn parse_amount(column: &str, value: Option<&str>) -> Result<Option<Decimal>, DatabaseError> {
    value
        .map(|text| Decimal::from_str(text).map_err(|e| DatabaseError::serialization(column, e)))
        .transpose()
}

fn parse_claim_id(value: &str) -> Result<ClaimId, DatabaseError> {
    ClaimId::from_str(value).map_err(|e| DatabaseError::serialization("claim_id", e))
}

/// Database row for claim
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: String,
    pub policy_number: String,
    pub vin: String,
    pub vehicle_year: Option<i32>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub incident_date: NaiveDate,
    pub incident_description: String,
    pub damage_description: String,
    pub estimated_damage: Option<String>,
    pub claim_type: Option<String>,
    pub status: String,
    pub payout_amount: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(Claim {
            id: parse_claim_id(&row.id)?,
            claim_type: row.claim_type.as_deref().map(parse_claim_type).transpose()?,
            status: parse_status("status", &row.status)?,
            payout_amount: parse_amount("payout_amount", row.payout_amount.as_deref())?,
            details: ClaimInput {
                estimated_damage: parse_amount("estimated_damage", row.estimated_damage.as_deref())?,
                policy_number: row.policy_number,
                vin: row.vin,
                vehicle_year: row.vehicle_year,
                vehicle_make: row.vehicle_make,
                vehicle_model: row.vehicle_model,
                incident_date: row.incident_date,
                incident_description: row.incident_description,
                damage_description: row.damage_description,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for an audit log entry
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: i64,
    pub claim_id: String,
    pub action: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = DatabaseError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            id: AuditEntryId::new(row.id),
            claim_id: parse_claim_id(&row.claim_id)?,
            action: AuditAction::from_str(&row.action)
                .map_err(|e| DatabaseError::serialization("action", e))?,
            old_status: row.old_status.as_deref().map(|s| parse_status("old_status", s)).transpose()?,
            new_status: row.new_status.as_deref().map(|s| parse_status("new_status", s)).transpose()?,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

/// Database row for a workflow run
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRunRow {
    pub id: i64,
    pub claim_id: String,
    pub claim_type: String,
    pub classifier_output: String,
    pub pipeline_output: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<WorkflowRunRow> for WorkflowRun {
    type Error = DatabaseError;

    fn try_from(row: WorkflowRunRow) -> Result<Self, Self::Error> {
        Ok(WorkflowRun {
            id: WorkflowRunId::new(row.id),
            claim_id: parse_claim_id(&row.claim_id)?,
            claim_type: parse_claim_type(&row.claim_type)?,
            classifier_output: row.classifier_output,
            pipeline_output: row.pipeline_output,
            created_at: row.created_at,
        })
    }
}

//! Audit trail and workflow run records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AuditEntryId, ClaimId, WorkflowRunId};
use crate::claim::{ClaimStatus, ClaimType};
use crate::error::ClaimError;

/// What an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StatusChanged => "status_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(AuditAction::Created),
            "status_changed" => Ok(AuditAction::StatusChanged),
            other => Err(ClaimError::validation(format!("unknown audit action: {other}"))),
        }
    }
}

/// One row of the append-only audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub claim_id: ClaimId,
    pub action: AuditAction,
    pub old_status: Option<ClaimStatus>,
    pub new_status: Option<ClaimStatus>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn is_transition(&self, from: ClaimStatus, to: ClaimStatus) -> bool {
        self.action == AuditAction::StatusChanged
            && self.old_status == Some(from)
            && self.new_status == Some(to)
    }
}

/// One execution of the pipeline (or escalation gate) for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: WorkflowRunId,
    pub claim_id: ClaimId,
    pub claim_type: ClaimType,
    pub classifier_output: String,
    pub pipeline_output: String,
    pub created_at: DateTime<Utc>,
}

/// A run about to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkflowRun {
    pub claim_id: ClaimId,
    pub claim_type: ClaimType,
    pub classifier_output: String,
    pub pipeline_output: String,
}

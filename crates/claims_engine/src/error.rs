//! Workflow errors
//!
//! Every variant raised after a claim exists carries its id; stage-scoped
//! variants also name the stage.

use thiserror::Error;

use core_kernel::{ClaimId, PortError};

use crate::orchestrator::CLASSIFICATION;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed submission, rejected before anything is written
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Claim not found: {0}")]
    NotFound(String),

    /// Classifier returned a label outside the known claim types
    #[error("Claim {claim_id}: classification failed: {message}")]
    Classification { claim_id: ClaimId, message: String },

    #[error("Claim {claim_id}: stage {stage} failed: {source}")]
    StageFailure {
        claim_id: ClaimId,
        stage: String,
        #[source]
        source: PortError,
    },

    /// The claim already has a run in flight
    #[error("Claim {claim_id} is already processing")]
    ConcurrencyConflict { claim_id: ClaimId },

    #[error("Claim {claim_id}: cancelled before stage {stage}")]
    Cancelled { claim_id: ClaimId, stage: String },

    /// Persistence failed outside any stage
    #[error(
        "Store error{}: {source}",
        .claim_id.as_ref().map(|id| format!(" for claim {id}")).unwrap_or_default()
    )]
    Store {
        claim_id: Option<ClaimId>,
        #[source]
        source: PortError,
    },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn stage_failure(claim_id: &ClaimId, stage: impl Into<String>, source: PortError) -> Self {
        WorkflowError::StageFailure {
            claim_id: claim_id.clone(),
            stage: stage.into(),
            source,
        }
    }

    /// Store error for an operation on one claim. `NotFound` and `Conflict`
    /// keep their meaning instead of being wrapped.
    pub fn from_store(claim_id: &ClaimId, source: PortError) -> Self {
        match source {
            PortError::NotFound { .. } => WorkflowError::NotFound(claim_id.to_string()),
            PortError::Conflict { .. } => WorkflowError::ConcurrencyConflict {
                claim_id: claim_id.clone(),
            },
            PortError::Validation { message, .. } => WorkflowError::Validation(message),
            source => WorkflowError::Store {
                claim_id: Some(claim_id.clone()),
                source,
            },
        }
    }

    pub fn claim_id(&self) -> Option<&ClaimId> {
        match self {
            WorkflowError::Classification { claim_id, .. }
            | WorkflowError::StageFailure { claim_id, .. }
            | WorkflowError::ConcurrencyConflict { claim_id }
            | WorkflowError::Cancelled { claim_id, .. } => Some(claim_id),
            WorkflowError::Store { claim_id, .. } => claim_id.as_ref(),
            WorkflowError::Validation(_) | WorkflowError::NotFound(_) => None,
        }
    }

    pub fn stage(&self) -> Option<&str> {
        match self {
            WorkflowError::StageFailure { stage, .. } | WorkflowError::Cancelled { stage, .. } => {
                Some(stage)
            }
            WorkflowError::Classification { .. } => Some(CLASSIFICATION),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkflowError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, WorkflowError::ConcurrencyConflict { .. })
    }

    /// True when the underlying cause was a wall-clock budget running out
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WorkflowError::StageFailure {
                source: PortError::Timeout { .. },
                ..
            }
        )
    }

    /// Text written to the audit log when a run fails with this error
    pub fn failure_details(&self) -> String {
        match self {
            WorkflowError::Cancelled { stage, .. } => format!("cancelled before stage {stage}"),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ClaimId {
        "CLM-1234ABCD".parse().unwrap()
    }

    #[test]
    fn test_stage_failure_display_names_claim_and_stage() {
        let error = WorkflowError::stage_failure(&id(), "vehicle_valuation", PortError::internal("down"));
        let text = error.to_string();
        assert!(text.contains("CLM-1234ABCD"));
        assert!(text.contains("vehicle_valuation"));
        assert_eq!(error.stage(), Some("vehicle_valuation"));
    }

    #[test]
    fn test_classification_failure_names_its_stage() {
        let error = WorkflowError::Classification {
            claim_id: id(),
            message: "unknown label 'fender_bender'".into(),
        };
        assert_eq!(error.stage(), Some("classification"));
        assert_eq!(error.claim_id(), Some(&id()));
        assert_eq!(WorkflowError::validation("vin").stage(), None);
    }

    #[test]
    fn test_store_display_with_and_without_claim() {
        let scoped = WorkflowError::Store {
            claim_id: Some(id()),
            source: PortError::connection("locked"),
        };
        assert!(scoped.to_string().starts_with("Store error for claim CLM-1234ABCD"));

        let unscoped = WorkflowError::Store {
            claim_id: None,
            source: PortError::connection("locked"),
        };
        assert!(unscoped.to_string().starts_with("Store error: "));
    }

    #[test]
    fn test_store_conflict_becomes_concurrency_conflict() {
        let error = WorkflowError::from_store(&id(), PortError::conflict("already processing"));
        assert!(error.is_conflict());
        assert_eq!(error.claim_id(), Some(&id()));
    }

    #[test]
    fn test_cancelled_details() {
        let error = WorkflowError::Cancelled {
            claim_id: id(),
            stage: "damage_assessment".into(),
        };
        assert_eq!(error.failure_details(), "cancelled before stage damage_assessment");
    }
}

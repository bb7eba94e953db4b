//! Claim aggregate
//!
//! A claim is created `pending`, moves to `processing` when a run starts, and
//! lands on exactly one terminal status per run. Terminal claims may be
//! reprocessed, which re-enters `processing`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::ClaimId;
use crate::audit::WorkflowRun;
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Stored, not yet picked up
    Pending,
    /// A run is in flight
    Processing,
    Open,
    Duplicate,
    Closed,
    FraudSuspected,
    PartialLoss,
    /// Escalated to a human reviewer
    NeedsReview,
    Failed,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 9] = [
        ClaimStatus::Pending,
        ClaimStatus::Processing,
        ClaimStatus::Open,
        ClaimStatus::Duplicate,
        ClaimStatus::Closed,
        ClaimStatus::FraudSuspected,
        ClaimStatus::PartialLoss,
        ClaimStatus::NeedsReview,
        ClaimStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Processing => "processing",
            ClaimStatus::Open => "open",
            ClaimStatus::Duplicate => "duplicate",
            ClaimStatus::Closed => "closed",
            ClaimStatus::FraudSuspected => "fraud_suspected",
            ClaimStatus::PartialLoss => "partial_loss",
            ClaimStatus::NeedsReview => "needs_review",
            ClaimStatus::Failed => "failed",
        }
    }

    /// Terminal for the current run; a later reprocess may leave it again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClaimStatus::Pending | ClaimStatus::Processing)
    }

    /// Checks if transition is valid
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        match (*self, target) {
            (Pending, Processing) => true,
            (Processing, to) => to.is_terminal(),
            (from, Processing) => from.is_terminal(),
            _ => false,
        }
    }

    /// Like [`can_transition_to`](Self::can_transition_to), but says why not.
    /// A second run on a processing claim is reported as
    /// [`ClaimError::AlreadyProcessing`] so callers can surface a conflict.
    pub fn check_transition(&self, target: ClaimStatus) -> Result<(), ClaimError> {
        if *self == ClaimStatus::Processing && target == ClaimStatus::Processing {
            return Err(ClaimError::AlreadyProcessing);
        }
        if !self.can_transition_to(target) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ClaimError::UnknownStatus(s.to_string()))
    }
}

/// Classification label assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    New,
    Duplicate,
    TotalLoss,
    Fraud,
    PartialLoss,
}

impl ClaimType {
    pub const ALL: [ClaimType; 5] = [
        ClaimType::New,
        ClaimType::Duplicate,
        ClaimType::TotalLoss,
        ClaimType::Fraud,
        ClaimType::PartialLoss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::New => "new",
            ClaimType::Duplicate => "duplicate",
            ClaimType::TotalLoss => "total_loss",
            ClaimType::Fraud => "fraud",
            ClaimType::PartialLoss => "partial_loss",
        }
    }

    /// Status a successful pipeline run ends in
    pub fn final_status(&self) -> ClaimStatus {
        match self {
            ClaimType::New => ClaimStatus::Open,
            ClaimType::Duplicate => ClaimStatus::Duplicate,
            ClaimType::TotalLoss => ClaimStatus::Closed,
            ClaimType::Fraud => ClaimStatus::FraudSuspected,
            ClaimType::PartialLoss => ClaimStatus::PartialLoss,
        }
    }

    /// Fraud-typed claims carry their own risk gate and bypass escalation
    pub fn skips_escalation(&self) -> bool {
        matches!(self, ClaimType::Fraud)
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict: only the five labels are accepted (surrounding whitespace aside).
impl FromStr for ClaimType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        ClaimType::ALL
            .into_iter()
            .find(|claim_type| claim_type.as_str() == label)
            .ok_or_else(|| ClaimError::UnknownClaimType(s.to_string()))
    }
}

/// Submission payload for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClaimInput {
    #[validate(length(min = 1, max = 64))]
    pub policy_number: String,
    #[validate(length(min = 1, max = 32))]
    pub vin: String,
    #[serde(default)]
    pub vehicle_year: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub vehicle_make: Option<String>,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub vehicle_model: Option<String>,
    pub incident_date: NaiveDate,
    #[validate(length(min = 1, max = 5000))]
    pub incident_description: String,
    #[validate(length(min = 1, max = 3000))]
    pub damage_description: String,
    #[serde(default)]
    pub estimated_damage: Option<Decimal>,
}

impl ClaimInput {
    /// Structural validation. Runs before anything is persisted.
    pub fn check(&self) -> Result<(), ClaimError> {
        let mut invalid: Vec<String> = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect(),
        };

        if let Some(year) = self.vehicle_year {
            let latest = Utc::now().year() + 1;
            if !(1900..=latest).contains(&year) {
                invalid.push("vehicle_year".to_string());
            }
        }
        if matches!(self.estimated_damage, Some(amount) if amount.is_sign_negative()) {
            invalid.push("estimated_damage".to_string());
        }
        if self.vin.trim().is_empty() && !invalid.iter().any(|f| f == "vin") {
            invalid.push("vin".to_string());
        }
        if self.policy_number.trim().is_empty() && !invalid.iter().any(|f| f == "policy_number") {
            invalid.push("policy_number".to_string());
        }

        if invalid.is_empty() {
            return Ok(());
        }
        invalid.sort();
        invalid.dedup();
        Err(ClaimError::validation(format!("invalid fields: {}", invalid.join(", "))))
    }
}

/// Fields applied together with a status change
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ClaimStatus,
    pub details: Option<String>,
    pub claim_type: Option<ClaimType>,
    pub payout_amount: Option<Decimal>,
}

impl StatusUpdate {
    pub fn to(status: ClaimStatus) -> Self {
        Self {
            status,
            details: None,
            claim_type: None,
            payout_amount: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_claim_type(mut self, claim_type: ClaimType) -> Self {
        self.claim_type = Some(claim_type);
        self
    }

    pub fn with_payout(mut self, payout_amount: Option<Decimal>) -> Self {
        self.payout_amount = payout_amount;
        self
    }
}

/// A stored claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    #[serde(flatten)]
    pub details: ClaimInput,
    pub claim_type: Option<ClaimType>,
    pub status: ClaimStatus,
    pub payout_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    pub fn is_processing(&self) -> bool {
        self.status == ClaimStatus::Processing
    }

    /// Amount the high-value rule looks at: the settled payout if one exists,
    /// otherwise the claimant's estimate.
    pub fn amount_at_stake(&self) -> Option<Decimal> {
        self.payout_amount.or(self.details.estimated_damage)
    }
}

/// A claim together with every workflow run recorded for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimView {
    #[serde(flatten)]
    pub claim: Claim,
    pub workflow_runs: Vec<WorkflowRun>,
}

impl ClaimView {
    pub fn latest_run(&self) -> Option<&WorkflowRun> {
        self.workflow_runs.last()
    }
}

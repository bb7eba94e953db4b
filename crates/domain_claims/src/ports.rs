//! Collaborator ports for the claims domain
//!
//! The engine depends on these traits only. The SQLite store and the
//! rule-based collaborators are adapters in other crates; tests substitute
//! deterministic fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, DomainPort, PortError, WorkflowRunId};
use crate::audit::{AuditLogEntry, NewWorkflowRun, WorkflowRun};
use crate::claim::{Claim, ClaimInput, StatusUpdate};

/// Exact-match search filters. An empty search matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSearch {
    pub vin: Option<String>,
    pub incident_date: Option<NaiveDate>,
}

impl ClaimSearch {
    pub fn is_empty(&self) -> bool {
        self.vin.as_deref().map_or(true, |vin| vin.trim().is_empty()) && self.incident_date.is_none()
    }
}

/// Durable claim aggregate, audit log, and workflow-run history
#[async_trait]
pub trait ClaimStore: DomainPort {
    /// Validates, assigns an id, and stores the claim as `pending` together
    /// with its `created` audit entry.
    async fn create_claim(&self, input: &ClaimInput) -> Result<ClaimId, PortError>;

    async fn get_claim(&self, id: &ClaimId) -> Result<Claim, PortError>;

    /// Applies a status change and appends its audit entry atomically. The
    /// transition is checked against the state machine inside the same
    /// transaction; an illegal one is a `Conflict` and writes nothing.
    async fn update_status(&self, id: &ClaimId, update: StatusUpdate) -> Result<Claim, PortError>;

    /// Moves a claim into `processing`. Fails with `Conflict` and writes
    /// nothing if the claim is already processing.
    async fn begin_processing(&self, id: &ClaimId) -> Result<Claim, PortError>;

    async fn record_workflow_run(&self, run: NewWorkflowRun) -> Result<WorkflowRunId, PortError>;

    /// Runs for a claim, oldest first
    async fn workflow_runs(&self, id: &ClaimId) -> Result<Vec<WorkflowRun>, PortError>;

    /// Audit entries for a claim, in insertion order
    async fn get_history(&self, id: &ClaimId) -> Result<Vec<AuditLogEntry>, PortError>;

    async fn search_claims(&self, search: &ClaimSearch) -> Result<Vec<Claim>, PortError>;

    /// Other claims with the same VIN whose incident date lies within
    /// `window_days` of this claim's.
    async fn find_duplicate_candidates(&self, claim: &Claim, window_days: u32) -> Result<Vec<Claim>, PortError>;

    /// Every claim on a VIN, oldest first
    async fn vin_history(&self, vin: &str) -> Result<Vec<Claim>, PortError>;
}

/// Raw classifier output. The label is parsed by the orchestrator, which
/// rejects anything outside the five known claim types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub rationale: String,
}

impl Classification {
    pub fn new(label: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rationale: rationale.into(),
        }
    }
}

#[async_trait]
pub trait Classifier: DomainPort {
    async fn classify(&self, claim: &Claim) -> Result<Classification, PortError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub active: bool,
    pub coverage: String,
    pub deductible: Decimal,
}

#[async_trait]
pub trait PolicyLookup: DomainPort {
    async fn lookup_policy(&self, policy_number: &str) -> Result<PolicyInfo, PortError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub vin: String,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl From<&ClaimInput> for VehicleDescriptor {
    fn from(input: &ClaimInput) -> Self {
        Self {
            vin: input.vin.clone(),
            year: input.vehicle_year,
            make: input.vehicle_make.clone(),
            model: input.vehicle_model.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleValue {
    pub value: Decimal,
    pub source: String,
}

#[async_trait]
pub trait VehicleValuation: DomainPort {
    async fn vehicle_value(&self, vehicle: &VehicleDescriptor) -> Result<VehicleValue, PortError>;
}

//! Claims Domain
//!
//! This crate holds everything about a claim that does not touch a database
//! or a network: the aggregate and its status machine, input sanitization,
//! and the three deterministic decision engines that gate and score claims.
//!
//! # Claim Lifecycle
//!
//! ```text
//!            submit              classify + gate + pipeline
//! pending ──────────▶ processing ──────────────────────────▶ open | duplicate | closed
//!                         ▲                                   fraud_suspected | partial_loss
//!                         │           reprocess               needs_review | failed
//!                         └───────────────────────────────────────────┘
//! ```
//!
//! Collaborators (store, classifier, lookups, specialist stages) are reached
//! only through the traits in [`ports`] and [`pipeline`].

pub mod audit;
pub mod claim;
pub mod damage;
pub mod duplicate;
pub mod error;
pub mod escalation;
pub mod fraud;
pub mod pipeline;
pub mod ports;
pub mod sanitize;
pub mod text;

pub use audit::{AuditAction, AuditLogEntry, NewWorkflowRun, WorkflowRun};
pub use claim::{Claim, ClaimInput, ClaimStatus, ClaimType, ClaimView, StatusUpdate};
pub use duplicate::{DuplicateAssessment, DuplicateCandidate, DuplicateRules, SimilarityBand};
pub use error::ClaimError;
pub use escalation::{EscalationDecision, EscalationReason, EscalationRules, Priority};
pub use fraud::{FraudAssessment, FraudLikelihood, FraudRules};
pub use pipeline::{PipelineRegistry, Stage, StageContext, StageOutput, StageRecord};
pub use ports::{
    ClaimSearch, ClaimStore, Classification, Classifier, PolicyInfo, PolicyLookup,
    VehicleDescriptor, VehicleValuation, VehicleValue,
};

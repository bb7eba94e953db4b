//! Core Kernel - Foundational types shared by every claims crate
//!
//! This crate provides the building blocks used across the workspace:
//! - Claim and row identifiers
//! - Scores clamped to the `[0, 100]` range
//! - The port error vocabulary adapters translate into
//! - A retry policy for transient collaborator failures

pub mod error;
pub mod identifiers;
pub mod ports;
pub mod retry;
pub mod score;

pub use error::CoreError;
pub use identifiers::{AuditEntryId, ClaimId, WorkflowRunId};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
pub use retry::RetryPolicy;
pub use score::Score;

//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claims test suite.
//!
//! # Modules
//!
//! - `fixtures`: Scenario claims and well-known reference values
//! - `builders`: Builder for claim submissions
//! - `fakes`: Deterministic collaborators (classifiers, stages, lookups)
//! - `store`: In-memory SQLite store helpers
//! - `assertions`: Assertion helpers for claims and audit trails
//! - `generators`: Property-based and randomized claim generators

pub mod assertions;
pub mod builders;
pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod store;

pub use assertions::*;
pub use builders::*;
pub use fakes::*;
pub use fixtures::*;
pub use generators::*;
pub use store::*;

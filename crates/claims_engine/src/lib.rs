//! Claims Engine - the workflow around a claim
//!
//! [`ClaimWorkflow`] sequences the decision engines of `domain_claims` around
//! its collaborators: a [`Classifier`](domain_claims::Classifier), a
//! [`ClaimStore`](domain_claims::ClaimStore), and the specialist stages of
//! each claim type's pipeline.
//!
//! The crate also ships what a deployment without external services needs:
//! a rule-based [`KeywordClassifier`], policy and valuation lookups backed by
//! a reference-data file, and the built-in [`stages`].

pub mod cancel;
pub mod classifier;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod reference;
pub mod stages;

pub use cancel::CancellationFlag;
pub use classifier::{KeywordClassifier, RetryingClassifier};
pub use config::EngineConfig;
pub use error::WorkflowError;
pub use orchestrator::{truncate_details, ClaimWorkflow, RunOutcome};
pub use reference::{ReferenceData, ReferenceValuation, StaticPolicyLookup, ValuationRules};
pub use stages::{default_pipelines, StageDeps};

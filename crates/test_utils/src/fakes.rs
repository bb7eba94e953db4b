//! Deterministic collaborators
//!
//! Stand-ins for the classifier, the specialist stages, and the policy and
//! valuation lookups. Every fake either returns a fixed answer or follows a
//! script, so workflow tests exercise the state machine without variance.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;

use core_kernel::{DomainPort, PortError};
use domain_claims::{
    Claim, Classification, Classifier, PolicyInfo, PolicyLookup, Stage, StageContext, StageOutput,
    VehicleDescriptor, VehicleValuation, VehicleValue,
};

/// A specific, hedge-free rationale that never trips the low-confidence rule
pub const CONFIDENT_RATIONALE: &str = "Rear bumper damage from a low-speed collision at a stoplight.";

// ============================================================================
// Classifiers
// ============================================================================

/// Always returns the same label and rationale, counting calls
pub struct StubClassifier {
    label: String,
    rationale: String,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_rationale(label, CONFIDENT_RATIONALE)
    }

    pub fn with_rationale(label: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rationale: rationale.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for StubClassifier {}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _claim: &Claim) -> Result<Classification, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification::new(self.label.clone(), self.rationale.clone()))
    }
}

/// One scripted classifier answer
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Label { label: String, rationale: String },
    Fail(fn() -> PortError),
}

impl ScriptStep {
    pub fn label(label: &str) -> Self {
        ScriptStep::Label {
            label: label.to_string(),
            rationale: CONFIDENT_RATIONALE.to_string(),
        }
    }

    fn play(&self) -> Result<Classification, PortError> {
        match self {
            ScriptStep::Label { label, rationale } => {
                Ok(Classification::new(label.clone(), rationale.clone()))
            }
            ScriptStep::Fail(error) => Err(error()),
        }
    }
}

/// Replays scripted answers in order; once the script runs out the last
/// step repeats.
pub struct ScriptedClassifier {
    script: Vec<ScriptStep>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// Labels returned one per call, all with a confident rationale
    pub fn labels(labels: &[&str]) -> Self {
        Self::new(labels.iter().map(|label| ScriptStep::label(label)).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for ScriptedClassifier {}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _claim: &Claim) -> Result<Classification, PortError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .get(call)
            .or_else(|| self.script.last())
            .map(ScriptStep::play)
            .unwrap_or_else(|| Err(PortError::internal("classifier script is empty")))
    }
}

/// Never answers in time
pub struct SlowClassifier {
    delay: Duration,
}

impl SlowClassifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl DomainPort for SlowClassifier {}

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(&self, _claim: &Claim) -> Result<Classification, PortError> {
        tokio::time::sleep(self.delay).await;
        Ok(Classification::new("new", CONFIDENT_RATIONALE))
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Appends its name to a shared journal and reports how many records it saw
pub struct RecordingStage {
    name: String,
    journal: Arc<Mutex<Vec<String>>>,
    payout: Option<Decimal>,
}

impl RecordingStage {
    pub fn new(name: impl Into<String>, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            journal,
            payout: None,
        }
    }

    pub fn with_payout(mut self, amount: Decimal) -> Self {
        self.payout = Some(amount);
        self
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        self.journal.lock().unwrap().push(self.name.clone());
        let output = StageOutput::new(
            format!("{} ran", self.name),
            json!({ "seen": context.records().len() }),
        );
        Ok(match self.payout {
            Some(amount) => output.with_payout(amount),
            None => output,
        })
    }
}

/// Fails with a fresh error from `error` every time
pub struct FailingStage {
    name: String,
    error: fn() -> PortError,
}

impl FailingStage {
    pub fn new(name: impl Into<String>, error: fn() -> PortError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _context: &StageContext) -> Result<StageOutput, PortError> {
        Err((self.error)())
    }
}

/// Sleeps before answering
pub struct SlowStage {
    name: String,
    delay: Duration,
}

impl SlowStage {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _context: &StageContext) -> Result<StageOutput, PortError> {
        tokio::time::sleep(self.delay).await;
        Ok(StageOutput::new(format!("{} finished", self.name), json!({})))
    }
}

/// Runs a closure when it executes; lets a test act between stages
pub struct HookStage<F> {
    name: String,
    hook: F,
}

impl<F: Fn() + Send + Sync> HookStage<F> {
    pub fn new(name: impl Into<String>, hook: F) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }
}

#[async_trait]
impl<F: Fn() + Send + Sync> Stage for HookStage<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _context: &StageContext) -> Result<StageOutput, PortError> {
        (self.hook)();
        Ok(StageOutput::new(format!("{} ran", self.name), json!({})))
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// Same answer for every policy number
pub struct FixedPolicyLookup {
    info: PolicyInfo,
}

impl FixedPolicyLookup {
    pub fn active(deductible: Decimal) -> Self {
        Self {
            info: PolicyInfo {
                active: true,
                coverage: "comprehensive".to_string(),
                deductible,
            },
        }
    }

    pub fn lapsed() -> Self {
        Self {
            info: PolicyInfo {
                active: false,
                coverage: "none".to_string(),
                deductible: Decimal::ZERO,
            },
        }
    }
}

impl DomainPort for FixedPolicyLookup {}

#[async_trait]
impl PolicyLookup for FixedPolicyLookup {
    async fn lookup_policy(&self, _policy_number: &str) -> Result<PolicyInfo, PortError> {
        Ok(self.info.clone())
    }
}

/// Same value for every vehicle
pub struct FixedValuation {
    value: Decimal,
}

impl FixedValuation {
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }
}

impl DomainPort for FixedValuation {}

#[async_trait]
impl VehicleValuation for FixedValuation {
    async fn vehicle_value(&self, _vehicle: &VehicleDescriptor) -> Result<VehicleValue, PortError> {
        Ok(VehicleValue {
            value: self.value,
            source: "fixed".to_string(),
        })
    }
}

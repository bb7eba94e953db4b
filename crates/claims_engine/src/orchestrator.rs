//! Claim workflow orchestration
//!
//! [`ClaimWorkflow`] owns the status machine around one run:
//!
//! 1. validate and create the claim (`pending`), then move it to `processing`
//! 2. classify it through the injected [`Classifier`]
//! 3. unless the label is `fraud`, run the escalation gate; a flagged claim
//!    stops at `needs_review`
//! 4. run the label's pipeline, one stage at a time, threading a
//!    [`StageContext`] through it
//! 5. record the workflow run and move to the label's final status
//!
//! Any failure after step 1 moves the claim to `failed` with the error text
//! before the error is returned. Nothing here retries.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use core_kernel::{ClaimId, PortError, Score, WorkflowRunId};
use domain_claims::{
    AuditLogEntry, Claim, ClaimInput, ClaimSearch, ClaimStatus, ClaimStore, ClaimType, ClaimView,
    Classification, Classifier, DuplicateRules, EscalationDecision, EscalationRules,
    NewWorkflowRun, PipelineRegistry, StageContext, StageRecord, StatusUpdate,
};

use crate::cancel::CancellationFlag;
use crate::classifier::{KeywordClassifier, RetryingClassifier};
use crate::config::{EngineConfig, DEFAULT_DETAILS_MAX_CHARS};
use crate::error::WorkflowError;
use crate::reference::{ReferenceData, ReferenceValuation, StaticPolicyLookup};
use crate::stages::{default_pipelines, StageDeps};

/// Name used for the classification step in errors and cancellation
pub const CLASSIFICATION: &str = "classification";
/// Name used for the duplicate lookup that feeds the escalation gate
pub const ESCALATION_SCREENING: &str = "escalation_screening";

/// Result of one completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub claim_type: ClaimType,
    /// Present when the escalation gate ran
    pub escalation: Option<EscalationDecision>,
    pub payout_amount: Option<Decimal>,
    /// Empty when the claim was escalated
    pub stages: Vec<StageRecord>,
    pub run_id: WorkflowRunId,
}

impl RunOutcome {
    pub fn escalated(&self) -> bool {
        self.status == ClaimStatus::NeedsReview
    }
}

pub struct ClaimWorkflow {
    store: Arc<dyn ClaimStore>,
    classifier: Arc<dyn Classifier>,
    pipelines: PipelineRegistry,
    escalation: EscalationRules,
    duplicates: DuplicateRules,
    stage_timeout: Option<Duration>,
    details_max_chars: usize,
}

impl ClaimWorkflow {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        classifier: Arc<dyn Classifier>,
        pipelines: PipelineRegistry,
    ) -> Self {
        Self {
            store,
            classifier,
            pipelines,
            escalation: EscalationRules::default(),
            duplicates: DuplicateRules::default(),
            stage_timeout: None,
            details_max_chars: DEFAULT_DETAILS_MAX_CHARS,
        }
    }

    /// Wires the rule-based classifier, the reference-data lookups and the
    /// built-in pipelines from configuration.
    pub fn from_config(store: Arc<dyn ClaimStore>, config: &EngineConfig) -> Result<Self, PortError> {
        let reference = Arc::new(match &config.reference_data_path {
            Some(path) => ReferenceData::from_file(path)?,
            None => ReferenceData::samples(),
        });

        let classifier = KeywordClassifier::new(store.clone())
            .with_damage_lexicon(config.damage.clone())
            .with_fraud_keywords(config.escalation.fraud_keywords.clone())
            .with_duplicate_window(config.duplicates.date_window_days);

        let deps = StageDeps {
            store: store.clone(),
            policies: Arc::new(StaticPolicyLookup::new(reference.clone())),
            valuation: Arc::new(ReferenceValuation::new(reference, config.valuation.clone())),
            damage: config.damage.clone(),
            duplicates: config.duplicates.clone(),
            fraud: config.fraud.clone(),
            repair: config.repair.clone(),
        };

        Ok(Self::new(
            store,
            Arc::new(RetryingClassifier::new(classifier, config.retry)),
            default_pipelines(&deps),
        )
        .with_escalation_rules(config.escalation.clone())
        .with_duplicate_rules(config.duplicates.clone())
        .with_stage_timeout(config.stage_timeout())
        .with_details_max_chars(config.details_max_chars))
    }

    pub fn with_escalation_rules(mut self, rules: EscalationRules) -> Self {
        self.escalation = rules;
        self
    }

    pub fn with_duplicate_rules(mut self, rules: DuplicateRules) -> Self {
        self.duplicates = rules;
        self
    }

    /// Wall-clock budget for classification and for each stage
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_details_max_chars(mut self, max_chars: usize) -> Self {
        self.details_max_chars = max_chars;
        self
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    pub fn pipelines(&self) -> &PipelineRegistry {
        &self.pipelines
    }

    /// Creates the claim and runs it to a terminal status
    pub async fn submit(&self, input: ClaimInput) -> Result<RunOutcome, WorkflowError> {
        self.submit_with(input, &CancellationFlag::new()).await
    }

    #[instrument(skip(self, input, cancel), fields(vin = %input.vin))]
    pub async fn submit_with(
        &self,
        input: ClaimInput,
        cancel: &CancellationFlag,
    ) -> Result<RunOutcome, WorkflowError> {
        let claim_id = self.store.create_claim(&input).await.map_err(|e| match e {
            PortError::Validation { message, .. } => WorkflowError::Validation(message),
            source => WorkflowError::Store {
                claim_id: None,
                source,
            },
        })?;
        info!(claim_id = %claim_id, "Claim created");

        let claim = self
            .store
            .begin_processing(&claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(&claim_id, e))?;
        self.process(claim, cancel).await
    }

    /// Runs a terminal claim again. Refused while a run is in flight.
    pub async fn reprocess(&self, claim_id: &ClaimId) -> Result<ClaimView, WorkflowError> {
        self.reprocess_with(claim_id, &CancellationFlag::new()).await
    }

    #[instrument(skip(self, cancel), fields(claim_id = %claim_id))]
    pub async fn reprocess_with(
        &self,
        claim_id: &ClaimId,
        cancel: &CancellationFlag,
    ) -> Result<ClaimView, WorkflowError> {
        let claim = self
            .store
            .get_claim(claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;
        if claim.is_processing() {
            warn!("Reprocess refused, claim is already processing");
            return Err(WorkflowError::ConcurrencyConflict {
                claim_id: claim_id.clone(),
            });
        }

        // The guarded transition catches a run that started since the read.
        let claim = self
            .store
            .begin_processing(claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;
        info!(previous_type = ?claim.claim_type, "Reprocessing claim");

        self.process(claim, cancel).await?;
        self.get(claim_id).await
    }

    pub async fn get(&self, claim_id: &ClaimId) -> Result<ClaimView, WorkflowError> {
        let claim = self
            .store
            .get_claim(claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;
        let workflow_runs = self
            .store
            .workflow_runs(claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;
        Ok(ClaimView {
            claim,
            workflow_runs,
        })
    }

    pub async fn history(&self, claim_id: &ClaimId) -> Result<Vec<AuditLogEntry>, WorkflowError> {
        self.store
            .get_history(claim_id)
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))
    }

    pub async fn search(&self, search: &ClaimSearch) -> Result<Vec<Claim>, WorkflowError> {
        self.store
            .search_claims(search)
            .await
            .map_err(|source| WorkflowError::Store {
                claim_id: None,
                source,
            })
    }

    /// Runs a claim that is already `processing`; any error moves it to
    /// `failed` before being returned.
    async fn process(&self, claim: Claim, cancel: &CancellationFlag) -> Result<RunOutcome, WorkflowError> {
        let claim_id = claim.id.clone();
        match self.execute(claim, cancel).await {
            Ok(outcome) => {
                info!(
                    claim_id = %outcome.claim_id,
                    status = %outcome.status,
                    run_id = %outcome.run_id,
                    "Workflow run completed"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(claim_id = %claim_id, stage = ?err.stage(), error = %err, "Workflow run failed");
                let update = StatusUpdate::to(ClaimStatus::Failed)
                    .with_details(truncate_details(&err.failure_details(), self.details_max_chars));
                if let Err(store_err) = self.store.update_status(&claim_id, update).await {
                    error!(claim_id = %claim_id, error = %store_err, "Could not record failed status");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, claim: Claim, cancel: &CancellationFlag) -> Result<RunOutcome, WorkflowError> {
        let claim_id = claim.id.clone();
        check_cancelled(cancel, &claim_id, CLASSIFICATION)?;

        let classification = self
            .bounded(CLASSIFICATION, self.classifier.classify(&claim))
            .await
            .map_err(|e| WorkflowError::stage_failure(&claim_id, CLASSIFICATION, e))?;
        let claim_type = ClaimType::from_str(&classification.label).map_err(|e| {
            WorkflowError::Classification {
                claim_id: claim_id.clone(),
                message: e.to_string(),
            }
        })?;
        info!(claim_id = %claim_id, claim_type = %claim_type, "Claim classified");
        let classifier_output = to_json(&claim_id, &classification)?;

        let escalation = if claim_type.skips_escalation() {
            None
        } else {
            let decision = self.evaluate_escalation(&claim, claim_type, &classification).await?;
            if decision.needs_review {
                return self
                    .escalate(&claim_id, claim_type, classifier_output, decision)
                    .await;
            }
            Some(decision)
        };

        let mut context = StageContext::new(claim, claim_type, classification.rationale);
        for stage in self.pipelines.stages(claim_type) {
            let name = stage.name().to_string();
            check_cancelled(cancel, &claim_id, &name)?;

            let output = self
                .bounded(&name, stage.run(&context))
                .await
                .map_err(|e| WorkflowError::stage_failure(&claim_id, name.as_str(), e))?;
            info!(claim_id = %claim_id, stage = %name, "Stage completed");
            context.push(name, output);
        }

        let payout_amount = context.payout_amount();
        let stages = context.into_records();
        let run_id = self
            .store
            .record_workflow_run(NewWorkflowRun {
                claim_id: claim_id.clone(),
                claim_type,
                classifier_output,
                pipeline_output: to_json(&claim_id, &stages)?,
            })
            .await
            .map_err(|e| WorkflowError::from_store(&claim_id, e))?;

        let status = claim_type.final_status();
        self.store
            .update_status(
                &claim_id,
                StatusUpdate::to(status)
                    .with_details(format!("Workflow run {run_id} completed as {claim_type}"))
                    .with_claim_type(claim_type)
                    .with_payout(payout_amount),
            )
            .await
            .map_err(|e| WorkflowError::from_store(&claim_id, e))?;

        Ok(RunOutcome {
            claim_id,
            status,
            claim_type,
            escalation,
            payout_amount,
            stages,
            run_id,
        })
    }

    /// Duplicate-labelled claims feed the best candidate's score to the gate
    async fn evaluate_escalation(
        &self,
        claim: &Claim,
        claim_type: ClaimType,
        classification: &Classification,
    ) -> Result<EscalationDecision, WorkflowError> {
        let similarity: Option<Score> = if claim_type == ClaimType::Duplicate {
            let candidates = self
                .bounded(
                    ESCALATION_SCREENING,
                    self.store
                        .find_duplicate_candidates(claim, self.duplicates.date_window_days),
                )
                .await
                .map_err(|e| WorkflowError::stage_failure(&claim.id, ESCALATION_SCREENING, e))?;
            self.duplicates.assess(&claim.details, &candidates).top_score()
        } else {
            None
        };

        Ok(self.escalation.evaluate(
            &claim.details,
            &classification.rationale,
            similarity,
            claim.amount_at_stake(),
        ))
    }

    async fn escalate(
        &self,
        claim_id: &ClaimId,
        claim_type: ClaimType,
        classifier_output: String,
        decision: EscalationDecision,
    ) -> Result<RunOutcome, WorkflowError> {
        warn!(
            claim_id = %claim_id,
            priority = ?decision.priority,
            reasons = ?decision.reasons,
            "Claim escalated for review"
        );
        let decision_json = to_json(claim_id, &decision)?;
        let run_id = self
            .store
            .record_workflow_run(NewWorkflowRun {
                claim_id: claim_id.clone(),
                claim_type,
                classifier_output,
                pipeline_output: decision_json.clone(),
            })
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;

        self.store
            .update_status(
                claim_id,
                StatusUpdate::to(ClaimStatus::NeedsReview)
                    .with_details(truncate_details(&decision_json, self.details_max_chars))
                    .with_claim_type(claim_type),
            )
            .await
            .map_err(|e| WorkflowError::from_store(claim_id, e))?;

        Ok(RunOutcome {
            claim_id: claim_id.clone(),
            status: ClaimStatus::NeedsReview,
            claim_type,
            escalation: Some(decision),
            payout_amount: None,
            stages: Vec::new(),
            run_id,
        })
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, PortError>>,
    ) -> Result<T, PortError> {
        match self.stage_timeout {
            Some(budget) => tokio::time::timeout(budget, call).await.map_err(|_| {
                PortError::timeout(operation, u64::try_from(budget.as_millis()).unwrap_or(u64::MAX))
            })?,
            None => call.await,
        }
    }
}

fn check_cancelled(cancel: &CancellationFlag, claim_id: &ClaimId, stage: &str) -> Result<(), WorkflowError> {
    if cancel.is_cancelled() {
        return Err(WorkflowError::Cancelled {
            claim_id: claim_id.clone(),
            stage: stage.to_string(),
        });
    }
    Ok(())
}

fn to_json<T: Serialize>(claim_id: &ClaimId, value: &T) -> Result<String, WorkflowError> {
    serde_json::to_string(value).map_err(|e| WorkflowError::Store {
        claim_id: Some(claim_id.clone()),
        source: PortError::transformation(e.to_string()),
    })
}

/// Cuts `text` to `max_chars` characters, appending `...` when anything was
/// dropped.
pub fn truncate_details(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

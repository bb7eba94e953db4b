//! The three fraud stages split one [`FraudRules::assess`] call so that each
//! pass leaves its own record in the run.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use core_kernel::PortError;
use domain_claims::fraud::{ClaimantRecord, CrossReference, PatternAnalysis};
use domain_claims::{
    Claim, ClaimStore, FraudAssessment, FraudRules, Stage, StageContext, StageOutput,
    VehicleDescriptor, VehicleValuation,
};

use super::output;

pub const FRAUD_PATTERN_ANALYSIS: &str = "fraud_pattern_analysis";
pub const FRAUD_CROSS_REFERENCE: &str = "fraud_cross_reference";
pub const FRAUD_ASSESSMENT: &str = "fraud_assessment";

/// VIN history gathered by the pattern pass, reused by the later passes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudEvidence {
    pub prior_claims: Vec<Claim>,
    pub analysis: PatternAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReferenceReport {
    pub vehicle_value: Option<Decimal>,
    #[serde(flatten)]
    pub cross_reference: CrossReference,
}

pub struct FraudPatternAnalysis {
    store: Arc<dyn ClaimStore>,
    rules: FraudRules,
}

impl FraudPatternAnalysis {
    pub fn new(store: Arc<dyn ClaimStore>, rules: FraudRules) -> Self {
        Self { store, rules }
    }
}

#[async_trait]
impl Stage for FraudPatternAnalysis {
    fn name(&self) -> &str {
        FRAUD_PATTERN_ANALYSIS
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let claim = &context.claim;
        let prior_claims: Vec<Claim> = self
            .store
            .vin_history(&claim.details.vin)
            .await?
            .into_iter()
            .filter(|prior| prior.id != claim.id)
            .collect();
        let analysis = self.rules.analyze_patterns(&claim.details, &prior_claims);

        let summary = format!(
            "Pattern score {:.1}: {} staged indicator(s), {} timing flag(s), {} claim(s) on the VIN in window.",
            analysis.score.value(),
            analysis.staged_indicators.len(),
            analysis.timing_flags.len(),
            analysis.claims_in_window
        );
        output(
            summary,
            &FraudEvidence {
                prior_claims,
                analysis,
            },
        )
    }
}

/// Checks the lexicon, the VIN's fraud history, and the damage against the
/// vehicle's value. A failed valuation is not fatal; the ratio check is
/// skipped instead.
pub struct FraudCrossReference {
    valuation: Arc<dyn VehicleValuation>,
    rules: FraudRules,
}

impl FraudCrossReference {
    pub fn new(valuation: Arc<dyn VehicleValuation>, rules: FraudRules) -> Self {
        Self { valuation, rules }
    }
}

#[async_trait]
impl Stage for FraudCrossReference {
    fn name(&self) -> &str {
        FRAUD_CROSS_REFERENCE
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let evidence: FraudEvidence = context.data(FRAUD_PATTERN_ANALYSIS)?;
        let details = &context.claim.details;
        let vehicle_value = match self
            .valuation
            .vehicle_value(&VehicleDescriptor::from(details))
            .await
        {
            Ok(value) => Some(value.value),
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                warn!(claim_id = %context.claim.id, error = %e, "Valuation unavailable for fraud check");
                None
            }
        };

        let cross_reference = self
            .rules
            .cross_reference(details, &evidence.prior_claims, vehicle_value);
        let summary = format!(
            "Cross-reference score {:.1}: {} lexicon hit(s), {} prior fraud claim(s) on the VIN.",
            cross_reference.score.value(),
            cross_reference.lexicon_hits.len(),
            cross_reference.known_fraud_matches.len()
        );
        output(
            summary,
            &CrossReferenceReport {
                vehicle_value,
                cross_reference,
            },
        )
    }
}

pub struct FraudAssessmentStage {
    rules: FraudRules,
}

impl FraudAssessmentStage {
    pub fn new(rules: FraudRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Stage for FraudAssessmentStage {
    fn name(&self) -> &str {
        FRAUD_ASSESSMENT
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let evidence: FraudEvidence = context.data(FRAUD_PATTERN_ANALYSIS)?;
        let report: CrossReferenceReport = context.data(FRAUD_CROSS_REFERENCE)?;

        // No claimant registry is wired in yet; every claimant starts clean.
        let assessment: FraudAssessment = self.rules.conclude(
            &context.claim.details,
            &evidence.analysis,
            &report.cross_reference,
            &evidence.prior_claims,
            &ClaimantRecord::default(),
        );
        let summary = format!(
            "Fraud risk {:.1} ({}). {}",
            assessment.composite_score.value(),
            assessment.likelihood,
            assessment.recommended_action
        );
        output(summary, &assessment)
    }
}

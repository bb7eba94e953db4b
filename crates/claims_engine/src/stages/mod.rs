//! Built-in specialist stages and the default pipeline table
//!
//! | claim type   | stages                                                                 |
//! |--------------|------------------------------------------------------------------------|
//! | new          | policy_verification, damage_assessment, claim_report                   |
//! | duplicate    | duplicate_search, duplicate_resolution, claim_report                   |
//! | total_loss   | damage_assessment, vehicle_valuation, payout_calculation, claim_report |
//! | fraud        | fraud_pattern_analysis, fraud_cross_reference, fraud_assessment, claim_report |
//! | partial_loss | policy_verification, damage_assessment, repair_estimate, claim_report  |

mod damage;
mod duplicate;
mod fraud;
mod policy;
mod repair;
mod report;
mod valuation;

use std::sync::Arc;

use serde::Serialize;

use core_kernel::PortError;
use domain_claims::damage::DamageLexicon;
use domain_claims::{
    ClaimStore, ClaimType, DuplicateRules, FraudRules, PipelineRegistry, PolicyLookup, Stage,
    StageOutput, VehicleValuation,
};

pub use damage::{DamageAssessment, DamageReport, DAMAGE_ASSESSMENT};
pub use duplicate::{DuplicateResolutionStage, DuplicateSearch, DUPLICATE_RESOLUTION, DUPLICATE_SEARCH};
pub use fraud::{
    CrossReferenceReport, FraudAssessmentStage, FraudCrossReference, FraudEvidence,
    FraudPatternAnalysis, FRAUD_ASSESSMENT, FRAUD_CROSS_REFERENCE, FRAUD_PATTERN_ANALYSIS,
};
pub use policy::{PolicyCheck, PolicyVerification, POLICY_VERIFICATION};
pub use repair::{PartLine, RepairEstimate, RepairQuote, RepairRules, REPAIR_ESTIMATE};
pub use report::{ClaimReport, ClaimReportStage, CLAIM_REPORT};
pub use valuation::{
    PayoutBreakdown, PayoutCalculation, VehicleValuationStage, MIN_PAYOUT_VEHICLE_VALUE,
    PAYOUT_CALCULATION, VEHICLE_VALUATION,
};

/// Serializes stage data into a [`StageOutput`]
pub(crate) fn output<T: Serialize>(summary: impl Into<String>, data: &T) -> Result<StageOutput, PortError> {
    let data = serde_json::to_value(data)
        .map_err(|e| PortError::transformation(format!("stage output: {e}")))?;
    Ok(StageOutput::new(summary, data))
}

/// Collaborators and rule sets the built-in stages are assembled from
#[derive(Clone)]
pub struct StageDeps {
    pub store: Arc<dyn ClaimStore>,
    pub policies: Arc<dyn PolicyLookup>,
    pub valuation: Arc<dyn VehicleValuation>,
    pub damage: DamageLexicon,
    pub duplicates: DuplicateRules,
    pub fraud: FraudRules,
    pub repair: RepairRules,
}

impl StageDeps {
    pub fn new(
        store: Arc<dyn ClaimStore>,
        policies: Arc<dyn PolicyLookup>,
        valuation: Arc<dyn VehicleValuation>,
    ) -> Self {
        Self {
            store,
            policies,
            valuation,
            damage: DamageLexicon::default(),
            duplicates: DuplicateRules::default(),
            fraud: FraudRules::default(),
            repair: RepairRules::default(),
        }
    }
}

/// The pipeline table above, wired to `deps`
pub fn default_pipelines(deps: &StageDeps) -> PipelineRegistry {
    let policy = shared(PolicyVerification::new(deps.policies.clone()));
    let damage = shared(DamageAssessment::new(deps.damage.clone()));
    let report = shared(ClaimReportStage);

    PipelineRegistry::new()
        .with(ClaimType::New, vec![policy.clone(), damage.clone(), report.clone()])
        .with(
            ClaimType::Duplicate,
            vec![
                shared(DuplicateSearch::new(deps.store.clone(), deps.duplicates.clone())),
                shared(DuplicateResolutionStage::new(deps.duplicates.clone())),
                report.clone(),
            ],
        )
        .with(
            ClaimType::TotalLoss,
            vec![
                damage.clone(),
                shared(VehicleValuationStage::new(deps.valuation.clone())),
                shared(PayoutCalculation::new(deps.policies.clone())),
                report.clone(),
            ],
        )
        .with(
            ClaimType::Fraud,
            vec![
                shared(FraudPatternAnalysis::new(deps.store.clone(), deps.fraud.clone())),
                shared(FraudCrossReference::new(deps.valuation.clone(), deps.fraud.clone())),
                shared(FraudAssessmentStage::new(deps.fraud.clone())),
                report.clone(),
            ],
        )
        .with(
            ClaimType::PartialLoss,
            vec![
                policy,
                damage,
                shared(RepairEstimate::new(
                    deps.repair.clone(),
                    deps.damage.clone(),
                    deps.policies.clone(),
                )),
                report,
            ],
        )
}

fn shared(stage: impl Stage + 'static) -> Arc<dyn Stage> {
    Arc::new(stage)
}

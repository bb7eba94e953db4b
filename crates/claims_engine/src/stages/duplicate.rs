use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use core_kernel::PortError;
use domain_claims::duplicate::DuplicateResolution;
use domain_claims::{ClaimStore, DuplicateAssessment, DuplicateRules, Stage, StageContext, StageOutput};

use super::output;

pub const DUPLICATE_SEARCH: &str = "duplicate_search";
pub const DUPLICATE_RESOLUTION: &str = "duplicate_resolution";

/// Scores every claim on the same VIN inside the date window
pub struct DuplicateSearch {
    store: Arc<dyn ClaimStore>,
    rules: DuplicateRules,
}

impl DuplicateSearch {
    pub fn new(store: Arc<dyn ClaimStore>, rules: DuplicateRules) -> Self {
        Self { store, rules }
    }
}

#[async_trait]
impl Stage for DuplicateSearch {
    fn name(&self) -> &str {
        DUPLICATE_SEARCH
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let candidates = self
            .store
            .find_duplicate_candidates(&context.claim, self.rules.date_window_days)
            .await?;
        let assessment = self.rules.assess(&context.claim.details, &candidates);
        debug!(
            claim_id = %context.claim.id,
            candidates = assessment.candidates.len(),
            "Duplicate candidates scored"
        );

        let summary = match assessment.best() {
            Some(best) => format!(
                "{} candidate(s); best match {} scored {:.1} ({}).",
                assessment.candidates.len(),
                best.claim_id,
                best.composite_score.value(),
                assessment.band
            ),
            None => "No earlier claim on this VIN within the date window.".to_string(),
        };
        output(summary, &assessment)
    }
}

/// Decides merge, reject, or escalate from the search assessment. The
/// claim's final status stays `duplicate` whatever is decided here.
pub struct DuplicateResolutionStage {
    rules: DuplicateRules,
}

impl DuplicateResolutionStage {
    pub fn new(rules: DuplicateRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Stage for DuplicateResolutionStage {
    fn name(&self) -> &str {
        DUPLICATE_RESOLUTION
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let assessment: DuplicateAssessment = context.data(DUPLICATE_SEARCH)?;
        let resolution = self.rules.resolve(&context.claim.details, &assessment);
        let summary = match &resolution {
            DuplicateResolution::Merge { canonical } => format!("Merge into {canonical}."),
            DuplicateResolution::Reject { canonical } => {
                format!("Reject as a resubmission of {canonical}.")
            }
            DuplicateResolution::Escalate { canonical, reason } => {
                format!("Escalate against {canonical}: {reason}.")
            }
            DuplicateResolution::NotDuplicate => {
                "No candidate scored in the duplicate band.".to_string()
            }
        };
        output(summary, &resolution)
    }
}

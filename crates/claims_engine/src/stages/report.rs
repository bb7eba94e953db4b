use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use domain_claims::{ClaimType, Stage, StageContext, StageOutput};

use super::output;

pub const CLAIM_REPORT: &str = "claim_report";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReport {
    pub claim_type: ClaimType,
    pub final_status: String,
    pub classification_rationale: String,
    /// `stage: summary` for every stage before the report
    pub findings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<rust_decimal::Decimal>,
}

/// Last stage of every built-in pipeline
pub struct ClaimReportStage;

#[async_trait]
impl Stage for ClaimReportStage {
    fn name(&self) -> &str {
        CLAIM_REPORT
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let report = ClaimReport {
            claim_type: context.claim_type,
            final_status: context.claim_type.final_status().to_string(),
            classification_rationale: context.rationale.clone(),
            findings: context
                .records()
                .iter()
                .map(|record| format!("{}: {}", record.stage, record.output.summary))
                .collect(),
            payout_amount: context.payout_amount(),
        };

        let mut summary = format!(
            "Claim {} processed as {} after {} stage(s).",
            context.claim.id,
            report.claim_type,
            report.findings.len()
        );
        if let Some(payout) = report.payout_amount {
            summary.push_str(&format!(" Payout {payout}."));
        }
        output(summary, &report)
    }
}

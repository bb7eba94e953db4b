//! Claims DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use claims_engine::RunOutcome;
use domain_claims::{ClaimSearch, ClaimStatus, ClaimType, EscalationDecision};

/// Body of `201 Created` after a submission
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitClaimResponse {
    pub claim_id: String,
    pub status: ClaimStatus,
    pub claim_type: ClaimType,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationDecision>,
}

impl From<RunOutcome> for SubmitClaimResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            claim_id: outcome.claim_id.to_string(),
            status: outcome.status,
            claim_type: outcome.claim_type,
            run_id: outcome.run_id.to_string(),
            payout_amount: outcome.payout_amount,
            escalation: outcome.escalation,
        }
    }
}

/// `GET /api/v1/claims?vin=...&incident_date=YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct ClaimSearchQuery {
    pub vin: Option<String>,
    pub incident_date: Option<NaiveDate>,
}

impl From<ClaimSearchQuery> for ClaimSearch {
    fn from(query: ClaimSearchQuery) -> Self {
        ClaimSearch {
            vin: query.vin,
            incident_date: query.incident_date,
        }
    }
}

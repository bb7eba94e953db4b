use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use domain_claims::{PolicyLookup, Stage, StageContext, StageOutput};

use super::output;

pub const POLICY_VERIFICATION: &str = "policy_verification";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub policy_number: String,
    pub active: bool,
    pub coverage: String,
    pub deductible: Decimal,
}

/// Confirms the policy exists and is in force. An inactive policy is
/// recorded, not treated as a stage failure.
pub struct PolicyVerification {
    policies: Arc<dyn PolicyLookup>,
}

impl PolicyVerification {
    pub fn new(policies: Arc<dyn PolicyLookup>) -> Self {
        Self { policies }
    }
}

#[async_trait]
impl Stage for PolicyVerification {
    fn name(&self) -> &str {
        POLICY_VERIFICATION
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let policy_number = &context.claim.details.policy_number;
        let info = self.policies.lookup_policy(policy_number).await?;
        let summary = if info.active {
            format!(
                "Policy {policy_number} is active with {} coverage and a {} deductible.",
                info.coverage, info.deductible
            )
        } else {
            format!("Policy {policy_number} is not active.")
        };
        let check = PolicyCheck {
            policy_number: policy_number.clone(),
            active: info.active,
            coverage: info.coverage,
            deductible: info.deductible,
        };
        output(summary, &check)
    }
}

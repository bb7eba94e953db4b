use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use domain_claims::damage::{DamageLexicon, DamageProfile};
use domain_claims::{Stage, StageContext, StageOutput};

use super::output;

pub const DAMAGE_ASSESSMENT: &str = "damage_assessment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    #[serde(flatten)]
    pub profile: DamageProfile,
    pub estimated_repair_cost: Option<Decimal>,
}

pub struct DamageAssessment {
    lexicon: DamageLexicon,
}

impl DamageAssessment {
    pub fn new(lexicon: DamageLexicon) -> Self {
        Self { lexicon }
    }
}

#[async_trait]
impl Stage for DamageAssessment {
    fn name(&self) -> &str {
        DAMAGE_ASSESSMENT
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let details = &context.claim.details;
        let profile = self
            .lexicon
            .analyze(&details.incident_description, &details.damage_description);

        let mut summary = format!("Damage severity {}", profile.severity);
        if profile.indicates_total_loss {
            summary.push_str("; total loss indicated");
        }
        if !profile.damaged_parts.is_empty() {
            summary.push_str(&format!("; parts: {}", profile.damaged_parts.join(", ")));
        }
        summary.push('.');

        let report = DamageReport {
            profile,
            estimated_repair_cost: details.estimated_damage,
        };
        output(summary, &report)
    }
}

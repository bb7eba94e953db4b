use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use domain_claims::damage::DamageLexicon;
use domain_claims::{PolicyLookup, Stage, StageContext, StageOutput};

use super::output;

pub const REPAIR_ESTIMATE: &str = "repair_estimate";

/// Parts prices and labour model for partial-loss estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairRules {
    /// Aftermarket price per detected part
    pub part_prices: BTreeMap<String, Decimal>,
    /// Price for a detected part missing from the table
    pub default_part_price: Decimal,
    pub labor_rate: Decimal,
    pub hours_per_part: Decimal,
    /// Paint and body work added to every job
    pub base_hours: Decimal,
    pub min_hours: Decimal,
}

impl Default for RepairRules {
    fn default() -> Self {
        let prices = [
            ("bumper", dec!(450)),
            ("fender", dec!(350)),
            ("door", dec!(650)),
            ("doors", dec!(1300)),
            ("hood", dec!(500)),
            ("trunk", dec!(550)),
            ("mirror", dec!(150)),
            ("light", dec!(200)),
            ("headlight", dec!(250)),
            ("taillight", dec!(180)),
            ("dent", dec!(120)),
            ("scratch", dec!(90)),
            ("panel", dec!(400)),
            ("quarter panel", dec!(700)),
            ("windshield", dec!(400)),
            ("window", dec!(220)),
            ("paint", dec!(300)),
        ];
        Self {
            part_prices: prices
                .into_iter()
                .map(|(part, price)| (part.to_string(), price))
                .collect(),
            default_part_price: dec!(300),
            labor_rate: dec!(85),
            hours_per_part: dec!(1.5),
            base_hours: dec!(2.0),
            min_hours: dec!(2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLine {
    pub part: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairQuote {
    pub parts: Vec<PartLine>,
    pub parts_cost: Decimal,
    pub labor_hours: Decimal,
    pub labor_cost: Decimal,
    pub total_estimate: Decimal,
    pub deductible: Decimal,
    pub customer_pays: Decimal,
    pub insurance_pays: Decimal,
}

impl RepairRules {
    /// Prices the given parts. With no recognised parts the claimant's own
    /// estimate, when present, stands in for the parts cost.
    pub fn quote(&self, parts: &[String], fallback: Option<Decimal>, deductible: Decimal) -> RepairQuote {
        let lines: Vec<PartLine> = parts
            .iter()
            .map(|part| PartLine {
                part: part.clone(),
                price: self
                    .part_prices
                    .get(part)
                    .copied()
                    .unwrap_or(self.default_part_price),
            })
            .collect();
        let parts_cost = if lines.is_empty() {
            fallback.unwrap_or(Decimal::ZERO)
        } else {
            lines.iter().map(|line| line.price).sum()
        };

        let labor_hours = (self.hours_per_part * Decimal::from(lines.len()) + self.base_hours)
            .max(self.min_hours);
        let labor_cost = (labor_hours * self.labor_rate).round_dp(2);
        let total_estimate = (parts_cost + labor_cost).round_dp(2);
        let insurance_pays = (total_estimate - deductible).max(Decimal::ZERO);

        RepairQuote {
            parts: lines,
            parts_cost,
            labor_hours,
            labor_cost,
            total_estimate,
            deductible,
            customer_pays: total_estimate.min(deductible),
            insurance_pays,
        }
    }
}

/// Partial-loss estimate; what the insurer pays becomes the run's payout
pub struct RepairEstimate {
    rules: RepairRules,
    lexicon: DamageLexicon,
    policies: Arc<dyn PolicyLookup>,
}

impl RepairEstimate {
    pub fn new(rules: RepairRules, lexicon: DamageLexicon, policies: Arc<dyn PolicyLookup>) -> Self {
        Self {
            rules,
            lexicon,
            policies,
        }
    }
}

#[async_trait]
impl Stage for RepairEstimate {
    fn name(&self) -> &str {
        REPAIR_ESTIMATE
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let details = &context.claim.details;
        let profile = self
            .lexicon
            .analyze(&details.incident_description, &details.damage_description);
        let policy = self.policies.lookup_policy(&details.policy_number).await?;

        let quote = self
            .rules
            .quote(&profile.damaged_parts, details.estimated_damage, policy.deductible);
        let payout = quote.insurance_pays;
        Ok(output(
            format!(
                "Repair estimate {} ({} parts, {} labour hours); insurance pays {}.",
                quote.total_estimate,
                quote.parts.len(),
                quote.labor_hours,
                payout
            ),
            &quote,
        )?
        .with_payout(payout))
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use domain_claims::{
    PolicyLookup, Stage, StageContext, StageOutput, VehicleDescriptor, VehicleValuation,
    VehicleValue,
};

use super::output;

pub const VEHICLE_VALUATION: &str = "vehicle_valuation";
pub const PAYOUT_CALCULATION: &str = "payout_calculation";

/// Values below this are treated as a broken valuation, not a cheap car
pub const MIN_PAYOUT_VEHICLE_VALUE: Decimal = dec!(100);

pub struct VehicleValuationStage {
    valuation: Arc<dyn VehicleValuation>,
}

impl VehicleValuationStage {
    pub fn new(valuation: Arc<dyn VehicleValuation>) -> Self {
        Self { valuation }
    }
}

#[async_trait]
impl Stage for VehicleValuationStage {
    fn name(&self) -> &str {
        VEHICLE_VALUATION
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let vehicle = VehicleDescriptor::from(&context.claim.details);
        let value = self.valuation.vehicle_value(&vehicle).await?;
        output(
            format!("Vehicle valued at {} ({}).", value.value, value.source),
            &value,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub vehicle_value: Decimal,
    pub deductible: Decimal,
    pub policy_active: bool,
    pub payout_amount: Decimal,
    pub calculation: String,
}

/// Total-loss payout: vehicle value less the policy deductible, never
/// negative. Needs the `vehicle_valuation` output earlier in the run.
pub struct PayoutCalculation {
    policies: Arc<dyn PolicyLookup>,
}

impl PayoutCalculation {
    pub fn new(policies: Arc<dyn PolicyLookup>) -> Self {
        Self { policies }
    }
}

#[async_trait]
impl Stage for PayoutCalculation {
    fn name(&self) -> &str {
        PAYOUT_CALCULATION
    }

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError> {
        let valuation: VehicleValue = context.data(VEHICLE_VALUATION)?;
        let vehicle_value = valuation.value.round_dp(2);
        if vehicle_value < MIN_PAYOUT_VEHICLE_VALUE {
            return Err(PortError::validation_field(
                format!("vehicle value {vehicle_value} is below the minimum of {MIN_PAYOUT_VEHICLE_VALUE}"),
                "vehicle_value",
            ));
        }

        let policy = self
            .policies
            .lookup_policy(&context.claim.details.policy_number)
            .await?;
        let breakdown = if policy.active {
            let payout_amount = (vehicle_value - policy.deductible).max(Decimal::ZERO).round_dp(2);
            PayoutBreakdown {
                vehicle_value,
                deductible: policy.deductible,
                policy_active: true,
                payout_amount,
                calculation: format!(
                    "{vehicle_value} (vehicle value) - {} (deductible) = {payout_amount}",
                    policy.deductible
                ),
            }
        } else {
            PayoutBreakdown {
                vehicle_value,
                deductible: Decimal::ZERO,
                policy_active: false,
                payout_amount: Decimal::ZERO,
                calculation: "policy not active, nothing payable".to_string(),
            }
        };

        let payout = breakdown.payout_amount;
        Ok(output(
            format!("Total-loss payout {}: {}.", payout, breakdown.calculation),
            &breakdown,
        )?
        .with_payout(payout))
    }
}

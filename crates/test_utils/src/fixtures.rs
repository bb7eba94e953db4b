//! Pre-built Test Fixtures
//!
//! Scenario claims with fixed, predictable values. Policy numbers and VINs
//! match the built-in reference samples, so lookups resolve.

use chrono::NaiveDate;
use domain_claims::ClaimInput;
use rust_decimal_macros::dec;

/// VIN with a reference value of 15000
pub const HONDA_VIN: &str = "1HGBH41JXMN109186";
/// VIN with a reference value of 42000
pub const TESLA_VIN: &str = "5YJSA1E26HF000001";
/// Active, comprehensive, deductible 500
pub const ACTIVE_POLICY: &str = "POL-001";
/// Lapsed
pub const LAPSED_POLICY: &str = "POL-004";
pub const UNKNOWN_CLAIM_ID: &str = "CLM-UNKNOWN";

/// Day of January 2025
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
}

pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Minor rear-end collision on an active policy, incident 2025-01-15
    pub fn minor_collision() -> ClaimInput {
        ClaimInput {
            policy_number: ACTIVE_POLICY.to_string(),
            vin: HONDA_VIN.to_string(),
            vehicle_year: Some(2021),
            vehicle_make: Some("Honda".to_string()),
            vehicle_model: Some("Accord".to_string()),
            incident_date: jan(15),
            incident_description: "Rear-ended at a stoplight on Main Street".to_string(),
            damage_description: "Rear bumper scratched and dented".to_string(),
            estimated_damage: Some(dec!(1200)),
        }
    }

    /// Same VIN and narrative as [`Self::minor_collision`], three days later
    pub fn resubmitted_collision() -> ClaimInput {
        ClaimInput {
            incident_date: jan(18),
            ..Self::minor_collision()
        }
    }

    /// Flood-totalled vehicle worth more than the high-value threshold
    pub fn flooded_total_loss() -> ClaimInput {
        ClaimInput {
            policy_number: ACTIVE_POLICY.to_string(),
            vin: TESLA_VIN.to_string(),
            vehicle_year: Some(2017),
            vehicle_make: Some("Tesla".to_string()),
            vehicle_model: Some("Model S".to_string()),
            incident_date: jan(10),
            incident_description: "Vehicle parked in a garage during a flash flood".to_string(),
            damage_description: "Car was submerged and is a total loss".to_string(),
            estimated_damage: Some(dec!(30000)),
        }
    }

    /// Total loss small enough to clear the escalation gate
    pub fn modest_total_loss() -> ClaimInput {
        ClaimInput {
            vin: HONDA_VIN.to_string(),
            vehicle_year: Some(2021),
            vehicle_make: Some("Honda".to_string()),
            vehicle_model: Some("Accord".to_string()),
            estimated_damage: Some(dec!(14000)),
            ..Self::flooded_total_loss()
        }
    }

    /// Staged-accident narrative with a large bill
    pub fn staged_accident() -> ClaimInput {
        ClaimInput {
            policy_number: ACTIVE_POLICY.to_string(),
            vin: "2T1BURHE0JC000002".to_string(),
            vehicle_year: Some(2018),
            vehicle_make: Some("Toyota".to_string()),
            vehicle_model: Some("Corolla".to_string()),
            incident_date: jan(20),
            incident_description: "Sudden stop in front of me, looked staged, multiple occupants claimed injury"
                .to_string(),
            damage_description: "Front end crushed, airbags deployed".to_string(),
            estimated_damage: Some(dec!(30000)),
        }
    }

    /// Door and mirror damage on an active collision policy
    pub fn repairable_damage() -> ClaimInput {
        ClaimInput {
            policy_number: "POL-002".to_string(),
            vin: "3VWFE21C04M000003".to_string(),
            vehicle_year: Some(2020),
            vehicle_make: Some("Volkswagen".to_string()),
            vehicle_model: Some("Jetta".to_string()),
            incident_date: jan(5),
            incident_description: "Sideswiped by a delivery van in a parking garage".to_string(),
            damage_description: "Driver door dented and side mirror broken".to_string(),
            estimated_damage: Some(dec!(2400)),
        }
    }
}

//! Test Data Builders
//!
//! Lets a test name only the fields it cares about; everything else comes
//! from [`ClaimFixtures::minor_collision`].

use chrono::NaiveDate;
use domain_claims::ClaimInput;
use rust_decimal::Decimal;

use crate::fixtures::ClaimFixtures;

#[derive(Debug, Clone)]
pub struct ClaimInputBuilder {
    input: ClaimInput,
}

impl Default for ClaimInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimInputBuilder {
    pub fn new() -> Self {
        Self {
            input: ClaimFixtures::minor_collision(),
        }
    }

    /// Starts from an existing submission
    pub fn from(input: ClaimInput) -> Self {
        Self { input }
    }

    pub fn with_policy_number(mut self, policy_number: impl Into<String>) -> Self {
        self.input.policy_number = policy_number.into();
        self
    }

    pub fn with_vin(mut self, vin: impl Into<String>) -> Self {
        self.input.vin = vin.into();
        self
    }

    pub fn with_vehicle(mut self, year: i32, make: &str, model: &str) -> Self {
        self.input.vehicle_year = Some(year);
        self.input.vehicle_make = Some(make.to_string());
        self.input.vehicle_model = Some(model.to_string());
        self
    }

    pub fn without_vehicle_details(mut self) -> Self {
        self.input.vehicle_year = None;
        self.input.vehicle_make = None;
        self.input.vehicle_model = None;
        self
    }

    pub fn with_incident_date(mut self, date: NaiveDate) -> Self {
        self.input.incident_date = date;
        self
    }

    pub fn with_incident(mut self, description: impl Into<String>) -> Self {
        self.input.incident_description = description.into();
        self
    }

    pub fn with_damage(mut self, description: impl Into<String>) -> Self {
        self.input.damage_description = description.into();
        self
    }

    pub fn with_estimate(mut self, amount: Decimal) -> Self {
        self.input.estimated_damage = Some(amount);
        self
    }

    pub fn without_estimate(mut self) -> Self {
        self.input.estimated_damage = None;
        self
    }

    pub fn build(self) -> ClaimInput {
        self.input
    }
}

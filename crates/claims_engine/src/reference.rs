//! Reference-data collaborators
//!
//! Policy and vehicle-value lookups backed by a JSON document instead of a
//! live policy administration system or valuation service.
//!
//! ```json
//! {
//!   "policies": { "POL-001": { "status": "active", "coverage": "comprehensive", "deductible": 500 } },
//!   "vehicle_values": { "1HGBH41JXMN109186": { "value": 15000, "condition": "good" } }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_claims::{PolicyInfo, PolicyLookup, VehicleDescriptor, VehicleValuation, VehicleValue};

pub const DEFAULT_DEDUCTIBLE: Decimal = dec!(500);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default = "default_policy_status")]
    pub status: String,
    #[serde(default = "default_coverage")]
    pub coverage: String,
    #[serde(default = "default_deductible")]
    pub deductible: Decimal,
}

impl PolicyRecord {
    pub fn is_active(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("active")
    }
}

fn default_policy_status() -> String {
    "active".to_string()
}

fn default_coverage() -> String {
    "comprehensive".to_string()
}

fn default_deductible() -> Decimal {
    DEFAULT_DEDUCTIBLE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub value: Decimal,
    #[serde(default = "default_condition")]
    pub condition: String,
}

fn default_condition() -> String {
    "good".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub policies: HashMap<String, PolicyRecord>,
    /// Keyed by VIN, or by `year_make_model` for generic entries
    #[serde(default)]
    pub vehicle_values: HashMap<String, VehicleRecord>,
}

impl ReferenceData {
    pub fn from_json(json: &str) -> Result<Self, PortError> {
        serde_json::from_str(json)
            .map_err(|e| PortError::transformation(format!("reference data: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, PortError> {
        let json = std::fs::read_to_string(path).map_err(|e| PortError::Internal {
            message: format!("reading {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::from_json(&json)
    }

    /// Small built-in data set for demos and local runs
    pub fn samples() -> Self {
        let policy = |status: &str, coverage: &str, deductible: Decimal| PolicyRecord {
            status: status.to_string(),
            coverage: coverage.to_string(),
            deductible,
        };
        let vehicle = |value: Decimal| VehicleRecord {
            value,
            condition: default_condition(),
        };
        Self {
            policies: HashMap::from([
                ("POL-001".to_string(), policy("active", "comprehensive", dec!(500))),
                ("POL-002".to_string(), policy("active", "collision", dec!(1000))),
                ("POL-003".to_string(), policy("active", "comprehensive", dec!(250))),
                ("POL-004".to_string(), policy("lapsed", "liability", dec!(500))),
            ]),
            vehicle_values: HashMap::from([
                ("1HGBH41JXMN109186".to_string(), vehicle(dec!(15000))),
                ("5YJSA1E26HF000001".to_string(), vehicle(dec!(42000))),
                ("2021_Toyota_Camry".to_string(), vehicle(dec!(22000))),
            ]),
        }
    }
}

/// Policy lookup over [`ReferenceData`]. Unknown policies come back inactive.
#[derive(Debug, Clone)]
pub struct StaticPolicyLookup {
    data: Arc<ReferenceData>,
}

impl StaticPolicyLookup {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }
}

impl DomainPort for StaticPolicyLookup {}

#[async_trait]
impl PolicyLookup for StaticPolicyLookup {
    #[instrument(skip(self))]
    async fn lookup_policy(&self, policy_number: &str) -> Result<PolicyInfo, PortError> {
        let key = policy_number.trim();
        if key.is_empty() {
            return Err(PortError::validation_field("empty policy number", "policy_number"));
        }
        let info = match self.data.policies.get(key) {
            Some(record) => PolicyInfo {
                active: record.is_active(),
                coverage: record.coverage.clone(),
                deductible: record.deductible,
            },
            None => PolicyInfo {
                active: false,
                coverage: "none".to_string(),
                deductible: DEFAULT_DEDUCTIBLE,
            },
        };
        debug!(active = info.active, "Policy looked up");
        Ok(info)
    }
}

/// Depreciation model used when a vehicle has no reference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationRules {
    pub base_value: Decimal,
    pub depreciation_per_year: Decimal,
    pub min_value: Decimal,
    /// Model year assumed when the claim does not give one
    pub fallback_year: i32,
}

impl Default for ValuationRules {
    fn default() -> Self {
        Self {
            base_value: dec!(12000),
            depreciation_per_year: dec!(500),
            min_value: dec!(2000),
            fallback_year: 2020,
        }
    }
}

impl ValuationRules {
    pub fn estimate(&self, year: Option<i32>, current_year: i32) -> Decimal {
        let age = (current_year - year.unwrap_or(self.fallback_year)).max(0);
        (self.base_value - self.depreciation_per_year * Decimal::from(age)).max(self.min_value)
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceValuation {
    data: Arc<ReferenceData>,
    rules: ValuationRules,
}

impl ReferenceValuation {
    pub fn new(data: Arc<ReferenceData>, rules: ValuationRules) -> Self {
        Self { data, rules }
    }
}

impl DomainPort for ReferenceValuation {}

#[async_trait]
impl VehicleValuation for ReferenceValuation {
    #[instrument(skip(self), fields(vin = %vehicle.vin))]
    async fn vehicle_value(&self, vehicle: &VehicleDescriptor) -> Result<VehicleValue, PortError> {
        let generic_key = format!(
            "{}_{}_{}",
            vehicle.year.unwrap_or(self.rules.fallback_year),
            vehicle.make.as_deref().unwrap_or_default().trim(),
            vehicle.model.as_deref().unwrap_or_default().trim(),
        );
        let known = self
            .data
            .vehicle_values
            .get(vehicle.vin.trim())
            .or_else(|| self.data.vehicle_values.get(&generic_key));

        Ok(match known {
            Some(record) => VehicleValue {
                value: record.value,
                source: "reference".to_string(),
            },
            None => VehicleValue {
                value: self.rules.estimate(vehicle.year, Utc::now().year()),
                source: "reference_estimated".to_string(),
            },
        })
    }
}

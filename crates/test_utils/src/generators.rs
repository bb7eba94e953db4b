//! Property-Based Test Generators
//!
//! proptest strategies for claim submissions that pass validation, and a
//! `fake`-backed generator for realistic one-off submissions.

use chrono::{Duration, NaiveDate};
use domain_claims::ClaimInput;
use fake::faker::address::en::StreetName;
use fake::faker::lorem::en::Words;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::{jan, ClaimFixtures};

const MAKES: [(&str, &str); 4] = [
    ("Honda", "Accord"),
    ("Toyota", "Camry"),
    ("Ford", "F-150"),
    ("Tesla", "Model 3"),
];

/// Strategy for 17-character VINs
pub fn vin_strategy() -> impl Strategy<Value = String> {
    "[A-HJ-NPR-Z0-9]{17}"
}

/// Strategy for incident dates in 2025
pub fn incident_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..365).prop_map(|offset| jan(1) + Duration::days(offset))
}

/// Strategy for non-negative amounts with cents
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for short lowercase narratives
pub fn narrative_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{3,9}", 3..12).prop_map(|words| words.join(" "))
}

/// Strategy for submissions that pass validation
pub fn claim_input_strategy() -> impl Strategy<Value = ClaimInput> {
    (
        vin_strategy(),
        incident_date_strategy(),
        narrative_strategy(),
        narrative_strategy(),
        proptest::option::of(amount_strategy()),
        (1995i32..=2025, 0usize..MAKES.len()),
    )
        .prop_map(|(vin, incident_date, incident, damage, estimate, (year, make))| ClaimInput {
            policy_number: "POL-001".to_string(),
            vin,
            vehicle_year: Some(year),
            vehicle_make: Some(MAKES[make].0.to_string()),
            vehicle_model: Some(MAKES[make].1.to_string()),
            incident_date,
            incident_description: incident,
            damage_description: damage,
            estimated_damage: estimate,
        })
}

/// A realistic random submission on the given VIN
pub fn fake_claim_input(vin: &str) -> ClaimInput {
    let street: String = StreetName().fake();
    let words: Vec<String> = Words(4..9).fake();
    let cents: i64 = (10_000i64..2_000_000i64).fake();
    let offset: i64 = (0i64..28).fake();
    ClaimInput {
        vin: vin.to_string(),
        incident_date: jan(1) + Duration::days(offset),
        incident_description: format!("Collision near {street}"),
        damage_description: words.join(" "),
        estimated_damage: Some(Decimal::new(cents, 2)),
        ..ClaimFixtures::minor_collision()
    }
}

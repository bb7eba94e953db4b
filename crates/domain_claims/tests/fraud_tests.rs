//! Tests for the fraud risk engine

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::Score;
use domain_claims::claim::{Claim, ClaimInput, ClaimStatus};
use domain_claims::fraud::{ClaimantRecord, FraudLikelihood, FraudRules, RiskAdjustments};

fn input(incident: &str, damage: &str) -> ClaimInput {
    ClaimInput {
        policy_number: "POL-9".to_string(),
        vin: "5YJSA1E26HF000001".to_string(),
        vehicle_year: None,
        vehicle_make: None,
        vehicle_model: None,
        incident_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        incident_description: incident.to_string(),
        damage_description: damage.to_string(),
        estimated_damage: None,
    }
}

fn prior(id: &str, days_before: i64, status: ClaimStatus) -> Claim {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut details = input("Earlier incident", "Earlier damage");
    details.incident_date -= chrono::Duration::days(days_before);
    Claim {
        id: id.parse().unwrap(),
        details,
        claim_type: None,
        status,
        payout_amount: None,
        created_at: created,
        updated_at: created,
    }
}

// ============================================================================
// Pattern Analysis Tests
// ============================================================================

mod pattern_tests {
    use super::*;

    #[test]
    fn test_clean_claim_has_zero_pattern_score() {
        let analysis = FraudRules::default()
            .analyze_patterns(&input("Backed into a bollard", "Rear bumper scuffed"), &[]);
        assert_eq!(analysis.score, Score::MIN);
        assert_eq!(analysis.claims_in_window, 1);
    }

    #[test]
    fn test_staged_and_timing_flags_accumulate() {
        let analysis = FraudRules::default().analyze_patterns(
            &input("Staged stop on a new policy, just purchased yesterday", "Rear bumper"),
            &[],
        );
        assert_eq!(analysis.staged_indicators, vec!["staged"]);
        assert_eq!(analysis.timing_flags, vec!["new_policy", "just_purchased"]);
        assert_eq!(analysis.score.value(), 20.0 + 15.0 * 2.0);
    }

    #[test]
    fn test_frequent_claims_on_vin_within_window() {
        let rules = FraudRules::default();
        let recent = prior("CLM-00000001", 30, ClaimStatus::Closed);
        let old = prior("CLM-00000002", 200, ClaimStatus::Closed);
        let analysis = rules.analyze_patterns(&input("Hit a pole", "Hood"), &[recent, old]);
        assert_eq!(analysis.claims_in_window, 2);
        assert_eq!(analysis.score.value(), 25.0);
    }
}

// ============================================================================
// Cross Reference Tests
// ============================================================================

mod cross_reference_tests {
    use super::*;

    #[test]
    fn test_known_fraud_on_vin_is_matched() {
        let xref = FraudRules::default().cross_reference(
            &input("Hit a pole", "Hood"),
            &[prior("CLM-0000000F", 10, ClaimStatus::FraudSuspected)],
            None,
        );
        assert_eq!(xref.known_fraud_matches.len(), 1);
        assert_eq!(xref.score.value(), 40.0);
    }

    #[test]
    fn test_damage_near_vehicle_value() {
        let mut claim = input("Hit a pole", "Hood");
        claim.estimated_damage = Some(dec!(9500));
        let xref = FraudRules::default().cross_reference(&claim, &[], Some(dec!(10000)));
        assert!((xref.damage_to_value_ratio.unwrap() - 0.95).abs() < 1e-9);
        assert_eq!(xref.score.value(), 20.0);
    }

    #[test]
    fn test_lexicon_hits() {
        let xref = FraudRules::default().cross_reference(
            &input("Suspicious circumstances", "Inflated estimate, pre-existing dents"),
            &[],
            None,
        );
        assert_eq!(xref.lexicon_hits, vec!["suspicious", "inflated", "pre_existing"]);
        assert_eq!(xref.score.value(), 60.0);
    }
}

// ============================================================================
// Assessment Tests
// ============================================================================

mod assessment_tests {
    use super::*;

    #[test]
    fn test_clean_claim_is_unlikely() {
        let mut claim = input("Rear bumper hit while parked", "Rear bumper cracked");
        claim.vehicle_year = Some(2019);
        claim.vehicle_make = Some("Tesla".to_string());
        claim.vehicle_model = Some("Model S".to_string());
        claim.estimated_damage = Some(dec!(1200));
        let assessment = FraudRules::default().assess(&claim, &[], None, &ClaimantRecord::default());
        assert_eq!(assessment.likelihood, FraudLikelihood::Unlikely);
        assert!(!assessment.siu_referral);
        assert!(!assessment.should_block);
    }

    #[test]
    fn test_vin_linked_to_known_fraud_blocks() {
        let assessment = FraudRules::default().assess(
            &input("Hit a pole", "Hood"),
            &[prior("CLM-0000000F", 10, ClaimStatus::FraudSuspected)],
            None,
            &ClaimantRecord::default(),
        );
        assert!(assessment.should_block);
        assert!(assessment.indicators.contains(&"vin_linked_to_known_fraud".to_string()));
    }

    #[test]
    fn test_injury_with_staged_indicator_refers_to_siu() {
        let assessment = FraudRules::default().assess(
            &input("Staged rear-end, driver claims whiplash", "Rear bumper"),
            &[],
            None,
            &ClaimantRecord::default(),
        );
        assert!(assessment.composite_score.value() <= 60.0);
        assert!(assessment.siu_referral);
    }

    #[test]
    fn test_claimant_flags_drive_referral_and_block() {
        let record = ClaimantRecord {
            prior_siu_referral: true,
            active_siu_investigation: true,
            ..ClaimantRecord::default()
        };
        let assessment = FraudRules::default().assess(&input("Hit a pole", "Hood"), &[], None, &record);
        assert!(assessment.siu_referral);
        assert!(assessment.should_block);
        assert_eq!(assessment.recommended_action, "Block claim and refer to SIU.");
    }

    #[test]
    fn test_conviction_adds_points() {
        let claim = input("Hit a pole", "Hood");
        let rules = FraudRules::default();
        let base = rules.assess(&claim, &[], None, &ClaimantRecord::default());
        let convicted = rules.assess(
            &claim,
            &[],
            None,
            &ClaimantRecord {
                prior_fraud_conviction: true,
                ..ClaimantRecord::default()
            },
        );
        assert!((convicted.composite_score.value() - base.composite_score.value() - 25.0).abs() < 1e-9);
    }
}

// ============================================================================
// Properties
// ============================================================================

fn arb_score() -> impl Strategy<Value = Score> {
    (-50.0f64..150.0).prop_map(Score::new)
}

fn arb_adjustments() -> impl Strategy<Value = RiskAdjustments> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(conviction, multiple, cooperation, clean, docs)| RiskAdjustments {
            prior_fraud_conviction: conviction,
            multiple_flags_in_category: multiple,
            cooperation_issues: cooperation,
            clean_history: clean,
            documentation_complete: docs,
        },
    )
}

proptest! {
    #[test]
    fn composite_is_always_clamped(
        p in arb_score(), x in arb_score(), i in arb_score(), h in arb_score(),
        adj in arb_adjustments(),
    ) {
        let score = FraudRules::default().composite(p, x, i, h, &adj);
        prop_assert!((0.0..=100.0).contains(&score.value()));
    }

    #[test]
    fn composite_is_monotonic_in_pattern_score(
        a in 0.0f64..100.0, b in 0.0f64..100.0, x in arb_score(), adj in arb_adjustments(),
    ) {
        let rules = FraudRules::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let low = rules.composite(Score::new(lo), x, Score::MIN, Score::MIN, &adj);
        let high = rules.composite(Score::new(hi), x, Score::MIN, Score::MIN, &adj);
        prop_assert!(low <= high);
    }

    #[test]
    fn likelihood_never_decreases_with_score(a in 0.0f64..100.0, b in 0.0f64..100.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            FraudLikelihood::from_score(Score::new(lo)) <= FraudLikelihood::from_score(Score::new(hi))
        );
    }

    #[test]
    fn high_composite_always_refers_and_blocks(
        incident in "[a-z ]{0,40}",
    ) {
        let record = ClaimantRecord {
            prior_fraud_conviction: true,
            ..ClaimantRecord::default()
        };
        let claim = input(&format!("{incident} staged, witnesses left, multiple occupants"), "inflated pre-existing damage");
        let priors = [
            prior("CLM-00000001", 5, ClaimStatus::FraudSuspected),
            prior("CLM-00000002", 9, ClaimStatus::Closed),
        ];
        let assessment = FraudRules::default().assess(&claim, &priors, None, &record);
        if assessment.composite_score.value() > 75.0 {
            prop_assert!(assessment.should_block);
        }
        if assessment.composite_score.value() > 60.0 {
            prop_assert!(assessment.siu_referral);
        }
    }
}

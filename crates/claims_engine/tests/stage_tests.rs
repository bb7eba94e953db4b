//! Tests for the built-in specialist stages

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;

use claims_engine::stages::{
    ClaimReport, ClaimReportStage, DuplicateResolutionStage, DuplicateSearch, FraudAssessmentStage,
    FraudCrossReference, FraudPatternAnalysis, PayoutBreakdown, PayoutCalculation, PolicyCheck,
    PolicyVerification, VehicleValuationStage, DUPLICATE_SEARCH, FRAUD_CROSS_REFERENCE,
    FRAUD_PATTERN_ANALYSIS, VEHICLE_VALUATION,
};
use claims_engine::{ReferenceData, StaticPolicyLookup};
use core_kernel::PortError;
use domain_claims::{
    Claim, ClaimInput, ClaimStatus, ClaimStore, ClaimType, DuplicateAssessment, DuplicateRules,
    FraudAssessment, FraudRules, Stage, StageContext, StageOutput, StatusUpdate,
};
use infra_db::SqliteClaimStore;
use test_utils::{
    assert_score_approx, assert_score_in_range, in_memory_store, seed_claim, ClaimFixtures,
    FixedPolicyLookup, FixedValuation, LAPSED_POLICY,
};

async fn stored(store: &SqliteClaimStore, input: ClaimInput) -> Claim {
    let id = store.create_claim(&input).await.unwrap();
    store.get_claim(&id).await.unwrap()
}

async fn run(stage: &dyn Stage, context: &mut StageContext) -> Result<StageOutput, PortError> {
    let output = stage.run(context).await?;
    context.push(stage.name(), output.clone());
    Ok(output)
}

// ============================================================================
// Policy and payout
// ============================================================================

mod payout_tests {
    use super::*;

    #[tokio::test]
    async fn test_lapsed_policy_is_recorded_not_failed() {
        let store = in_memory_store().await;
        let input = ClaimInput {
            policy_number: LAPSED_POLICY.to_string(),
            ..ClaimFixtures::minor_collision()
        };
        let claim = stored(&store, input).await;
        let lookup = Arc::new(StaticPolicyLookup::new(Arc::new(ReferenceData::samples())));
        let mut context = StageContext::new(claim, ClaimType::New, "rationale");

        let output = run(&PolicyVerification::new(lookup), &mut context).await.unwrap();
        let check: PolicyCheck = serde_json::from_value(output.data).unwrap();
        assert!(!check.active);
        assert!(output.summary.contains("not active"));
    }

    #[tokio::test]
    async fn test_payout_needs_valuation_output() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let context = StageContext::new(claim, ClaimType::TotalLoss, "rationale");

        let error = PayoutCalculation::new(Arc::new(FixedPolicyLookup::active(dec!(500))))
            .run(&context)
            .await
            .unwrap_err();
        match error {
            PortError::Validation { message, .. } => assert!(message.contains(VEHICLE_VALUATION)),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_payout_is_value_less_deductible() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let mut context = StageContext::new(claim, ClaimType::TotalLoss, "rationale");

        run(&VehicleValuationStage::new(Arc::new(FixedValuation::new(dec!(9800.456)))), &mut context)
            .await
            .unwrap();
        let output = run(
            &PayoutCalculation::new(Arc::new(FixedPolicyLookup::active(dec!(1000)))),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(output.payout_amount, Some(dec!(8800.46)));
        assert_eq!(context.payout_amount(), Some(dec!(8800.46)));
    }

    #[tokio::test]
    async fn test_deductible_above_value_pays_nothing() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let mut context = StageContext::new(claim, ClaimType::TotalLoss, "rationale");

        run(&VehicleValuationStage::new(Arc::new(FixedValuation::new(dec!(400)))), &mut context)
            .await
            .unwrap();
        let output = run(
            &PayoutCalculation::new(Arc::new(FixedPolicyLookup::active(dec!(500)))),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(output.payout_amount, Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_lapsed_policy_pays_nothing() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let mut context = StageContext::new(claim, ClaimType::TotalLoss, "rationale");

        run(&VehicleValuationStage::new(Arc::new(FixedValuation::new(dec!(15000)))), &mut context)
            .await
            .unwrap();
        let output = run(&PayoutCalculation::new(Arc::new(FixedPolicyLookup::lapsed())), &mut context)
            .await
            .unwrap();
        let breakdown: PayoutBreakdown = serde_json::from_value(output.data).unwrap();
        assert!(!breakdown.policy_active);
        assert_eq!(output.payout_amount, Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_implausible_valuation_fails() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let mut context = StageContext::new(claim, ClaimType::TotalLoss, "rationale");

        run(&VehicleValuationStage::new(Arc::new(FixedValuation::new(dec!(99.99)))), &mut context)
            .await
            .unwrap();
        let error = run(
            &PayoutCalculation::new(Arc::new(FixedPolicyLookup::active(dec!(500)))),
            &mut context,
        )
        .await
        .unwrap_err();
        assert!(matches!(error, PortError::Validation { .. }));
    }
}

// ============================================================================
// Duplicates
// ============================================================================

mod duplicate_tests {
    use super::*;

    #[tokio::test]
    async fn test_search_then_merge_into_earliest() {
        let store = in_memory_store().await;
        let original = stored(&store, ClaimFixtures::minor_collision()).await;
        let resubmitted = stored(&store, ClaimFixtures::resubmitted_collision()).await;
        let rules = DuplicateRules::default();
        let mut context = StageContext::new(resubmitted, ClaimType::Duplicate, "rationale");

        let search = run(&DuplicateSearch::new(store.clone(), rules.clone()), &mut context)
            .await
            .unwrap();
        assert!(search.summary.ends_with("(duplicate)."), "{}", search.summary);
        let assessment: DuplicateAssessment = context.data(DUPLICATE_SEARCH).unwrap();
        assert_eq!(assessment.candidates.len(), 1);
        let candidate = &assessment.candidates[0];
        assert_score_in_range(candidate.composite_score);
        assert_score_approx(candidate.sub_scores.vin, 100.0, 0.001);
        // three days apart on a seven-day linear decay
        assert_score_approx(candidate.sub_scores.incident_date, 57.14, 0.01);
        assert!(assessment.top_score().unwrap().value() >= 80.0);

        let output = run(&DuplicateResolutionStage::new(rules), &mut context)
            .await
            .unwrap();
        assert_eq!(
            output.data,
            json!({ "decision": "merge", "canonical": original.id.as_str() })
        );
    }

    #[tokio::test]
    async fn test_resolution_without_search_fails() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::minor_collision()).await;
        let context = StageContext::new(claim, ClaimType::Duplicate, "rationale");

        let error = DuplicateResolutionStage::new(DuplicateRules::default())
            .run(&context)
            .await
            .unwrap_err();
        assert!(matches!(error, PortError::Validation { .. }));
    }
}

// ============================================================================
// Fraud
// ============================================================================

mod fraud_tests {
    use super::*;

    #[tokio::test]
    async fn test_prior_fraud_on_vin_blocks_claim() {
        let store = in_memory_store().await;
        let prior = ClaimInput {
            incident_date: test_utils::jan(2),
            ..ClaimFixtures::staged_accident()
        };
        seed_claim(&store, &prior, StatusUpdate::to(ClaimStatus::FraudSuspected)).await;
        let claim = stored(&store, ClaimFixtures::staged_accident()).await;

        let rules = FraudRules::default();
        let mut context = StageContext::new(claim, ClaimType::Fraud, "rationale");
        run(&FraudPatternAnalysis::new(store.clone(), rules.clone()), &mut context)
            .await
            .unwrap();
        run(
            &FraudCrossReference::new(Arc::new(FixedValuation::new(dec!(18000))), rules.clone()),
            &mut context,
        )
        .await
        .unwrap();
        let output = run(&FraudAssessmentStage::new(rules), &mut context)
            .await
            .unwrap();

        let assessment: FraudAssessment = serde_json::from_value(output.data.clone()).unwrap();
        assert!(assessment.should_block);
        let likelihood = assessment.likelihood.to_string();
        assert!(output.summary.contains(&format!("({likelihood})")), "{}", output.summary);
        assert_eq!(likelihood, likelihood.to_lowercase());
        assert!(assessment
            .indicators
            .contains(&"vin_linked_to_known_fraud".to_string()));
        assert!(assessment
            .indicators
            .contains(&"multiple_claims_same_vin".to_string()));
        assert!(context.output(FRAUD_PATTERN_ANALYSIS).is_some());
        assert!(context.output(FRAUD_CROSS_REFERENCE).is_some());
    }

    #[tokio::test]
    async fn test_pattern_analysis_excludes_the_claim_itself() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::repairable_damage()).await;
        let mut context = StageContext::new(claim, ClaimType::Fraud, "rationale");

        let output = run(
            &FraudPatternAnalysis::new(store.clone(), FraudRules::default()),
            &mut context,
        )
        .await
        .unwrap();
        assert_eq!(output.data["prior_claims"], json!([]));
        assert_eq!(output.data["analysis"]["claims_in_window"], 1);
    }
}

// ============================================================================
// Report
// ============================================================================

mod report_tests {
    use super::*;

    #[tokio::test]
    async fn test_report_lists_earlier_findings_and_payout() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::modest_total_loss()).await;
        let mut context = StageContext::new(claim, ClaimType::TotalLoss, "Flood damage.");
        context.push("vehicle_valuation", StageOutput::new("Valued at 15000.", json!({})));
        context.push(
            "payout_calculation",
            StageOutput::new("Payout 14500.", json!({})).with_payout(dec!(14500)),
        );

        let output = run(&ClaimReportStage, &mut context).await.unwrap();
        let report: ClaimReport = serde_json::from_value(output.data).unwrap();
        assert_eq!(report.final_status, "closed");
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[1], "payout_calculation: Payout 14500.");
        assert_eq!(report.payout_amount, Some(dec!(14500)));
        assert!(output.summary.contains("Payout 14500"));
    }
}

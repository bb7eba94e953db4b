//! Tests for the rule-based classifier and the retry decorator

use claims_engine::{KeywordClassifier, RetryingClassifier};
use core_kernel::{PortError, RetryPolicy};
use domain_claims::{Claim, ClaimInput, ClaimStore, ClaimType, Classifier, EscalationRules};
use infra_db::SqliteClaimStore;
use test_utils::{in_memory_store, jan, ClaimFixtures, ClaimInputBuilder, ScriptStep, ScriptedClassifier};

async fn stored(store: &SqliteClaimStore, input: ClaimInput) -> Claim {
    let id = store.create_claim(&input).await.unwrap();
    store.get_claim(&id).await.unwrap()
}

async fn label_of(input: ClaimInput) -> ClaimType {
    let store = in_memory_store().await;
    let claim = stored(&store, input).await;
    let classification = KeywordClassifier::new(store.clone())
        .classify(&claim)
        .await
        .unwrap();
    classification.label.parse().unwrap()
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

// ============================================================================
// Keyword classifier
// ============================================================================

mod keyword_tests {
    use super::*;

    #[tokio::test]
    async fn test_fraud_wording_wins() {
        assert_eq!(label_of(ClaimFixtures::staged_accident()).await, ClaimType::Fraud);
    }

    #[tokio::test]
    async fn test_flood_is_total_loss() {
        assert_eq!(label_of(ClaimFixtures::flooded_total_loss()).await, ClaimType::TotalLoss);
    }

    #[tokio::test]
    async fn test_named_parts_are_partial_loss() {
        assert_eq!(label_of(ClaimFixtures::repairable_damage()).await, ClaimType::PartialLoss);
    }

    #[tokio::test]
    async fn test_no_signals_is_new() {
        let input = ClaimInputBuilder::new()
            .with_incident("Hit a deer on a rural highway at dusk")
            .with_damage("Grille cracked")
            .build();
        assert_eq!(label_of(input).await, ClaimType::New);
    }

    #[tokio::test]
    async fn test_recent_claim_on_same_vin_is_duplicate() {
        let store = in_memory_store().await;
        stored(&store, ClaimFixtures::minor_collision()).await;
        let second = stored(&store, ClaimFixtures::resubmitted_collision()).await;

        let classification = KeywordClassifier::new(store.clone())
            .classify(&second)
            .await
            .unwrap();
        assert_eq!(classification.label, "duplicate");
        assert!(classification.rationale.contains("within 7 days"));
    }

    #[tokio::test]
    async fn test_claim_outside_window_is_not_duplicate() {
        let store = in_memory_store().await;
        stored(&store, ClaimFixtures::minor_collision()).await;
        let later = ClaimInputBuilder::new().with_incident_date(jan(30)).build();
        let second = stored(&store, later).await;

        let classification = KeywordClassifier::new(store.clone())
            .classify(&second)
            .await
            .unwrap();
        assert_eq!(classification.label, "partial_loss");
    }

    #[tokio::test]
    async fn test_rationales_read_as_confident() {
        let rules = EscalationRules::default();
        let store = in_memory_store().await;
        for input in [
            ClaimFixtures::staged_accident(),
            ClaimFixtures::flooded_total_loss(),
            ClaimFixtures::repairable_damage(),
        ] {
            let claim = stored(&store, input).await;
            let classification = KeywordClassifier::new(store.clone())
                .classify(&claim)
                .await
                .unwrap();
            assert!(
                rules.classifier_confidence(&classification.rationale) >= rules.confidence_threshold,
                "hedged rationale: {}",
                classification.rationale
            );
        }
    }
}

// ============================================================================
// Retry decorator
// ============================================================================

mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::minor_collision()).await;
        let classifier = RetryingClassifier::new(
            ScriptedClassifier::new(vec![
                ScriptStep::Fail(|| PortError::connection("connection reset")),
                ScriptStep::label("new"),
            ]),
            fast_retries(),
        );

        let classification = classifier.classify(&claim).await.unwrap();
        assert_eq!(classification.label, "new");
        assert_eq!(classifier.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::minor_collision()).await;
        let classifier = RetryingClassifier::new(
            ScriptedClassifier::new(vec![ScriptStep::Fail(|| {
                PortError::validation("prompt rejected")
            })]),
            fast_retries(),
        );

        let error = classifier.classify(&claim).await.unwrap_err();
        assert!(matches!(error, PortError::Validation { .. }));
        assert_eq!(classifier.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let store = in_memory_store().await;
        let claim = stored(&store, ClaimFixtures::minor_collision()).await;
        let classifier = RetryingClassifier::new(
            ScriptedClassifier::new(vec![ScriptStep::Fail(|| PortError::timeout("classify", 10))]),
            fast_retries(),
        );

        assert!(classifier.classify(&claim).await.is_err());
        assert_eq!(classifier.inner().calls(), 3);
    }
}


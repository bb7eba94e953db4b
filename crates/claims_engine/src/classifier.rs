//! Classifier adapters
//!
//! [`KeywordClassifier`] is a deterministic stand-in for a reasoning service:
//! it reads the narratives, checks the store for a recent claim on the same
//! VIN, and always explains itself in one specific sentence.
//! [`RetryingClassifier`] wraps any classifier with bounded backoff on
//! transient failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError, RetryPolicy};
use domain_claims::damage::DamageLexicon;
use domain_claims::text::matching_phrases;
use domain_claims::{Claim, ClaimStore, ClaimType, Classification, Classifier, EscalationRules};

/// Rule order: fraud wording, total-loss wording, a recent claim on the VIN,
/// repairable parts, otherwise a new claim.
pub struct KeywordClassifier {
    store: Arc<dyn ClaimStore>,
    damage: DamageLexicon,
    fraud_keywords: Vec<String>,
    duplicate_window_days: u32,
}

impl KeywordClassifier {
    pub fn new(store: Arc<dyn ClaimStore>) -> Self {
        Self {
            store,
            damage: DamageLexicon::default(),
            fraud_keywords: EscalationRules::default().fraud_keywords,
            duplicate_window_days: 7,
        }
    }

    pub fn with_damage_lexicon(mut self, damage: DamageLexicon) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_fraud_keywords(mut self, keywords: Vec<String>) -> Self {
        self.fraud_keywords = keywords;
        self
    }

    pub fn with_duplicate_window(mut self, days: u32) -> Self {
        self.duplicate_window_days = days;
        self
    }
}

impl DomainPort for KeywordClassifier {}

#[async_trait]
impl Classifier for KeywordClassifier {
    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn classify(&self, claim: &Claim) -> Result<Classification, PortError> {
        let details = &claim.details;
        let texts = [details.incident_description.as_str(), details.damage_description.as_str()];

        let fraud_hits = matching_phrases(&texts, &self.fraud_keywords);
        if !fraud_hits.is_empty() {
            return Ok(labelled(
                ClaimType::Fraud,
                format!("Narrative contains fraud indicators: {}.", fraud_hits.join(", ")),
            ));
        }

        let profile = self
            .damage
            .analyze(&details.incident_description, &details.damage_description);
        if profile.indicates_total_loss {
            return Ok(labelled(
                ClaimType::TotalLoss,
                "Damage description states the vehicle is a total loss.",
            ));
        }

        let candidates = self
            .store
            .find_duplicate_candidates(claim, self.duplicate_window_days)
            .await?;
        if let Some(existing) = candidates.first() {
            return Ok(labelled(
                ClaimType::Duplicate,
                format!(
                    "Claim {} on VIN {} has an incident dated {}, within {} days of this one.",
                    existing.id, details.vin, existing.details.incident_date, self.duplicate_window_days
                ),
            ));
        }

        if profile.repairable {
            return Ok(labelled(
                ClaimType::PartialLoss,
                format!("Repairable damage to {}.", profile.damaged_parts.join(", ")),
            ));
        }

        Ok(labelled(
            ClaimType::New,
            "First notice of loss with no fraud, total-loss, duplicate, or repairable-part wording.",
        ))
    }
}

fn labelled(claim_type: ClaimType, rationale: impl Into<String>) -> Classification {
    let classification = Classification::new(claim_type.as_str(), rationale);
    debug!(label = %classification.label, "Claim classified");
    classification
}

/// Retries transient classifier failures with exponential backoff
pub struct RetryingClassifier<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: Classifier> RetryingClassifier<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Classifier> DomainPort for RetryingClassifier<C> {}

#[async_trait]
impl<C: Classifier> Classifier for RetryingClassifier<C> {
    async fn classify(&self, claim: &Claim) -> Result<Classification, PortError> {
        self.policy
            .run("classify", || self.inner.classify(claim))
            .await
    }
}

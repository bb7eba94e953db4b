//! Escalation rule evaluation
//!
//! Decides whether a classified claim must go to a human reviewer before any
//! automated pipeline runs. The evaluator is a pure function of its inputs:
//! no clock, no store, no randomness. Reasons are kept in a sorted set so the
//! same inputs always serialize to the same decision.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::Score;
use crate::claim::ClaimInput;
use crate::text::{matching_phrases, tag};

/// Review priority, ordered low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    FraudIndicators,
    HighValue,
    AmbiguousDuplicate,
    LowConfidence,
}

impl EscalationReason {
    pub fn severity(&self) -> Priority {
        match self {
            EscalationReason::FraudIndicators | EscalationReason::HighValue => Priority::High,
            EscalationReason::AmbiguousDuplicate | EscalationReason::LowConfidence => Priority::Medium,
        }
    }

    fn reviewer_hint(&self) -> &'static str {
        match self {
            EscalationReason::FraudIndicators => "Refer to SIU if fraud indicators are confirmed.",
            EscalationReason::HighValue => "Verify valuation and damage estimate.",
            EscalationReason::AmbiguousDuplicate => "Confirm duplicate vs new claim.",
            EscalationReason::LowConfidence => "Confirm routing classification.",
        }
    }
}

/// Thresholds and word lists the evaluator works from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationRules {
    /// Amounts strictly above this are high value
    pub high_value_threshold: Decimal,
    /// Similarity scores in `[low, high)` are ambiguous
    pub ambiguous_similarity_low: f64,
    pub ambiguous_similarity_high: f64,
    /// Classifier confidence below this is low confidence
    pub confidence_threshold: f64,
    pub confidence_penalty: f64,
    pub confidence_floor: f64,
    /// Confidence assumed for an empty rationale
    pub empty_rationale_confidence: f64,
    pub hedge_phrases: Vec<String>,
    pub fraud_keywords: Vec<String>,
}

impl Default for EscalationRules {
    fn default() -> Self {
        Self {
            high_value_threshold: dec!(25000),
            ambiguous_similarity_low: 60.0,
            ambiguous_similarity_high: 80.0,
            confidence_threshold: 0.7,
            confidence_penalty: 0.15,
            confidence_floor: 0.3,
            empty_rationale_confidence: 0.5,
            hedge_phrases: [
                "possibly", "might be", "unclear", "unsure", "could be", "uncertain",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fraud_keywords: [
                "staged", "multiple occupants", "witnesses left", "witness left", "prior claims",
                "suspicious damage", "inflated", "pre-existing", "inconsistent",
                "material misrepresentation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Outcome of the escalation gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub needs_review: bool,
    pub reasons: BTreeSet<EscalationReason>,
    pub priority: Priority,
    pub recommended_action: String,
    pub fraud_indicators: Vec<String>,
}

impl EscalationRules {
    /// Evaluates every trigger independently and folds them into a decision.
    pub fn evaluate(
        &self,
        claim: &ClaimInput,
        rationale: &str,
        similarity: Option<Score>,
        amount: Option<Decimal>,
    ) -> EscalationDecision {
        let mut reasons = BTreeSet::new();

        let fraud_indicators: Vec<String> = matching_phrases(
            &[&claim.incident_description, &claim.damage_description],
            &self.fraud_keywords,
        )
        .into_iter()
        .map(tag)
        .collect();
        if !fraud_indicators.is_empty() {
            reasons.insert(EscalationReason::FraudIndicators);
        }

        if matches!(amount, Some(value) if value > self.high_value_threshold) {
            reasons.insert(EscalationReason::HighValue);
        }

        if let Some(score) = similarity {
            let value = score.value();
            if value >= self.ambiguous_similarity_low && value < self.ambiguous_similarity_high {
                reasons.insert(EscalationReason::AmbiguousDuplicate);
            }
        }

        if self.classifier_confidence(rationale) < self.confidence_threshold {
            reasons.insert(EscalationReason::LowConfidence);
        }

        let priority = reasons
            .iter()
            .map(EscalationReason::severity)
            .max()
            .unwrap_or(Priority::Low);

        let recommended_action = if reasons.is_empty() {
            "No escalation needed.".to_string()
        } else {
            std::iter::once("Review claim manually.")
                .chain(reasons.iter().map(EscalationReason::reviewer_hint))
                .collect::<Vec<_>>()
                .join(" ")
        };

        EscalationDecision {
            needs_review: !reasons.is_empty(),
            reasons,
            priority,
            recommended_action,
            fraud_indicators,
        }
    }

    /// Heuristic confidence in `[floor, 1.0]`: every hedge in the rationale
    /// costs a fixed penalty.
    pub fn classifier_confidence(&self, rationale: &str) -> f64 {
        let text = rationale.trim().to_lowercase();
        if text.is_empty() {
            return self.empty_rationale_confidence;
        }
        let hedges = self
            .hedge_phrases
            .iter()
            .filter(|phrase| text.contains(phrase.as_str()))
            .count();
        (1.0 - self.confidence_penalty * hedges as f64).clamp(self.confidence_floor, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn claim(incident: &str, damage: &str) -> ClaimInput {
        ClaimInput {
            policy_number: "POL-001".to_string(),
            vin: "1HGBH41JXMN109186".to_string(),
            vehicle_year: Some(2021),
            vehicle_make: Some("Honda".to_string()),
            vehicle_model: Some("Accord".to_string()),
            incident_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            incident_description: incident.to_string(),
            damage_description: damage.to_string(),
            estimated_damage: None,
        }
    }

    #[test]
    fn test_clean_claim_needs_no_review() {
        let decision = EscalationRules::default().evaluate(
            &claim("Backed into a pole in a parking lot", "Rear bumper dented"),
            "Single-vehicle collision with clearly described bumper damage.",
            None,
            Some(dec!(1200)),
        );
        assert!(!decision.needs_review);
        assert_eq!(decision.priority, Priority::Low);
        assert_eq!(decision.recommended_action, "No escalation needed.");
    }

    #[test]
    fn test_high_value_is_strictly_above_threshold() {
        let rules = EscalationRules::default();
        let c = claim("Hit a deer", "Hood and grille damage");
        let rationale = "Animal strike with front-end damage.";
        assert!(!rules.evaluate(&c, rationale, None, Some(dec!(25000))).needs_review);
        let decision = rules.evaluate(&c, rationale, None, Some(dec!(25000.01)));
        assert!(decision.reasons.contains(&EscalationReason::HighValue));
        assert_eq!(decision.priority, Priority::High);
    }

    #[test]
    fn test_hedged_rationale_is_low_confidence() {
        let rules = EscalationRules::default();
        assert_eq!(rules.classifier_confidence("Clear rear-end collision."), 1.0);
        assert!((rules.classifier_confidence("Possibly new, unclear") - 0.7).abs() < 1e-9);
        assert!((rules.classifier_confidence("possibly, might be, unclear") - 0.55).abs() < 1e-9);
        assert_eq!(rules.classifier_confidence(""), 0.5);
    }
}

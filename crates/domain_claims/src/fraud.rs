//! Fraud risk engine
//!
//! Three passes over a claim and its VIN history, each producing a bounded
//! sub-score:
//!
//! - pattern analysis: staged-accident wording, timing red flags, claim
//!   frequency on the VIN in a rolling window
//! - cross reference: fraud-lexicon hits, prior claims on the VIN already
//!   marked `fraud_suspected`, damage-to-value ratio
//! - inconsistency and history: narrative contradictions and the VIN's past
//!
//! The composite is `0.3·pattern + 0.3·cross_reference + 0.2·inconsistency +
//! 0.2·historical` plus fixed adjustments, clamped to `[0, 100]`.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, Score};
use crate::claim::{Claim, ClaimInput, ClaimStatus};
use crate::text::{jaccard, matching_phrases, tag};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Known fraud wording, by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudLexicon {
    pub staged_accident: Vec<String>,
    pub suspicious_claim: Vec<String>,
    pub timing_red_flags: Vec<String>,
    pub damage_fraud: Vec<String>,
    pub minor_incident: Vec<String>,
    pub severe_damage: Vec<String>,
    pub bodily_injury: Vec<String>,
}

impl Default for FraudLexicon {
    fn default() -> Self {
        Self {
            staged_accident: strings(&[
                "staged", "multiple occupants", "witnesses left", "witness left", "no witnesses",
                "brake checked", "sudden stop", "swoop and squat", "all passengers injured",
            ]),
            suspicious_claim: strings(&[
                "prior claims", "suspicious", "material misrepresentation", "inconsistent",
                "fabricated", "cash settlement", "no police report",
            ]),
            timing_red_flags: strings(&[
                "new policy", "just purchased", "recently purchased", "policy started",
                "just insured", "before policy", "day after purchase",
            ]),
            damage_fraud: strings(&[
                "inflated", "pre-existing", "exaggerated", "old damage", "prior damage",
            ]),
            minor_incident: strings(&[
                "minor", "small", "slight", "light tap", "low speed", "barely", "fender bender",
            ]),
            severe_damage: strings(&[
                "totaled", "destroyed", "frame", "airbags deployed", "extensive", "severe",
                "engine damage",
            ]),
            bodily_injury: strings(&[
                "injured", "injury", "injuries", "whiplash", "hospital", "hospitalized",
                "neck pain", "back pain",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudRules {
    pub lexicon: FraudLexicon,
    /// Rolling window for claim frequency on a VIN
    pub multiple_claims_days: i64,
    /// Claims (this one included) in the window that count as frequent
    pub multiple_claims_threshold: usize,
    pub staged_keyword_score: f64,
    pub timing_anomaly_score: f64,
    pub multiple_claims_score: f64,
    pub lexicon_keyword_score: f64,
    pub known_fraud_match_score: f64,
    pub damage_value_ratio: f64,
    pub damage_value_score: f64,
    pub minor_vs_severe_score: f64,
    pub minor_vs_large_amount_score: f64,
    pub large_amount: Decimal,
    pub narrative_mismatch_overlap: f64,
    pub narrative_mismatch_score: f64,
    pub prior_claim_score: f64,
    pub prior_fraud_score: f64,
    pub weights: CompositeWeights,
    pub adjustments: AdjustmentPoints,
    pub clean_history_years: u32,
    /// Composite strictly above this refers to SIU
    pub siu_threshold: f64,
    /// Composite strictly above this blocks the claim
    pub block_threshold: f64,
}

impl Default for FraudRules {
    fn default() -> Self {
        Self {
            lexicon: FraudLexicon::default(),
            multiple_claims_days: 90,
            multiple_claims_threshold: 2,
            staged_keyword_score: 20.0,
            timing_anomaly_score: 15.0,
            multiple_claims_score: 25.0,
            lexicon_keyword_score: 20.0,
            known_fraud_match_score: 40.0,
            damage_value_ratio: 0.9,
            damage_value_score: 20.0,
            minor_vs_severe_score: 50.0,
            minor_vs_large_amount_score: 30.0,
            large_amount: dec!(10000),
            narrative_mismatch_overlap: 0.1,
            narrative_mismatch_score: 20.0,
            prior_claim_score: 15.0,
            prior_fraud_score: 40.0,
            weights: CompositeWeights::default(),
            adjustments: AdjustmentPoints::default(),
            clean_history_years: 5,
            siu_threshold: 60.0,
            block_threshold: 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub pattern: f64,
    pub cross_reference: f64,
    pub inconsistency: f64,
    pub historical: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            pattern: 0.3,
            cross_reference: 0.3,
            inconsistency: 0.2,
            historical: 0.2,
        }
    }
}

/// Points added (or removed) after weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentPoints {
    pub prior_fraud_conviction: f64,
    pub multiple_flags_in_category: f64,
    pub cooperation_issues: f64,
    pub clean_history: f64,
    pub documentation_complete: f64,
}

impl Default for AdjustmentPoints {
    fn default() -> Self {
        Self {
            prior_fraud_conviction: 25.0,
            multiple_flags_in_category: 10.0,
            cooperation_issues: 5.0,
            clean_history: -10.0,
            documentation_complete: -5.0,
        }
    }
}

/// What is known about the claimant beyond this claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimantRecord {
    pub prior_fraud_conviction: bool,
    pub prior_siu_referral: bool,
    pub active_siu_investigation: bool,
    pub cooperation_issues: bool,
    pub clean_history_years: u32,
}

/// Which adjustments apply to a particular assessment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAdjustments {
    pub prior_fraud_conviction: bool,
    pub multiple_flags_in_category: bool,
    pub cooperation_issues: bool,
    pub clean_history: bool,
    pub documentation_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudLikelihood {
    Unlikely,
    Possible,
    Probable,
    Likely,
    Confirmed,
}

impl FraudLikelihood {
    pub fn from_score(score: Score) -> Self {
        match score.value() {
            v if v <= 20.0 => FraudLikelihood::Unlikely,
            v if v <= 40.0 => FraudLikelihood::Possible,
            v if v <= 60.0 => FraudLikelihood::Probable,
            v if v <= 80.0 => FraudLikelihood::Likely,
            _ => FraudLikelihood::Confirmed,
        }
    }
}

impl fmt::Display for FraudLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FraudLikelihood::Unlikely => "unlikely",
            FraudLikelihood::Possible => "possible",
            FraudLikelihood::Probable => "probable",
            FraudLikelihood::Likely => "likely",
            FraudLikelihood::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub staged_indicators: Vec<String>,
    pub timing_flags: Vec<String>,
    /// Claims on the VIN inside the rolling window, this one included
    pub claims_in_window: usize,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    pub lexicon_hits: Vec<String>,
    pub known_fraud_matches: Vec<ClaimId>,
    pub damage_to_value_ratio: Option<f64>,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub pattern_score: Score,
    pub cross_reference_score: Score,
    pub inconsistency_score: Score,
    pub historical_risk: Score,
    pub composite_score: Score,
    pub likelihood: FraudLikelihood,
    pub siu_referral: bool,
    pub should_block: bool,
    pub indicators: Vec<String>,
    pub recommended_action: String,
}

impl FraudRules {
    /// Pattern pass. `prior_claims` are other claims on the same VIN.
    pub fn analyze_patterns(&self, claim: &ClaimInput, prior_claims: &[Claim]) -> PatternAnalysis {
        let texts = [claim.incident_description.as_str(), claim.damage_description.as_str()];
        let staged_indicators = tags(matching_phrases(&texts, &self.lexicon.staged_accident));
        let timing_flags = tags(matching_phrases(&texts, &self.lexicon.timing_red_flags));

        let claims_in_window = 1 + prior_claims
            .iter()
            .filter(|prior| {
                (prior.details.incident_date - claim.incident_date).num_days().abs()
                    <= self.multiple_claims_days
            })
            .count();

        let mut raw = self.staged_keyword_score * staged_indicators.len() as f64
            + self.timing_anomaly_score * timing_flags.len() as f64;
        if claims_in_window >= self.multiple_claims_threshold {
            raw += self.multiple_claims_score;
        }

        PatternAnalysis {
            staged_indicators,
            timing_flags,
            claims_in_window,
            score: Score::new(raw),
        }
    }

    /// Cross-reference pass against the lexicon, the VIN's fraud history, and
    /// the vehicle's value.
    pub fn cross_reference(
        &self,
        claim: &ClaimInput,
        prior_claims: &[Claim],
        vehicle_value: Option<Decimal>,
    ) -> CrossReference {
        let texts = [claim.incident_description.as_str(), claim.damage_description.as_str()];
        let mut lexicon_hits = tags(matching_phrases(&texts, &self.lexicon.suspicious_claim));
        lexicon_hits.extend(tags(matching_phrases(&texts, &self.lexicon.damage_fraud)));

        let known_fraud_matches: Vec<ClaimId> = prior_claims
            .iter()
            .filter(|prior| prior.status == ClaimStatus::FraudSuspected)
            .map(|prior| prior.id.clone())
            .collect();

        let damage_to_value_ratio = match (claim.estimated_damage, vehicle_value) {
            (Some(damage), Some(value)) if value > Decimal::ZERO => (damage / value).to_f64(),
            _ => None,
        };

        let mut raw = self.lexicon_keyword_score * lexicon_hits.len() as f64;
        if !known_fraud_matches.is_empty() {
            raw += self.known_fraud_match_score;
        }
        if matches!(damage_to_value_ratio, Some(ratio) if ratio >= self.damage_value_ratio) {
            raw += self.damage_value_score;
        }

        CrossReference {
            lexicon_hits,
            known_fraud_matches,
            damage_to_value_ratio,
            score: Score::new(raw),
        }
    }

    /// Contradictions inside the claim: a minor incident with severe damage
    /// or a large bill, or narratives that share almost no words.
    pub fn inconsistency(&self, claim: &ClaimInput) -> (Score, Vec<String>) {
        let incident = [claim.incident_description.as_str()];
        let damage = [claim.damage_description.as_str()];
        let minor = !matching_phrases(&incident, &self.lexicon.minor_incident).is_empty();
        let severe = !matching_phrases(&damage, &self.lexicon.severe_damage).is_empty();

        let mut flags = Vec::new();
        let mut raw = 0.0;
        if minor && severe {
            flags.push("minor_incident_severe_damage".to_string());
            raw += self.minor_vs_severe_score;
        }
        if minor && matches!(claim.estimated_damage, Some(amount) if amount > self.large_amount) {
            flags.push("minor_incident_large_amount".to_string());
            raw += self.minor_vs_large_amount_score;
        }
        let has_both = !claim.incident_description.trim().is_empty()
            && !claim.damage_description.trim().is_empty();
        if has_both
            && jaccard(&claim.incident_description, &claim.damage_description)
                < self.narrative_mismatch_overlap
        {
            flags.push("incident_damage_description_mismatch".to_string());
            raw += self.narrative_mismatch_score;
        }
        (Score::new(raw), flags)
    }

    pub fn historical_risk(&self, prior_claims: &[Claim]) -> Score {
        let fraud = prior_claims
            .iter()
            .filter(|prior| prior.status == ClaimStatus::FraudSuspected)
            .count() as f64;
        Score::new(self.prior_claim_score * prior_claims.len() as f64 + self.prior_fraud_score * fraud)
    }

    /// Weighted composite plus adjustments, clamped.
    pub fn composite(
        &self,
        pattern: Score,
        cross_reference: Score,
        inconsistency: Score,
        historical: Score,
        adjustments: &RiskAdjustments,
    ) -> Score {
        let w = &self.weights;
        let points = &self.adjustments;
        let mut raw = pattern.weighted(w.pattern)
            + cross_reference.weighted(w.cross_reference)
            + inconsistency.weighted(w.inconsistency)
            + historical.weighted(w.historical);

        let applied = [
            (adjustments.prior_fraud_conviction, points.prior_fraud_conviction),
            (adjustments.multiple_flags_in_category, points.multiple_flags_in_category),
            (adjustments.cooperation_issues, points.cooperation_issues),
            (adjustments.clean_history, points.clean_history),
            (adjustments.documentation_complete, points.documentation_complete),
        ];
        raw += applied
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, delta)| delta)
            .sum::<f64>();
        Score::new(raw)
    }

    /// Final pass: combines the pattern and cross-reference results with
    /// inconsistency and history into an assessment.
    pub fn conclude(
        &self,
        claim: &ClaimInput,
        pattern: &PatternAnalysis,
        cross_reference: &CrossReference,
        prior_claims: &[Claim],
        claimant: &ClaimantRecord,
    ) -> FraudAssessment {
        let (inconsistency_score, inconsistency_flags) = self.inconsistency(claim);
        let historical_risk = self.historical_risk(prior_claims);

        let texts = [claim.incident_description.as_str(), claim.damage_description.as_str()];
        let suspicious = matching_phrases(&texts, &self.lexicon.suspicious_claim).len();
        let damage_fraud = matching_phrases(&texts, &self.lexicon.damage_fraud).len();
        let multiple_flags_in_category = pattern.staged_indicators.len() >= 2
            || pattern.timing_flags.len() >= 2
            || suspicious >= 2
            || damage_fraud >= 2;

        let adjustments = RiskAdjustments {
            prior_fraud_conviction: claimant.prior_fraud_conviction,
            multiple_flags_in_category,
            cooperation_issues: claimant.cooperation_issues,
            clean_history: claimant.clean_history_years >= self.clean_history_years,
            documentation_complete: documentation_complete(claim),
        };

        let composite_score = self.composite(
            pattern.score,
            cross_reference.score,
            inconsistency_score,
            historical_risk,
            &adjustments,
        );

        let bodily_injury = !matching_phrases(&texts, &self.lexicon.bodily_injury).is_empty();
        let staged = !pattern.staged_indicators.is_empty();
        let vin_linked_to_known_fraud = !cross_reference.known_fraud_matches.is_empty();

        let siu_referral = composite_score.value() > self.siu_threshold
            || claimant.prior_siu_referral
            || (bodily_injury && staged);
        let should_block = composite_score.value() > self.block_threshold
            || claimant.active_siu_investigation
            || vin_linked_to_known_fraud;

        let mut indicators: Vec<String> = pattern
            .staged_indicators
            .iter()
            .chain(&pattern.timing_flags)
            .chain(&cross_reference.lexicon_hits)
            .cloned()
            .collect();
        if pattern.claims_in_window >= self.multiple_claims_threshold {
            indicators.push("multiple_claims_same_vin".to_string());
        }
        if vin_linked_to_known_fraud {
            indicators.push("vin_linked_to_known_fraud".to_string());
        }
        if matches!(cross_reference.damage_to_value_ratio, Some(r) if r >= self.damage_value_ratio) {
            indicators.push("damage_near_or_above_vehicle_value".to_string());
        }
        indicators.extend(inconsistency_flags);

        let likelihood = FraudLikelihood::from_score(composite_score);
        FraudAssessment {
            pattern_score: pattern.score,
            cross_reference_score: cross_reference.score,
            inconsistency_score,
            historical_risk,
            composite_score,
            likelihood,
            siu_referral,
            should_block,
            indicators,
            recommended_action: recommended_action(likelihood, siu_referral, should_block).to_string(),
        }
    }

    /// All three passes in one call.
    pub fn assess(
        &self,
        claim: &ClaimInput,
        prior_claims: &[Claim],
        vehicle_value: Option<Decimal>,
        claimant: &ClaimantRecord,
    ) -> FraudAssessment {
        let pattern = self.analyze_patterns(claim, prior_claims);
        let cross_reference = self.cross_reference(claim, prior_claims, vehicle_value);
        self.conclude(claim, &pattern, &cross_reference, prior_claims, claimant)
    }
}

fn tags(phrases: Vec<&str>) -> Vec<String> {
    phrases.into_iter().map(tag).collect()
}

fn documentation_complete(claim: &ClaimInput) -> bool {
    claim.vehicle_year.is_some()
        && claim.vehicle_make.is_some()
        && claim.vehicle_model.is_some()
        && claim.estimated_damage.is_some()
}

fn recommended_action(likelihood: FraudLikelihood, siu_referral: bool, should_block: bool) -> &'static str {
    if should_block {
        return "Block claim and refer to SIU.";
    }
    if siu_referral {
        return "Refer to SIU for investigation.";
    }
    match likelihood {
        FraudLikelihood::Unlikely => "Proceed with standard processing.",
        FraudLikelihood::Possible => "Proceed with enhanced documentation review.",
        _ => "Hold payment pending adjuster investigation.",
    }
}

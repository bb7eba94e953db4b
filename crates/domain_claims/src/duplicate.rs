//! Duplicate similarity engine
//!
//! Scores a new claim against previously stored claims for the same VIN and
//! decides whether it is a duplicate, ambiguous, or distinct. The composite is
//! a weighted sum of six sub-scores, each on the `[0, 100]` scale:
//!
//! | field                | weight |
//! |----------------------|--------|
//! | VIN                  | 0.25   |
//! | incident date        | 0.20   |
//! | incident narrative   | 0.20   |
//! | damage narrative     | 0.15   |
//! | location             | 0.10   |
//! | vehicle details      | 0.10   |

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, Score};
use crate::claim::{Claim, ClaimInput};
use crate::text::{jaccard, tokens};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub vin: f64,
    pub incident_date: f64,
    pub incident_description: f64,
    pub damage_description: f64,
    pub location: f64,
    pub vehicle: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            vin: 0.25,
            incident_date: 0.20,
            incident_description: 0.20,
            damage_description: 0.15,
            location: 0.10,
            vehicle: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateRules {
    pub weights: SimilarityWeights,
    /// Candidates are fetched within this many days either side
    pub date_window_days: u32,
    /// Date proximity reaches 0 at this distance
    pub date_decay_days: u32,
    pub duplicate_threshold: f64,
    pub ambiguous_threshold: f64,
    /// Location sub-score when either side has no recognizable location
    pub unknown_location_score: f64,
    /// Best score at or above this is an exact resubmission and is rejected
    pub reject_threshold: f64,
    /// Relative difference in estimated damage above which a merge is escalated
    pub amount_divergence: Decimal,
}

impl Default for DuplicateRules {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            date_window_days: 7,
            date_decay_days: 7,
            duplicate_threshold: 80.0,
            ambiguous_threshold: 60.0,
            unknown_location_score: 50.0,
            reject_threshold: 95.0,
            amount_divergence: dec!(0.25),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    Duplicate,
    Ambiguous,
    Distinct,
}

impl fmt::Display for SimilarityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimilarityBand::Duplicate => "duplicate",
            SimilarityBand::Ambiguous => "ambiguous",
            SimilarityBand::Distinct => "distinct",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub vin: Score,
    pub incident_date: Score,
    pub incident_description: Score,
    pub damage_description: Score,
    pub location: Score,
    pub vehicle: Score,
}

impl SubScores {
    fn composite(&self, weights: &SimilarityWeights) -> Score {
        Score::new(
            self.vin.weighted(weights.vin)
                + self.incident_date.weighted(weights.incident_date)
                + self.incident_description.weighted(weights.incident_description)
                + self.damage_description.weighted(weights.damage_description)
                + self.location.weighted(weights.location)
                + self.vehicle.weighted(weights.vehicle),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub claim_id: ClaimId,
    pub composite_score: Score,
    pub sub_scores: SubScores,
    pub created_at: DateTime<Utc>,
    pub estimated_damage: Option<Decimal>,
}

/// Ranked candidates plus the band of the best one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateAssessment {
    /// Highest score first; equal scores ordered by earliest creation
    pub candidates: Vec<DuplicateCandidate>,
    pub band: SimilarityBand,
}

impl DuplicateAssessment {
    pub fn best(&self) -> Option<&DuplicateCandidate> {
        self.candidates.first()
    }

    pub fn top_score(&self) -> Option<Score> {
        self.best().map(|candidate| candidate.composite_score)
    }
}

/// What to do with a claim judged a duplicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DuplicateResolution {
    /// Fold into the canonical (earliest-created) claim
    Merge { canonical: ClaimId },
    /// Exact resubmission of the canonical claim
    Reject { canonical: ClaimId },
    /// Looks like the same incident but the amounts disagree
    Escalate { canonical: ClaimId, reason: String },
    /// Nothing scored in the duplicate band
    NotDuplicate,
}

impl DuplicateRules {
    pub fn band(&self, score: Score) -> SimilarityBand {
        let value = score.value();
        if value >= self.duplicate_threshold {
            SimilarityBand::Duplicate
        } else if value >= self.ambiguous_threshold {
            SimilarityBand::Ambiguous
        } else {
            SimilarityBand::Distinct
        }
    }

    /// 100 on the same day, falling linearly to 0 at the decay distance.
    pub fn date_proximity(&self, a: NaiveDate, b: NaiveDate) -> Score {
        let days = (a - b).num_days().unsigned_abs() as f64;
        let decay = f64::from(self.date_decay_days.max(1));
        Score::from_ratio(1.0 - days / decay)
    }

    pub fn sub_scores(&self, new: &ClaimInput, existing: &ClaimInput) -> SubScores {
        let vin = if normalize(&new.vin) == normalize(&existing.vin) {
            Score::MAX
        } else {
            Score::MIN
        };

        let location = match (
            extract_location(&new.incident_description),
            extract_location(&existing.incident_description),
        ) {
            (Some(a), Some(b)) => Score::from_ratio(jaccard(&a, &b)),
            _ => Score::new(self.unknown_location_score),
        };

        SubScores {
            vin,
            incident_date: self.date_proximity(new.incident_date, existing.incident_date),
            incident_description: Score::from_ratio(jaccard(
                &new.incident_description,
                &existing.incident_description,
            )),
            damage_description: Score::from_ratio(jaccard(
                &new.damage_description,
                &existing.damage_description,
            )),
            location,
            vehicle: vehicle_match(new, existing),
        }
    }

    pub fn score(&self, new: &ClaimInput, existing: &ClaimInput) -> Score {
        self.sub_scores(new, existing).composite(&self.weights)
    }

    /// Scores every candidate and ranks them. The caller is responsible for
    /// leaving the new claim itself out of `candidates`.
    pub fn assess(&self, new: &ClaimInput, candidates: &[Claim]) -> DuplicateAssessment {
        let mut scored: Vec<DuplicateCandidate> = candidates
            .iter()
            .map(|candidate| {
                let sub_scores = self.sub_scores(new, &candidate.details);
                DuplicateCandidate {
                    claim_id: candidate.id.clone(),
                    composite_score: sub_scores.composite(&self.weights),
                    sub_scores,
                    created_at: candidate.created_at,
                    estimated_damage: candidate.details.estimated_damage,
                }
            })
            .collect();
        scored.sort_by(rank);

        let band = scored
            .first()
            .map(|best| self.band(best.composite_score))
            .unwrap_or(SimilarityBand::Distinct);

        DuplicateAssessment {
            candidates: scored,
            band,
        }
    }

    /// Merge, reject, or escalate a claim whose best match is a duplicate.
    pub fn resolve(&self, new: &ClaimInput, assessment: &DuplicateAssessment) -> DuplicateResolution {
        let Some(best) = assessment.best() else {
            return DuplicateResolution::NotDuplicate;
        };
        if assessment.band != SimilarityBand::Duplicate {
            return DuplicateResolution::NotDuplicate;
        }

        let canonical = assessment
            .candidates
            .iter()
            .filter(|c| self.band(c.composite_score) == SimilarityBand::Duplicate)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.claim_id.cmp(&b.claim_id)))
            .map(|c| c.claim_id.clone())
            .unwrap_or_else(|| best.claim_id.clone());

        if best.composite_score.value() >= self.reject_threshold {
            return DuplicateResolution::Reject { canonical };
        }

        if let (Some(ours), Some(theirs)) = (new.estimated_damage, best.estimated_damage) {
            let larger = ours.max(theirs);
            if larger > Decimal::ZERO {
                let divergence = (ours - theirs).abs() / larger;
                if divergence > self.amount_divergence {
                    return DuplicateResolution::Escalate {
                        canonical,
                        reason: format!(
                            "estimated damage differs by {}% from {}",
                            (divergence * dec!(100)).round_dp(1),
                            best.claim_id
                        ),
                    };
                }
            }
        }

        DuplicateResolution::Merge { canonical }
    }
}

fn rank(a: &DuplicateCandidate, b: &DuplicateCandidate) -> Ordering {
    b.composite_score
        .value()
        .total_cmp(&a.composite_score.value())
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.claim_id.cmp(&b.claim_id))
}

fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

fn vehicle_match(a: &ClaimInput, b: &ClaimInput) -> Score {
    let same_text = |x: &Option<String>, y: &Option<String>| match (x, y) {
        (Some(x), Some(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => false,
    };
    let year = matches!((a.vehicle_year, b.vehicle_year), (Some(x), Some(y)) if x == y);
    let matched = [year, same_text(&a.vehicle_make, &b.vehicle_make), same_text(&a.vehicle_model, &b.vehicle_model)]
        .iter()
        .filter(|hit| **hit)
        .count();
    Score::from_ratio(matched as f64 / 3.0)
}

const LOCATION_MARKERS: [&str; 3] = ["at", "near", "on"];
const MAX_LOCATION_WORDS: usize = 6;

/// Pulls a location phrase out of a narrative: the words following the first
/// "at", "near", or "on", up to the end of that clause.
pub fn extract_location(narrative: &str) -> Option<String> {
    narrative
        .split(|c: char| matches!(c, '.' | ',' | ';' | '!' | '?' | '\n'))
        .find_map(|clause| {
            let words = tokens(clause);
            let start = words
                .iter()
                .position(|word| LOCATION_MARKERS.contains(&word.as_str()))?;
            let phrase: Vec<&str> = words[start + 1..]
                .iter()
                .take(MAX_LOCATION_WORDS)
                .map(String::as_str)
                .collect();
            (!phrase.is_empty()).then(|| phrase.join(" "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let rules = DuplicateRules::default();
        assert_eq!(rules.band(Score::new(80.0)), SimilarityBand::Duplicate);
        assert_eq!(rules.band(Score::new(79.99)), SimilarityBand::Ambiguous);
        assert_eq!(rules.band(Score::new(60.0)), SimilarityBand::Ambiguous);
        assert_eq!(rules.band(Score::new(59.99)), SimilarityBand::Distinct);
    }

    #[test]
    fn test_band_display_matches_serde_names() {
        for band in [SimilarityBand::Duplicate, SimilarityBand::Ambiguous, SimilarityBand::Distinct] {
            let serialized = serde_json::to_value(band).unwrap();
            assert_eq!(serialized, band.to_string());
        }
    }

    #[test]
    fn test_date_proximity_decays_linearly() {
        let rules = DuplicateRules::default();
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        assert_eq!(rules.date_proximity(d(15), d(15)).value(), 100.0);
        assert!((rules.date_proximity(d(15), d(18)).value() - 400.0 / 7.0).abs() < 1e-9);
        assert_eq!(rules.date_proximity(d(1), d(8)).value(), 0.0);
        assert_eq!(rules.date_proximity(d(1), d(20)).value(), 0.0);
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("Rear-ended at the corner of Main and 5th. Other driver fled."),
            Some("the corner of main and 5th".to_string())
        );
        assert_eq!(extract_location("Hail storm overnight"), None);
    }
}

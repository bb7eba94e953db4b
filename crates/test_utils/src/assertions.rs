//! Custom Test Assertions
//!
//! Assertion helpers for claims and audit trails that say what was expected
//! when they fail.

use core_kernel::Score;
use domain_claims::{AuditAction, AuditLogEntry, ClaimStatus};

/// Asserts the trail starts with `created` and then walks exactly `statuses`
pub fn assert_audit_trail(history: &[AuditLogEntry], statuses: &[ClaimStatus]) {
    assert!(!history.is_empty(), "Expected a created entry, audit trail is empty");
    assert_eq!(
        history[0].action,
        AuditAction::Created,
        "First audit entry should be created, got {:?}",
        history[0].action
    );
    assert_eq!(history[0].new_status, Some(ClaimStatus::Pending));

    let walked: Vec<ClaimStatus> = history[1..]
        .iter()
        .map(|entry| {
            assert_eq!(entry.action, AuditAction::StatusChanged, "Unexpected entry {entry:?}");
            entry.new_status.expect("status change without new_status")
        })
        .collect();
    assert_eq!(walked, statuses, "Audit trail mismatch");
}

/// Asserts consecutive status changes chain (each old status is the
/// previous new status)
pub fn assert_trail_is_chained(history: &[AuditLogEntry]) {
    for pair in history.windows(2) {
        assert_eq!(
            pair[1].old_status, pair[0].new_status,
            "Audit entry {} does not continue from {}",
            pair[1].id, pair[0].id
        );
    }
}

/// Asserts a score lies in `[0, 100]`
pub fn assert_score_in_range(score: Score) {
    let value = score.value();
    assert!((0.0..=100.0).contains(&value), "Score {value} outside [0, 100]");
}

/// Asserts two scores agree to within `tolerance`
pub fn assert_score_approx(actual: Score, expected: f64, tolerance: f64) {
    let diff = (actual.value() - expected).abs();
    assert!(
        diff <= tolerance,
        "Score differs by more than tolerance: actual={}, expected={expected}, diff={diff}",
        actual.value()
    );
}

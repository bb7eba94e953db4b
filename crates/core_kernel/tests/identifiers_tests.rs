//! Unit tests for claim and row identifiers
//!
//! Tests cover generation, parsing, display, and serialization.

use core_kernel::{AuditEntryId, ClaimId, WorkflowRunId};
use std::collections::HashSet;

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_generate_produces_unique_ids() {
        let ids: HashSet<ClaimId> = (0..500).map(|_| ClaimId::generate()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ClaimId::prefix(), "CLM");
    }

    #[test]
    fn test_display_matches_inner_string() {
        let id = ClaimId::generate();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_parse_accepts_unknown_looking_ids() {
        let id: ClaimId = "CLM-UNKNOWN".parse().unwrap();
        assert_eq!(id.as_str(), "CLM-UNKNOWN");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id: ClaimId = "  CLM-0A1B2C3D \n".parse().unwrap();
        assert_eq!(id.as_str(), "CLM-0A1B2C3D");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id: ClaimId = "CLM-12345678".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"CLM-12345678\"");
        let back: ClaimId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

mod row_id_tests {
    use super::*;

    #[test]
    fn test_audit_entry_display() {
        assert_eq!(AuditEntryId::new(42).to_string(), "AUD-42");
    }

    #[test]
    fn test_row_ids_order_by_value() {
        assert!(WorkflowRunId::new(1) < WorkflowRunId::new(2));
        assert_eq!(WorkflowRunId::from(9).value(), 9);
    }
}

//! Strongly-typed identifiers for claim entities
//!
//! Claim identifiers are opaque strings of the form `CLM-XXXXXXXX`. They are
//! assigned once by the store and never reused. Audit entries and workflow runs
//! are keyed by database row ids, wrapped so they cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of a claim aggregate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(String);

impl ClaimId {
    const PREFIX: &'static str = "CLM";

    /// Generates a fresh identifier: the prefix followed by eight uppercase
    /// hex characters taken from a random v4 UUID.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", Self::PREFIX, simple[..8].to_uppercase()))
    }

    /// Returns the identifier prefix for display
    pub fn prefix() -> &'static str {
        Self::PREFIX
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Any non-blank string parses. Whether it names a stored claim is the
/// store's concern, so `CLM-UNKNOWN` is a valid id that simply is not found.
impl FromStr for ClaimId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_identifier("claim id must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for ClaimId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! define_row_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

define_row_id!(AuditEntryId, "AUD");
define_row_id!(WorkflowRunId, "RUN");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_claim_id_shape() {
        let id = ClaimId::generate();
        let s = id.as_str();
        assert!(s.starts_with("CLM-"));
        assert_eq!(s.len(), 12);
        assert!(s[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!("   ".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_row_id_display() {
        assert_eq!(WorkflowRunId::new(7).to_string(), "RUN-7");
    }
}

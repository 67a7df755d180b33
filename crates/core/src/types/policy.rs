//! Post-download verification policy

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How strictly a completed download is checked against expected metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyPolicy {
    /// No verification
    None,
    /// Byte length must match
    SizeOnly,
    /// Byte length and mtime (within tolerance) must match
    SizeAndMtime,
    /// Size, mtime, and content checksum must match
    Full,
}

impl VerifyPolicy {
    /// True when any verification step runs at all
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

impl FromStr for VerifyPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "size" | "size_only" | "size-only" => Ok(Self::SizeOnly),
            "size_and_mtime" | "size-and-mtime" | "mtime" => Ok(Self::SizeAndMtime),
            "full" => Ok(Self::Full),
            other => Err(CoreError::UnknownVerifyPolicy(other.to_string())),
        }
    }
}

/// Outcome of a verification check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub passed: bool,
    pub message: String,
}

impl VerifyResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: "verified".to_string(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_enabled() {
        assert!(!VerifyPolicy::None.is_enabled());
        assert!(VerifyPolicy::SizeOnly.is_enabled());
        assert!(VerifyPolicy::Full.is_enabled());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("none".parse::<VerifyPolicy>().ok(), Some(VerifyPolicy::None));
        assert_eq!(
            "size-only".parse::<VerifyPolicy>().ok(),
            Some(VerifyPolicy::SizeOnly)
        );
        assert_eq!("full".parse::<VerifyPolicy>().ok(), Some(VerifyPolicy::Full));
        assert!("strict".parse::<VerifyPolicy>().is_err());
    }

    #[test]
    fn test_verify_result_helpers() {
        assert!(VerifyResult::pass().passed);
        let failed = VerifyResult::fail("size mismatch");
        assert!(!failed.passed);
        assert_eq!(failed.message, "size mismatch");
    }
}

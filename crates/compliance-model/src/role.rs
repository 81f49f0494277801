//! Compliance roles
//!
//! Provides [`ComplianceRole`], the answer a user gives on the qualification form.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Role a user plays in the compliance feature
///
/// Serialized exactly as the qualification form submits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceRole {
    /// Lab head or investigator looking at their own publications
    Scientist,
    /// Someone helping others with compliance
    LabManager,
}

impl ComplianceRole {
    /// All roles, in form order
    pub const ALL: [ComplianceRole; 2] = [ComplianceRole::Scientist, ComplianceRole::LabManager];

    /// Wire name of the role
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceRole::Scientist => "scientist",
            ComplianceRole::LabManager => "lab-manager",
        }
    }

    /// Check if this is the lab-manager role
    #[inline]
    #[must_use]
    pub fn is_lab_manager(&self) -> bool {
        matches!(self, ComplianceRole::LabManager)
    }
}

impl Display for ComplianceRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown compliance role: {0:?}")]
pub struct RoleParseError(pub String);

impl FromStr for ComplianceRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scientist" => Ok(ComplianceRole::Scientist),
            "lab-manager" => Ok(ComplianceRole::LabManager),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in ComplianceRole::ALL {
            assert_eq!(role.as_str().parse::<ComplianceRole>(), Ok(role));
        }
    }

    #[test]
    fn role_rejects_unknown_values() {
        let err = "admin".parse::<ComplianceRole>().unwrap_err();
        assert_eq!(err, RoleParseError("admin".to_string()));
        assert!("Scientist".parse::<ComplianceRole>().is_err());
    }

    #[test]
    fn role_serializes_kebab_case() {
        let json = serde_json::to_string(&ComplianceRole::LabManager).unwrap();
        assert_eq!(json, "\"lab-manager\"");

        let role: ComplianceRole = serde_json::from_str("\"scientist\"").unwrap();
        assert_eq!(role, ComplianceRole::Scientist);
    }
}

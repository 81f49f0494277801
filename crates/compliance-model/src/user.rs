//! Users as seen by the compliance feature

use crate::role::ComplianceRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider name of ORCID linked accounts
pub const ORCID_PROVIDER: &str = "orcid";

/// Permission scopes checked by the compliance feature
pub mod scopes {
    /// Grants the administrator views (all scientists, access grants)
    pub const COMPLIANCE_ADMIN: &str = "compliance:admin";
    /// Grants access to the compliance dashboard feature
    pub const DASHBOARD_FEATURE: &str = "compliance:feature:dashboard";
}

/// User identifier in the relational user store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Account at an external identity provider linked to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub provider: String,
    /// Identifier at the provider (the ORCID iD for ORCID accounts)
    pub id_at_provider: Option<String>,
    /// Linking has started but is not confirmed yet
    #[serde(default)]
    pub pending: bool,
}

impl LinkedAccount {
    /// Confirmed ORCID account
    #[must_use]
    pub fn orcid(orcid: impl Into<String>) -> Self {
        Self {
            provider: ORCID_PROVIDER.to_string(),
            id_at_provider: Some(orcid.into()),
            pending: false,
        }
    }

    /// Mark as pending
    #[inline]
    #[must_use]
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_confirmed_orcid(&self) -> bool {
        self.provider == ORCID_PROVIDER && !self.pending
    }
}

/// Compliance section of the user's free-form metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ComplianceRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_requested: Option<bool>,
}

impl ComplianceMetadata {
    /// Update that only sets the role
    #[must_use]
    pub fn role(role: ComplianceRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    /// Update that only marks a dashboard as requested
    #[must_use]
    pub fn dashboard_requested() -> Self {
        Self {
            dashboard_requested: Some(true),
            ..Self::default()
        }
    }

    /// Nothing would change when merged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.dashboard_requested.is_none()
    }

    /// Merge `update` over `self`; fields absent from the update are kept
    pub fn merge(&mut self, update: &ComplianceMetadata) {
        if let Some(role) = update.role {
            self.role = Some(role);
        }
        if let Some(requested) = update.dashboard_requested {
            self.dashboard_requested = Some(requested);
        }
    }
}

/// Acting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub linked_accounts: Vec<LinkedAccount>,
    #[serde(default)]
    pub compliance: ComplianceMetadata,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: Some(email.into()),
            display_name: None,
            username: None,
            scopes: Vec::new(),
            linked_accounts: Vec::new(),
            compliance: ComplianceMetadata::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_linked_account(mut self, account: LinkedAccount) -> Self {
        self.linked_accounts.push(account);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: ComplianceRole) -> Self {
        self.compliance.role = Some(role);
        self
    }

    #[inline]
    #[must_use]
    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    /// Confirmed ORCID account, if any
    #[must_use]
    pub fn orcid_account(&self) -> Option<&LinkedAccount> {
        self.linked_accounts
            .iter()
            .find(|account| account.is_confirmed_orcid())
    }

    /// ORCID iD of the confirmed ORCID account
    ///
    /// Blank identifiers count as absent.
    #[must_use]
    pub fn orcid(&self) -> Option<&str> {
        self.orcid_account()
            .and_then(|account| account.id_at_provider.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    #[inline]
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    #[inline]
    #[must_use]
    pub fn is_compliance_admin(&self) -> bool {
        self.has_scope(scopes::COMPLIANCE_ADMIN)
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Option<ComplianceRole> {
        self.compliance.role
    }

    /// Admins and lab-managers manage compliance for others
    #[must_use]
    pub fn is_compliance_manager(&self) -> bool {
        self.is_compliance_admin() || self.role().is_some_and(|r| r.is_lab_manager())
    }

    /// Best human-readable name: display name, then username
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.username.as_deref().filter(|n| !n.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_orcid_is_not_linked() {
        let user = User::new("u-1", "a@example.org")
            .with_linked_account(LinkedAccount::orcid("0000-0001").pending());
        assert!(user.orcid_account().is_none());
        assert_eq!(user.orcid(), None);
    }

    #[test]
    fn blank_orcid_counts_as_absent() {
        let user =
            User::new("u-1", "a@example.org").with_linked_account(LinkedAccount::orcid("  "));
        assert!(user.orcid_account().is_some());
        assert_eq!(user.orcid(), None);
    }

    #[test]
    fn other_providers_are_ignored() {
        let github = LinkedAccount {
            provider: "github".to_string(),
            id_at_provider: Some("octo".to_string()),
            pending: false,
        };
        let user = User::new("u-1", "a@example.org").with_linked_account(github);
        assert_eq!(user.orcid(), None);
    }

    #[test]
    fn metadata_merge_keeps_untouched_fields() {
        let mut meta = ComplianceMetadata::dashboard_requested();
        meta.merge(&ComplianceMetadata::role(ComplianceRole::Scientist));

        assert_eq!(meta.role, Some(ComplianceRole::Scientist));
        assert_eq!(meta.dashboard_requested, Some(true));
        assert!(ComplianceMetadata::default().is_empty());
    }

    #[test]
    fn manager_detection() {
        let manager = User::new("u-1", "a@example.org").with_role(ComplianceRole::LabManager);
        let admin = User::new("u-2", "b@example.org").with_scope(scopes::COMPLIANCE_ADMIN);
        let scientist = User::new("u-3", "c@example.org").with_role(ComplianceRole::Scientist);

        assert!(manager.is_compliance_manager());
        assert!(admin.is_compliance_manager());
        assert!(!scientist.is_compliance_manager());
    }

    #[test]
    fn name_falls_back_to_username() {
        let user = User::new("u-1", "a@example.org").with_username("ada");
        assert_eq!(user.name(), Some("ada"));

        let named = user.with_display_name("Ada Lovelace");
        assert_eq!(named.name(), Some("Ada Lovelace"));
    }

    #[test]
    fn user_deserializes_from_camel_case() {
        let json = r#"{
            "id": "u-9",
            "email": "x@example.org",
            "displayName": null,
            "username": "x",
            "linkedAccounts": [{"provider": "orcid", "idAtProvider": "0000-0003"}],
            "compliance": {"role": "lab-manager", "dashboardRequested": true}
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.orcid(), Some("0000-0003"));
        assert_eq!(user.role(), Some(ComplianceRole::LabManager));
        assert!(user.scopes.is_empty());
    }
}

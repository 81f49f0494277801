//! Identity inputs and the reconciliation key
//!
//! [`Identity`] holds the inputs that are known synchronously when a page
//! loads. [`ReconciliationKey`] condenses them into the string the menu
//! reconciler compares to decide between resetting and keeping stale data.

use compliance_model::{ComplianceRole, User};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronous identity inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub is_compliance_admin: bool,
    /// A confirmed ORCID account exists, with or without an identifier
    pub orcid_linked: bool,
    /// ORCID iD of the confirmed ORCID account
    pub orcid: Option<String>,
    pub role: Option<ComplianceRole>,
}

impl Identity {
    #[must_use]
    pub fn new(is_compliance_admin: bool, orcid: Option<&str>, role: Option<ComplianceRole>) -> Self {
        Self {
            is_compliance_admin,
            orcid_linked: orcid.is_some(),
            orcid: orcid.map(str::to_string),
            role,
        }
    }

    /// Override the linked flag independently of the ORCID value
    #[must_use]
    pub fn with_orcid_linked(mut self, linked: bool) -> Self {
        self.orcid_linked = linked;
        self
    }

    /// Identity of `user`
    ///
    /// A confirmed ORCID account counts as linked even when its identifier
    /// is blank; the identifier alone feeds the existence check.
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self::new(user.is_compliance_admin(), user.orcid(), user.role())
            .with_orcid_linked(user.orcid_account().is_some())
    }

    #[inline]
    #[must_use]
    pub fn orcid_linked(&self) -> bool {
        self.orcid_linked
    }

    #[must_use]
    pub fn key(&self) -> ReconciliationKey {
        ReconciliationKey::derive(self)
    }
}

/// Identity string of the menu inputs
///
/// Format: `orcid=<id|->;linked=<bool>;admin=<bool>;role=<role|->`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciliationKey(String);

impl ReconciliationKey {
    #[must_use]
    pub fn derive(identity: &Identity) -> Self {
        Self(format!(
            "orcid={};linked={};admin={};role={}",
            identity.orcid.as_deref().unwrap_or("-"),
            identity.orcid_linked,
            identity.is_compliance_admin,
            identity.role.map_or("-", |r| r.as_str()),
        ))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReconciliationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_model::{scopes, LinkedAccount, ORCID_PROVIDER};

    #[test]
    fn key_format() {
        let identity = Identity::new(false, Some("0000-1"), Some(ComplianceRole::Scientist));
        assert_eq!(
            identity.key().as_str(),
            "orcid=0000-1;linked=true;admin=false;role=scientist"
        );

        let empty = Identity::default();
        assert_eq!(empty.key().as_str(), "orcid=-;linked=false;admin=false;role=-");
    }

    #[test]
    fn identity_of_user() {
        let user = User::new("u-1", "a@example.org")
            .with_scope(scopes::COMPLIANCE_ADMIN)
            .with_role(ComplianceRole::LabManager)
            .with_linked_account(LinkedAccount::orcid("0000-2").pending());

        let identity = Identity::of(&user);
        assert!(identity.is_compliance_admin);
        assert!(!identity.orcid_linked());
        assert_eq!(identity.role, Some(ComplianceRole::LabManager));
    }

    #[test]
    fn different_orcids_give_different_keys() {
        let a = Identity::new(false, Some("0000-1"), None);
        let b = Identity::new(false, Some("0000-2"), None);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn confirmed_account_without_identifier_counts_as_linked() {
        let user = User::new("u-1", "a@example.org")
            .with_role(ComplianceRole::Scientist)
            .with_linked_account(LinkedAccount {
                provider: ORCID_PROVIDER.to_string(),
                id_at_provider: None,
                pending: false,
            });

        let identity = Identity::of(&user);
        assert!(identity.orcid_linked());
        assert_eq!(identity.orcid, None);
        assert_ne!(identity.key(), Identity::new(false, None, identity.role).key());
    }
}

//! External collaborators
//!
//! The tabular data source, the sharing/access store and the user store are
//! reached only through these traits. Implementations live outside this
//! crate (HTTP clients, ORM adapters) or in the test utilities.

use crate::error::{ComplianceError, FetchError};
use async_trait::async_trait;
use compliance_model::{ArticleRecord, ComplianceMetadata, Scientist, SharedReport, User, UserId};

/// Scientist lookup by ORCID
///
/// The source can answer with a soft error next to an absent scientist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScientistLookup {
    pub scientist: Option<Scientist>,
    pub error: Option<String>,
}

impl ScientistLookup {
    #[must_use]
    pub fn found(scientist: Scientist) -> Self {
        Self {
            scientist: Some(scientist),
            error: None,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Spreadsheet-backed source of scientists and publications
#[async_trait]
pub trait ComplianceSource: Send + Sync {
    /// Publications covered by the open-access policy
    async fn covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError>;

    /// Publications outside the policy window or scope
    async fn not_covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError>;

    async fn scientist_by_orcid(&self, orcid: &str) -> Result<ScientistLookup, FetchError>;

    /// Whether a scientist record exists for `orcid`
    async fn scientist_exists(&self, orcid: &str) -> Result<bool, FetchError> {
        Ok(self.scientist_by_orcid(orcid).await?.scientist.is_some())
    }

    async fn all_scientists(&self) -> Result<Vec<Scientist>, FetchError>;
}

/// Who shared which report with whom
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Reports shared with `user_id`, in grant order
    async fn shared_with(&self, user_id: &UserId) -> Result<Vec<SharedReport>, FetchError>;
}

/// Relational user store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Result<Option<User>, ComplianceError>;

    /// Merge `update` into the stored compliance metadata
    ///
    /// Returns `Ok(false)` when the user does not exist.
    async fn merge_compliance_metadata(
        &self,
        user_id: &UserId,
        update: &ComplianceMetadata,
    ) -> Result<bool, ComplianceError>;
}

/// Merge a metadata update, logging instead of failing
///
/// Empty updates do not touch the store.
pub async fn update_compliance_metadata(
    store: &dyn UserStore,
    user_id: &UserId,
    update: &ComplianceMetadata,
) {
    if update.is_empty() {
        return;
    }
    match store.merge_compliance_metadata(user_id, update).await {
        Ok(true) => tracing::debug!(%user_id, "updated compliance metadata"),
        Ok(false) => tracing::error!(%user_id, "user not found while updating compliance metadata"),
        Err(error) => {
            tracing::error!(%user_id, %error, "failed to update compliance metadata");
        }
    }
}

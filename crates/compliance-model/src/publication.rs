//! Records from the external tabular data source
//!
//! Scientists and their publications, normalized from the spreadsheet-backed API.

use crate::user::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Scientist profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scientist {
    pub id: String,
    pub full_name: String,
    pub orcid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub lab: Option<String>,
    /// Publications before this date are outside the policy window
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

impl Scientist {
    #[must_use]
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, orcid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            orcid: orcid.into(),
            email: None,
            lab: None,
            hire_date: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_orcid(&self) -> bool {
        !self.orcid.trim().is_empty()
    }
}

/// One version of a publication (journal article or preprint)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationSide {
    pub title: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub license: Option<String>,
    pub compliance_issue_status: Option<String>,
}

impl PublicationSide {
    /// PubMed Central landing page
    #[must_use]
    pub fn pmc_url(&self) -> Option<String> {
        self.pmcid
            .as_deref()
            .map(|id| format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{id}/"))
    }

    /// PubMed landing page
    #[must_use]
    pub fn pubmed_url(&self) -> Option<String> {
        self.pmid
            .as_deref()
            .map(|id| format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"))
    }

    #[must_use]
    pub fn doi_url(&self) -> Option<String> {
        self.doi.as_deref().map(|doi| format!("https://doi.org/{doi}"))
    }

    /// Preprint DOIs under the bioRxiv prefix
    #[must_use]
    pub fn is_biorxiv(&self) -> bool {
        self.doi.as_deref().is_some_and(|doi| doi.contains("10.1101/"))
    }
}

/// Publication with its compliance status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: String,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub compliant: bool,
    /// Was non-compliant at some point, even if resolved now
    #[serde(default)]
    pub ever_non_compliant: bool,
    pub top_level_policy: Option<String>,
    #[serde(default)]
    pub journal: Option<PublicationSide>,
    #[serde(default)]
    pub preprint: Option<PublicationSide>,
}

impl ArticleRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, compliant: bool) -> Self {
        Self {
            id: id.into(),
            title: None,
            authors: Vec::new(),
            year: None,
            compliant,
            ever_non_compliant: false,
            top_level_policy: None,
            journal: None,
            preprint: None,
        }
    }

    /// Compliant now but had policy issues before
    #[inline]
    #[must_use]
    pub fn issues_resolved(&self) -> bool {
        self.compliant && self.ever_non_compliant
    }

    /// Issue status shown for non-compliant articles, preprint first
    #[must_use]
    pub fn issue_status(&self) -> Option<&str> {
        self.preprint
            .as_ref()
            .and_then(|p| p.compliance_issue_status.as_deref())
            .or_else(|| {
                self.journal
                    .as_ref()
                    .and_then(|j| j.compliance_issue_status.as_deref())
            })
    }
}

/// Report shared with the current user by its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedReport {
    pub owner_id: UserId,
    pub owner_display_name: Option<String>,
    /// Owners without a linked ORCID have no dashboard to show
    pub orcid: Option<String>,
    pub shared_at: Option<DateTime<Utc>>,
}

impl SharedReport {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, orcid: Option<&str>) -> Self {
        Self {
            owner_id: UserId::new(owner_id),
            owner_display_name: None,
            orcid: orcid.map(str::to_string),
            shared_at: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_owner_name(mut self, name: impl Into<String>) -> Self {
        self.owner_display_name = Some(name.into());
        self
    }

    /// Non-blank ORCID of the owner
    #[must_use]
    pub fn orcid(&self) -> Option<&str> {
        self.orcid.as_deref().filter(|o| !o.trim().is_empty())
    }
}

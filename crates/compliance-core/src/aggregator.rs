//! Report aggregation
//!
//! Loaders for the scientist's own dashboard and for the dashboards shared
//! with the user. Slow source queries are started right away and handed
//! back as [`Deferred`] values so the page can render before they finish.

use crate::context::ComplianceContext;
use crate::deferred::{with_timeout, Deferred, FetchResult};
use crate::error::ComplianceError;
use crate::routing::Destination;
use crate::source::{ComplianceSource, ScientistLookup};
use compliance_model::{ArticleRecord, ComplianceRole, Scientist};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Data of the my-report page
#[derive(Debug, Clone)]
pub struct MyReport {
    pub orcid: String,
    pub scientist: Deferred<ScientistLookup>,
    pub covered: Deferred<Vec<ArticleRecord>>,
    pub not_covered: Deferred<Vec<ArticleRecord>>,
    pub dashboard_requested: bool,
    pub role: Option<ComplianceRole>,
    pub enhanced_article_rendering: bool,
    pub is_compliance_manager: bool,
}

/// Outcome of [`load_my_report`]
#[derive(Debug, Clone)]
pub enum MyReportLoad {
    Redirect(Destination),
    Report(Box<MyReport>),
}

/// How the scientist lookup of a report ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScientistStatus {
    Found(Scientist),
    /// ORCID linked but absent from the source; offer a dashboard request
    NotFound,
    /// Source too slow; offer a retry
    TimedOut,
    Failed(String),
}

impl ScientistStatus {
    #[must_use]
    pub fn classify(result: &FetchResult<ScientistLookup>) -> Self {
        match result {
            Ok(ScientistLookup {
                scientist: Some(scientist),
                ..
            }) => ScientistStatus::Found(scientist.clone()),
            Ok(_) => ScientistStatus::NotFound,
            Err(error) if error.is_timeout() => ScientistStatus::TimedOut,
            Err(error) => ScientistStatus::Failed(error.to_string()),
        }
    }

    #[inline]
    #[must_use]
    pub fn offers_dashboard_request(&self) -> bool {
        matches!(self, ScientistStatus::NotFound)
    }
}

/// Start the three queries behind the my-report page
///
/// Users without a confirmed ORCID account are sent to the linking page. A
/// confirmed account without an identifier is an error.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// `ComplianceError::MissingOrcid` when the ORCID account has no identifier
pub fn load_my_report(ctx: &ComplianceContext) -> Result<MyReportLoad, ComplianceError> {
    let Some(account) = ctx.user.orcid_account() else {
        return Ok(MyReportLoad::Redirect(Destination::LinkOrcid));
    };
    let orcid = account
        .id_at_provider
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ComplianceError::MissingOrcid)?
        .to_string();

    let source = Arc::clone(&ctx.services.source);
    let budget = ctx.config().source.fetch_timeout();
    tracing::debug!(user_id = %ctx.user.id, %orcid, "loading my report");

    let covered = spawn_bounded(budget, {
        let source = Arc::clone(&source);
        let orcid = orcid.clone();
        async move { source.covered_by_policy(&orcid).await }
    });
    let not_covered = spawn_bounded(budget, {
        let source = Arc::clone(&source);
        let orcid = orcid.clone();
        async move { source.not_covered_by_policy(&orcid).await }
    });
    let scientist = spawn_bounded(budget, {
        let orcid = orcid.clone();
        async move { source.scientist_by_orcid(&orcid).await }
    });

    Ok(MyReportLoad::Report(Box::new(MyReport {
        orcid,
        scientist,
        covered,
        not_covered,
        dashboard_requested: ctx.user.compliance.dashboard_requested.unwrap_or(false),
        role: ctx.user.role(),
        enhanced_article_rendering: ctx.config().enhanced_article_rendering,
        is_compliance_manager: ctx.user.is_compliance_manager(),
    })))
}

fn spawn_bounded<T, F>(budget: Duration, future: F) -> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
    F: std::future::Future<Output = FetchResult<T>> + Send + 'static,
{
    Deferred::spawn(with_timeout(budget, future))
}

/// Data of the shared-dashboards page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDashboards {
    pub scientists: Vec<Scientist>,
    pub role: Option<ComplianceRole>,
}

/// Scientists whose dashboards were shared with the user
///
/// Lookups run concurrently; failed or empty lookups are skipped. The
/// result keeps the order in which the reports were shared.
///
/// # Errors
/// Fails only when the shared-report list itself cannot be fetched
pub async fn load_shared_dashboards(
    ctx: &ComplianceContext,
) -> Result<SharedDashboards, ComplianceError> {
    let reports = ctx.services.access.shared_with(&ctx.user.id).await?;
    let budget = ctx.config().source.fetch_timeout();
    let source: &dyn ComplianceSource = ctx.services.source.as_ref();

    let lookups = reports
        .iter()
        .filter_map(|report| report.orcid())
        .map(|orcid| async move {
            match with_timeout(budget, source.scientist_by_orcid(orcid)).await {
                Ok(lookup) => lookup.scientist,
                Err(error) => {
                    tracing::error!(orcid, %error, "failed to fetch shared scientist");
                    None
                }
            }
        });

    let scientists: Vec<Scientist> = join_all(lookups).await.into_iter().flatten().collect();
    tracing::debug!(
        user_id = %ctx.user.id,
        shared = reports.len(),
        resolved = scientists.len(),
        "loaded shared dashboards"
    );

    Ok(SharedDashboards {
        scientists,
        role: ctx.user.role(),
    })
}

//! Scheduled cache warm-up
//!
//! A cron job calls the hook with `Authorization: Bearer <secret>`. The
//! hook loads the scientist roster and both publication lists of the first
//! scientist with an ORCID so the source cache is hot before users arrive.

use crate::config::CronConfig;
use crate::deferred::with_timeout;
use crate::error::WarmupError;
use crate::source::ComplianceSource;
use std::time::Duration;

/// Successful warm-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupReport {
    pub orcid: String,
    pub covered: usize,
    pub not_covered: usize,
}

/// Check the bearer token of a hook call
///
/// # Errors
/// `NotConfigured` without a secret, `Unauthorized` on any mismatch
pub fn authorize(authorization: Option<&str>, cron: &CronConfig) -> Result<(), WarmupError> {
    let Some(secret) = cron.secret.as_deref() else {
        tracing::error!("cron secret not configured");
        return Err(WarmupError::NotConfigured);
    };
    let presented = authorization.and_then(|header| header.strip_prefix("Bearer "));
    if presented != Some(secret) {
        tracing::error!("invalid authorization header for cache warm-up hook");
        return Err(WarmupError::Unauthorized);
    }
    Ok(())
}

/// Authorize, then warm the source cache
///
/// Every source call is bounded by `budget`.
///
/// # Errors
/// See [`WarmupError::status`] for the status each variant answers with
pub async fn warm_cache(
    authorization: Option<&str>,
    cron: &CronConfig,
    source: &dyn ComplianceSource,
    budget: Duration,
) -> Result<WarmupReport, WarmupError> {
    authorize(authorization, cron)?;

    let outcome: Result<WarmupReport, WarmupError> = async {
        let scientists = with_timeout(budget, source.all_scientists()).await?;
        let Some(orcid) = scientists
            .iter()
            .find(|s| s.has_orcid())
            .map(|s| s.orcid.trim().to_string())
        else {
            return Err(WarmupError::NoScientistWithOrcid);
        };

        let (covered, not_covered) = futures::try_join!(
            with_timeout(budget, source.covered_by_policy(&orcid)),
            with_timeout(budget, source.not_covered_by_policy(&orcid)),
        )?;

        Ok(WarmupReport {
            orcid,
            covered: covered.len(),
            not_covered: not_covered.len(),
        })
    }
    .await;

    match &outcome {
        Ok(report) => tracing::info!(
            orcid = %report.orcid,
            covered = report.covered,
            not_covered = report.not_covered,
            "source cache warmed"
        ),
        Err(error) => tracing::error!(%error, "error warming source cache"),
    }
    outcome
}

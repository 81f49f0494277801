//! Role and redirect resolution
//!
//! Pure decision tables: given who the user is and where they are going,
//! either stay or redirect. Order matters in [`resolve_layout`]: the ORCID
//! check runs before role routing, which runs before the undefined-role
//! check.

use crate::identity::Identity;
use compliance_model::ComplianceRole;
use serde::Serialize;

/// Redirect targets of the compliance feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// Role selection form
    Qualify,
    /// ORCID linking page
    LinkOrcid,
    /// The scientist's own dashboard
    ScientistReport,
    /// Dashboards shared with a lab-manager
    LabManagerShared,
    /// Admin list of all scientists
    AdminScientists,
}

impl Destination {
    /// Path relative to the feature base
    #[must_use]
    pub fn relative_path(&self) -> &'static str {
        match self {
            Destination::Qualify => "/qualify",
            Destination::LinkOrcid => "/reports/me/link",
            Destination::ScientistReport => "/reports/me",
            Destination::LabManagerShared => "/shared",
            Destination::AdminScientists => "/scientists",
        }
    }

    /// Absolute app path under `base`
    #[must_use]
    pub fn path(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.relative_path())
    }
}

/// Outcome of a redirect check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Stay,
    Redirect(Destination),
}

impl RouteDecision {
    #[inline]
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, RouteDecision::Redirect(_))
    }

    /// Target path when redirecting
    #[must_use]
    pub fn redirect_path(&self, base: &str) -> Option<String> {
        match self {
            RouteDecision::Stay => None,
            RouteDecision::Redirect(destination) => Some(destination.path(base)),
        }
    }
}

/// Page of the feature a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompliancePage {
    /// The feature root
    Root,
    /// `/reports`
    Reports,
    /// `/reports/me`
    MyReport,
    /// `/qualify`
    Qualify,
    /// Any other sub-route
    Other,
}

impl CompliancePage {
    /// Classify `path` relative to `base`
    #[must_use]
    pub fn classify(base: &str, path: &str) -> Self {
        let base = base.trim_end_matches('/');
        let path = path.trim_end_matches('/');
        let Some(rest) = path.strip_prefix(base) else {
            return CompliancePage::Other;
        };
        match rest {
            "" => CompliancePage::Root,
            "/reports" => CompliancePage::Reports,
            "/reports/me" => CompliancePage::MyReport,
            "/qualify" => CompliancePage::Qualify,
            _ => CompliancePage::Other,
        }
    }
}

/// Where a user with `role` lands
#[must_use]
pub fn landing_for(role: ComplianceRole, is_admin: bool) -> Destination {
    match role {
        ComplianceRole::Scientist => Destination::ScientistReport,
        ComplianceRole::LabManager if is_admin => Destination::AdminScientists,
        ComplianceRole::LabManager => Destination::LabManagerShared,
    }
}

/// Redirect check run by the feature layout for every page
#[must_use]
pub fn resolve_layout(base: &str, path: &str, identity: &Identity) -> RouteDecision {
    let page = CompliancePage::classify(base, path);

    let entry_page = matches!(
        page,
        CompliancePage::Root | CompliancePage::Reports | CompliancePage::MyReport
    );
    if entry_page
        && !identity.orcid_linked()
        && identity.role == Some(ComplianceRole::Scientist)
        && !identity.is_compliance_admin
    {
        return RouteDecision::Redirect(Destination::LinkOrcid);
    }

    if let Some(role) = identity.role {
        if matches!(page, CompliancePage::Root | CompliancePage::Reports) {
            return RouteDecision::Redirect(landing_for(role, identity.is_compliance_admin));
        }
    }

    if identity.role.is_none() && page != CompliancePage::Qualify {
        return RouteDecision::Redirect(Destination::Qualify);
    }

    RouteDecision::Stay
}

/// Users who already chose a role skip the qualification form
#[must_use]
pub fn resolve_qualify_page(identity: &Identity) -> RouteDecision {
    match identity.role {
        Some(role) => RouteDecision::Redirect(landing_for(role, identity.is_compliance_admin)),
        None => RouteDecision::Stay,
    }
}

/// Users with a linked ORCID skip the linking page
#[must_use]
pub fn resolve_link_page(identity: &Identity) -> RouteDecision {
    if identity.orcid_linked() {
        RouteDecision::Redirect(Destination::ScientistReport)
    } else {
        RouteDecision::Stay
    }
}

/// Pages that opt out of reloading after some form actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidatingPage {
    SharedDashboards,
    MyReport,
}

/// Whether `page` reloads its data after a form posted to `form_action`
///
/// Dialog-driven actions keep their page data so the dialog stays open.
#[must_use]
pub fn should_revalidate(page: RevalidatingPage, form_action: Option<&str>) -> bool {
    let Some(action) = form_action else {
        return true;
    };
    let marker = match page {
        RevalidatingPage::SharedDashboards => "/compliance/shared",
        RevalidatingPage::MyReport => "/compliance/help-request",
    };
    !action.contains(marker)
}

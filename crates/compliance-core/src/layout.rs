//! Feature layout loader
//!
//! Runs on every page of the feature: applies the redirect table, then
//! starts the two slow menu inputs and returns the minimal menu that can be
//! shown before they resolve.

use crate::context::ComplianceContext;
use crate::deferred::{with_timeout, Deferred};
use crate::identity::Identity;
use crate::menu::{build_menu, MenuState};
use crate::reconciler::MenuInputs;
use crate::routing::{resolve_layout, RouteDecision};
use compliance_model::SharedReport;
use std::sync::Arc;

/// Data of the feature layout
#[derive(Debug, Clone)]
pub struct LayoutData {
    /// Menu built from the synchronous inputs only
    pub menu: MenuState,
    /// Whether the secondary navigation is shown (role chosen)
    pub show_secondary_nav: bool,
    pub identity: Identity,
    pub exists_in_source: Deferred<bool>,
    pub shared_reports: Deferred<Vec<SharedReport>>,
}

impl LayoutData {
    /// Inputs of the reconciliation batch for this page load
    #[must_use]
    pub fn into_inputs(self) -> MenuInputs {
        MenuInputs::new(self.identity, self.exists_in_source, self.shared_reports)
    }
}

/// Outcome of [`load_layout`]
#[derive(Debug, Clone)]
pub enum LayoutDecision {
    /// Send the browser to this absolute app path
    Redirect(String),
    Render(Box<LayoutData>),
}

/// Load the layout for a request to `path`
///
/// The existence check only runs when an ORCID is linked; otherwise it is
/// already resolved to `false`.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn load_layout(ctx: &ComplianceContext, path: &str) -> LayoutDecision {
    let identity = ctx.identity();
    let base = ctx.base();

    if let RouteDecision::Redirect(destination) = resolve_layout(base, path, &identity) {
        let target = destination.path(base);
        tracing::debug!(user_id = %ctx.user.id, from = path, to = %target, "layout redirect");
        return LayoutDecision::Redirect(target);
    }

    let budget = ctx.config().source.fetch_timeout();

    let shared_reports = {
        let access = Arc::clone(&ctx.services.access);
        let user_id = ctx.user.id.clone();
        Deferred::spawn(async move { with_timeout(budget, access.shared_with(&user_id)).await })
    };

    let exists_in_source = match identity.orcid.clone() {
        Some(orcid) => {
            let source = Arc::clone(&ctx.services.source);
            Deferred::spawn(
                async move { with_timeout(budget, source.scientist_exists(&orcid)).await },
            )
        }
        None => Deferred::ready(false),
    };

    let menu = build_menu(
        base,
        identity.is_compliance_admin,
        identity.orcid_linked(),
        false,
        identity.role,
        &[],
    );

    LayoutDecision::Render(Box::new(LayoutData {
        menu,
        show_secondary_nav: identity.role.is_some(),
        identity,
        exists_in_source,
        shared_reports,
    }))
}

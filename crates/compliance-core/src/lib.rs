//! Compliance Core - dashboard services
//!
//! The services behind the compliance dashboards:
//! - Resolves where a user belongs from role, ORCID link and admin scope
//! - Reconciles the navigation menu without flicker on re-navigation
//! - Aggregates publication reports from a slow external data source
//! - Dispatches sharing, invitation and help emails
//! - Emits product analytics without failing requests
//!
//! # Example
//!
//! ```rust,ignore
//! use compliance_core::{load_layout, LayoutDecision, MenuReconciler};
//!
//! # async fn example(ctx: compliance_core::ComplianceContext) {
//! let reconciler = MenuReconciler::new(ctx.config());
//! match load_layout(&ctx, "/app/compliance/reports/me") {
//!     LayoutDecision::Redirect(path) => println!("redirect to {path}"),
//!     LayoutDecision::Render(layout) => {
//!         reconciler.submit(layout.into_inputs());
//!     }
//! }
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregator;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod context;
pub mod deferred;
pub mod email;
pub mod error;
pub mod help;
pub mod identity;
pub mod layout;
pub mod menu;
pub mod qualify;
pub mod reconciler;
pub mod routing;
pub mod sharing;
pub mod source;
pub mod warmup;

// Re-exports for convenience
pub use aggregator::{
    load_my_report, load_shared_dashboards, MyReport, MyReportLoad, ScientistStatus,
    SharedDashboards,
};
pub use analytics::{
    Analytics, AnalyticsEmitter, AnalyticsEvent, DepositEvent, EventOptions, EventPayload,
    TrackEvent, TrackedEvent,
};
pub use cache::{CacheStats, CachedSource};
pub use config::{ComplianceConfig, CronConfig, MenuConfig, SourceConfig};
pub use context::{ComplianceContext, Services};
pub use deferred::{with_timeout, Deferred, FetchResult};
pub use email::{EmailMessage, EmailTemplate, Mailer};
pub use error::{
    ActionError, ActionErrorKind, ComplianceError, ConfigError, FetchError, MailError,
    WarmupError,
};
pub use help::{request_help, sanitize_message, HelpRequestKind};
pub use identity::{Identity, ReconciliationKey};
pub use layout::{load_layout, LayoutData, LayoutDecision};
pub use menu::{build_menu, MenuEntry, MenuSection, MenuState};
pub use qualify::qualify;
pub use reconciler::{
    BatchToken, CommitOutcome, MenuInputs, MenuReconciler, MenuSnapshot, ReconcilePhase,
};
pub use routing::{
    landing_for, resolve_layout, resolve_link_page, resolve_qualify_page, should_revalidate,
    CompliancePage, Destination, RevalidatingPage, RouteDecision,
};
pub use sharing::{
    dispatch_shared_action, invite_new_user, request_dashboard_share, FormFields, SharedAction,
};
pub use source::{
    update_compliance_metadata, AccessStore, ComplianceSource, ScientistLookup, UserStore,
};
pub use warmup::{warm_cache, WarmupReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Compliance Core
    pub use crate::{
        ComplianceConfig, ComplianceContext, ComplianceSource, Deferred, Destination, Identity,
        MenuReconciler, MenuState, RouteDecision, Services,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Request context
//!
//! [`ComplianceContext`] bundles the acting user with the shared services a
//! loader or action needs. Services are cheap to clone and shared across
//! requests; a context lives for one request.

use crate::analytics::{Analytics, AnalyticsEmitter};
use crate::config::ComplianceConfig;
use crate::email::Mailer;
use crate::identity::Identity;
use crate::source::{AccessStore, ComplianceSource, UserStore};
use compliance_model::User;
use std::fmt;
use std::sync::Arc;

/// Shared collaborators
#[derive(Clone)]
pub struct Services {
    pub config: Arc<ComplianceConfig>,
    pub source: Arc<dyn ComplianceSource>,
    pub access: Arc<dyn AccessStore>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub analytics: AnalyticsEmitter,
}

impl Services {
    #[must_use]
    pub fn new(
        config: ComplianceConfig,
        source: Arc<dyn ComplianceSource>,
        access: Arc<dyn AccessStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        analytics: Arc<dyn Analytics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            access,
            users,
            mailer,
            analytics: AnalyticsEmitter::new(analytics),
        }
    }

    /// Context for one request by `user`
    #[must_use]
    pub fn for_user(&self, user: User) -> ComplianceContext {
        ComplianceContext {
            user,
            services: self.clone(),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Acting user plus services
#[derive(Debug, Clone)]
pub struct ComplianceContext {
    pub user: User,
    pub services: Services,
}

impl ComplianceContext {
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ComplianceConfig {
        &self.services.config
    }

    /// Feature base path
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        self.services.config.base()
    }

    /// Absolute URL of an app path
    #[must_use]
    pub fn as_base_url(&self, path: &str) -> String {
        self.services.config.as_base_url(path)
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.user)
    }
}

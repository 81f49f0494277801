//! Error types for compliance services
//!
//! Provides error handling for:
//! - External data source fetches (timeouts, upstream failures)
//! - Configuration loading and validation
//! - Form actions that answer with a status code
//! - The cache warm-up hook

use compliance_model::RoleParseError;
use serde::Serialize;

/// Main compliance error type
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    /// External fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Linked ORCID account without an identifier
    #[error("ORCID is missing")]
    MissingOrcid,

    /// Unknown compliance role
    #[error("invalid role: {0}")]
    InvalidRole(#[from] RoleParseError),

    /// User store failure
    #[error("user store error: {0}")]
    Store(String),

    /// Email could not be sent
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Analytics sink rejected an event
    #[error("analytics error: {0}")]
    Analytics(String),
}

impl ComplianceError {
    /// Check if error is a fetch timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Fetch(FetchError::Timeout { .. }))
    }
}

/// Failure of a call to the external data source or access store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// No answer within the configured budget
    #[error("Server Timeout after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Upstream answered with an error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The task producing the value was cancelled
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    #[inline]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Upstream(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Mailer failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

/// Classification of a failed form action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionErrorKind {
    /// Bad input, the user can fix it
    Validation,
    /// Something failed on our side
    General,
}

/// Error answered by a form action
///
/// Serializes as `{"type": ..., "message": ...}`, the body the forms render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} ({status})")]
pub struct ActionError {
    #[serde(rename = "type")]
    pub kind: ActionErrorKind,
    pub message: String,
    #[serde(skip)]
    pub status: u16,
}

impl ActionError {
    /// 400 validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ActionErrorKind::Validation,
            message: message.into(),
            status: 400,
        }
    }

    /// 404 validation error
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ActionErrorKind::Validation,
            message: message.into(),
            status: 404,
        }
    }

    /// 500 general error
    #[inline]
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            kind: ActionErrorKind::General,
            message: message.into(),
            status: 500,
        }
    }

    /// Response body: `{"error": {...}}`
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self })
    }
}

/// Cache warm-up hook errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarmupError {
    /// Hook disabled: no cron secret configured
    #[error("cron secret not configured")]
    NotConfigured,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Error warming cache: No scientists with valid ORCID found")]
    NoScientistWithOrcid,

    #[error("{0}")]
    Fetch(#[from] FetchError),
}

impl WarmupError {
    /// HTTP status the hook answers with
    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotConfigured => 404,
            Self::Unauthorized => 401,
            Self::NoScientistWithOrcid | Self::Fetch(_) => 422,
        }
    }
}

//! Compliance Data Model
//!
//! Plain data shared by every compliance crate.
//!
//! # Core Concepts
//!
//! - [`ComplianceRole`]: scientist or lab-manager, chosen once per user
//! - [`User`]: the acting user, its scopes, linked accounts and compliance metadata
//! - [`Scientist`]: a record from the external tabular data source
//! - [`ArticleRecord`]: a publication and its open-access compliance status
//! - [`SharedReport`]: a dashboard another user shared with the current user
//!
//! # Example
//!
//! ```rust
//! use compliance_model::{ComplianceRole, LinkedAccount, User};
//!
//! let user = User::new("u-1", "ada@example.org")
//!     .with_role(ComplianceRole::Scientist)
//!     .with_linked_account(LinkedAccount::orcid("0000-0002-1825-0097"));
//!
//! assert_eq!(user.orcid(), Some("0000-0002-1825-0097"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod publication;
mod role;
mod user;

pub use publication::{ArticleRecord, PublicationSide, Scientist, SharedReport};
pub use role::{ComplianceRole, RoleParseError};
pub use user::{scopes, ComplianceMetadata, LinkedAccount, User, UserId, ORCID_PROVIDER};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Dashboard sharing actions
//!
//! Form actions of the shared-dashboards page:
//! - `request-dashboard`: email another user asking for their dashboard
//! - `invite-new-user`: invite someone who has no account yet
//!
//! Validation failures answer with an [`ActionError`] carrying the status
//! and message the form displays.

use crate::analytics::{EventPayload, TrackEvent};
use crate::context::ComplianceContext;
use crate::email::{EmailMessage, EmailTemplate, DASHBOARD_REQUEST_EVENT, INVITATION_EVENT};
use crate::error::{ActionError, ComplianceError};
use compliance_model::{User, UserId};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Posted form fields
pub type FormFields = IndexMap<String, String>;

/// App path of the page where a scientist shares their dashboard
pub const SHARE_PAGE_PATH: &str = "/app/compliance/share";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Loose address check: one `@`, no whitespace, a dot in the domain
#[must_use]
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address.trim())
}

/// Parsed action of the shared-dashboards form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedAction {
    RequestDashboard {
        recipient_user_id: UserId,
    },
    InviteNewUser {
        email: String,
        message: Option<String>,
    },
}

impl SharedAction {
    /// Parse the `intent` field and the fields that intent needs
    ///
    /// # Errors
    /// 400 validation error for an unknown intent or a missing field
    pub fn from_form(form: &FormFields) -> Result<Self, ActionError> {
        let field = |name: &str| form.get(name).map(String::as_str);

        match field("intent") {
            Some("request-dashboard") => {
                let recipient = field("recipientUserId")
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ActionError::validation("Recipient user ID is required"))?;
                Ok(SharedAction::RequestDashboard {
                    recipient_user_id: UserId::new(recipient),
                })
            }
            Some("invite-new-user") => {
                let email = field("email")
                    .filter(|e| is_valid_email(e))
                    .ok_or_else(|| ActionError::validation("Valid email is required"))?;
                Ok(SharedAction::InviteNewUser {
                    email: email.trim().to_string(),
                    message: field("message")
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string),
                })
            }
            Some(_) => Err(ActionError::validation("Invalid action")),
            None => Err(ActionError::validation("Invalid intent")),
        }
    }
}

/// Parse and run a shared-dashboards form post
///
/// # Errors
/// The first validation or delivery failure
pub async fn dispatch_shared_action(
    ctx: &ComplianceContext,
    form: &FormFields,
) -> Result<(), ActionError> {
    match SharedAction::from_form(form)? {
        SharedAction::RequestDashboard { recipient_user_id } => {
            request_dashboard_share(ctx, &recipient_user_id).await
        }
        SharedAction::InviteNewUser { email, message } => {
            invite_new_user(ctx, &email, message.as_deref()).await
        }
    }
}

fn display_name(user: &User) -> Option<String> {
    user.name().map(str::to_string)
}

/// Ask `recipient_id` to share their dashboard with the acting user
///
/// # Errors
/// In order: empty recipient (400), recipient is the requester (400),
/// unknown recipient (404), recipient without email (400), then a 500 if
/// the email or the tracking call fails.
pub async fn request_dashboard_share(
    ctx: &ComplianceContext,
    recipient_id: &UserId,
) -> Result<(), ActionError> {
    if recipient_id.is_empty() {
        return Err(ActionError::validation("Please select a user"));
    }
    if *recipient_id == ctx.user.id {
        return Err(ActionError::validation(
            "You cannot request access from yourself",
        ));
    }

    let recipient = ctx
        .services
        .users
        .find(recipient_id)
        .await
        .map_err(|e| ActionError::general(e.to_string()))?
        .ok_or_else(|| ActionError::not_found("Recipient user not found"))?;

    let Some(recipient_email) = recipient.email.clone().filter(|e| !e.trim().is_empty()) else {
        return Err(ActionError::validation(
            "Recipient user does not have an email address",
        ));
    };

    let requester_name = display_name(&ctx.user).unwrap_or_else(|| "A user".to_string());
    let requester_email = ctx.user.email.clone().unwrap_or_default();
    let recipient_name = display_name(&recipient);

    let message = EmailMessage::new(
        DASHBOARD_REQUEST_EVENT,
        recipient_email.clone(),
        format!("{requester_name} has requested access to your compliance dashboard"),
        EmailTemplate::DashboardRequest {
            requester_name: requester_name.clone(),
            requester_email: requester_email.clone(),
            recipient_name: recipient_name.clone(),
            share_page_url: ctx.as_base_url(SHARE_PAGE_PATH),
        },
    );

    let outcome: Result<(), ComplianceError> = async {
        ctx.services.mailer.send(message).await?;
        ctx.services
            .analytics
            .track_for(
                &ctx.user,
                TrackEvent::DashboardRequested,
                EventPayload::new()
                    .with("requesterUserId", ctx.user.id.as_str())
                    .with("requesterEmail", requester_email)
                    .with("requesterDisplayName", display_name(&ctx.user))
                    .with("recipientUserId", recipient.id.as_str())
                    .with("recipientEmail", recipient_email)
                    .with("recipientDisplayName", recipient_name),
            )
            .await
    }
    .await;

    match outcome {
        Ok(()) => {
            tracing::info!(
                requester = %ctx.user.id,
                recipient = %recipient.id,
                "dashboard share requested"
            );
            Ok(())
        }
        Err(error) => {
            tracing::error!(%error, "failed to send dashboard request");
            Err(ActionError::general(error.to_string()))
        }
    }
}

/// Invite someone without an account to the compliance dashboards
///
/// # Errors
/// 400 for an invalid address, 500 if the email cannot be sent
pub async fn invite_new_user(
    ctx: &ComplianceContext,
    email: &str,
    message: Option<&str>,
) -> Result<(), ActionError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ActionError::validation("Valid email is required"));
    }

    let inviter_name = display_name(&ctx.user).unwrap_or_else(|| "A user".to_string());
    let invitation = EmailMessage::new(
        INVITATION_EVENT,
        email,
        format!("{inviter_name} invited you to view compliance dashboards"),
        EmailTemplate::Invitation {
            inviter_name,
            inviter_email: ctx.user.email.clone().unwrap_or_default(),
            message: message.map(str::to_string),
            signup_url: ctx.as_base_url(ctx.base()),
        },
    );

    ctx.services.mailer.send(invitation).await.map_err(|error| {
        tracing::error!(%error, "failed to send invitation");
        ActionError::general(error.to_string())
    })?;

    tracing::info!(inviter = %ctx.user.id, "invitation sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> FormFields {
        fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("ada@example.org"));
        assert!(is_valid_email("  ada@example.org "));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.org"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn email_pattern_is_anchored() {
        assert!(EMAIL_PATTERN.is_match("a@b.co"));
        assert!(!EMAIL_PATTERN.is_match("x a@b.co"));
        assert!(!EMAIL_PATTERN.is_match("a@b.co\n"));
        assert!(!EMAIL_PATTERN.is_match("a@@b.co"));
    }

    #[test]
    fn parse_intents() {
        assert_eq!(
            SharedAction::from_form(&form(&[
                ("intent", "request-dashboard"),
                ("recipientUserId", "u-2")
            ])),
            Ok(SharedAction::RequestDashboard {
                recipient_user_id: UserId::new("u-2")
            })
        );
        assert_eq!(
            SharedAction::from_form(&form(&[
                ("intent", "invite-new-user"),
                ("email", "new@example.org"),
                ("message", "  ")
            ])),
            Ok(SharedAction::InviteNewUser {
                email: "new@example.org".to_string(),
                message: None
            })
        );
    }

    #[test]
    fn parse_rejects_bad_forms() {
        let missing_intent = SharedAction::from_form(&form(&[])).unwrap_err();
        assert_eq!(missing_intent.message, "Invalid intent");

        let unknown = SharedAction::from_form(&form(&[("intent", "delete-all")])).unwrap_err();
        assert_eq!(unknown.message, "Invalid action");
        assert_eq!(unknown.status, 400);

        let no_recipient =
            SharedAction::from_form(&form(&[("intent", "request-dashboard")])).unwrap_err();
        assert_eq!(no_recipient.message, "Recipient user ID is required");

        let bad_email = SharedAction::from_form(&form(&[
            ("intent", "invite-new-user"),
            ("email", "nope"),
        ]))
        .unwrap_err();
        assert_eq!(bad_email.message, "Valid email is required");
    }
}

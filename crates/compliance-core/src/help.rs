//! Help requests sent to compliance support

use crate::analytics::{EventPayload, TrackEvent};
use crate::context::ComplianceContext;
use crate::email::{EmailMessage, EmailTemplate, HELP_REQUEST_EVENT};
use crate::error::ActionError;
use crate::source::update_compliance_metadata;
use compliance_model::ComplianceMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

/// Longest message forwarded to support, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

static MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("markup regex is valid"));

/// What the user needs help with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpRequestKind {
    /// ORCID linked but the scientist is missing from the compliance database
    MissingFromDatabase,
    General,
}

impl HelpRequestKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HelpRequestKind::MissingFromDatabase => "missing-from-database",
            HelpRequestKind::General => "general",
        }
    }
}

impl FromStr for HelpRequestKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "missing-from-database" => Ok(HelpRequestKind::MissingFromDatabase),
            "general" => Ok(HelpRequestKind::General),
            other => Err(ActionError::validation(format!(
                "Invalid help request type: {other}"
            ))),
        }
    }
}

/// Clean a free-text message before it goes into an email
///
/// Markup is stripped, control characters other than newlines become
/// spaces, and the result is trimmed and capped at [`MAX_MESSAGE_CHARS`].
/// Returns `None` when nothing is left.
#[must_use]
pub fn sanitize_message(raw: &str) -> Option<String> {
    let stripped = MARKUP.replace_all(raw, "");

    let mut cleaned = String::with_capacity(stripped.len());
    let mut last_was_space = false;
    for c in stripped.chars() {
        if c.is_control() && c != '\n' {
            if !last_was_space {
                cleaned.push(' ');
            }
            last_was_space = true;
        } else {
            cleaned.push(c);
            last_was_space = c == ' ';
        }
    }

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_MESSAGE_CHARS).collect())
}

/// Send a help request to the support address
///
/// For [`HelpRequestKind::MissingFromDatabase`] the user's metadata records
/// that a dashboard was requested.
///
/// # Errors
/// 400 when a database request comes from a user without an ORCID, 500
/// when the email cannot be sent
pub async fn request_help(
    ctx: &ComplianceContext,
    kind: HelpRequestKind,
    message: Option<&str>,
) -> Result<(), ActionError> {
    let sanitized = message.and_then(sanitize_message);
    let user_name = ctx.user.name().unwrap_or("Unknown user").to_string();
    let user_email = ctx.user.email.clone().unwrap_or_default();
    let orcid = ctx.user.orcid().map(str::to_string);

    let (subject, template) = match kind {
        HelpRequestKind::MissingFromDatabase => {
            let orcid = orcid.clone().ok_or_else(|| {
                ActionError::validation("An ORCID is required to request a compliance dashboard")
            })?;
            (
                format!("Compliance Dashboard Request from {user_name}"),
                EmailTemplate::ComplianceReportRequest {
                    user_name,
                    user_email,
                    orcid,
                    message: sanitized.clone(),
                },
            )
        }
        HelpRequestKind::General => (
            format!("Compliance Help Request from {user_name}"),
            EmailTemplate::GeneralHelpRequest {
                user_name,
                user_email,
                orcid: orcid.clone(),
                message: sanitized.clone(),
            },
        ),
    };

    let email = EmailMessage::new(
        HELP_REQUEST_EVENT,
        ctx.config().support_email.clone(),
        subject,
        template,
    );
    ctx.services.mailer.send(email).await.map_err(|error| {
        tracing::error!(user_id = %ctx.user.id, %error, "failed to send help request");
        ActionError::general(error.to_string())
    })?;

    ctx.services.analytics.emit_for(
        &ctx.user,
        TrackEvent::HelpRequested,
        EventPayload::new()
            .with("requestType", kind.as_str())
            .with("hasMessage", sanitized.is_some())
            .with("orcid", orcid),
    );

    if kind == HelpRequestKind::MissingFromDatabase {
        update_compliance_metadata(
            ctx.services.users.as_ref(),
            &ctx.user.id,
            &ComplianceMetadata::dashboard_requested(),
        )
        .await;
    }

    tracing::info!(user_id = %ctx.user.id, kind = kind.as_str(), "help request sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_controls() {
        assert_eq!(
            sanitize_message("  <b>Hello</b>\u{0007}\u{0008}world\n<script>x</script> "),
            Some("Hello world\nx".to_string())
        );
    }

    #[test]
    fn markup_pattern_matches_single_tags() {
        assert_eq!(MARKUP.replace_all("a<br/>b<i attr=\"1\">c", ""), "abc");
        assert_eq!(MARKUP.replace_all("1 < 2 and 3 > 2", ""), "1  2");
        assert_eq!(MARKUP.replace_all("dangling <tag", ""), "dangling <tag");
    }

    #[test]
    fn blank_messages_vanish() {
        assert_eq!(sanitize_message("   "), None);
        assert_eq!(sanitize_message("<p></p>"), None);
    }

    #[test]
    fn long_messages_are_capped() {
        let long = "é".repeat(MAX_MESSAGE_CHARS + 50);
        let sanitized = sanitize_message(&long).unwrap();
        assert_eq!(sanitized.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn parse_kind() {
        assert_eq!(
            "missing-from-database".parse::<HelpRequestKind>(),
            Ok(HelpRequestKind::MissingFromDatabase)
        );
        assert_eq!(" general ".parse::<HelpRequestKind>(), Ok(HelpRequestKind::General));
        assert_eq!("other".parse::<HelpRequestKind>().unwrap_err().status, 400);
    }
}

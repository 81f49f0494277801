//! Transactional email
//!
//! Templates for the help and dashboard-sharing requests, and the
//! [`Mailer`] seam that delivers them. Every interpolated value is escaped
//! before it lands in the HTML body.

use crate::error::MailError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use ulid::Ulid;

/// Event type of dashboard sharing requests
pub const DASHBOARD_REQUEST_EVENT: &str = "COMPLIANCE_DASHBOARD_REQUEST";
/// Event type of help requests
pub const HELP_REQUEST_EVENT: &str = "COMPLIANCE_HELP_REQUEST";
/// Event type of invitations
pub const INVITATION_EVENT: &str = "COMPLIANCE_INVITATION";

/// Email body variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "kebab-case")]
pub enum EmailTemplate {
    /// Ask a scientist to share their dashboard
    DashboardRequest {
        requester_name: String,
        requester_email: String,
        recipient_name: Option<String>,
        share_page_url: String,
    },
    /// ORCID linked but scientist missing from the compliance database
    ComplianceReportRequest {
        user_name: String,
        user_email: String,
        orcid: String,
        message: Option<String>,
    },
    /// Anything else the user needs help with
    GeneralHelpRequest {
        user_name: String,
        user_email: String,
        orcid: Option<String>,
        message: Option<String>,
    },
    /// Invite someone without an account
    Invitation {
        inviter_name: String,
        inviter_email: String,
        message: Option<String>,
        signup_url: String,
    },
}

impl EmailTemplate {
    /// Heading shown at the top of the body
    #[must_use]
    pub fn heading(&self) -> &'static str {
        match self {
            EmailTemplate::DashboardRequest { .. } => "Dashboard Sharing Request",
            EmailTemplate::ComplianceReportRequest { .. } => "Compliance Dashboard Request",
            EmailTemplate::GeneralHelpRequest { .. } => "Compliance Help Request",
            EmailTemplate::Invitation { .. } => "You're Invited",
        }
    }

    /// Text shown by mail clients next to the subject
    #[must_use]
    pub fn preview_text(&self) -> String {
        match self {
            EmailTemplate::DashboardRequest { requester_name, .. } => {
                format!("{requester_name} has requested access to your compliance dashboard")
            }
            EmailTemplate::ComplianceReportRequest { user_name, .. } => {
                format!("{user_name} is missing from the compliance database")
            }
            EmailTemplate::GeneralHelpRequest { user_name, .. } => {
                format!("{user_name} needs help with compliance")
            }
            EmailTemplate::Invitation { inviter_name, .. } => {
                format!("{inviter_name} invited you to view compliance dashboards")
            }
        }
    }

    /// Plain-text body
    #[must_use]
    pub fn render_text(&self) -> String {
        self.paragraphs()
            .into_iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// HTML body; all values escaped
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<h1>{}</h1>", escape_html(self.heading()));
        for paragraph in self.paragraphs() {
            html.push_str(&paragraph.html());
        }
        let _ = write!(
            html,
            "<hr/><p class=\"footer\">{}</p>",
            escape_html(&self.footer())
        );
        html
    }

    fn footer(&self) -> String {
        match self {
            EmailTemplate::DashboardRequest { requester_name, .. } => format!(
                "This email was sent because {requester_name} requested access to your \
                 compliance dashboard. If you believe this was sent in error, please contact \
                 the requester directly."
            ),
            _ => "This email was sent by the compliance dashboard.".to_string(),
        }
    }

    fn paragraphs(&self) -> Vec<Paragraph> {
        let mut out = Vec::new();
        match self {
            EmailTemplate::DashboardRequest {
                requester_name,
                requester_email,
                recipient_name,
                share_page_url,
            } => {
                out.push(Paragraph::Text(match recipient_name {
                    Some(name) => format!("Hello {name},"),
                    None => "Hello,".to_string(),
                }));
                out.push(Paragraph::Text(format!(
                    "{requester_name} ({requester_email}) has requested that you share your \
                     compliance dashboard with them."
                )));
                out.push(Paragraph::Text(format!(
                    "To grant access to your compliance dashboard, please visit the link below \
                     and use the form to share your dashboard with {requester_name}."
                )));
                out.push(Paragraph::Button {
                    label: "Share My Dashboard".to_string(),
                    href: share_page_url.clone(),
                });
                out.push(Paragraph::Text(format!(
                    "If you have any questions or concerns, please contact {requester_name} \
                     directly at {requester_email}."
                )));
            }
            EmailTemplate::ComplianceReportRequest {
                user_name,
                user_email,
                orcid,
                message,
            } => {
                out.push(Paragraph::Field("From", format!("{user_name} ({user_email})")));
                out.push(Paragraph::Field("ORCID", orcid.clone()));
                out.push(Paragraph::Field(
                    "Issue",
                    "User has linked their ORCID but is not yet included in the compliance \
                     database."
                        .to_string(),
                ));
                push_message(&mut out, message.as_deref());
            }
            EmailTemplate::GeneralHelpRequest {
                user_name,
                user_email,
                orcid,
                message,
            } => {
                out.push(Paragraph::Field("From", format!("{user_name} ({user_email})")));
                if let Some(orcid) = orcid {
                    out.push(Paragraph::Field("ORCID", orcid.clone()));
                }
                push_message(&mut out, message.as_deref());
            }
            EmailTemplate::Invitation {
                inviter_name,
                inviter_email,
                message,
                signup_url,
            } => {
                out.push(Paragraph::Text(format!(
                    "{inviter_name} ({inviter_email}) invited you to view compliance dashboards."
                )));
                push_message(&mut out, message.as_deref());
                out.push(Paragraph::Button {
                    label: "Create Your Account".to_string(),
                    href: signup_url.clone(),
                });
            }
        }
        out
    }
}

fn push_message(out: &mut Vec<Paragraph>, message: Option<&str>) {
    if let Some(message) = message.filter(|m| !m.is_empty()) {
        out.push(Paragraph::Field("Additional Information", message.to_string()));
    }
}

enum Paragraph {
    Text(String),
    Field(&'static str, String),
    Button { label: String, href: String },
}

impl Paragraph {
    fn text(&self) -> String {
        match self {
            Paragraph::Text(text) => text.clone(),
            Paragraph::Field(label, value) => format!("{label}: {value}"),
            Paragraph::Button { label, href } => format!("{label}: {href}"),
        }
    }

    fn html(&self) -> String {
        match self {
            Paragraph::Text(text) => format!("<p>{}</p>", escape_html(text)),
            Paragraph::Field(label, value) => format!(
                "<p><strong>{}:</strong> {}</p>",
                escape_html(label),
                escape_html(value)
            ),
            Paragraph::Button { label, href } => format!(
                "<p><a class=\"button\" href=\"{}\">{}</a></p>",
                escape_html(href),
                escape_html(label)
            ),
        }
    }
}

/// Escape text for HTML element and attribute content
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub id: Ulid,
    pub event_type: String,
    pub to: String,
    pub subject: String,
    pub template: EmailTemplate,
}

impl EmailMessage {
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        template: EmailTemplate,
    ) -> Self {
        Self {
            id: Ulid::new(),
            event_type: event_type.into(),
            to: to.into(),
            subject: subject.into(),
            template,
        }
    }
}

/// Delivers transactional email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard_request(recipient: Option<&str>) -> EmailTemplate {
        EmailTemplate::DashboardRequest {
            requester_name: "Grace".to_string(),
            requester_email: "grace@example.org".to_string(),
            recipient_name: recipient.map(str::to_string),
            share_page_url: "https://example.org/app/compliance/share".to_string(),
        }
    }

    #[test]
    fn dashboard_request_greets_recipient() {
        let text = dashboard_request(Some("Ada")).render_text();
        assert!(text.starts_with("Hello Ada,"));
        assert!(text.contains("Share My Dashboard: https://example.org/app/compliance/share"));

        let anonymous = dashboard_request(None).render_text();
        assert!(anonymous.starts_with("Hello,"));
    }

    #[test]
    fn html_escapes_values() {
        let template = EmailTemplate::GeneralHelpRequest {
            user_name: "<script>alert(1)</script>".to_string(),
            user_email: "x@example.org".to_string(),
            orcid: None,
            message: Some("a & b \"quoted\"".to_string()),
        };
        let html = template.render_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b &quot;quoted&quot;"));
        assert!(!html.contains("ORCID"));
    }

    #[test]
    fn report_request_lists_orcid_and_issue() {
        let template = EmailTemplate::ComplianceReportRequest {
            user_name: "Ada".to_string(),
            user_email: "ada@example.org".to_string(),
            orcid: "0000-1".to_string(),
            message: None,
        };
        let text = template.render_text();
        assert!(text.contains("ORCID: 0000-1"));
        assert!(text.contains("not yet included"));
        assert!(!text.contains("Additional Information"));
        assert_eq!(template.heading(), "Compliance Dashboard Request");
    }

    #[test]
    fn preview_text_names_requester() {
        assert_eq!(
            dashboard_request(None).preview_text(),
            "Grace has requested access to your compliance dashboard"
        );
    }

    #[test]
    fn messages_get_unique_ids() {
        let a = EmailMessage::new(DASHBOARD_REQUEST_EVENT, "a@x", "s", dashboard_request(None));
        let b = EmailMessage::new(DASHBOARD_REQUEST_EVENT, "a@x", "s", dashboard_request(None));
        assert_ne!(a.id, b.id);
    }
}

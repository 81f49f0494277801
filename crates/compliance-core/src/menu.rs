//! Navigation menu construction
//!
//! [`build_menu`] is pure: the same inputs always give the same menu. The
//! reconciler calls it once with placeholders (no existence flag, no shared
//! reports) and again once the slow inputs resolve.

use compliance_model::{ComplianceRole, SharedReport};
use serde::Serialize;

/// Path of the compliance helper wizard, outside the feature base
pub const WIZARD_PATH: &str = "/app/task/compliance-wizard";

/// Menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub name: String,
    pub label: String,
    pub url: String,
}

impl MenuEntry {
    fn new(name: impl Into<String>, label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Titled group of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSection {
    pub title: String,
    pub entries: Vec<MenuEntry>,
}

/// Ordered navigation menu
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MenuState {
    pub sections: Vec<MenuSection>,
}

impl MenuState {
    /// Section by title
    #[must_use]
    pub fn section(&self, title: &str) -> Option<&MenuSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// All entries in display order
    pub fn entries(&self) -> impl Iterator<Item = &MenuEntry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    /// Entry by name, across sections
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&MenuEntry> {
        self.entries().find(|e| e.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn push(&mut self, title: &str, entries: Vec<MenuEntry>) {
        if !entries.is_empty() {
            self.sections.push(MenuSection {
                title: title.to_string(),
                entries,
            });
        }
    }
}

/// Build the compliance menu
#[must_use]
pub fn build_menu(
    base_path: &str,
    is_admin: bool,
    orcid_linked: bool,
    exists_in_source: bool,
    role: Option<ComplianceRole>,
    shared_reports: &[SharedReport],
) -> MenuState {
    let base = base_path.trim_end_matches('/');
    let mut menu = MenuState::default();

    let mut own = Vec::new();
    match role {
        Some(ComplianceRole::LabManager) => {
            own.push(MenuEntry::new("shared", "Dashboards", format!("{base}/shared")));
        }
        Some(ComplianceRole::Scientist) | None if !orcid_linked => {
            own.push(MenuEntry::new(
                "link-orcid",
                "Link ORCID",
                format!("{base}/reports/me/link"),
            ));
        }
        Some(ComplianceRole::Scientist) => {
            own.push(MenuEntry::new(
                "my-dashboard",
                "My Dashboard",
                format!("{base}/reports/me"),
            ));
            if exists_in_source {
                own.push(MenuEntry::new(
                    "share",
                    "Share My Dashboard",
                    format!("{base}/share"),
                ));
            }
        }
        None => {}
    }
    menu.push("My Compliance", own);

    let shared = shared_reports
        .iter()
        .filter_map(|report| {
            let orcid = report.orcid()?;
            let label = report
                .owner_display_name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(orcid);
            Some(MenuEntry::new(
                format!("shared-{orcid}"),
                label,
                format!("{base}/shared/reports/{orcid}"),
            ))
        })
        .collect();
    menu.push("Shared With Me", shared);

    if is_admin {
        menu.push(
            "Administration",
            vec![MenuEntry::new(
                "scientists",
                "All Scientists",
                format!("{base}/scientists"),
            )],
        );
    }

    menu.push(
        "Help",
        vec![MenuEntry::new("wizard", "Compliance Helper", WIZARD_PATH)],
    );

    menu
}

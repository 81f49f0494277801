//! Product analytics
//!
//! Event taxonomy for the compliance feature and the deposit flow it links
//! to, ordered payloads, and a fire-and-forget emitter. Tracking never
//! fails the request that triggered it.

use crate::error::ComplianceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_model::{ComplianceRole, User};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Compliance feature events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackEvent {
    ScientistSelected,
    FilterApplied,
    PolicyOpened,
    PublicationModalOpened,
    PmcLinkClicked,
    PubmedLinkClicked,
    DoiLinkClicked,
    UrlLinkClicked,
    EnhancedPmcLinkClicked,
    EnhancedPreprintLinkClicked,
    ReportShared,
    ReportAccessRevoked,
    ReportHidden,
    ReportShareClicked,
    AccessGrantsViewed,
    HelpRequested,
    ReportTaskClicked,
    RoleQualified,
    DashboardRequested,
    WizardClicked,
    WizardStarted,
    WizardCompleted,
    WizardRestarted,
    WizardFinished,
    WizardQuestionAnswered,
    WizardQuestionChanged,
    WizardOutcomeViewed,
    WizardBiorxivClicked,
    WizardPmcDepositClicked,
    WizardHelpLinkClicked,
    WizardConfirmUseful,
    WizardConfirmNeedHelp,
    WizardHelpRequestSubmitted,
    ServerTimeout,
    TimeoutRetry,
}

impl TrackEvent {
    /// Every event, in taxonomy order
    pub const ALL: [TrackEvent; 35] = [
        TrackEvent::ScientistSelected,
        TrackEvent::FilterApplied,
        TrackEvent::PolicyOpened,
        TrackEvent::PublicationModalOpened,
        TrackEvent::PmcLinkClicked,
        TrackEvent::PubmedLinkClicked,
        TrackEvent::DoiLinkClicked,
        TrackEvent::UrlLinkClicked,
        TrackEvent::EnhancedPmcLinkClicked,
        TrackEvent::EnhancedPreprintLinkClicked,
        TrackEvent::ReportShared,
        TrackEvent::ReportAccessRevoked,
        TrackEvent::ReportHidden,
        TrackEvent::ReportShareClicked,
        TrackEvent::AccessGrantsViewed,
        TrackEvent::HelpRequested,
        TrackEvent::ReportTaskClicked,
        TrackEvent::RoleQualified,
        TrackEvent::DashboardRequested,
        TrackEvent::WizardClicked,
        TrackEvent::WizardStarted,
        TrackEvent::WizardCompleted,
        TrackEvent::WizardRestarted,
        TrackEvent::WizardFinished,
        TrackEvent::WizardQuestionAnswered,
        TrackEvent::WizardQuestionChanged,
        TrackEvent::WizardOutcomeViewed,
        TrackEvent::WizardBiorxivClicked,
        TrackEvent::WizardPmcDepositClicked,
        TrackEvent::WizardHelpLinkClicked,
        TrackEvent::WizardConfirmUseful,
        TrackEvent::WizardConfirmNeedHelp,
        TrackEvent::WizardHelpRequestSubmitted,
        TrackEvent::ServerTimeout,
        TrackEvent::TimeoutRetry,
    ];

    /// Display name sent to the analytics backend
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TrackEvent::ScientistSelected => "HHMI Compliance Scientist Selected",
            TrackEvent::FilterApplied => "HHMI Compliance Filter Applied",
            TrackEvent::PolicyOpened => "HHMI Compliance Policy URL Opened",
            TrackEvent::PublicationModalOpened => "HHMI Compliance Publication Modal Opened",
            TrackEvent::PmcLinkClicked => "HHMI Compliance PMC Link Clicked",
            TrackEvent::PubmedLinkClicked => "HHMI Compliance PubMed Link Clicked",
            TrackEvent::DoiLinkClicked => "HHMI Compliance DOI Link Clicked",
            TrackEvent::UrlLinkClicked => "HHMI Compliance URL Link Clicked",
            TrackEvent::EnhancedPmcLinkClicked => "HHMI Compliance Enhanced PMC Link Clicked",
            TrackEvent::EnhancedPreprintLinkClicked => {
                "HHMI Compliance Enhanced Preprint Link Clicked"
            }
            TrackEvent::ReportShared => "HHMI Compliance Report Shared",
            TrackEvent::ReportAccessRevoked => "HHMI Compliance Report Access Revoked",
            TrackEvent::ReportHidden => "HHMI Compliance Report Hidden",
            TrackEvent::ReportShareClicked => "HHMI Compliance Share Report Clicked",
            TrackEvent::AccessGrantsViewed => "HHMI Compliance Access Grants Viewed",
            TrackEvent::HelpRequested => "HHMI Compliance Help Requested",
            TrackEvent::ReportTaskClicked => "HHMI Compliance Report Task Card Clicked",
            TrackEvent::RoleQualified => "HHMI Compliance Role Qualified",
            TrackEvent::DashboardRequested => "HHMI Compliance Dashboard Requested",
            TrackEvent::WizardClicked => "PMC Compliance Wizard Clicked",
            TrackEvent::WizardStarted => "PMC Compliance Wizard Started",
            TrackEvent::WizardCompleted => "PMC Compliance Wizard Completed",
            TrackEvent::WizardRestarted => "PMC Compliance Wizard Restarted",
            TrackEvent::WizardFinished => "PMC Compliance Wizard Finished",
            TrackEvent::WizardQuestionAnswered => "PMC Compliance Wizard Question Answered",
            TrackEvent::WizardQuestionChanged => "PMC Compliance Wizard Question Changed",
            TrackEvent::WizardOutcomeViewed => "PMC Compliance Wizard Outcome Viewed",
            TrackEvent::WizardBiorxivClicked => "PMC Compliance Wizard BioRxiv Link Clicked",
            TrackEvent::WizardPmcDepositClicked => "PMC Compliance Wizard PMC Deposit Clicked",
            TrackEvent::WizardHelpLinkClicked => "PMC Compliance Wizard Help Link Clicked",
            TrackEvent::WizardConfirmUseful => "PMC Compliance Wizard Confirmed Useful",
            TrackEvent::WizardConfirmNeedHelp => "PMC Compliance Wizard Confirmed Need Help",
            TrackEvent::WizardHelpRequestSubmitted => {
                "PMC Compliance Wizard Help Request Submitted"
            }
            TrackEvent::ServerTimeout => "HHMI Compliance Server Timeout",
            TrackEvent::TimeoutRetry => "HHMI Compliance Timeout Retry",
        }
    }

    /// What the event records
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            TrackEvent::ScientistSelected => "User selected a scientist for compliance review",
            TrackEvent::FilterApplied => "User applied a filter in the compliance list",
            TrackEvent::PolicyOpened => "User opened the open-access policy URL",
            TrackEvent::PublicationModalOpened => {
                "User opened the publication modal via article title"
            }
            TrackEvent::PmcLinkClicked => "User clicked on a PMC link",
            TrackEvent::PubmedLinkClicked => "User clicked on a PubMed link",
            TrackEvent::DoiLinkClicked => "User clicked on a DOI link",
            TrackEvent::UrlLinkClicked => "User clicked on a URL link",
            TrackEvent::EnhancedPmcLinkClicked => "User clicked on an enhanced PMC link",
            TrackEvent::EnhancedPreprintLinkClicked => "User clicked on an enhanced preprint link",
            TrackEvent::ReportShared => "Compliance report shared with another user",
            TrackEvent::ReportAccessRevoked => "Access to compliance report revoked",
            TrackEvent::ReportHidden => "User hid their compliance report",
            TrackEvent::ReportShareClicked => "User clicked the share this report button",
            TrackEvent::AccessGrantsViewed => {
                "Admin viewed access grants for a scientist compliance report"
            }
            TrackEvent::HelpRequested => "User requested help or support",
            TrackEvent::ReportTaskClicked => {
                "User clicked the compliance report task card from dashboard"
            }
            TrackEvent::RoleQualified => {
                "User qualified their compliance role (scientist or lab-manager)"
            }
            TrackEvent::DashboardRequested => {
                "User requested another user to share their compliance dashboard"
            }
            TrackEvent::WizardClicked => {
                "User clicked the compliance wizard task card button on dashboard"
            }
            TrackEvent::WizardStarted => "User started the compliance wizard page",
            TrackEvent::WizardCompleted => {
                "User completed the compliance wizard; only the first completion after start"
            }
            TrackEvent::WizardRestarted => "User clicked the Start Over button in the wizard",
            TrackEvent::WizardFinished => "User clicked the Finish button in the wizard",
            TrackEvent::WizardQuestionAnswered => "User answered a question in the wizard",
            TrackEvent::WizardQuestionChanged => "User changed an answer in the wizard",
            TrackEvent::WizardOutcomeViewed => {
                "User viewed compliance outcomes; fires every time outcomes change"
            }
            TrackEvent::WizardBiorxivClicked => "User clicked on the BioRxiv submission link",
            TrackEvent::WizardPmcDepositClicked => "User clicked on the PMC deposit task card",
            TrackEvent::WizardHelpLinkClicked => "User clicked on the help link",
            TrackEvent::WizardConfirmUseful => {
                "After completing the wizard, user confirmed the wizard was useful"
            }
            TrackEvent::WizardConfirmNeedHelp => {
                "After completing the wizard, user confirmed they still needed help"
            }
            TrackEvent::WizardHelpRequestSubmitted => {
                "User submitted a help request form after indicating they needed help"
            }
            TrackEvent::ServerTimeout => {
                "Server timeout occurred while loading compliance data"
            }
            TrackEvent::TimeoutRetry => {
                "User clicked retry button after experiencing a server timeout"
            }
        }
    }

    /// Event by display name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

/// Deposit flow events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepositEvent {
    TaskCardClicked,
    Created,
    Previewed,
    Confirmed,
    DoiLookupSucceeded,
    DoiLookupFailed,
}

impl DepositEvent {
    pub const ALL: [DepositEvent; 6] = [
        DepositEvent::TaskCardClicked,
        DepositEvent::Created,
        DepositEvent::Previewed,
        DepositEvent::Confirmed,
        DepositEvent::DoiLookupSucceeded,
        DepositEvent::DoiLookupFailed,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DepositEvent::TaskCardClicked => "PMC Deposit Task Card Clicked",
            DepositEvent::Created => "PMC Deposit Created",
            DepositEvent::Previewed => "PMC Deposit Previewed",
            DepositEvent::Confirmed => "PMC Deposit Confirmed",
            DepositEvent::DoiLookupSucceeded => "PMC DOI Lookup Succeeded",
            DepositEvent::DoiLookupFailed => "PMC DOI Lookup Failed",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            DepositEvent::TaskCardClicked => "User clicked the PMC deposit task card",
            DepositEvent::Created => "PMC deposit work created",
            DepositEvent::Previewed => "PMC deposit previewed before submission",
            DepositEvent::Confirmed => "PMC deposit confirmed and submitted",
            DepositEvent::DoiLookupSucceeded => "DOI lookup succeeded for PMC deposit",
            DepositEvent::DoiLookupFailed => "DOI lookup failed for PMC deposit",
        }
    }
}

/// Any tracked event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsEvent {
    Compliance(TrackEvent),
    Deposit(DepositEvent),
}

impl AnalyticsEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::Compliance(event) => event.name(),
            AnalyticsEvent::Deposit(event) => event.name(),
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            AnalyticsEvent::Compliance(event) => event.description(),
            AnalyticsEvent::Deposit(event) => event.description(),
        }
    }

    /// Both taxonomies, compliance first
    pub fn all() -> impl Iterator<Item = AnalyticsEvent> {
        TrackEvent::ALL
            .into_iter()
            .map(AnalyticsEvent::Compliance)
            .chain(DepositEvent::ALL.into_iter().map(AnalyticsEvent::Deposit))
    }
}

impl From<TrackEvent> for AnalyticsEvent {
    fn from(event: TrackEvent) -> Self {
        AnalyticsEvent::Compliance(event)
    }
}

impl From<DepositEvent> for AnalyticsEvent {
    fn from(event: DepositEvent) -> Self {
        AnalyticsEvent::Deposit(event)
    }
}

impl fmt::Display for AnalyticsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for AnalyticsEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Ordered event properties
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventPayload(IndexMap<String, serde_json::Value>);

impl EventPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a property, keeping first-insert order
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add `complianceRole`; `null` when the role is unset
    #[must_use]
    pub fn with_compliance_role(self, role: Option<ComplianceRole>) -> Self {
        let value = role.map_or(serde_json::Value::Null, |r| r.as_str().into());
        self.with("complianceRole", value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-event delivery options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOptions {
    /// Do not attach the user identity
    pub anonymous: bool,
    /// Drop the event when the actor is an administrator
    pub ignore_admin: bool,
}

impl EventOptions {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ignore_admin: true,
        }
    }
}

/// Event as handed to the analytics backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    pub id: Ulid,
    pub event: AnalyticsEvent,
    pub payload: EventPayload,
    pub options: EventOptions,
    pub timestamp: DateTime<Utc>,
}

impl TrackedEvent {
    #[must_use]
    pub fn new(event: AnalyticsEvent, payload: EventPayload, options: EventOptions) -> Self {
        Self {
            id: Ulid::new(),
            event,
            payload,
            options,
            timestamp: Utc::now(),
        }
    }
}

/// Analytics backend
#[async_trait]
pub trait Analytics: Send + Sync {
    async fn track(&self, event: TrackedEvent) -> Result<(), ComplianceError>;
}

/// Fire-and-forget front of an [`Analytics`] backend
#[derive(Clone)]
pub struct AnalyticsEmitter {
    sink: Arc<dyn Analytics>,
}

impl AnalyticsEmitter {
    #[must_use]
    pub fn new(sink: Arc<dyn Analytics>) -> Self {
        Self { sink }
    }

    /// Track in the background; failures are logged at `warn`
    ///
    /// Must be called from within a tokio runtime.
    pub fn emit(
        &self,
        event: impl Into<AnalyticsEvent>,
        payload: EventPayload,
        options: EventOptions,
    ) -> JoinHandle<()> {
        let tracked = TrackedEvent::new(event.into(), payload, options);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let name = tracked.event.name();
            if let Err(error) = sink.track(tracked).await {
                metrics::counter!("compliance_analytics_failures_total").increment(1);
                tracing::warn!(event = name, %error, "analytics tracking failed");
            }
        })
    }

    /// Track on behalf of `user`, adding their `complianceRole`
    pub fn emit_for(
        &self,
        user: &User,
        event: impl Into<AnalyticsEvent>,
        payload: EventPayload,
    ) -> JoinHandle<()> {
        self.emit(
            event,
            payload.with_compliance_role(user.role()),
            EventOptions::default(),
        )
    }

    /// Track and wait for the backend's answer
    pub async fn track_for(
        &self,
        user: &User,
        event: impl Into<AnalyticsEvent>,
        payload: EventPayload,
    ) -> Result<(), ComplianceError> {
        let tracked = TrackedEvent::new(
            event.into(),
            payload.with_compliance_role(user.role()),
            EventOptions::default(),
        );
        self.sink.track(tracked).await
    }
}

impl fmt::Debug for AnalyticsEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_described() {
        let names: HashSet<&str> = AnalyticsEvent::all().map(|e| e.name()).collect();
        assert_eq!(names.len(), TrackEvent::ALL.len() + DepositEvent::ALL.len());
        assert!(AnalyticsEvent::all().all(|e| !e.description().is_empty()));
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(
            TrackEvent::from_name("HHMI Compliance Role Qualified"),
            Some(TrackEvent::RoleQualified)
        );
        assert_eq!(TrackEvent::from_name("nope"), None);
    }

    #[test]
    fn payload_keeps_insertion_order() {
        let payload = EventPayload::new()
            .with("role", "scientist")
            .with("userId", "u-1")
            .with("autoSet", false)
            .with_compliance_role(Some(ComplianceRole::Scientist));
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(keys, vec!["role", "userId", "autoSet", "complianceRole"]);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"role":"scientist","userId":"u-1","autoSet":false,"complianceRole":"scientist"}"#
        );
    }

    #[test]
    fn unset_role_is_null() {
        let payload = EventPayload::new().with_compliance_role(None);
        assert_eq!(payload.get("complianceRole"), Some(&serde_json::Value::Null));
    }

    #[derive(Default)]
    struct Sink {
        fail: bool,
        seen: Mutex<Vec<TrackedEvent>>,
    }

    #[async_trait]
    impl Analytics for Sink {
        async fn track(&self, event: TrackedEvent) -> Result<(), ComplianceError> {
            self.seen.lock().push(event);
            if self.fail {
                return Err(ComplianceError::Analytics("sink down".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn emit_for_adds_role() {
        let sink = Arc::new(Sink::default());
        let emitter = AnalyticsEmitter::new(sink.clone());
        let user = User::new("u-1", "a@example.org").with_role(ComplianceRole::LabManager);

        emitter
            .emit_for(&user, TrackEvent::HelpRequested, EventPayload::new())
            .await
            .unwrap();

        let seen = sink.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event, AnalyticsEvent::Compliance(TrackEvent::HelpRequested));
        assert_eq!(seen[0].payload.get("complianceRole").unwrap(), "lab-manager");
    }

    #[tokio::test]
    async fn failed_emission_does_not_propagate() {
        let sink = Arc::new(Sink {
            fail: true,
            ..Sink::default()
        });
        let emitter = AnalyticsEmitter::new(sink.clone());
        let handle = emitter.emit(
            DepositEvent::Created,
            EventPayload::new(),
            EventOptions::anonymous(),
        );
        assert!(handle.await.is_ok());
        assert_eq!(sink.seen.lock().len(), 1);
    }
}

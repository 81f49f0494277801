//! Testing utilities for the compliance workspace
//!
//! In-memory stores, a scriptable data source, recording mail and analytics
//! sinks, and user fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use compliance_core::{
    AccessStore, Analytics, AnalyticsEvent, ComplianceConfig, ComplianceContext, ComplianceError,
    ComplianceSource, EmailMessage, FetchError, MailError, Mailer, ScientistLookup, Services,
    TrackEvent, TrackedEvent, UserStore,
};
use compliance_model::{
    scopes, ArticleRecord, ComplianceMetadata, ComplianceRole, LinkedAccount, Scientist,
    SharedReport, User, UserId,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const SCIENTIST_ORCID: &str = "0000-0002-1825-0097";

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Scientist with a confirmed ORCID
pub fn scientist_user() -> User {
    User::new("u-scientist", "ada@example.org")
        .with_display_name("Ada Lovelace")
        .with_role(ComplianceRole::Scientist)
        .with_linked_account(LinkedAccount::orcid(SCIENTIST_ORCID))
}

/// Scientist who has not linked ORCID yet
pub fn unlinked_scientist_user() -> User {
    User::new("u-unlinked", "grace@example.org")
        .with_display_name("Grace Hopper")
        .with_role(ComplianceRole::Scientist)
}

pub fn lab_manager_user() -> User {
    User::new("u-manager", "mary@example.org")
        .with_username("mary")
        .with_role(ComplianceRole::LabManager)
}

/// Lab-manager with the compliance admin scope
pub fn admin_user() -> User {
    lab_manager_user().with_scope(scopes::COMPLIANCE_ADMIN)
}

/// User who has not chosen a role
pub fn unqualified_user() -> User {
    User::new("u-new", "new@example.org").with_display_name("New User")
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<UserId, User>,
    fail: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.users.get(&UserId::new(id)).map(|u| u.clone())
    }

    /// Make every call fail with a store error
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ComplianceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ComplianceError::Store("database unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, user_id: &UserId) -> Result<Option<User>, ComplianceError> {
        self.check()?;
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn merge_compliance_metadata(
        &self,
        user_id: &UserId,
        update: &ComplianceMetadata,
    ) -> Result<bool, ComplianceError> {
        self.check()?;
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.compliance.merge(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    grants: DashMap<UserId, Vec<SharedReport>>,
    failure: Mutex<Option<FetchError>>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share `report` with `user_id`
    pub fn share(&self, user_id: &str, report: SharedReport) {
        self.grants
            .entry(UserId::new(user_id))
            .or_default()
            .push(report);
    }

    pub fn fail_with(&self, error: Option<FetchError>) {
        *self.failure.lock() = error;
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn shared_with(&self, user_id: &UserId) -> Result<Vec<SharedReport>, FetchError> {
        let failure = self.failure.lock().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self
            .grants
            .get(user_id)
            .map(|g| g.clone())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

/// Scriptable data source
///
/// Answers from in-memory tables after an optional delay. ORCIDs listed in
/// `failing` answer with an upstream error.
#[derive(Debug, Default)]
pub struct FakeSource {
    scientists: Mutex<Vec<Scientist>>,
    covered: DashMap<String, Vec<ArticleRecord>>,
    not_covered: DashMap<String, Vec<ArticleRecord>>,
    failing: DashMap<String, ()>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scientist(self, scientist: Scientist) -> Self {
        self.scientists.lock().push(scientist);
        self
    }

    pub fn with_covered(self, orcid: &str, records: Vec<ArticleRecord>) -> Self {
        self.covered.insert(orcid.to_string(), records);
        self
    }

    pub fn with_not_covered(self, orcid: &str, records: Vec<ArticleRecord>) -> Self {
        self.not_covered.insert(orcid.to_string(), records);
        self
    }

    pub fn with_failing(self, orcid: &str) -> Self {
        self.failing.insert(orcid.to_string(), ());
        self
    }

    /// Delay every answer; combine with a paused clock
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, orcid: Option<&str>) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match orcid {
            Some(orcid) if self.failing.contains_key(orcid) => {
                Err(FetchError::upstream(format!("lookup failed for {orcid}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ComplianceSource for FakeSource {
    async fn covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError> {
        self.enter(Some(orcid)).await?;
        Ok(self.covered.get(orcid).map(|r| r.clone()).unwrap_or_default())
    }

    async fn not_covered_by_policy(&self, orcid: &str) -> Result<Vec<ArticleRecord>, FetchError> {
        self.enter(Some(orcid)).await?;
        Ok(self
            .not_covered
            .get(orcid)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn scientist_by_orcid(&self, orcid: &str) -> Result<ScientistLookup, FetchError> {
        self.enter(Some(orcid)).await?;
        let found = self
            .scientists
            .lock()
            .iter()
            .find(|s| s.orcid == orcid)
            .cloned();
        Ok(found.map_or_else(ScientistLookup::not_found, ScientistLookup::found))
    }

    async fn all_scientists(&self) -> Result<Vec<Scientist>, FetchError> {
        self.enter(None).await?;
        Ok(self.scientists.lock().clone())
    }
}

// ---------------------------------------------------------------------------
// Mail and analytics sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("smtp unavailable".to_string()));
        }
        self.sent.lock().push(message);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<TrackedEvent>>,
    fail: AtomicBool,
    notify: Notify,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events.lock().clone()
    }

    /// Recorded events of one kind
    pub fn of(&self, event: TrackEvent) -> Vec<TrackedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event == AnalyticsEvent::from(event))
            .cloned()
            .collect()
    }

    /// Wait until `count` events arrived or `budget` elapsed
    pub async fn wait_for(&self, count: usize, budget: Duration) -> Vec<TrackedEvent> {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let notified = self.notify.notified();
            if self.events.lock().len() >= count {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        self.events()
    }
}

#[async_trait]
impl Analytics for RecordingAnalytics {
    async fn track(&self, event: TrackedEvent) -> Result<(), ComplianceError> {
        self.events.lock().push(event);
        self.notify.notify_waiters();
        if self.fail.load(Ordering::SeqCst) {
            return Err(ComplianceError::Analytics("analytics unavailable".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// All fakes wired into [`Services`]
pub struct TestHarness {
    pub config: ComplianceConfig,
    pub source: Arc<FakeSource>,
    pub access: Arc<InMemoryAccessStore>,
    pub users: Arc<InMemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_source(FakeSource::new())
    }

    pub fn with_source(source: FakeSource) -> Self {
        Self {
            config: ComplianceConfig::new().with_public_base_url("https://example.org"),
            source: Arc::new(source),
            access: Arc::new(InMemoryAccessStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            mailer: Arc::new(RecordingMailer::new()),
            analytics: Arc::new(RecordingAnalytics::new()),
        }
    }

    pub fn with_config(mut self, config: ComplianceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn services(&self) -> Services {
        Services::new(
            self.config.clone(),
            self.source.clone(),
            self.access.clone(),
            self.users.clone(),
            self.mailer.clone(),
            self.analytics.clone(),
        )
    }

    /// Context for `user`, who is also stored in the user store
    pub fn context(&self, user: User) -> ComplianceContext {
        self.users.insert(user.clone());
        self.services().for_user(user)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

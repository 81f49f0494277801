//! Menu reconciliation
//!
//! Turns the layout's inputs (synchronous identity plus two slow deferred
//! values) into a navigation menu that does not flicker on re-navigation.
//!
//! # State machine
//!
//! ```text
//!            submit (key changed)              both inputs resolve
//! Minimal ───────────────────────▶ Resolving ─────────────────────▶ Committed
//!    ▲        reset to fallback     │   ▲                               │
//!    │                              │   └───────────────────────────────┘
//!    └──── input failed, ───────────┘     submit (same key): keep menu
//!          no full menu yet
//! ```
//!
//! Every batch carries the generation it was issued with. A batch commits
//! only if its generation is still the latest when it finishes; anything
//! older is dropped. Unmounting aborts the in-flight batch and turns every
//! later completion into a no-op.

use crate::config::ComplianceConfig;
use crate::deferred::{Deferred, FetchResult};
use crate::error::FetchError;
use crate::identity::{Identity, ReconciliationKey};
use crate::menu::{build_menu, MenuState};
use compliance_model::SharedReport;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Inputs of one reconciliation batch
#[derive(Debug, Clone)]
pub struct MenuInputs {
    pub identity: Identity,
    pub exists_in_source: Deferred<bool>,
    pub shared_reports: Deferred<Vec<SharedReport>>,
}

impl MenuInputs {
    #[must_use]
    pub fn new(
        identity: Identity,
        exists_in_source: Deferred<bool>,
        shared_reports: Deferred<Vec<SharedReport>>,
    ) -> Self {
        Self {
            identity,
            exists_in_source,
            shared_reports,
        }
    }
}

/// Reconciliation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePhase {
    /// Showing the fallback menu, nothing pending
    Minimal,
    /// A batch is in flight
    Resolving,
    /// Showing a fully resolved menu, nothing pending
    Committed,
}

/// Published view of the reconciler
#[derive(Debug, Clone)]
pub struct MenuSnapshot {
    pub menu: Arc<MenuState>,
    pub phase: ReconcilePhase,
    /// Displayed menu is the fallback built from synchronous inputs only
    pub fallback: bool,
    pub key: Option<ReconciliationKey>,
    /// Generation of the batch that last changed `menu`
    pub generation: u64,
}

impl MenuSnapshot {
    fn empty() -> Self {
        Self {
            menu: Arc::new(MenuState::default()),
            phase: ReconcilePhase::Minimal,
            fallback: true,
            key: None,
            generation: 0,
        }
    }
}

/// Handle of an issued batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchToken {
    generation: u64,
    reset: bool,
}

impl BatchToken {
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issuing this batch reset the menu to the fallback
    #[inline]
    #[must_use]
    pub fn reset(&self) -> bool {
        self.reset
    }
}

/// What happened to a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Full menu published
    Committed,
    /// An input failed; previous menu kept
    Failed,
    /// A newer batch was issued; result dropped
    Stale,
    /// Reconciler unmounted; result dropped
    Unmounted,
}

#[derive(Debug)]
struct State {
    identity: Identity,
    key: Option<ReconciliationKey>,
    /// Latest issued generation
    generation: u64,
    has_full_menu: bool,
    unmounted: bool,
    in_flight: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    base_path: String,
    slow_resolution: Duration,
    state: Mutex<State>,
    tx: watch::Sender<MenuSnapshot>,
}

/// Menu reconciler owned by one layout instance
///
/// Dropping the reconciler unmounts it.
#[derive(Debug)]
pub struct MenuReconciler {
    inner: Arc<Inner>,
}

impl MenuReconciler {
    /// Create reconciler showing an empty fallback menu
    #[must_use]
    pub fn new(config: &ComplianceConfig) -> Self {
        let (tx, _rx) = watch::channel(MenuSnapshot::empty());
        Self {
            inner: Arc::new(Inner {
                base_path: config.base().to_string(),
                slow_resolution: Duration::from_millis(config.menu.slow_resolution_ms),
                state: Mutex::new(State {
                    identity: Identity::default(),
                    key: None,
                    generation: 0,
                    has_full_menu: false,
                    unmounted: false,
                    in_flight: None,
                }),
                tx,
            }),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> MenuSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// Receiver notified on every published change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MenuSnapshot> {
        self.inner.tx.subscribe()
    }

    /// Start a batch and resolve it on the runtime
    ///
    /// Aborts the previous in-flight batch. Returns `None` once unmounted.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, inputs: MenuInputs) -> Option<BatchToken> {
        let mut state = self.inner.state.lock();
        let token = self.inner.begin_locked(&mut state, inputs.identity)?;

        if let Some(previous) = state.in_flight.take() {
            previous.abort();
        }

        let inner = Arc::clone(&self.inner);
        let exists = inputs.exists_in_source;
        let reports = inputs.shared_reports;
        state.in_flight = Some(tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let outcome = futures::future::try_join(exists.resolve(), reports.resolve()).await;
            inner.complete(token, outcome, started.elapsed());
        }));

        Some(token)
    }

    /// Start a batch whose inputs the caller resolves itself
    ///
    /// Pair with [`MenuReconciler::complete`]. Returns `None` once unmounted.
    pub fn begin(&self, identity: Identity) -> Option<BatchToken> {
        let mut state = self.inner.state.lock();
        self.inner.begin_locked(&mut state, identity)
    }

    /// Finish a batch started with [`MenuReconciler::begin`]
    pub fn complete(
        &self,
        token: BatchToken,
        outcome: FetchResult<(bool, Vec<SharedReport>)>,
    ) -> CommitOutcome {
        self.inner.complete(token, outcome, Duration::ZERO)
    }

    /// Stop publishing; pending and future completions become no-ops
    pub fn unmount(&self) {
        let mut state = self.inner.state.lock();
        if state.unmounted {
            return;
        }
        state.unmounted = true;
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        tracing::debug!(generation = state.generation, "menu reconciler unmounted");
    }

    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.inner.state.lock().unmounted
    }
}

impl Drop for MenuReconciler {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl Inner {
    fn begin_locked(&self, state: &mut State, identity: Identity) -> Option<BatchToken> {
        if state.unmounted {
            return None;
        }

        state.generation += 1;
        let generation = state.generation;
        let key = identity.key();
        let reset = state.key.as_ref() != Some(&key);

        if reset {
            let menu = build_menu(
                &self.base_path,
                identity.is_compliance_admin,
                identity.orcid_linked(),
                false,
                identity.role,
                &[],
            );
            tracing::debug!(%key, generation, "identity changed, showing fallback menu");
            state.has_full_menu = false;
            self.tx.send_replace(MenuSnapshot {
                menu: Arc::new(menu),
                phase: ReconcilePhase::Resolving,
                fallback: true,
                key: Some(key.clone()),
                generation,
            });
        } else {
            self.tx.send_if_modified(|snapshot| {
                let changed = snapshot.phase != ReconcilePhase::Resolving;
                snapshot.phase = ReconcilePhase::Resolving;
                changed
            });
        }

        state.key = Some(key);
        state.identity = identity;
        Some(BatchToken { generation, reset })
    }

    fn complete(
        &self,
        token: BatchToken,
        outcome: FetchResult<(bool, Vec<SharedReport>)>,
        elapsed: Duration,
    ) -> CommitOutcome {
        let mut state = self.state.lock();
        if state.unmounted {
            return CommitOutcome::Unmounted;
        }
        if token.generation != state.generation {
            metrics::counter!("compliance_menu_stale_total").increment(1);
            tracing::debug!(
                batch = token.generation,
                latest = state.generation,
                "dropping stale menu resolution"
            );
            return CommitOutcome::Stale;
        }
        state.in_flight = None;

        match outcome {
            Ok((exists, reports)) => {
                let identity = &state.identity;
                let menu = build_menu(
                    &self.base_path,
                    identity.is_compliance_admin,
                    identity.orcid_linked(),
                    exists,
                    identity.role,
                    &reports,
                );
                if elapsed > self.slow_resolution {
                    tracing::info!(
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "menu data resolved slowly"
                    );
                }
                state.has_full_menu = true;
                self.tx.send_replace(MenuSnapshot {
                    menu: Arc::new(menu),
                    phase: ReconcilePhase::Committed,
                    fallback: false,
                    key: state.key.clone(),
                    generation: token.generation,
                });
                metrics::counter!("compliance_menu_commits_total").increment(1);
                CommitOutcome::Committed
            }
            Err(error) => {
                log_failure(&error, token.generation);
                let phase = if state.has_full_menu {
                    ReconcilePhase::Committed
                } else {
                    ReconcilePhase::Minimal
                };
                self.tx.send_modify(|snapshot| snapshot.phase = phase);
                metrics::counter!("compliance_menu_failures_total").increment(1);
                CommitOutcome::Failed
            }
        }
    }
}

fn log_failure(error: &FetchError, generation: u64) {
    tracing::error!(%error, generation, "failed to resolve menu data, keeping previous menu");
}

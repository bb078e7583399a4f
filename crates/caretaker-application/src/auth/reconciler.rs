//! Reconciler: the single writer of session identity.
//!
//! One attempt runs at a time. An attempt fetches the current remote
//! identity, then the profile keyed by it, and commits the pair atomically
//! (or clears both). Transient failures are retried a bounded number of
//! times; the whole attempt is bounded by a watchdog whose expiry releases
//! the loading flag but keeps the previous session.

use std::future::Future;
use std::sync::Arc;

use caretaker_core::auth::{IdentityProvider, Platform};
use caretaker_core::config::{AuthConfig, ProfileProvisioning};
use caretaker_core::error::{CaretakerError, Result};
use caretaker_core::session::{AttemptId, Commit, SessionStore, SkipReason};
use caretaker_core::user::{NewProfile, ProfileRepository};
use tokio::time::{Instant, sleep, timeout};

/// `last_error` recorded when an identity has no profile record.
pub const PROFILE_NOT_FOUND: &str = "profile not found";

/// How a call to [`Reconciler::reconcile`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No attempt was started.
    Skipped(SkipReason),
    Authenticated,
    /// Definitive: the provider reports no session.
    SignedOut,
    /// Session cleared and `last_error` set.
    Failed(String),
    /// Watchdog fired; previous session kept.
    TimedOut,
    /// A newer attempt, a clear, or a forced release took ownership; the
    /// result was discarded.
    Superseded,
}

/// Retry state of one attempt.
enum Phase {
    Checking,
    Retrying(u32),
    Settled(Commit),
    Abandoned,
}

/// Releases the loading flag if an attempt future is dropped before it
/// settles (caller cancelled, task aborted).
struct AttemptGuard<'a> {
    store: &'a SessionStore,
    attempt: AttemptId,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.store.abandon(self.attempt) {
            tracing::warn!(
                "[Reconciler] Attempt {} dropped before settling, loading released",
                self.attempt.get()
            );
        }
    }
}

pub struct Reconciler {
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    config: AuthConfig,
    platform: Platform,
}

impl Reconciler {
    pub fn new(
        store: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        config: AuthConfig,
        platform: Platform,
    ) -> Self {
        Self {
            store,
            identity,
            profiles,
            config,
            platform,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Runs one reconciliation attempt unless one is already in flight or
    /// the previous one started within the debounce window.
    ///
    /// Never fails: callers observe the result through the session store.
    /// A skipped call does not queue; re-trigger after the in-flight attempt
    /// settles if fresher state is needed.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        match self
            .store
            .begin_attempt(Instant::now(), self.config.min_interval())
        {
            Ok(attempt) => self.run(attempt).await,
            Err(reason) => {
                tracing::debug!("[Reconciler] Skipped: {:?}", reason);
                ReconcileOutcome::Skipped(reason)
            }
        }
    }

    /// Reconciles after an explicit user action such as signing in.
    ///
    /// Waits (bounded by the watchdog) for any in-flight attempt to settle,
    /// then runs a fresh one regardless of the debounce window. An attempt
    /// that started before the action could not have observed it.
    pub async fn refresh(&self) -> ReconcileOutcome {
        let deadline = Instant::now() + self.config.watchdog(self.platform);
        let mut changes = self.store.subscribe();

        loop {
            match self
                .store
                .begin_attempt(Instant::now(), std::time::Duration::ZERO)
            {
                Ok(attempt) => return self.run(attempt).await,
                Err(reason) => {
                    let settled = tokio::time::timeout_at(
                        deadline,
                        changes.wait_for(|session| !session.is_loading()),
                    )
                    .await
                    .is_ok_and(|waited| waited.is_ok());

                    if !settled {
                        tracing::warn!(
                            "[Reconciler] Refresh gave up waiting for in-flight attempt"
                        );
                        return ReconcileOutcome::Skipped(reason);
                    }
                }
            }
        }
    }

    /// Clears the session immediately and invalidates any attempt in flight.
    pub fn clear(&self) {
        self.store.invalidate_and_clear();
        tracing::info!("[Reconciler] Session cleared");
    }

    /// Records a failure that happened outside an attempt, such as rejected
    /// credentials. Identity and profile are left as they are.
    pub fn record_error(&self, message: impl Into<String>) {
        self.store.set_error(Some(message.into()));
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    /// Forces the loading flag off, superseding a stuck attempt.
    pub fn release_loading(&self) {
        if self.store.release_loading() {
            tracing::warn!("[Reconciler] Loading forcibly released, in-flight attempt superseded");
        }
    }

    async fn run(&self, attempt: AttemptId) -> ReconcileOutcome {
        let _guard = AttemptGuard {
            store: &self.store,
            attempt,
        };
        let watchdog = self.config.watchdog(self.platform);
        tracing::debug!(
            "[Reconciler] Attempt {} started (watchdog {:?}, platform {:?})",
            attempt.get(),
            watchdog,
            self.platform
        );

        match timeout(watchdog, self.resolve(attempt)).await {
            Ok(Some(commit)) => self.settle(attempt, commit),
            Ok(None) => {
                tracing::debug!(
                    "[Reconciler] Attempt {} superseded before settling",
                    attempt.get()
                );
                ReconcileOutcome::Superseded
            }
            Err(_) => {
                if self.store.abandon(attempt) {
                    tracing::warn!(
                        "[Reconciler] Attempt {} hit watchdog after {:?}, keeping previous session",
                        attempt.get(),
                        watchdog
                    );
                    ReconcileOutcome::TimedOut
                } else {
                    ReconcileOutcome::Superseded
                }
            }
        }
    }

    /// Drives the retry state machine to a terminal commit, or `None` if the
    /// attempt lost ownership while backing off.
    async fn resolve(&self, attempt: AttemptId) -> Option<Commit> {
        let mut phase = Phase::Checking;
        loop {
            phase = match phase {
                Phase::Checking => self.check(0).await,
                Phase::Retrying(retry) => {
                    sleep(self.config.retry_backoff()).await;
                    if self.store.is_current(attempt) {
                        self.check(retry).await
                    } else {
                        Phase::Abandoned
                    }
                }
                Phase::Settled(commit) => return Some(commit),
                Phase::Abandoned => return None,
            };
        }
    }

    async fn check(&self, retries_so_far: u32) -> Phase {
        match self.fetch().await {
            Ok(commit) => Phase::Settled(commit),
            Err(err) if err.is_transient() && retries_so_far < self.config.max_retries => {
                tracing::warn!(
                    "[Reconciler] Transient failure ({}), retry {}/{}",
                    err,
                    retries_so_far + 1,
                    self.config.max_retries
                );
                Phase::Retrying(retries_so_far + 1)
            }
            Err(err) => {
                tracing::error!("[Reconciler] Reconciliation failed: {}", err);
                Phase::Settled(Commit::Failed(err.to_string()))
            }
        }
    }

    /// One pass of identity + profile lookup.
    ///
    /// `Err` is returned only for failures that may be retried or that
    /// should surface as `last_error`; definitive answers become commits.
    async fn fetch(&self) -> Result<Commit> {
        let identity = match self
            .bounded("get_current_user", self.identity.current_user())
            .await
        {
            Ok(Some(identity)) => identity,
            Ok(None) => return Ok(Commit::SignedOut),
            Err(err) if err.is_transient() => return Err(err),
            Err(err) => {
                tracing::debug!("[Reconciler] Provider reported no valid session: {}", err);
                return Ok(Commit::SignedOut);
            }
        };

        let found = match self
            .bounded("get_profile", self.profiles.find_by_id(&identity.id))
            .await
        {
            Ok(found) => found,
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let profile = match (found, self.config.profile_provisioning) {
            (Some(profile), _) => profile,
            (None, ProfileProvisioning::Disabled) => {
                tracing::error!(
                    "[Reconciler] No profile record for identity {}",
                    identity.id
                );
                return Ok(Commit::Failed(PROFILE_NOT_FOUND.to_string()));
            }
            (None, ProfileProvisioning::CreateDefault) => {
                let draft = NewProfile::for_identity(&identity, self.config.default_role);
                tracing::info!(
                    "[Reconciler] Creating default {} profile for identity {}",
                    draft.role,
                    identity.id
                );
                match self
                    .bounded("create_profile", self.profiles.create(&draft))
                    .await
                {
                    Ok(profile) => profile,
                    Err(err) if err.is_transient() => return Err(err),
                    Err(err) => {
                        return Ok(Commit::Failed(format!(
                            "profile could not be created: {}",
                            err
                        )));
                    }
                }
            }
        };

        Ok(Commit::Authenticated { identity, profile })
    }

    fn settle(&self, attempt: AttemptId, commit: Commit) -> ReconcileOutcome {
        let outcome = match &commit {
            Commit::Authenticated { .. } => ReconcileOutcome::Authenticated,
            Commit::SignedOut => ReconcileOutcome::SignedOut,
            Commit::Failed(message) => ReconcileOutcome::Failed(message.clone()),
        };

        if self.store.commit(attempt, commit) {
            tracing::info!(
                "[Reconciler] Attempt {} settled: {:?}",
                attempt.get(),
                outcome
            );
            outcome
        } else {
            tracing::debug!(
                "[Reconciler] Attempt {} result discarded, no longer current",
                attempt.get()
            );
            ReconcileOutcome::Superseded
        }
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.config.request_timeout();
        timeout(limit, call)
            .await
            .map_err(|_| CaretakerError::timeout(operation, limit))?
    }
}

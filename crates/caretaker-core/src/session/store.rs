//! Session store with attempt-scoped commits.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::model::Session;
use crate::user::{Identity, Profile};

/// Number identifying one reconciliation attempt.
///
/// Commits carrying a stale id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Why an attempt was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another attempt is still loading.
    InFlight,
    /// The previous attempt started less than the minimum interval ago.
    Debounced,
}

/// Terminal result of an attempt, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Authenticated { identity: Identity, profile: Profile },
    SignedOut,
    Failed(String),
}

/// Owner of the client [`Session`].
///
/// Every mutation is synchronous and applied under the channel's lock, and
/// every observable change is published to [`subscribe`](Self::subscribe)
/// receivers.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<Session>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::default());
        Self { state }
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn has_identity(&self) -> bool {
        self.state.borrow().identity.is_some()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    // ============================================================================
    // Plain setters
    // ============================================================================

    pub fn set_identity(&self, identity: Option<Identity>) {
        self.state.send_if_modified(|session| {
            let changed = session.identity != identity;
            session.identity = identity;
            changed
        });
    }

    /// Sets the profile; a present profile also clears `last_error`.
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.state.send_if_modified(|session| {
            let before = (session.profile.clone(), session.last_error.clone());
            if profile.is_some() {
                session.last_error = None;
            }
            session.profile = profile;
            before != (session.profile.clone(), session.last_error.clone())
        });
    }

    pub fn set_error(&self, message: Option<String>) {
        self.state.send_if_modified(|session| {
            let changed = session.last_error != message;
            session.last_error = message;
            changed
        });
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// Wipes identity, profile and error.
    pub fn clear(&self) {
        self.state.send_if_modified(|session| {
            let changed = session.identity.is_some()
                || session.profile.is_some()
                || session.last_error.is_some();
            session.wipe();
            changed
        });
    }

    // ============================================================================
    // Attempt lifecycle
    // ============================================================================

    /// Starts a new attempt unless one is in flight or the last one started
    /// less than `min_interval` before `now`.
    ///
    /// On success the session is marked loading, the start time recorded and
    /// `last_error` cleared, all in one step.
    pub fn begin_attempt(
        &self,
        now: Instant,
        min_interval: Duration,
    ) -> Result<AttemptId, SkipReason> {
        let mut outcome = Err(SkipReason::InFlight);
        self.state.send_if_modified(|session| {
            if session.is_loading {
                outcome = Err(SkipReason::InFlight);
                return false;
            }
            if let Some(last) = session.last_reconcile_at
                && now.saturating_duration_since(last) < min_interval
            {
                outcome = Err(SkipReason::Debounced);
                return false;
            }

            session.attempt += 1;
            session.is_loading = true;
            session.last_reconcile_at = Some(now);
            session.last_error = None;
            outcome = Ok(AttemptId(session.attempt));
            true
        });
        outcome
    }

    /// Whether `attempt` still owns the session.
    pub fn is_current(&self, attempt: AttemptId) -> bool {
        let session = self.state.borrow();
        session.is_loading && session.attempt == attempt.0
    }

    /// Applies `commit` and releases loading, if `attempt` is still current.
    ///
    /// Returns `false` when the attempt was superseded; the session is then
    /// left untouched.
    pub fn commit(&self, attempt: AttemptId, commit: Commit) -> bool {
        self.state.send_if_modified(|session| {
            if !session.is_loading || session.attempt != attempt.0 {
                return false;
            }

            match commit {
                Commit::Authenticated { identity, profile } => {
                    session.identity = Some(identity);
                    session.profile = Some(profile);
                    session.last_error = None;
                }
                Commit::SignedOut => session.wipe(),
                Commit::Failed(message) => {
                    session.wipe();
                    session.last_error = Some(message);
                }
            }
            session.is_loading = false;
            true
        })
    }

    /// Releases loading without touching identity or profile, if `attempt`
    /// is still current.
    pub fn abandon(&self, attempt: AttemptId) -> bool {
        self.state.send_if_modified(|session| {
            if !session.is_loading || session.attempt != attempt.0 {
                return false;
            }
            session.is_loading = false;
            true
        })
    }

    /// Forces loading off and invalidates whichever attempt was in flight.
    ///
    /// Returns `true` if an attempt was running.
    pub fn release_loading(&self) -> bool {
        self.state.send_if_modified(|session| {
            if !session.is_loading {
                return false;
            }
            session.attempt += 1;
            session.is_loading = false;
            true
        })
    }

    /// Clears the session and invalidates any attempt in flight, so a late
    /// commit cannot resurrect it.
    pub fn invalidate_and_clear(&self) {
        self.state.send_modify(|session| {
            session.attempt += 1;
            session.is_loading = false;
            session.wipe();
        });
    }
}

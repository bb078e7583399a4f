use serde::Serialize;
use tokio::time::Instant;

use crate::user::{Identity, Profile, Role};

/// Believed authentication state of this client.
///
/// `is_authenticated()` holds iff both `identity` and `profile` are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub(crate) identity: Option<Identity>,
    pub(crate) profile: Option<Profile>,
    pub(crate) is_loading: bool,
    pub(crate) last_error: Option<String>,
    #[serde(skip)]
    pub(crate) last_reconcile_at: Option<Instant>,
    /// Number of the most recent reconciliation attempt (or invalidation).
    pub(crate) attempt: u64,
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_reconcile_at(&self) -> Option<Instant> {
        self.last_reconcile_at
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.profile.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.authenticated_profile().map(|profile| profile.role)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.authenticated_profile()
            .map(|profile| profile.display_name.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.identity.as_ref().map(|identity| identity.id.as_str())
        } else {
            None
        }
    }

    fn authenticated_profile(&self) -> Option<&Profile> {
        if self.is_authenticated() {
            self.profile.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn wipe(&mut self) {
        self.identity = None;
        self.profile = None;
        self.last_error = None;
    }
}

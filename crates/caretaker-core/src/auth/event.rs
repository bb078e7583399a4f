use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config::EventPolicyConfig;
use crate::error::{CaretakerError, Result};

/// Session-change notifications emitted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
    InitialSession,
}

/// Page-lifecycle signals from the hosting shell. No payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleSignal {
    VisibleAgain,
    RestoredFromCache,
    FocusGained,
}

/// What the listener does with an incoming auth event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventAction {
    Reconcile,
    Clear,
    #[default]
    Ignore,
}

/// Fixed mapping from every [`AuthEventKind`] to an [`EventAction`].
///
/// `SignedIn` always reconciles and `SignedOut` always clears; only the
/// remaining kinds are configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPolicy {
    user_updated: EventAction,
    token_refreshed: EventAction,
    initial_session: EventAction,
}

impl Default for EventPolicy {
    fn default() -> Self {
        Self::from_config(&EventPolicyConfig::default())
    }
}

impl EventPolicy {
    pub fn from_config(config: &EventPolicyConfig) -> Self {
        Self {
            user_updated: config.user_updated,
            token_refreshed: config.token_refreshed,
            initial_session: config.initial_session,
        }
    }

    pub fn action_for(&self, kind: AuthEventKind) -> EventAction {
        match kind {
            AuthEventKind::SignedIn => EventAction::Reconcile,
            AuthEventKind::SignedOut => EventAction::Clear,
            AuthEventKind::UserUpdated => self.user_updated,
            AuthEventKind::TokenRefreshed => self.token_refreshed,
            AuthEventKind::InitialSession => self.initial_session,
        }
    }

    /// Kinds that currently map to [`EventAction::Reconcile`].
    pub fn reconciling_kinds(&self) -> Vec<AuthEventKind> {
        AuthEventKind::iter()
            .filter(|kind| self.action_for(*kind) == EventAction::Reconcile)
            .collect()
    }

    /// Rejects a policy under which reading the provider could trigger
    /// another read.
    ///
    /// `side_effects` are the kinds the provider may emit while the
    /// reconciler is fetching identity or profile. `SignedIn` is exempt: it
    /// is only emitted by an explicit sign-in, and the debounce window
    /// absorbs the echo.
    pub fn validate(&self, side_effects: &[AuthEventKind]) -> Result<()> {
        let looping: Vec<String> = side_effects
            .iter()
            .filter(|kind| **kind != AuthEventKind::SignedIn)
            .filter(|kind| self.action_for(**kind) == EventAction::Reconcile)
            .map(|kind| kind.to_string())
            .collect();

        if looping.is_empty() {
            Ok(())
        } else {
            Err(CaretakerError::config(format!(
                "event policy would reconcile on provider side effects: {}",
                looping.join(", ")
            )))
        }
    }
}

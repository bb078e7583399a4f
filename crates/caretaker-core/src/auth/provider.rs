//! Identity provider and lifecycle source ports.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::event::{AuthEventKind, LifecycleSignal};
use crate::error::Result;
use crate::user::Identity;

/// Remote identity/session provider.
///
/// Implementations wrap the hosted authentication service. The client core
/// never talks to it except through this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the principal of the active session.
    ///
    /// `Ok(None)` is a definitive "no session". Transport failures must be
    /// reported as transient errors so the caller can retry them.
    async fn current_user(&self) -> Result<Option<Identity>>;

    /// Starts a session with email/password credentials.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity>;

    /// Ends the remote session.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribes to session-change notifications.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEventKind>;

    /// Event kinds this provider may emit as a side effect of
    /// [`current_user`](Self::current_user), e.g. a token refresh.
    fn side_effect_events(&self) -> Vec<AuthEventKind> {
        Vec::new()
    }
}

/// Source of page-lifecycle signals (visibility, cache restore, focus).
pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<LifecycleSignal>;
}

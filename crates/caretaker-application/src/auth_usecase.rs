//! Auth use case.
//!
//! `AuthUseCase` wires the session store, reconciler, event listener and
//! navigation gate together over one identity provider and profile
//! repository, and exposes the operations the application shell calls.

use std::sync::Arc;

use caretaker_core::auth::{EventPolicy, IdentityProvider, LifecycleSource, Platform};
use caretaker_core::config::RootConfig;
use caretaker_core::error::Result;
use caretaker_core::session::{Session, SessionStore};
use caretaker_core::user::ProfileRepository;
use tokio::sync::watch;

use crate::auth::{AuthEventListener, ListenerHandle, ReconcileOutcome, Reconciler};
use crate::navigation_gate::NavigationGate;

/// Facade over the auth-state machinery.
///
/// # Lifecycle
///
/// 1. [`initialize`](Self::initialize) subscribes the listener and runs the
///    first reconciliation. Keep the returned handle for as long as events
///    should be processed.
/// 2. Route changes go through [`gate`](Self::gate).
/// 3. [`sign_in`](Self::sign_in) and [`sign_out`](Self::sign_out) drive the
///    provider and bring the local session in line.
pub struct AuthUseCase {
    identity: Arc<dyn IdentityProvider>,
    lifecycle: Option<Arc<dyn LifecycleSource>>,
    reconciler: Arc<Reconciler>,
    listener: Arc<AuthEventListener>,
    gate: NavigationGate,
}

impl AuthUseCase {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        lifecycle: Option<Arc<dyn LifecycleSource>>,
        config: &RootConfig,
        platform: Platform,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let reconciler = Arc::new(Reconciler::new(
            store,
            identity.clone(),
            profiles,
            config.auth.clone(),
            platform,
        ));
        let listener = Arc::new(AuthEventListener::new(
            reconciler.clone(),
            EventPolicy::from_config(&config.auth.events),
        ));
        let gate = NavigationGate::new(reconciler.clone(), config.navigation.clone());

        Self {
            identity,
            lifecycle,
            reconciler,
            listener,
            gate,
        }
    }

    /// Starts the event listener and performs the initial reconciliation.
    pub async fn initialize(&self) -> Result<ListenerHandle> {
        let handle = self
            .listener
            .start(self.identity.as_ref(), self.lifecycle.as_deref())?;

        let outcome = self.reconciler.reconcile().await;
        tracing::info!("[AuthUseCase] Initial reconcile: {:?}", outcome);
        Ok(handle)
    }

    pub async fn reconcile(&self) -> ReconcileOutcome {
        self.reconciler.reconcile().await
    }

    pub fn clear(&self) {
        self.reconciler.clear();
    }

    pub fn clear_error(&self) {
        self.reconciler.clear_error();
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.reconciler.store().subscribe()
    }

    pub fn session(&self) -> Session {
        self.reconciler.store().snapshot()
    }

    pub fn gate(&self) -> &NavigationGate {
        &self.gate
    }

    pub fn platform(&self) -> Platform {
        self.reconciler.platform()
    }

    /// Signs in with email and password, then brings the session in line.
    ///
    /// Rejected credentials are recorded as `last_error` and returned. The
    /// follow-up reconciliation bypasses the debounce window, so it always
    /// reflects the new identity.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        if let Err(err) = self.identity.sign_in_with_password(email, password).await {
            tracing::warn!("[AuthUseCase] Sign-in failed for {}: {}", email, err);
            self.reconciler.record_error(err.to_string());
            return Err(err);
        }

        let outcome = self.reconciler.refresh().await;
        tracing::info!("[AuthUseCase] Signed in as {}: {:?}", email, outcome);
        Ok(self.session())
    }

    /// Signs out remotely and clears the local session.
    ///
    /// The local session is cleared even if the provider call fails; the
    /// provider error is still returned.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.identity.sign_out().await;
        if let Err(err) = &result {
            tracing::warn!("[AuthUseCase] Remote sign-out failed: {}", err);
        }
        self.reconciler.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{
        MockIdentityProvider, MockProfileRepository, TestLifecycle, profile_for,
        test_auth_config,
    };
    use caretaker_core::CaretakerError;
    use caretaker_core::auth::{AuthEventKind, LifecycleSignal};
    use caretaker_core::config::ProfileProvisioning;
    use caretaker_core::navigation::{NavigationDecision, RouteMeta, RouteRequest};
    use caretaker_core::user::{Identity, Role};
    use std::time::Duration;

    fn root_config() -> RootConfig {
        RootConfig {
            auth: test_auth_config(),
            ..RootConfig::default()
        }
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_reconciles_once() {
        let identity = Arc::new(MockIdentityProvider::signed_in(Identity::new("u1")));
        let profiles = Arc::new(MockProfileRepository::with_profile(profile_for(
            "u1",
            Role::Supervisor,
            "Ana",
        )));
        let usecase = AuthUseCase::new(
            identity.clone(),
            profiles,
            None,
            &root_config(),
            Platform::Desktop,
        );

        let handle = usecase.initialize().await.unwrap();
        assert!(handle.is_active());
        assert!(usecase.session().is_authenticated());
        assert_eq!(usecase.session().role(), Some(Role::Supervisor));
        assert_eq!(identity.current_user_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_refreshes_inside_debounce_window() {
        let identity = Arc::new(MockIdentityProvider::signed_out());
        let profiles = Arc::new(MockProfileRepository::with_profile(profile_for(
            "id-ana@example.com",
            Role::Chief,
            "Ana",
        )));
        let usecase = AuthUseCase::new(
            identity.clone(),
            profiles,
            None,
            &root_config(),
            Platform::Desktop,
        );
        let _handle = usecase.initialize().await.unwrap();
        assert!(!usecase.session().is_authenticated());

        // Well inside the 2s debounce window of the initial reconcile.
        tokio::time::advance(Duration::from_millis(300)).await;
        let session = usecase
            .sign_in("ana@example.com", "correct-horse")
            .await
            .unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("id-ana@example.com"));

        // The provider's signed-in event is absorbed by the guard.
        settle().await;
        assert_eq!(identity.current_user_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_credentials_set_error() {
        let identity = Arc::new(MockIdentityProvider::signed_out());
        let usecase = AuthUseCase::new(
            identity.clone(),
            Arc::new(MockProfileRepository::empty()),
            None,
            &root_config(),
            Platform::Desktop,
        );

        let err = usecase.sign_in("ana@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, CaretakerError::Unauthorized(_)));
        assert!(usecase.session().last_error().is_some());
        assert_eq!(identity.current_user_calls(), 0);

        usecase.clear_error();
        assert_eq!(usecase.session().last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_rejected_sign_in() {
        let usecase = AuthUseCase::new(
            Arc::new(MockIdentityProvider::signed_out()),
            Arc::new(MockProfileRepository::empty()),
            None,
            &root_config(),
            Platform::Desktop,
        );
        let mut changes = usecase.subscribe();
        assert_eq!(changes.borrow_and_update().last_error(), None);

        assert!(usecase.sign_in("ana@example.com", "wrong").await.is_err());
        assert!(changes.has_changed().unwrap());
        let session = changes.borrow_and_update().clone();
        assert!(session.last_error().is_some());
        assert!(!session.is_loading());
        assert!(session.identity().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_provisions_profile_when_enabled() {
        let identity = Arc::new(MockIdentityProvider::signed_out());
        let profiles = Arc::new(MockProfileRepository::empty());
        let mut config = root_config();
        config.auth.profile_provisioning = ProfileProvisioning::CreateDefault;
        let usecase = AuthUseCase::new(
            identity,
            profiles.clone(),
            None,
            &config,
            Platform::Desktop,
        );

        let session = usecase
            .sign_in("new@example.com", "correct-horse")
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Supervisor));
        assert_eq!(session.display_name(), Some("new@example.com"));
        assert_eq!(profiles.create_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_session() {
        let identity = Arc::new(MockIdentityProvider::signed_in(Identity::new("u1")));
        let profiles = Arc::new(MockProfileRepository::with_profile(profile_for(
            "u1",
            Role::Chief,
            "Ana",
        )));
        let usecase = AuthUseCase::new(
            identity.clone(),
            profiles,
            None,
            &root_config(),
            Platform::Desktop,
        );
        let _handle = usecase.initialize().await.unwrap();
        assert!(usecase.session().is_authenticated());

        usecase.sign_out().await.unwrap();
        assert!(!usecase.session().is_authenticated());
        assert!(usecase.session().identity().is_none());
        assert_eq!(identity.sign_out_calls(), 1);

        // The signed-out event arrives afterwards and is a no-op.
        settle().await;
        assert_eq!(identity.current_user_calls(), 1);
        assert!(!usecase.session().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_redirects_after_sign_out() {
        let identity = Arc::new(MockIdentityProvider::signed_in(Identity::new("u1")));
        let profiles = Arc::new(MockProfileRepository::with_profile(profile_for(
            "u1",
            Role::Chief,
            "Ana",
        )));
        let usecase = AuthUseCase::new(
            identity.clone(),
            profiles,
            None,
            &root_config(),
            Platform::Desktop,
        );
        let _handle = usecase.initialize().await.unwrap();

        let tasks = RouteRequest::new("/tasks", RouteMeta::protected());
        assert_eq!(usecase.gate().guard(&tasks).await, NavigationDecision::Allow);

        identity.emit(AuthEventKind::SignedOut);
        identity.set_identity(None);
        settle().await;
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(
            usecase.gate().guard(&tasks).await,
            NavigationDecision::Redirect {
                to: "/login".to_string(),
                return_to: Some("/tasks".to_string()),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_source_is_wired() {
        let identity = Arc::new(MockIdentityProvider::signed_in(Identity::new("u1")));
        let profiles = Arc::new(MockProfileRepository::with_profile(profile_for(
            "u1",
            Role::Chief,
            "Ana",
        )));
        let lifecycle = Arc::new(TestLifecycle::new());
        let usecase = AuthUseCase::new(
            identity.clone(),
            profiles,
            Some(lifecycle.clone()),
            &root_config(),
            Platform::Mobile,
        );
        let _handle = usecase.initialize().await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        lifecycle.emit(LifecycleSignal::RestoredFromCache);
        settle().await;

        assert_eq!(identity.current_user_calls(), 2);
        assert!(usecase.session().is_authenticated());
    }
}

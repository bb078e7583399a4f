//! Hand-written doubles for the identity provider, profile repository and
//! lifecycle source.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use caretaker_core::auth::{AuthEventKind, IdentityProvider, LifecycleSignal, LifecycleSource};
use caretaker_core::config::AuthConfig;
use caretaker_core::error::{CaretakerError, Result};
use caretaker_core::user::{Identity, NewProfile, Profile, ProfileRepository, Role};
use chrono::Utc;
use tokio::sync::broadcast;

pub(crate) fn test_auth_config() -> AuthConfig {
    AuthConfig {
        min_interval_ms: 2000,
        watchdog_desktop_ms: 5000,
        watchdog_mobile_ms: 3000,
        request_timeout_ms: 1500,
        max_retries: 2,
        retry_backoff_ms: 500,
        ..AuthConfig::default()
    }
}

pub(crate) fn profile_for(id: &str, role: Role, display_name: &str) -> Profile {
    Profile {
        id: id.to_string(),
        role,
        display_name: display_name.to_string(),
        profile_picture_url: None,
        phone: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Identity provider
// ============================================================================

pub(crate) struct MockIdentityProvider {
    identity: Mutex<Option<Identity>>,
    delay: Mutex<Duration>,
    failures: Mutex<(u32, Option<CaretakerError>)>,
    emit_on_read: Mutex<Option<AuthEventKind>>,
    side_effects: Vec<AuthEventKind>,
    calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    events: broadcast::Sender<AuthEventKind>,
}

impl MockIdentityProvider {
    fn build(identity: Option<Identity>, side_effects: Vec<AuthEventKind>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            identity: Mutex::new(identity),
            delay: Mutex::new(Duration::ZERO),
            failures: Mutex::new((0, None)),
            emit_on_read: Mutex::new(None),
            side_effects,
            calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub(crate) fn signed_in(identity: Identity) -> Self {
        Self::build(Some(identity), Vec::new())
    }

    pub(crate) fn signed_out() -> Self {
        Self::build(None, Vec::new())
    }

    /// A provider that refreshes its token (and says so) on every read.
    pub(crate) fn refreshing_on_read(identity: Identity) -> Self {
        let provider = Self::build(Some(identity), vec![AuthEventKind::TokenRefreshed]);
        *provider.emit_on_read.lock().unwrap() = Some(AuthEventKind::TokenRefreshed);
        provider
    }

    pub(crate) fn set_identity(&self, identity: Option<Identity>) {
        *self.identity.lock().unwrap() = identity;
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Makes the next `count` reads fail with `error`.
    pub(crate) fn fail_next(&self, count: u32, error: CaretakerError) {
        *self.failures.lock().unwrap() = (count, Some(error));
    }

    pub(crate) fn emit(&self, kind: AuthEventKind) {
        let _ = self.events.send(kind);
    }

    pub(crate) fn current_user_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn current_user(&self) -> Result<Option<Identity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(kind) = *self.emit_on_read.lock().unwrap() {
            let _ = self.events.send(kind);
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if failures.0 > 0 {
                failures.0 -= 1;
                if let Some(err) = failures.1.clone() {
                    return Err(err);
                }
            }
        }

        Ok(self.identity.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity> {
        if password != "correct-horse" {
            return Err(CaretakerError::Unauthorized(
                "Invalid login credentials".to_string(),
            ));
        }
        let identity = Identity::new(format!("id-{}", email)).with_email(email);
        self.set_identity(Some(identity.clone()));
        let _ = self.events.send(AuthEventKind::SignedIn);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.set_identity(None);
        let _ = self.events.send(AuthEventKind::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEventKind> {
        self.events.subscribe()
    }

    fn side_effect_events(&self) -> Vec<AuthEventKind> {
        self.side_effects.clone()
    }
}

// ============================================================================
// Profile repository
// ============================================================================

pub(crate) struct MockProfileRepository {
    profiles: Mutex<HashMap<String, Profile>>,
    find_error: Mutex<Option<CaretakerError>>,
    create_error: Mutex<Option<CaretakerError>>,
    find_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MockProfileRepository {
    pub(crate) fn empty() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            find_error: Mutex::new(None),
            create_error: Mutex::new(None),
            find_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_profile(profile: Profile) -> Self {
        let repository = Self::empty();
        repository.insert(profile);
        repository
    }

    pub(crate) fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub(crate) fn fail_find_with(&self, error: CaretakerError) {
        *self.find_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn fail_create_with(&self, error: CaretakerError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.find_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.profiles.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, draft: &NewProfile) -> Result<Profile> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.create_error.lock().unwrap().clone() {
            return Err(err);
        }
        let profile = Profile {
            id: draft.id.clone(),
            role: draft.role,
            display_name: draft.display_name.clone(),
            profile_picture_url: None,
            phone: None,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        };
        self.insert(profile.clone());
        Ok(profile)
    }
}

// ============================================================================
// Lifecycle source
// ============================================================================

pub(crate) struct TestLifecycle {
    signals: broadcast::Sender<LifecycleSignal>,
}

impl TestLifecycle {
    pub(crate) fn new() -> Self {
        let (signals, _) = broadcast::channel(16);
        Self { signals }
    }

    pub(crate) fn emit(&self, signal: LifecycleSignal) {
        let _ = self.signals.send(signal);
    }
}

impl LifecycleSource for TestLifecycle {
    fn subscribe(&self) -> broadcast::Receiver<LifecycleSignal> {
        self.signals.subscribe()
    }
}

pub mod check_route;
pub mod sign_in;
pub mod status;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use caretaker_application::AuthUseCase;
use caretaker_core::auth::Platform;
use caretaker_core::session::Session;
use caretaker_infrastructure::{ConfigService, LifecycleHub, RestBackend};
use serde_json::json;

/// Seeds the backend with an existing session token.
const ENV_ACCESS_TOKEN: &str = "CARETAKER_ACCESS_TOKEN";

/// Everything a command needs, built once from config.
pub struct Context {
    pub auth: AuthUseCase,
    pub lifecycle: Arc<LifecycleHub>,
}

impl Context {
    pub fn build(config_path: Option<&Path>, user_agent: Option<&str>) -> Result<Self> {
        let config_service = ConfigService::for_path(config_path)?;
        let config = config_service
            .get_config()
            .with_context(|| format!("Failed to load {}", config_service.path().display()))?;

        let mut backend = RestBackend::new(&config.backend)?;
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN)
            && !token.trim().is_empty()
        {
            backend = backend.with_access_token(token.trim());
        }
        let backend = Arc::new(backend);

        let platform = user_agent
            .map(Platform::from_user_agent)
            .unwrap_or(Platform::Desktop);
        let lifecycle = Arc::new(LifecycleHub::new());

        let auth = AuthUseCase::new(
            backend.clone(),
            backend,
            Some(lifecycle.clone()),
            &config,
            platform,
        );
        tracing::debug!("[caretaker] Platform: {:?}", platform);

        Ok(Self { auth, lifecycle })
    }
}

/// JSON view of a session, derived fields included.
pub fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "is_authenticated": session.is_authenticated(),
        "is_loading": session.is_loading(),
        "user_id": session.user_id(),
        "role": session.role().map(|role| role.to_string()),
        "display_name": session.display_name(),
        "email": session.identity().and_then(|identity| identity.email.clone()),
        "last_error": session.last_error(),
        "attempt": session.attempt(),
    })
}

pub fn print_session(session: &Session) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&session_json(session))?);
    Ok(())
}

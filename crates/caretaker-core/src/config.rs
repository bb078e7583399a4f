//! Configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so a missing file or section is never an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{EventAction, Platform};
use crate::error::{CaretakerError, Result};
use crate::user::Role;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RootConfig {
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub navigation: NavigationConfig,
}

impl RootConfig {
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.navigation.validate()
    }
}

/// Connection settings for the hosted backend.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub publishable_key: Option<String>,
    /// Table holding one profile row per identity.
    pub profile_table: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            publishable_key: None,
            profile_table: "users".to_string(),
        }
    }
}

impl BackendConfig {
    /// Returns `(url, publishable_key)` or a config error if either is unset.
    pub fn require(&self) -> Result<(&str, &str)> {
        match (self.url.as_deref(), self.publishable_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Ok((url, key)),
            _ => Err(CaretakerError::config(
                "missing backend url or publishable key",
            )),
        }
    }
}

/// What to do when an identity has no profile record.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileProvisioning {
    /// A server-side trigger guarantees the profile; a missing one is an error.
    #[default]
    Disabled,
    /// Insert a default profile once, then treat failure as terminal.
    CreateDefault,
}

/// Configurable actions for the auth event kinds that are not fixed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EventPolicyConfig {
    pub user_updated: EventAction,
    pub token_refreshed: EventAction,
    pub initial_session: EventAction,
}

/// Timing and retry settings for auth reconciliation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum spacing between two reconciliation attempts.
    pub min_interval_ms: u64,
    pub watchdog_desktop_ms: u64,
    pub watchdog_mobile_ms: u64,
    /// Bound on each individual remote call.
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub profile_provisioning: ProfileProvisioning,
    pub default_role: Role,
    pub events: EventPolicyConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
            watchdog_desktop_ms: 5000,
            watchdog_mobile_ms: 3000,
            request_timeout_ms: 1000,
            max_retries: 2,
            retry_backoff_ms: 500,
            profile_provisioning: ProfileProvisioning::Disabled,
            default_role: Role::Supervisor,
            events: EventPolicyConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn watchdog(&self, platform: Platform) -> Duration {
        match platform {
            Platform::Desktop => Duration::from_millis(self.watchdog_desktop_ms),
            Platform::Mobile => Duration::from_millis(self.watchdog_mobile_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Time one attempt needs to exhaust its retries when each pass hangs on
    /// a single call until the request timeout.
    pub fn retry_budget(&self) -> Duration {
        let retries = self.max_retries;
        self.request_timeout() * (retries + 1) + self.retry_backoff() * retries
    }

    /// Platforms whose watchdog fires before the retry budget is spent. On
    /// these, a hanging network ends as a timeout that keeps the previous
    /// session instead of a terminal failure.
    pub fn watchdog_shortfalls(&self) -> Vec<Platform> {
        [Platform::Desktop, Platform::Mobile]
            .into_iter()
            .filter(|platform| self.retry_budget() > self.watchdog(*platform))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.watchdog_desktop_ms == 0 || self.watchdog_mobile_ms == 0 {
            return Err(CaretakerError::config("auth watchdog must be greater than zero"));
        }
        if self.request_timeout_ms == 0 {
            return Err(CaretakerError::config(
                "auth request timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Settings for the navigation gate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub poll_interval_ms: u64,
    pub max_wait_desktop_ms: u64,
    pub max_wait_mobile_ms: u64,
    pub sign_in_route: String,
    pub home_route: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_wait_desktop_ms: 3000,
            max_wait_mobile_ms: 2000,
            sign_in_route: "/login".to_string(),
            home_route: "/".to_string(),
        }
    }
}

impl NavigationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self, platform: Platform) -> Duration {
        match platform {
            Platform::Desktop => Duration::from_millis(self.max_wait_desktop_ms),
            Platform::Mobile => Duration::from_millis(self.max_wait_mobile_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(CaretakerError::config(
                "navigation poll interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
            [auth]
            min_interval_ms = 500
            profile_provisioning = "create_default"

            [auth.events]
            user_updated = "reconcile"
        "#;
        let config: RootConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.auth.min_interval(), Duration::from_millis(500));
        assert_eq!(config.auth.watchdog(Platform::Desktop), Duration::from_secs(5));
        assert_eq!(config.auth.watchdog(Platform::Mobile), Duration::from_secs(3));
        assert_eq!(
            config.auth.profile_provisioning,
            ProfileProvisioning::CreateDefault
        );
        assert_eq!(config.auth.events.user_updated, EventAction::Reconcile);
        assert_eq!(config.auth.events.token_refreshed, EventAction::Ignore);
        assert_eq!(config.navigation.sign_in_route, "/login");
        assert_eq!(config.backend.profile_table, "users");
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config, RootConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let mut config = RootConfig::default();
        config.auth.watchdog_mobile_ms = 0;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = RootConfig::default();
        config.navigation.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_budget_against_watchdogs() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.retry_budget(), Duration::from_millis(1000 * 3 + 500 * 2));
        // Mobile gives up on a hanging network before the retries run out.
        assert_eq!(auth.watchdog_shortfalls(), vec![Platform::Mobile]);

        auth.request_timeout_ms = 1500;
        auth.retry_backoff_ms = 750;
        assert_eq!(auth.retry_budget(), Duration::from_millis(6000));
        assert_eq!(
            auth.watchdog_shortfalls(),
            vec![Platform::Desktop, Platform::Mobile]
        );

        auth.max_retries = 0;
        assert_eq!(auth.retry_budget(), auth.request_timeout());
        assert!(auth.watchdog_shortfalls().is_empty());
    }

    #[test]
    fn test_backend_require() {
        let mut backend = BackendConfig::default();
        assert!(backend.require().is_err());

        backend.url = Some("https://example.test".to_string());
        backend.publishable_key = Some(String::new());
        assert!(backend.require().is_err());

        backend.publishable_key = Some("pk".to_string());
        assert_eq!(backend.require().unwrap(), ("https://example.test", "pk"));
    }
}

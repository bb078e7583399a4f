//! REST adapter for the hosted backend.
//!
//! Implements [`IdentityProvider`] against the backend's auth endpoints and
//! [`ProfileRepository`] against its row API. The access token lives in
//! memory only.

use std::time::Duration;

use async_trait::async_trait;
use caretaker_core::auth::{AuthEventKind, IdentityProvider};
use caretaker_core::config::BackendConfig;
use caretaker_core::error::{CaretakerError, Result};
use caretaker_core::user::{Identity, NewProfile, Profile, ProfileRepository};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, broadcast};

/// Upper bound for a single HTTP exchange. The reconciler applies its own,
/// shorter bound on top.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserResponse,
}

pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    profile_table: String,
    access_token: RwLock<Option<String>>,
    events: broadcast::Sender<AuthEventKind>,
}

impl RestBackend {
    /// Creates a backend client; fails if the url or key is not configured.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let (url, key) = config.require()?;
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| CaretakerError::internal(format!("HTTP client: {}", e)))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: key.to_string(),
            profile_table: config.profile_table.clone(),
            access_token: RwLock::new(None),
            events,
        })
    }

    /// Seeds the session with an existing access token.
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        Self {
            access_token: RwLock::new(Some(token.into())),
            ..self
        }
    }

    pub async fn has_access_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.profile_table)
    }

    /// Attaches the publishable key and, for row requests, a bearer token:
    /// the session token when signed in, the publishable key otherwise.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.read().await.clone();
        let bearer = token.unwrap_or_else(|| self.api_key.clone());
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    fn emit(&self, kind: AuthEventKind) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(kind);
    }
}

#[async_trait]
impl IdentityProvider for RestBackend {
    async fn current_user(&self) -> Result<Option<Identity>> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Ok(None);
        };

        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| transport_error("get current user", e))?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            tracing::debug!("[RestBackend] Access token rejected, treating as signed out");
            return Ok(None);
        }

        let user: UserResponse = read_json(response, "get current user").await?;
        Ok(Some(user.into()))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity> {
        let response = self
            .client
            .post(self.auth_url("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error("sign in", e))?;

        // The token endpoint answers bad credentials with 400.
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(CaretakerError::Unauthorized(error_message(&body)));
        }

        let token: TokenResponse = read_json(response, "sign in").await?;
        *self.access_token.write().await = Some(token.access_token);
        tracing::info!("[RestBackend] Signed in as {}", token.user.id);
        self.emit(AuthEventKind::SignedIn);
        Ok(token.user.into())
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.access_token.write().await.take();
        let result = match token {
            Some(token) => self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
                .map_err(|e| transport_error("sign out", e))
                .and_then(check_status),
            None => Ok(()),
        };
        self.emit(AuthEventKind::SignedOut);
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEventKind> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ProfileRepository for RestBackend {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let request = self
            .client
            .get(self.table_url())
            .query(&[("id", format!("eq.{}", id).as_str()), ("select", "*")]);
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| transport_error("find profile", e))?;

        let rows: Vec<Profile> = read_json(response, "find profile").await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, draft: &NewProfile) -> Result<Profile> {
        let request = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(draft);
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| transport_error("create profile", e))?;

        let rows: Vec<Profile> = read_json(response, "create profile").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CaretakerError::provider("create profile returned no row"))
    }
}

// ============================================================================
// Response handling
// ============================================================================

fn transport_error(operation: &str, err: reqwest::Error) -> CaretakerError {
    if err.is_timeout() {
        CaretakerError::timeout(operation, HTTP_TIMEOUT)
    } else if err.is_decode() {
        CaretakerError::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    } else {
        CaretakerError::network(format!("{}: {}", operation, err))
    }
}

/// Maps a non-success status. Outages, throttling and gateway timeouts are
/// reported as network errors so callers retry them.
fn status_error(status: StatusCode, body: &str) -> CaretakerError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CaretakerError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            CaretakerError::network(format!("{}: {}", status.as_u16(), message))
        }
        status if status.is_server_error() => {
            CaretakerError::network(format!("{}: {}", status.as_u16(), message))
        }
        _ => CaretakerError::provider(format!("{}: {}", status.as_u16(), message)),
    }
}

/// Pulls a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        msg: Option<String>,
        message: Option<String>,
        error_description: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.msg.or(e.message).or(e.error_description).or(e.error))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error details".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

fn check_status(response: Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response.status(), ""))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(operation, e))?;

    if !status.is_success() {
        tracing::debug!("[RestBackend] {} failed with {}: {}", operation, status, body);
        return Err(status_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

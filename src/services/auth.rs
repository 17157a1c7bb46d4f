use crate::constants::{auth as auth_constants, content_types, network};
use crate::errors::ClientError;
use crate::services::logger::Logger;
use crate::services::request::OutgoingRequest;
use crate::services::transport::map_reqwest_error;
use crate::utils::redact::redact_text;
use crate::utils::text::truncate_utf8_prefix;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[async_trait]
pub trait AuthHandler: Send + Sync {
    async fn attach(&self, request: &mut OutgoingRequest) -> Result<(), ClientError>;

    async fn refresh(&self, request: &mut OutgoingRequest) -> Result<bool, ClientError>;
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic { username: String, password: String },
    Header { name: String, value: String },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => write!(f, "Bearer([REDACTED])"),
            Credential::Basic { username, .. } => write!(f, "Basic({}, [REDACTED])", username),
            Credential::Header { name, .. } => write!(f, "Header({}, [REDACTED])", name),
        }
    }
}

impl Credential {
    fn apply(&self, request: &mut OutgoingRequest) -> Result<(), ClientError> {
        let result = match self {
            Credential::Bearer(token) => {
                request.set_header(AUTHORIZATION.as_str(), &format!("Bearer {}", token))
            }
            Credential::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                request.set_header(AUTHORIZATION.as_str(), &format!("Basic {}", encoded))
            }
            Credential::Header { name, value } => request.set_header(name, value),
        };
        result.map_err(|err| ClientError::auth(format!("Failed to attach credential: {}", err)))
    }
}

#[derive(Debug, Clone)]
pub struct StaticTokenHandler {
    credential: Credential,
}

impl StaticTokenHandler {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(Credential::Bearer(token.into()))
    }
}

#[async_trait]
impl AuthHandler for StaticTokenHandler {
    async fn attach(&self, request: &mut OutgoingRequest) -> Result<(), ClientError> {
        self.credential.apply(request)
    }

    async fn refresh(&self, _request: &mut OutgoingRequest) -> Result<bool, ClientError> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    fn as_str(self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

#[derive(Clone)]
pub struct OAuth2Config {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: GrantType,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub audience: Option<String>,
    pub token_path: String,
    pub expiry_buffer_ms: u64,
    pub extra: Vec<(String, String)>,
}

impl std::fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .field("audience", &self.audience)
            .field("token_path", &self.token_path)
            .field("expiry_buffer_ms", &self.expiry_buffer_ms)
            .finish()
    }
}

impl OAuth2Config {
    pub fn client_credentials(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant_type: GrantType::ClientCredentials,
            refresh_token: None,
            scope: None,
            audience: None,
            token_path: auth_constants::TOKEN_PATH.to_string(),
            expiry_buffer_ms: auth_constants::EXPIRY_BUFFER_MS,
            extra: Vec::new(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.grant_type = GrantType::RefreshToken;
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_token_path(mut self, token_path: impl Into<String>) -> Self {
        self.token_path = token_path.into();
        self
    }
}

struct CachedToken {
    token: String,
    expires_at: Option<Instant>,
}

struct TokenState {
    cached: Option<CachedToken>,
    refresh_token: Option<String>,
}

pub struct OAuth2TokenHandler {
    config: OAuth2Config,
    client: Client,
    state: Mutex<TokenState>,
    logger: Logger,
}

impl OAuth2TokenHandler {
    pub fn new(config: OAuth2Config, logger: Logger) -> Result<Self, ClientError> {
        if config.token_url.trim().is_empty() {
            return Err(ClientError::configuration("OAuth2 token_url is required"));
        }
        if config.grant_type == GrantType::RefreshToken && config.refresh_token.is_none() {
            return Err(ClientError::configuration(
                "OAuth2 refresh_token is required for the refresh_token grant",
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(network::TIMEOUT_TOKEN_REQUEST_MS))
            .build()
            .map_err(|err| {
                ClientError::internal(format!("Failed to build HTTP client: {}", err))
            })?;
        let refresh_token = config.refresh_token.clone();
        Ok(Self {
            config,
            client,
            state: Mutex::new(TokenState {
                cached: None,
                refresh_token,
            }),
            logger: logger.child("oauth2"),
        })
    }

    async fn token(&self, force: bool, rejected: Option<&str>) -> Result<String, ClientError> {
        let mut state = self.state.lock().await;
        if !force {
            if let Some(cached) = &state.cached {
                let fresh = cached
                    .expires_at
                    .map(|expires_at| Instant::now() < expires_at)
                    .unwrap_or(true);
                if fresh && rejected != Some(cached.token.as_str()) {
                    return Ok(cached.token.clone());
                }
            }
        }
        let payload = self.fetch(state.refresh_token.as_deref()).await?;
        let token = lookup_path(&payload, &self.config.token_path)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if token.is_empty() {
            return Err(ClientError::auth("OAuth2 token not found in response"));
        }
        if let Some(rotated) = payload.get("refresh_token").and_then(|v| v.as_str()) {
            state.refresh_token = Some(rotated.to_string());
        }
        let expires_at = payload
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .map(|expires_in| expires_in.max(0) as u64 * 1000)
            .map(|ttl_ms| {
                Instant::now() + Duration::from_millis(ttl_ms.saturating_sub(self.config.expiry_buffer_ms))
            });
        state.cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    async fn fetch(&self, refresh_token: Option<&str>) -> Result<Value, ClientError> {
        let mut payload: HashMap<&str, String> = HashMap::new();
        payload.insert("grant_type", self.config.grant_type.as_str().to_string());
        payload.insert("client_id", self.config.client_id.clone());
        payload.insert("client_secret", self.config.client_secret.clone());
        if let Some(scope) = &self.config.scope {
            payload.insert("scope", scope.clone());
        }
        if let Some(audience) = &self.config.audience {
            payload.insert("audience", audience.clone());
        }
        if self.config.grant_type == GrantType::RefreshToken {
            let refresh = refresh_token.ok_or_else(|| {
                ClientError::configuration("OAuth2 refresh_token is required")
            })?;
            payload.insert("refresh_token", refresh.to_string());
        }
        for (key, value) in &self.config.extra {
            payload.insert(key.as_str(), value.clone());
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .header("Content-Type", content_types::FORM)
            .form(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::auth(format!(
                "OAuth2 token request failed ({})",
                status.as_u16()
            ))
            .with_details(serde_json::json!({
                "status": status.as_u16(),
                "body": truncate_utf8_prefix(&redact_text(&text), 16 * 1024),
            })));
        }
        response
            .json::<Value>()
            .await
            .map_err(|_| ClientError::auth("OAuth2 token response invalid"))
    }
}

fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

#[async_trait]
impl AuthHandler for OAuth2TokenHandler {
    async fn attach(&self, request: &mut OutgoingRequest) -> Result<(), ClientError> {
        let token = self.token(false, None).await?;
        Credential::Bearer(token).apply(request)
    }

    async fn refresh(&self, request: &mut OutgoingRequest) -> Result<bool, ClientError> {
        // Refetch only when the cached token is the rejected one.
        let rejected = request
            .header(AUTHORIZATION.as_str())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        let token = self.token(rejected.is_none(), rejected.as_deref()).await?;
        self.logger.info(
            "OAuth2 token refreshed",
            Some(&serde_json::json!({ "token_url": self.config.token_url })),
        );
        Credential::Bearer(token).apply(request)?;
        Ok(true)
    }
}

//! OAuth2 client-credentials authentication
//!
//! The Feed API only accepts application tokens obtained through the
//! client-credentials grant. The token endpoint reports its tokens with
//! `token_type: "Application Access Token"`, but the API rejects anything
//! other than a `Bearer` authorization header, so the reported type is
//! ignored and every token is sent as `Bearer`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::config::{Environment, SCOPE_BUY_ITEM_FEED};
use super::transport::{ReqwestTransport, Transport};
use super::{FeedError, FeedResult};

/// Environment variable holding the OAuth2 client id
pub const ENV_CLIENT_ID: &str = "EBAY_API_CLIENT_ID";

/// Environment variable holding the OAuth2 client secret
pub const ENV_CLIENT_SECRET: &str = "EBAY_API_CLIENT_SECRET";

/// Tokens are refreshed this long before the server-reported expiry
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Application credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Credentials from explicit values.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Credentials from `EBAY_API_CLIENT_ID` / `EBAY_API_CLIENT_SECRET`.
    pub fn from_env() -> FeedResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Credentials from an arbitrary variable lookup.
    ///
    /// # Errors
    /// [`FeedError::Auth`] naming the first variable that is unset or empty
    pub fn from_lookup<F>(lookup: F) -> FeedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| FeedError::Auth(format!("environment variable {key} is not set")))
        };

        Ok(Self::new(read(ENV_CLIENT_ID)?, read(ENV_CLIENT_SECRET)?))
    }

    /// Client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + TOKEN_EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// Client-credentials token source with in-memory caching
pub struct TokenSource {
    client: Arc<Client>,
    token_url: String,
    credentials: ClientCredentials,
    scopes: Vec<String>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    /// Create a token source.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client used for the token exchange
    /// * `token_url` - OAuth2 token endpoint
    /// * `credentials` - Application credentials
    /// * `scopes` - Scopes requested for the token
    pub fn new(
        client: Arc<Client>,
        token_url: impl Into<String>,
        credentials: ClientCredentials,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            credentials,
            scopes,
            cached: Mutex::new(None),
        }
    }

    /// Current access token, fetching a new one when missing or about to expire.
    pub async fn token(&self) -> FeedResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> FeedResult<AccessToken> {
        let scope = self.scopes.join(" ");
        let mut form = vec![("grant_type", "client_credentials")];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FeedError::Auth(format!(
                "token request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| FeedError::Auth(format!("invalid token response: {e}")))?;

        if parsed.access_token.is_empty() {
            return Err(FeedError::Auth("token response has no access_token".to_string()));
        }

        info!(
            token_type = %parsed.token_type,
            expires_in = ?parsed.expires_in,
            "Obtained access token"
        );

        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: parsed
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("token_url", &self.token_url)
            .field("credentials", &self.credentials)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Transport that attaches a bearer token to every request
#[derive(Debug)]
pub struct AuthenticatedTransport<T> {
    inner: T,
    tokens: TokenSource,
}

impl<T: Transport> AuthenticatedTransport<T> {
    /// Wrap `inner`, authenticating with tokens from `tokens`.
    pub fn new(inner: T, tokens: TokenSource) -> Self {
        Self { inner, tokens }
    }
}

impl AuthenticatedTransport<ReqwestTransport> {
    /// Item-feed transport for `environment`, credentials read from the process environment.
    pub fn from_env(environment: Environment, client: Arc<Client>) -> FeedResult<Self> {
        let credentials = ClientCredentials::from_env()?;
        let tokens = TokenSource::new(
            client.clone(),
            environment.token_url(),
            credentials,
            vec![SCOPE_BUY_ITEM_FEED.to_string()],
        );
        Ok(Self::new(ReqwestTransport::new(client), tokens))
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthenticatedTransport<T> {
    async fn execute(&self, mut request: Request) -> FeedResult<Response> {
        let token = self.tokens.token().await?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| FeedError::Auth(format!("access token is not a valid header value: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        self.inner.execute(request).await
    }
}

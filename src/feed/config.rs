//! Feed API environment configuration
//!
//! Sandbox and production differ only in host names and the maximum chunk
//! size the server accepts; the protocol is the same. A [`FeedConfig`] is
//! passed explicitly to the downloader and never mutated afterwards.
//!
//! # Environments
//!
//! - **Sandbox**: <https://api.sandbox.ebay.com/buy/feed/>, 1 MiB chunks
//! - **Production**: <https://api.ebay.com/buy/feed/>, 10 MiB chunks

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use super::request::FeedPath;
use super::{FeedError, FeedResult};

/// Feed API version segment used by both environments
pub const DEFAULT_API_VERSION: &str = "v1_beta";

/// Sandbox Feed API base URL
pub const SANDBOX_BASE_URL: &str = "https://api.sandbox.ebay.com/buy/feed/";

/// Maximum chunk size accepted by the sandbox (1 MiB)
pub const SANDBOX_MAX_CHUNK_SIZE: u64 = 1_048_576;

/// Sandbox OAuth2 token endpoint
pub const SANDBOX_TOKEN_URL: &str = "https://api.sandbox.ebay.com/identity/v1/oauth2/token";

/// Production Feed API base URL
pub const PRODUCTION_BASE_URL: &str = "https://api.ebay.com/buy/feed/";

/// Maximum chunk size accepted in production (10 MiB)
pub const PRODUCTION_MAX_CHUNK_SIZE: u64 = 10_485_760;

/// Production OAuth2 token endpoint
pub const PRODUCTION_TOKEN_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";

/// OAuth2 scope granting access to the item feed API
pub const SCOPE_BUY_ITEM_FEED: &str = "https://api.ebay.com/oauth/api_scope/buy.item.feed";

/// Deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Sandbox environment
    Sandbox,
    /// Production environment
    Production,
}

impl Environment {
    /// Default configuration for this environment.
    pub fn config(&self) -> FeedConfig {
        match self {
            Environment::Sandbox => FeedConfig::sandbox(),
            Environment::Production => FeedConfig::production(),
        }
    }

    /// OAuth2 token endpoint for this environment.
    pub fn token_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_TOKEN_URL,
            Environment::Production => PRODUCTION_TOKEN_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Valid options: sandbox, production"
            )),
        }
    }
}

/// Immutable client configuration shared by every download call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Base URL of the Feed API, with trailing slash
    pub base_url: String,

    /// API version path segment (e.g. `v1_beta`)
    pub api_version: String,

    /// Maximum number of bytes requested per chunk
    pub chunk_size: u64,
}

impl FeedConfig {
    /// Sandbox defaults.
    pub fn sandbox() -> Self {
        Self {
            base_url: SANDBOX_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            chunk_size: SANDBOX_MAX_CHUNK_SIZE,
        }
    }

    /// Production defaults.
    pub fn production() -> Self {
        Self {
            base_url: PRODUCTION_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            chunk_size: PRODUCTION_MAX_CHUNK_SIZE,
        }
    }

    /// Same configuration pointing at another base URL (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Same configuration with another chunk size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Endpoint URL for a feed resource: `<base><version>/<path>`.
    pub fn endpoint_url(&self, path: FeedPath) -> FeedResult<Url> {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        let raw = format!("{base}{}/{}", self.api_version, path.as_str());

        Url::parse(&raw)
            .map_err(|e| FeedError::InvalidRequest(format!("cannot build endpoint URL {raw}: {e}")))
    }

    /// Reject configurations the chunk loop cannot work with.
    pub fn validate(&self) -> FeedResult<()> {
        if self.chunk_size == 0 {
            return Err(FeedError::InvalidRequest(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        if self.api_version.is_empty() {
            return Err(FeedError::InvalidRequest(
                "API version cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::sandbox()
    }
}

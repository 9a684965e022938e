//! HTTP transport capability
//!
//! The downloader never talks to `reqwest` directly: it sends every request
//! through a [`Transport`], so an authenticating transport (see
//! [`super::auth`]) or a scripted test double can be swapped in.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use tracing::debug;

use super::FeedResult;

/// Perform one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    ///
    /// # Errors
    /// Only transport-level failures (connection, timeout, auth collaborator)
    /// are errors here; HTTP error statuses are returned as responses.
    async fn execute(&self, request: Request) -> FeedResult<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> FeedResult<Response> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> FeedResult<Response> {
        (**self).execute(request).await
    }
}

/// Plain `reqwest` transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Arc<Client>,
}

impl ReqwestTransport {
    /// Wrap a shared client (Arc for cheap cloning across downloads).
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Arc::new(Client::new()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> FeedResult<Response> {
        debug!("{} {}", request.method(), request.url());
        let response = self.client.execute(request).await?;
        debug!("Response status: {}", response.status());
        Ok(response)
    }
}

use async_trait::async_trait;

use crate::{RequestsError, Result};

/// A single request/response exchange, without any retry logic.
///
/// Implemented for [`reqwest::Client`]; tests and custom stacks can plug
/// their own implementation into a [`Session`](crate::Session).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.execute(request).await.map_err(RequestsError::Transport)
    }
}

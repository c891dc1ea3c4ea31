//! HTTP implementation of [`Transport`] against the chat REST API.
//!
//! Routes mirror the server's message API:
//! `GET /messages/users`, `GET /messages/{partnerId}`,
//! `POST /messages/send/{partnerId}`. Bodies are camelCase JSON with
//! RFC3339 timestamps.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use palaver_shared::models::{Draft, Message, User};
use palaver_shared::types::UserId;

use crate::error::{FetchError, SendError};
use crate::Transport;

/// JSON error body the server returns on failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// `reqwest`-backed transport talking to the chat HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url` (trailing slash tolerated).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the server's error message out of a non-success response.
    async fn status_error(response: reqwest::Response) -> (u16, String) {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("Request failed with status {status}"));
        (status, message)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_roster(&self) -> Result<Vec<User>, FetchError> {
        let response = self.client.get(self.url("/messages/users")).send().await?;
        if !response.status().is_success() {
            let (status, message) = Self::status_error(response).await;
            return Err(FetchError::Status { status, message });
        }
        let users: Vec<User> = response.json().await?;
        debug!(count = users.len(), "Roster fetched");
        Ok(users)
    }

    async fn fetch_timeline(&self, partner: UserId) -> Result<Vec<Message>, FetchError> {
        let response = self
            .client
            .get(self.url(&format!("/messages/{partner}")))
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = Self::status_error(response).await;
            return Err(FetchError::Status { status, message });
        }
        let messages: Vec<Message> = response.json().await?;
        debug!(partner = %partner, count = messages.len(), "Timeline fetched");
        Ok(messages)
    }

    async fn post_message(&self, partner: UserId, draft: &Draft) -> Result<Message, SendError> {
        let response = self
            .client
            .post(self.url(&format!("/messages/send/{partner}")))
            .json(draft)
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = Self::status_error(response).await;
            return Err(SendError::Status { status, message });
        }
        let message: Message = response.json().await?;
        debug!(partner = %partner, id = %message.id, "Message posted");
        Ok(message)
    }
}

//! # palaver-transport
//!
//! Request/response side of the chat API: roster retrieval, timeline
//! retrieval, and message posting. [`Transport`] is the seam the
//! conversation core depends on; [`HttpTransport`] is the production
//! implementation backed by `reqwest`.

mod error;
mod http;

pub use error::{FetchError, SendError};
pub use http::HttpTransport;

use async_trait::async_trait;

use palaver_shared::models::{Draft, Message, User};
use palaver_shared::types::UserId;

/// Request operations the conversation core performs against the server.
///
/// Each call either succeeds with a typed payload or fails with an error
/// the UI can surface as a notice. None of them touch store state; that is
/// the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full roster of conversation partners.
    async fn fetch_roster(&self) -> Result<Vec<User>, FetchError>;

    /// Fetch the ordered message history for one partner.
    async fn fetch_timeline(&self, partner: UserId) -> Result<Vec<Message>, FetchError>;

    /// Post a draft to a partner.
    ///
    /// Returns the server-echoed [`Message`] carrying the assigned id and
    /// timestamp, which may differ from anything the client guessed.
    async fn post_message(&self, partner: UserId, draft: &Draft) -> Result<Message, SendError>;
}

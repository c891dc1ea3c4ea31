//! Domain model structs handed between the store core and the UI layer.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can cross the
//! HTTP boundary and be forwarded to the UI unchanged.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A conversation partner as listed in the roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// URL of the avatar image, if the user has set one.
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// The locally authenticated user, as exposed by the session layer.
///
/// The conversation core reads only the id and the favorite-partner set;
/// everything else about the account stays with the session owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub favorites: HashSet<UserId>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// Immutable once created. At least one of `text` / `image` is present in
/// any valid message. `created_at` is server-assigned and trusted; the
/// client never reorders messages on display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: Option<String>,
    /// Data URL of an attached image, if any.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An outgoing message before the server has assigned it an identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draft {
    pub text: Option<String>,
    pub image: Option<String>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: impl Into<String>) -> Self {
        Self {
            text: None,
            image: Some(image.into()),
        }
    }

    /// Trim the text and drop empty fields.
    ///
    /// Returns `None` when neither text nor image remains; such a draft is
    /// rejected before any network call is made.
    pub fn sanitize(self) -> Option<Self> {
        let text = self
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let image = self.image.filter(|i| !i.is_empty());

        if text.is_none() && image.is_none() {
            None
        } else {
            Some(Self { text, image })
        }
    }
}

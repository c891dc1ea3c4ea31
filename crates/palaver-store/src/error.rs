use thiserror::Error;

use palaver_transport::{FetchError, SendError};

/// Errors surfaced at the store boundary.
///
/// None of these are fatal: the store always settles into a well-defined
/// state (loading flags cleared, no partial writes) and the caller may
/// retry by repeating the triggering action.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Roster or timeline retrieval failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Message post failed.
    #[error("Send failed: {0}")]
    Send(#[from] SendError),

    /// The draft was empty after trimming; nothing was sent.
    #[error("Cannot send an empty message")]
    EmptyDraft,

    /// The operation needs an active conversation and none is selected.
    #[error("No conversation selected")]
    NoSelection,

    /// The store task has shut down.
    #[error("Store is closed")]
    Closed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

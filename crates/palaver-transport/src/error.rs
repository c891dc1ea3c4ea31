use thiserror::Error;

/// Roster or timeline retrieval failed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },
}

/// Message post failed.
#[derive(Error, Debug)]
pub enum SendError {
    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the message.
    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },
}

impl FetchError {
    /// Human-readable text for the UI notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the server".to_string(),
            Self::Status { message, .. } => message.clone(),
        }
    }
}

impl SendError {
    /// Human-readable text for the UI notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the server".to_string(),
            Self::Status { message, .. } => message.clone(),
        }
    }
}

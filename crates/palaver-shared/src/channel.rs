//! Contract between the conversation core and the session-owned push channel.
//!
//! The session layer owns the persistent connection and its lifecycle
//! (connect, reconnect, disconnect). The core only borrows the handle: it
//! attaches or detaches a handler for incoming `new-message` events and
//! emits outbound typing signals.

use thiserror::Error;

use crate::protocol::{NewMessagePayload, TypingPayload};

/// Handler invoked for every incoming `new-message` push event.
pub type NewMessageHandler = Box<dyn Fn(NewMessagePayload) + Send + Sync>;

/// Failure to emit a signal over the push channel.
///
/// Always non-fatal: typing signals are best-effort and callers drop them
/// silently when the channel is down.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Push channel is not connected")]
    Unavailable,

    #[error("Channel error: {0}")]
    Channel(String),
}

/// Borrowed handle to the session's persistent push channel.
pub trait PushChannel: Send + Sync {
    /// Attach a handler for `new-message` events.
    ///
    /// Implementations simply register the handler; keeping at most one
    /// live handler is the relay's job (it always detaches before
    /// attaching).
    fn on_new_message(&self, handler: NewMessageHandler);

    /// Detach any `new-message` handler. A no-op when none is attached.
    fn off_new_message(&self);

    /// Emit an outbound typing signal (`typing` / `stop-typing`).
    fn emit_signal(&self, event: &'static str, payload: TypingPayload)
        -> Result<(), SignalError>;
}

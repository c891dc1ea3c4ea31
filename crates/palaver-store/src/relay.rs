//! Push-event relay between the session channel and the store task.
//!
//! Owns the Unbound/Bound state of the `new-message` handler. Binding is
//! idempotent: any prior handler is detached first, so at most one live
//! handler exists no matter how often a conversation view re-activates.
//! The handler itself does no routing; it only enqueues the event on the
//! store's command queue, where it is processed in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use palaver_shared::channel::PushChannel;
use palaver_shared::protocol::NewMessagePayload;

use crate::store::StoreCommand;

/// Bind state for the `new-message` push handler.
#[derive(Debug, Default)]
pub struct MessageRelay {
    bound: bool,
}

impl MessageRelay {
    /// Create a relay in the unbound state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Attach the `new-message` handler, detaching any prior one first.
    pub fn bind(&mut self, channel: &Arc<dyn PushChannel>, cmd_tx: mpsc::Sender<StoreCommand>) {
        channel.off_new_message();
        channel.on_new_message(Box::new(move |payload: NewMessagePayload| {
            if cmd_tx.try_send(StoreCommand::Push(payload)).is_err() {
                warn!("Dropped push event: store queue full or closed");
            }
        }));

        if !self.bound {
            debug!("Relay bound to push channel");
            self.bound = true;
        }
    }

    /// Detach the handler. Idempotent; a no-op when already unbound.
    pub fn unbind(&mut self, channel: &Arc<dyn PushChannel>) {
        if self.bound {
            channel.off_new_message();
            self.bound = false;
            debug!("Relay unbound from push channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use palaver_shared::channel::{NewMessageHandler, SignalError};
    use palaver_shared::models::Message;
    use palaver_shared::protocol::TypingPayload;
    use palaver_shared::types::{MessageId, UserId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingChannel {
        handlers: Mutex<Vec<NewMessageHandler>>,
    }

    impl CountingChannel {
        fn handler_count(&self) -> usize {
            self.handlers.lock().unwrap().len()
        }

        fn deliver(&self, payload: NewMessagePayload) {
            for handler in self.handlers.lock().unwrap().iter() {
                handler(payload.clone());
            }
        }
    }

    impl PushChannel for CountingChannel {
        fn on_new_message(&self, handler: NewMessageHandler) {
            self.handlers.lock().unwrap().push(handler);
        }

        fn off_new_message(&self) {
            self.handlers.lock().unwrap().clear();
        }

        fn emit_signal(
            &self,
            _event: &'static str,
            _payload: TypingPayload,
        ) -> Result<(), SignalError> {
            Ok(())
        }
    }

    fn payload() -> NewMessagePayload {
        let sender = UserId::new();
        NewMessagePayload {
            sender_id: sender,
            message: Message {
                id: MessageId::new(),
                sender_id: sender,
                text: Some("hi".into()),
                image: None,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_double_bind_keeps_one_live_handler() {
        let counting = Arc::new(CountingChannel::default());
        let channel: Arc<dyn PushChannel> = counting.clone();
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let mut relay = MessageRelay::new();

        relay.bind(&channel, cmd_tx.clone());
        relay.bind(&channel, cmd_tx);
        assert_eq!(counting.handler_count(), 1);
        assert!(relay.is_bound());

        // Two injected events produce exactly two queued commands, not four.
        counting.deliver(payload());
        counting.deliver(payload());

        assert!(matches!(cmd_rx.try_recv(), Ok(StoreCommand::Push(_))));
        assert!(matches!(cmd_rx.try_recv(), Ok(StoreCommand::Push(_))));
        assert!(cmd_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unbind_detaches_and_is_idempotent() {
        let counting = Arc::new(CountingChannel::default());
        let channel: Arc<dyn PushChannel> = counting.clone();
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let mut relay = MessageRelay::new();

        relay.bind(&channel, cmd_tx);
        relay.unbind(&channel);
        relay.unbind(&channel);

        assert!(!relay.is_bound());
        assert_eq!(counting.handler_count(), 0);

        counting.deliver(payload());
        assert!(cmd_rx.try_recv().is_err());
    }
}

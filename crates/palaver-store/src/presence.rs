//! Debounced typing-presence signaler.
//!
//! Converts a burst of composer keystrokes into two discrete signals:
//! `typing` on the first keystroke and `stop-typing` once a quiet period
//! elapses with no further input. The timer handle lives here, owned by
//! the store task, never ambient: it is cancelled on send, on partner
//! switch, and on teardown, so a stale signal can never fire after the
//! user has moved on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use palaver_shared::channel::PushChannel;
use palaver_shared::protocol::{TypingPayload, EVENT_STOP_TYPING, EVENT_TYPING};
use palaver_shared::types::UserId;

/// Notice sent back to the owning task when a quiet period ends.
///
/// Expiries travel through the owner's event queue so they mutate state on
/// the same task as every other input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietExpiry {
    pub partner: UserId,
    pub generation: u64,
}

/// One outstanding quiet-period timer.
#[derive(Debug)]
struct PendingQuiet {
    partner: UserId,
    generation: u64,
    timer: JoinHandle<()>,
}

/// Debounces keystrokes into edge-triggered typing signals.
pub struct PresenceSignaler {
    quiet_period: Duration,
    expiry_tx: mpsc::Sender<QuietExpiry>,
    pending: Option<PendingQuiet>,
    generation: u64,
}

impl PresenceSignaler {
    /// Create a signaler with the given quiet period.
    ///
    /// The quiet period is a construction parameter so tests can shorten
    /// it; at runtime it stays at the contract value of 1500 ms.
    pub fn new(quiet_period: Duration, expiry_tx: mpsc::Sender<QuietExpiry>) -> Self {
        Self {
            quiet_period,
            expiry_tx,
            pending: None,
            generation: 0,
        }
    }

    /// Whether a quiet timer is currently outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle one composer keystroke aimed at `partner`.
    ///
    /// Emits `typing` only on the first keystroke of a burst, then resets
    /// the quiet timer. A keystroke for a different partner first flushes
    /// the outstanding timer so the stop signal goes to the partner it was
    /// scheduled for, never the new one.
    pub fn on_input(&mut self, partner: UserId, channel: &Arc<dyn PushChannel>) {
        let switched = self
            .pending
            .as_ref()
            .map_or(false, |pending| pending.partner != partner);
        if switched {
            self.flush(channel);
        }

        if self.pending.is_none() {
            emit(channel, EVENT_TYPING, partner);
        }

        self.reschedule(partner);
    }

    /// A quiet period elapsed with no intervening input.
    ///
    /// Expiries whose generation no longer matches the outstanding timer
    /// were superseded by a later keystroke and are ignored.
    pub fn on_quiet_elapsed(&mut self, expiry: QuietExpiry, channel: &Arc<dyn PushChannel>) {
        let Some(pending) = &self.pending else {
            return;
        };
        if pending.generation != expiry.generation {
            debug!(partner = %expiry.partner, "Ignoring superseded quiet-period expiry");
            return;
        }
        self.pending = None;
        emit(channel, EVENT_STOP_TYPING, expiry.partner);
    }

    /// Cancel any outstanding timer and emit `stop-typing` immediately.
    ///
    /// Called on explicit send, on leaving the conversation, and on
    /// teardown. A no-op when no timer is outstanding.
    pub fn flush(&mut self, channel: &Arc<dyn PushChannel>) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
            emit(channel, EVENT_STOP_TYPING, pending.partner);
        }
    }

    fn reschedule(&mut self, partner: UserId) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        let quiet_period = self.quiet_period;
        let expiry_tx = self.expiry_tx.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let _ = expiry_tx.send(QuietExpiry { partner, generation }).await;
        });

        self.pending = Some(PendingQuiet {
            partner,
            generation,
            timer,
        });
    }
}

impl Drop for PresenceSignaler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }
}

fn emit(channel: &Arc<dyn PushChannel>, event: &'static str, receiver: UserId) {
    let payload = TypingPayload {
        receiver_id: receiver,
    };
    if let Err(e) = channel.emit_signal(event, payload) {
        // Typing signals are best-effort; a downed channel is not an error.
        debug!(event, error = %e, "Dropped typing signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::channel::{NewMessageHandler, SignalError};
    use std::sync::Mutex;

    struct RecordingChannel {
        available: bool,
        signals: Mutex<Vec<(&'static str, UserId)>>,
    }

    impl RecordingChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                available: true,
                signals: Mutex::new(Vec::new()),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                available: false,
                signals: Mutex::new(Vec::new()),
            })
        }

        fn signals(&self) -> Vec<(&'static str, UserId)> {
            self.signals.lock().unwrap().clone()
        }
    }

    impl PushChannel for RecordingChannel {
        fn on_new_message(&self, _handler: NewMessageHandler) {}

        fn off_new_message(&self) {}

        fn emit_signal(
            &self,
            event: &'static str,
            payload: TypingPayload,
        ) -> Result<(), SignalError> {
            if !self.available {
                return Err(SignalError::Unavailable);
            }
            self.signals.lock().unwrap().push((event, payload.receiver_id));
            Ok(())
        }
    }

    fn signaler(
        quiet: Duration,
    ) -> (PresenceSignaler, mpsc::Receiver<QuietExpiry>) {
        let (tx, rx) = mpsc::channel(8);
        (PresenceSignaler::new(quiet, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_typing_per_burst_then_one_stop() {
        let recorder = RecordingChannel::new();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let partner = UserId::new();
        let (mut signaler, mut rx) = signaler(Duration::from_millis(1500));

        signaler.on_input(partner, &channel);
        signaler.on_input(partner, &channel);
        signaler.on_input(partner, &channel);

        assert_eq!(recorder.signals(), vec![(EVENT_TYPING, partner)]);
        assert!(signaler.is_pending());

        tokio::time::advance(Duration::from_millis(1500)).await;
        let expiry = rx.recv().await.unwrap();
        signaler.on_quiet_elapsed(expiry, &channel);

        assert_eq!(
            recorder.signals(),
            vec![(EVENT_TYPING, partner), (EVENT_STOP_TYPING, partner)]
        );
        assert!(!signaler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_resets_quiet_timer() {
        let recorder = RecordingChannel::new();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let partner = UserId::new();
        let (mut signaler, mut rx) = signaler(Duration::from_millis(1500));

        signaler.on_input(partner, &channel);
        tokio::time::advance(Duration::from_millis(1000)).await;
        signaler.on_input(partner, &channel);

        // Only the rescheduled timer fires.
        tokio::time::advance(Duration::from_millis(1500)).await;
        let expiry = rx.recv().await.unwrap();
        signaler.on_quiet_elapsed(expiry, &channel);

        assert!(rx.try_recv().is_err());
        assert_eq!(
            recorder.signals(),
            vec![(EVENT_TYPING, partner), (EVENT_STOP_TYPING, partner)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_expiry_is_ignored() {
        let recorder = RecordingChannel::new();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let partner = UserId::new();
        let (mut signaler, mut rx) = signaler(Duration::from_millis(1500));

        signaler.on_input(partner, &channel);
        tokio::time::advance(Duration::from_millis(1500)).await;
        let stale = rx.recv().await.unwrap();

        // The expiry is already queued when the next keystroke lands.
        signaler.on_input(partner, &channel);
        signaler.on_quiet_elapsed(stale, &channel);

        // No stop yet; the burst is still alive.
        assert_eq!(recorder.signals(), vec![(EVENT_TYPING, partner)]);
        assert!(signaler.is_pending());

        tokio::time::advance(Duration::from_millis(1500)).await;
        let expiry = rx.recv().await.unwrap();
        signaler.on_quiet_elapsed(expiry, &channel);

        assert_eq!(
            recorder.signals(),
            vec![(EVENT_TYPING, partner), (EVENT_STOP_TYPING, partner)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_stops_immediately_for_old_partner() {
        let recorder = RecordingChannel::new();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let bob = UserId::new();
        let carol = UserId::new();
        let (mut signaler, _rx) = signaler(Duration::from_millis(1500));

        signaler.on_input(bob, &channel);
        // Keystroke for a different partner mid-burst.
        signaler.on_input(carol, &channel);

        assert_eq!(
            recorder.signals(),
            vec![
                (EVENT_TYPING, bob),
                (EVENT_STOP_TYPING, bob),
                (EVENT_TYPING, carol),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_pending_timer_is_silent() {
        let recorder = RecordingChannel::new();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let (mut signaler, _rx) = signaler(Duration::from_millis(1500));

        signaler.flush(&channel);

        assert!(recorder.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_channel_drops_signals_silently() {
        let recorder = RecordingChannel::unavailable();
        let channel: Arc<dyn PushChannel> = recorder.clone();
        let partner = UserId::new();
        let (mut signaler, _rx) = signaler(Duration::from_millis(1500));

        signaler.on_input(partner, &channel);
        signaler.flush(&channel);

        assert!(recorder.signals().is_empty());
    }
}

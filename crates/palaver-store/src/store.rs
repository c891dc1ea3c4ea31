//! The conversation store task, with a tokio mpsc command/notification
//! pattern.
//!
//! All mutable state — roster, selection, timeline, unread counters, and
//! the typing timer — lives on one spawned task. User actions, push
//! events, and quiet-period expiries are all delivered to that task as
//! messages, so no two mutations ever interleave: a selection change runs
//! to completion before any queued push event is processed, and a push
//! event never observes a half-applied switch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use palaver_shared::channel::PushChannel;
use palaver_shared::constants::{COMMAND_BUFFER, NOTIFICATION_BUFFER, TYPING_QUIET_PERIOD_MS};
use palaver_shared::models::{Draft, Message, SessionUser, User};
use palaver_shared::protocol::NewMessagePayload;
use palaver_shared::types::UserId;
use palaver_transport::Transport;

use crate::directory::{filter_users_with_unread, RosterDirectory, RosterFilter};
use crate::error::{Result, StoreError};
use crate::presence::{PresenceSignaler, QuietExpiry};
use crate::relay::MessageRelay;
use crate::timeline::Timeline;
use crate::unread::UnreadTracker;

// ---------------------------------------------------------------------------
// Command / notification / snapshot types
// ---------------------------------------------------------------------------

/// Commands sent *into* the store task.
#[derive(Debug)]
pub enum StoreCommand {
    /// Refresh the conversation-partner roster.
    LoadRoster(oneshot::Sender<Result<()>>),
    /// Switch the active conversation (`None` closes it).
    Select(Option<UserId>, oneshot::Sender<Result<()>>),
    /// Send a draft to the active partner.
    Send(Draft, oneshot::Sender<Result<Message>>),
    /// One keystroke in the active composer.
    ComposerInput,
    /// An incoming `new-message` push event.
    Push(NewMessagePayload),
    /// (Re)attach the push handler. Idempotent.
    Bind,
    /// Detach the push handler. Idempotent.
    Unbind,
    /// Request a read-only snapshot of the store state.
    Snapshot(oneshot::Sender<StoreSnapshot>),
    /// Tear the store down.
    Shutdown,
}

/// Notifications sent *from* the store task after a mutation completes.
///
/// The core never renders anything itself; the UI layer reacts to these
/// (e.g. a toast for [`StoreNotification::UnreadMessage`]).
#[derive(Debug, Clone)]
pub enum StoreNotification {
    /// The roster was refreshed.
    RosterUpdated { count: usize },
    /// The active conversation changed.
    SelectionChanged { partner: Option<UserId> },
    /// The active timeline finished loading.
    TimelineLoaded { partner: UserId, count: usize },
    /// A message was appended to the active timeline.
    MessageAppended { message: Message },
    /// A message arrived for an inactive conversation.
    UnreadMessage { from: UserId, count: u32 },
}

/// Read-only view of the store state at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub local_user: UserId,
    pub favorites: HashSet<UserId>,
    pub roster: Vec<User>,
    pub selected: Option<UserId>,
    pub messages: Vec<Message>,
    pub unread: HashMap<UserId, u32>,
    pub is_roster_loading: bool,
    pub is_timeline_loading: bool,
}

impl StoreSnapshot {
    /// Project the roster through `filter`, pairing each partner with its
    /// unread count. Pure; mutates nothing.
    pub fn filter_roster(&self, filter: &RosterFilter) -> Vec<(&User, u32)> {
        filter_users_with_unread(&self.roster, filter, &self.favorites, &self.unread)
    }
}

/// Construction parameters for the store task.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Quiet period after the last keystroke before `stop-typing`.
    pub quiet_period: Duration,
    /// Capacity of the command queue.
    pub command_buffer: usize,
    /// Capacity of the notification queue.
    pub notification_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(TYPING_QUIET_PERIOD_MS),
            command_buffer: COMMAND_BUFFER,
            notification_buffer: NOTIFICATION_BUFFER,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable handle the UI layer uses to drive the store task.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    cmd_tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Refresh the partner roster.
    ///
    /// On failure the previous roster is kept (stale-but-valid) and the
    /// error is returned for the UI to surface.
    pub async fn load_roster(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::LoadRoster(tx)).await?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Open the conversation with `partner`, or close it with `None`.
    ///
    /// Clears the partner's unread entry, reloads the timeline, and
    /// (re)binds the push relay as one atomic transition. The selection
    /// always applies; a timeline fetch failure is returned alongside an
    /// empty timeline.
    pub async fn select(&self, partner: Option<UserId>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Select(partner, tx)).await?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Send a draft to the active partner.
    ///
    /// Returns the server-echoed message that was appended to the
    /// timeline. Empty drafts are rejected before any network call.
    pub async fn send_message(&self, draft: Draft) -> Result<Message> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Send(draft, tx)).await?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Report one composer keystroke (drives the typing signal).
    pub async fn composer_input(&self) -> Result<()> {
        self.send(StoreCommand::ComposerInput).await
    }

    /// (Re)attach the push handler; at most one stays live.
    pub async fn bind(&self) -> Result<()> {
        self.send(StoreCommand::Bind).await
    }

    /// Detach the push handler.
    pub async fn unbind(&self) -> Result<()> {
        self.send(StoreCommand::Unbind).await
    }

    /// Read-only snapshot of roster, selection, timeline, unread map, and
    /// loading flags.
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(StoreCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Stop the store task, flushing any pending typing signal and
    /// detaching the push handler.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(StoreCommand::Shutdown).await
    }

    async fn send(&self, cmd: StoreCommand) -> Result<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| StoreError::Closed)
    }
}

/// Spawn the conversation store in a background tokio task.
///
/// `transport` and `channel` are borrowed collaborators: the store never
/// opens or closes the connection behind either. Returns the UI-facing
/// handle and the notification stream.
pub fn spawn_store(
    transport: Arc<dyn Transport>,
    channel: Arc<dyn PushChannel>,
    session: SessionUser,
    config: StoreConfig,
) -> (StoreHandle, mpsc::Receiver<StoreNotification>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let (notif_tx, notif_rx) = mpsc::channel(config.notification_buffer);
    let (expiry_tx, expiry_rx) = mpsc::channel(8);

    let store = ChatStore {
        transport,
        channel,
        session,
        cmd_tx: cmd_tx.clone(),
        notif_tx,
        directory: RosterDirectory::new(),
        timeline: Timeline::new(),
        unread: UnreadTracker::new(),
        presence: PresenceSignaler::new(config.quiet_period, expiry_tx),
        relay: MessageRelay::new(),
    };

    tokio::spawn(store.run(cmd_rx, expiry_rx));

    (StoreHandle { cmd_tx }, notif_rx)
}

// ---------------------------------------------------------------------------
// Store task
// ---------------------------------------------------------------------------

struct ChatStore {
    transport: Arc<dyn Transport>,
    channel: Arc<dyn PushChannel>,
    session: SessionUser,
    /// Clone of the store's own command sender, handed to the relay so
    /// push handlers can enqueue events.
    cmd_tx: mpsc::Sender<StoreCommand>,
    notif_tx: mpsc::Sender<StoreNotification>,
    directory: RosterDirectory,
    timeline: Timeline,
    unread: UnreadTracker,
    presence: PresenceSignaler,
    relay: MessageRelay,
}

impl ChatStore {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<StoreCommand>,
        mut expiry_rx: mpsc::Receiver<QuietExpiry>,
    ) {
        info!(user = %self.session.id, "Conversation store started");

        loop {
            tokio::select! {
                Some(expiry) = expiry_rx.recv() => {
                    self.presence.on_quiet_elapsed(expiry, &self.channel);
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(StoreCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
            }
        }

        self.presence.flush(&self.channel);
        self.relay.unbind(&self.channel);
        info!("Conversation store stopped");
    }

    async fn handle_command(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::LoadRoster(reply) => {
                let result = self.load_roster().await;
                let _ = reply.send(result);
            }
            StoreCommand::Select(partner, reply) => {
                let result = self.select(partner).await;
                let _ = reply.send(result);
            }
            StoreCommand::Send(draft, reply) => {
                let result = self.send_draft(draft).await;
                let _ = reply.send(result);
            }
            StoreCommand::ComposerInput => self.composer_input(),
            StoreCommand::Push(payload) => self.route_push(payload).await,
            StoreCommand::Bind => self.relay.bind(&self.channel, self.cmd_tx.clone()),
            StoreCommand::Unbind => self.relay.unbind(&self.channel),
            StoreCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop before dispatch.
            StoreCommand::Shutdown => {}
        }
    }

    async fn load_roster(&mut self) -> Result<()> {
        self.directory.set_loading(true);
        let result = self.transport.fetch_roster().await;
        self.directory.set_loading(false);

        match result {
            Ok(users) => {
                let count = users.len();
                self.directory.replace_roster(users);
                self.notify(StoreNotification::RosterUpdated { count }).await;
                Ok(())
            }
            Err(e) => {
                // The previous roster stays visible; the UI surfaces the
                // notice and the user retries by reloading.
                warn!(error = %e, "Roster fetch failed");
                Err(e.into())
            }
        }
    }

    /// The composite selection transition: clear the new partner's unread
    /// entry, set the selection, reload the timeline, ensure the relay is
    /// bound. Runs to completion on the store task, so a queued push event
    /// sees either the old state or the new state, never a half-applied
    /// switch.
    async fn select(&mut self, partner: Option<UserId>) -> Result<()> {
        // A timer outstanding for the previous partner must not leak a
        // signal into the new conversation.
        self.presence.flush(&self.channel);

        let Some(partner) = partner else {
            self.directory.select(None);
            self.timeline.clear();
            self.notify(StoreNotification::SelectionChanged { partner: None })
                .await;
            return Ok(());
        };

        self.unread.clear(partner);
        self.directory.select(Some(partner));
        self.notify(StoreNotification::SelectionChanged {
            partner: Some(partner),
        })
        .await;

        self.timeline.begin_load(partner);
        let loaded = match self.transport.fetch_timeline(partner).await {
            Ok(messages) => {
                let count = messages.len();
                self.timeline.finish_load(partner, Some(messages));
                self.notify(StoreNotification::TimelineLoaded { partner, count })
                    .await;
                Ok(())
            }
            Err(e) => {
                // Empty, not stale: a stale history would show under the
                // wrong partner.
                self.timeline.finish_load(partner, None);
                warn!(partner = %partner, error = %e, "Timeline fetch failed");
                Err(e.into())
            }
        };

        self.relay.bind(&self.channel, self.cmd_tx.clone());
        loaded
    }

    async fn send_draft(&mut self, draft: Draft) -> Result<Message> {
        // Reject empty drafts before any network traffic.
        let draft = draft.sanitize().ok_or(StoreError::EmptyDraft)?;

        // Capture the target at call time; a partner switch during the
        // post must not redirect the echo.
        let partner = self.directory.selected().ok_or(StoreError::NoSelection)?;

        // The burst is committed; stop the quiet timer now rather than
        // letting it fire after the message.
        self.presence.flush(&self.channel);

        match self.transport.post_message(partner, &draft).await {
            Ok(message) => {
                info!(partner = %partner, id = %message.id, "Message sent");
                if self.timeline.append_for(partner, message.clone()) {
                    self.notify(StoreNotification::MessageAppended {
                        message: message.clone(),
                    })
                    .await;
                }
                Ok(message)
            }
            Err(e) => {
                // No optimistic insertion, so there is nothing to roll back.
                warn!(partner = %partner, error = %e, "Message send failed");
                Err(e.into())
            }
        }
    }

    fn composer_input(&mut self) {
        // Keystrokes with no conversation open are silently ignored.
        let Some(partner) = self.directory.selected() else {
            return;
        };
        self.presence.on_input(partner, &self.channel);
    }

    async fn route_push(&mut self, payload: NewMessagePayload) {
        let NewMessagePayload { sender_id, message } = payload;

        // Own sends arrive via the HTTP echo, not the push channel.
        if sender_id == self.session.id {
            debug!(id = %message.id, "Ignoring push echo of own message");
            return;
        }

        if self.directory.selected() == Some(sender_id) {
            if self.timeline.append_for(sender_id, message.clone()) {
                self.notify(StoreNotification::MessageAppended { message })
                    .await;
            }
        } else {
            let count = self.unread.record_incoming(sender_id);
            self.notify(StoreNotification::UnreadMessage {
                from: sender_id,
                count,
            })
            .await;
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            local_user: self.session.id,
            favorites: self.session.favorites.clone(),
            roster: self.directory.roster().to_vec(),
            selected: self.directory.selected(),
            messages: self.timeline.messages().to_vec(),
            unread: self.unread.counts().clone(),
            is_roster_loading: self.directory.is_loading(),
            is_timeline_loading: self.timeline.is_loading(),
        }
    }

    async fn notify(&self, notification: StoreNotification) {
        if self.notif_tx.send(notification).await.is_err() {
            debug!("Notification dropped: no listener");
        }
    }
}

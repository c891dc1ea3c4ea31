//! Ordered message history for the active conversation.
//!
//! The timeline is scoped to exactly one partner at a time and fully
//! replaced when the active partner changes. Appends preserve network
//! delivery order; the client never reorders messages. Date grouping is a
//! derived view computed on demand, not stored state.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tracing::debug;

use palaver_shared::models::Message;
use palaver_shared::types::UserId;

/// Message history scoped to one partner.
#[derive(Debug, Default)]
pub struct Timeline {
    partner: Option<UserId>,
    messages: Vec<Message>,
    loading: bool,
}

impl Timeline {
    /// Create a new, unscoped timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The partner this timeline is scoped to.
    pub fn partner(&self) -> Option<UserId> {
        self.partner
    }

    /// All messages in applied order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Scope the timeline to `partner` and mark it loading.
    ///
    /// The previous history is dropped immediately so a slow fetch can
    /// never show one partner's messages under another's conversation.
    pub fn begin_load(&mut self, partner: UserId) {
        self.partner = Some(partner);
        self.messages.clear();
        self.loading = true;
    }

    /// Complete a load started with [`Timeline::begin_load`].
    ///
    /// On success the history is replaced wholesale; on failure
    /// (`messages == None`) it stays empty rather than stale. The loading
    /// flag clears in all cases. A result for a partner that is no longer
    /// scoped is discarded.
    pub fn finish_load(&mut self, partner: UserId, messages: Option<Vec<Message>>) {
        if self.partner != Some(partner) {
            debug!(partner = %partner, "Discarding timeline load for a stale partner");
            return;
        }
        self.loading = false;
        if let Some(messages) = messages {
            debug!(partner = %partner, count = messages.len(), "Timeline loaded");
            self.messages = messages;
        }
    }

    /// Append `message` if the timeline is currently scoped to `partner`.
    ///
    /// Returns whether the message was appended. Strictly append-only:
    /// messages land in network delivery order, never by timestamp.
    pub fn append_for(&mut self, partner: UserId, message: Message) -> bool {
        if self.partner != Some(partner) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Drop the history and selection scope (no conversation open).
    pub fn clear(&mut self) {
        self.partner = None;
        self.messages.clear();
        self.loading = false;
    }
}

// ---------------------------------------------------------------------------
// Date grouping (derived view)
// ---------------------------------------------------------------------------

/// Consecutive messages sharing one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub messages: Vec<&'a Message>,
}

/// Group consecutive messages by the calendar date of `created_at` in the
/// time zone `tz`.
///
/// A new group opens for the first message and whenever a message's date
/// differs from the previous message's date.
pub fn day_groups_in<'a, Tz: TimeZone>(messages: &'a [Message], tz: &Tz) -> Vec<DayGroup<'a>> {
    let mut groups: Vec<DayGroup<'a>> = Vec::new();
    for message in messages {
        let date = message.created_at.with_timezone(tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.messages.push(message),
            _ => groups.push(DayGroup {
                date,
                messages: vec![message],
            }),
        }
    }
    groups
}

/// Group messages by the local calendar date.
pub fn day_groups(messages: &[Message]) -> Vec<DayGroup<'_>> {
    day_groups_in(messages, &Local)
}

/// Render a date separator label relative to `today`:
/// "Today", "Yesterday", or e.g. "Nov 20, 2024".
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// Render a message timestamp as "03:07 PM" in the zone of `time`.
pub fn time_label<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%I:%M %p").to_string()
}

//! Per-partner unread message counters.
//!
//! Counts messages that arrived while the sender's conversation was not
//! active. Entries are removed on selection, never zeroed: absence means
//! zero, and the active partner never has an entry.

use std::collections::HashMap;

use tracing::debug;

use palaver_shared::types::UserId;

/// Tracks unread counts for inactive conversations.
#[derive(Debug, Clone, Default)]
pub struct UnreadTracker {
    counts: HashMap<UserId, u32>,
}

impl UnreadTracker {
    /// Create a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message that arrived for an inactive conversation and
    /// return the new count.
    ///
    /// The relay's routing guarantees this is never called for the active
    /// partner; the tracker itself does not know the selection.
    pub fn record_incoming(&mut self, sender: UserId) -> u32 {
        let count = self.counts.entry(sender).or_insert(0);
        *count += 1;
        debug!(partner = %sender, count = *count, "Unread message recorded");
        *count
    }

    /// Remove the entry for `partner` entirely.
    pub fn clear(&mut self, partner: UserId) {
        if self.counts.remove(&partner).is_some() {
            debug!(partner = %partner, "Unread entry cleared");
        }
    }

    /// Unread count for `partner` (absence == zero).
    pub fn count(&self, partner: UserId) -> u32 {
        self.counts.get(&partner).copied().unwrap_or(0)
    }

    /// Whether `partner` has any unread messages.
    pub fn is_unread(&self, partner: UserId) -> bool {
        self.counts.contains_key(&partner)
    }

    /// Total unread messages across all partners.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Number of partners with unread messages.
    pub fn partner_count(&self) -> usize {
        self.counts.len()
    }

    /// All counters (snapshot source).
    pub fn counts(&self) -> &HashMap<UserId, u32> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_clear() {
        let mut tracker = UnreadTracker::new();
        let partner = UserId::new();

        assert!(!tracker.is_unread(partner));
        assert_eq!(tracker.count(partner), 0);

        assert_eq!(tracker.record_incoming(partner), 1);
        assert_eq!(tracker.record_incoming(partner), 2);
        assert!(tracker.is_unread(partner));
        assert_eq!(tracker.count(partner), 2);

        tracker.clear(partner);
        assert!(!tracker.is_unread(partner));
        assert_eq!(tracker.count(partner), 0);
        assert_eq!(tracker.partner_count(), 0);
    }

    #[test]
    fn test_clear_removes_entry_not_zeroes_it() {
        let mut tracker = UnreadTracker::new();
        let partner = UserId::new();

        tracker.record_incoming(partner);
        tracker.clear(partner);

        assert!(!tracker.counts().contains_key(&partner));
    }

    #[test]
    fn test_clear_unknown_partner_is_a_noop() {
        let mut tracker = UnreadTracker::new();
        tracker.clear(UserId::new());
        assert_eq!(tracker.partner_count(), 0);
    }

    #[test]
    fn test_total_spans_partners() {
        let mut tracker = UnreadTracker::new();
        let a = UserId::new();
        let b = UserId::new();

        tracker.record_incoming(a);
        tracker.record_incoming(a);
        tracker.record_incoming(b);

        assert_eq!(tracker.total(), 3);
        assert_eq!(tracker.partner_count(), 2);
    }
}

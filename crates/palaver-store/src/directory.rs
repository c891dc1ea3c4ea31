//! Conversation roster and selection state.
//!
//! Holds the list of known partners and the currently selected one. A
//! failed roster refresh keeps the previous roster visible
//! (stale-but-valid); filtering is a pure projection and never mutates
//! stored state.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use palaver_shared::models::User;
use palaver_shared::types::UserId;

/// Pure filter settings applied over the roster.
#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    /// Show only partners in the local user's favorites set.
    pub favorites_only: bool,
    /// Case-insensitive substring match on display names.
    pub name_query: Option<String>,
}

/// Project `users` through `filter`.
pub fn filter_users<'a>(
    users: &'a [User],
    filter: &RosterFilter,
    favorites: &HashSet<UserId>,
) -> Vec<&'a User> {
    let query = filter
        .name_query
        .as_deref()
        .map(str::to_lowercase)
        .filter(|q| !q.is_empty());

    users
        .iter()
        .filter(|u| !filter.favorites_only || favorites.contains(&u.id))
        .filter(|u| {
            query
                .as_deref()
                .map_or(true, |q| u.display_name.to_lowercase().contains(q))
        })
        .collect()
}

/// Project `users` through `filter`, pairing each partner with its unread
/// count (absence in the map == zero).
pub fn filter_users_with_unread<'a>(
    users: &'a [User],
    filter: &RosterFilter,
    favorites: &HashSet<UserId>,
    unread: &HashMap<UserId, u32>,
) -> Vec<(&'a User, u32)> {
    filter_users(users, filter, favorites)
        .into_iter()
        .map(|u| (u, unread.get(&u.id).copied().unwrap_or(0)))
        .collect()
}

/// Roster of known conversation partners plus the active selection.
#[derive(Debug, Default)]
pub struct RosterDirectory {
    roster: Vec<User>,
    selected: Option<UserId>,
    loading: bool,
}

impl RosterDirectory {
    /// Create a new, empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full roster in server order.
    pub fn roster(&self) -> &[User] {
        &self.roster
    }

    /// The active partner, if a conversation is open.
    pub fn selected(&self) -> Option<UserId> {
        self.selected
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Replace the roster after a successful fetch.
    ///
    /// Failed fetches must not call this; the previous roster stays.
    pub fn replace_roster(&mut self, users: Vec<User>) {
        debug!(count = users.len(), "Roster replaced");
        self.roster = users;
    }

    /// Set the active partner (`None` closes the conversation).
    pub fn select(&mut self, partner: Option<UserId>) {
        self.selected = partner;
    }

    /// Look up a partner in the roster.
    pub fn get(&self, id: UserId) -> Option<&User> {
        self.roster.iter().find(|u| u.id == id)
    }

    /// Pure projection of the roster; see [`filter_users`].
    pub fn filter<'a>(&'a self, filter: &RosterFilter, favorites: &HashSet<UserId>) -> Vec<&'a User> {
        filter_users(&self.roster, filter, favorites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: UserId::new(),
            display_name: name.to_string(),
            avatar_url: None,
            bio: None,
        }
    }

    #[test]
    fn test_favorites_only_filter() {
        let alice = user("Alice");
        let bob = user("Bob");
        let favorites: HashSet<UserId> = [alice.id].into_iter().collect();

        let mut directory = RosterDirectory::new();
        directory.replace_roster(vec![alice.clone(), bob]);

        let filter = RosterFilter {
            favorites_only: true,
            name_query: None,
        };
        let filtered = directory.filter(&filter, &favorites);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, alice.id);
    }

    #[test]
    fn test_name_query_is_case_insensitive() {
        let mut directory = RosterDirectory::new();
        directory.replace_roster(vec![user("Alice"), user("Bob"), user("alicia")]);

        let filter = RosterFilter {
            favorites_only: false,
            name_query: Some("ALI".to_string()),
        };
        let filtered = directory.filter(&filter, &HashSet::new());

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_empty_query_matches_everyone() {
        let mut directory = RosterDirectory::new();
        directory.replace_roster(vec![user("Alice"), user("Bob")]);

        let filter = RosterFilter {
            favorites_only: false,
            name_query: Some("  ".trim().to_string()),
        };
        assert_eq!(directory.filter(&filter, &HashSet::new()).len(), 2);
    }

    #[test]
    fn test_filter_does_not_mutate_roster() {
        let mut directory = RosterDirectory::new();
        directory.replace_roster(vec![user("Alice"), user("Bob")]);

        let filter = RosterFilter {
            favorites_only: true,
            name_query: Some("nobody".to_string()),
        };
        let _ = directory.filter(&filter, &HashSet::new());

        assert_eq!(directory.roster().len(), 2);
    }

    #[test]
    fn test_filter_with_unread_pairs_counts() {
        let alice = user("Alice");
        let bob = user("Bob");
        let unread: HashMap<UserId, u32> = [(bob.id, 3)].into_iter().collect();

        let users = vec![alice.clone(), bob.clone()];
        let pairs =
            filter_users_with_unread(&users, &RosterFilter::default(), &HashSet::new(), &unread);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (&users[0], 0));
        assert_eq!(pairs[1], (&users[1], 3));
    }

    #[test]
    fn test_selection() {
        let alice = user("Alice");
        let mut directory = RosterDirectory::new();
        directory.replace_roster(vec![alice.clone()]);

        assert_eq!(directory.selected(), None);
        directory.select(Some(alice.id));
        assert_eq!(directory.selected(), Some(alice.id));
        directory.select(None);
        assert_eq!(directory.selected(), None);
    }
}

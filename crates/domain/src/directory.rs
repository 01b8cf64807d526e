use std::collections::HashMap;

use crate::user::User;

/// Registry of every user known to the server, keyed by username.
///
/// Entries are created on first login and never removed. Usernames double
/// as the handles the follow graph stores, so growth of the map can never
/// invalidate an edge.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent get-or-create: an existing entry is returned and marked
    /// connected, otherwise a fresh entry with empty edge sets is inserted.
    pub fn get_or_create(&mut self, username: &str) -> &mut User {
        let user = self
            .users
            .entry(username.to_string())
            .or_insert_with(|| User::new(username));
        user.connected = true;
        user
    }

    /// Read-only lookup; absence is not an error, callers decide.
    pub fn find(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub(crate) fn find_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.get_mut(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Every known username; order is not significant.
    pub fn all_usernames(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut directory = UserDirectory::new();

        directory.get_or_create("alice").followers.insert("bob".to_string());
        let again = directory.get_or_create("alice");

        assert!(again.is_followed_by("bob"));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn get_or_create_marks_connected() {
        let mut directory = UserDirectory::new();

        directory.get_or_create("alice").connected = false;
        assert!(directory.get_or_create("alice").connected);
    }

    #[test]
    fn find_missing_user_is_none() {
        let directory = UserDirectory::new();
        assert!(directory.find("nobody").is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A registered user. Created on first login, never deleted.
///
/// Follower and following sets hold usernames: stable handles into the
/// directory, never owning references to other entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub connected: bool,
    pub followers: HashSet<String>,
    pub following: HashSet<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            connected: true,
            followers: HashSet::new(),
            following: HashSet::new(),
        }
    }

    pub fn is_following(&self, other: &str) -> bool {
        self.following.contains(other)
    }

    pub fn is_followed_by(&self, other: &str) -> bool {
        self.followers.contains(other)
    }
}

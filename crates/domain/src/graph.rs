use crate::directory::UserDirectory;
use crate::error::{DomainError, Result};
use crate::user::User;

/// Directed follow-edge graph over the user directory.
///
/// Every mutation runs against `&mut self`, so both sides of an edge are
/// updated inside whatever critical section the caller holds: a reader can
/// never observe a half-inserted or half-removed edge.
#[derive(Debug, Default)]
pub struct SocialGraph {
    directory: UserDirectory,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn find(&self, username: &str) -> Option<&User> {
        self.directory.find(username)
    }

    /// Get-or-create on first login; a user that is already connected is
    /// rejected with `AlreadyJoined`.
    pub fn login(&mut self, username: &str) -> Result<()> {
        if let Some(user) = self.directory.find(username) {
            if user.connected {
                return Err(DomainError::AlreadyJoined {
                    username: username.to_string(),
                });
            }
        }
        self.directory.get_or_create(username);
        Ok(())
    }

    pub fn set_connected(&mut self, username: &str, connected: bool) -> Result<()> {
        let user = self
            .directory
            .find_mut(username)
            .ok_or_else(|| DomainError::UnknownUser {
                username: username.to_string(),
            })?;
        user.connected = connected;
        Ok(())
    }

    /// Inserts the edge `follower -> followee`, updating both edge sets.
    pub fn follow(&mut self, follower: &str, followee: &str) -> Result<()> {
        if follower == followee {
            return Err(DomainError::SelfFollow {
                username: follower.to_string(),
            });
        }
        self.ensure_known(follower)?;
        self.ensure_known(followee)?;

        if self
            .directory
            .find(follower)
            .is_some_and(|user| user.is_following(followee))
        {
            return Err(DomainError::AlreadyFollowing {
                follower: follower.to_string(),
                followee: followee.to_string(),
            });
        }

        if let Some(user) = self.directory.find_mut(follower) {
            user.following.insert(followee.to_string());
        }
        if let Some(user) = self.directory.find_mut(followee) {
            user.followers.insert(follower.to_string());
        }
        Ok(())
    }

    /// Removes the edge `follower -> followee` from both edge sets.
    pub fn unfollow(&mut self, follower: &str, followee: &str) -> Result<()> {
        self.ensure_known(follower)?;
        self.ensure_known(followee)?;

        if !self
            .directory
            .find(follower)
            .is_some_and(|user| user.is_following(followee))
        {
            return Err(DomainError::NotFollowing {
                follower: follower.to_string(),
                followee: followee.to_string(),
            });
        }

        if let Some(user) = self.directory.find_mut(follower) {
            user.following.remove(followee);
        }
        if let Some(user) = self.directory.find_mut(followee) {
            user.followers.remove(follower);
        }
        Ok(())
    }

    /// Owned copy of the follower set, taken under the caller's lock so it
    /// can be released before any delivery work.
    pub fn followers_of(&self, username: &str) -> Result<Vec<String>> {
        let user = self
            .directory
            .find(username)
            .ok_or_else(|| DomainError::UnknownUser {
                username: username.to_string(),
            })?;
        Ok(user.followers.iter().cloned().collect())
    }

    /// All known usernames plus the followers of `username`.
    pub fn list(&self, username: &str) -> Result<(Vec<String>, Vec<String>)> {
        let followers = self.followers_of(username)?;
        Ok((self.directory.all_usernames(), followers))
    }

    fn ensure_known(&self, username: &str) -> Result<()> {
        if self.directory.contains(username) {
            Ok(())
        } else {
            Err(DomainError::UnknownUser {
                username: username.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(users: &[&str]) -> SocialGraph {
        let mut graph = SocialGraph::new();
        for user in users {
            graph.login(user).expect("login");
        }
        graph
    }

    #[test]
    fn login_then_relogin_is_already_joined() {
        let mut graph = SocialGraph::new();

        assert!(graph.login("alice").is_ok());
        assert_eq!(
            graph.login("alice"),
            Err(DomainError::AlreadyJoined {
                username: "alice".to_string()
            })
        );
    }

    #[test]
    fn login_after_disconnect_succeeds() {
        let mut graph = graph_with(&["alice"]);

        graph.set_connected("alice", false).expect("set_connected");
        assert!(graph.login("alice").is_ok());
        assert!(graph.find("alice").expect("alice").connected);
    }

    #[test]
    fn follow_updates_both_edge_sets() {
        let mut graph = graph_with(&["alice", "bob"]);

        graph.follow("bob", "alice").expect("follow");

        assert!(graph.find("bob").expect("bob").is_following("alice"));
        assert!(graph.find("alice").expect("alice").is_followed_by("bob"));
    }

    #[test]
    fn unfollow_restores_pre_follow_state() {
        let mut graph = graph_with(&["alice", "bob"]);

        graph.follow("bob", "alice").expect("follow");
        graph.unfollow("bob", "alice").expect("unfollow");

        assert!(!graph.find("bob").expect("bob").is_following("alice"));
        assert!(!graph.find("alice").expect("alice").is_followed_by("bob"));
        assert!(graph.find("bob").expect("bob").following.is_empty());
        assert!(graph.find("alice").expect("alice").followers.is_empty());
    }

    #[test]
    fn self_follow_is_rejected_and_graph_unchanged() {
        let mut graph = graph_with(&["alice"]);

        assert_eq!(
            graph.follow("alice", "alice"),
            Err(DomainError::SelfFollow {
                username: "alice".to_string()
            })
        );
        assert!(graph.find("alice").expect("alice").following.is_empty());
        assert!(graph.find("alice").expect("alice").followers.is_empty());
    }

    #[test]
    fn follow_unknown_target_is_rejected_and_graph_unchanged() {
        let mut graph = graph_with(&["carol"]);

        assert_eq!(
            graph.follow("carol", "dave"),
            Err(DomainError::UnknownUser {
                username: "dave".to_string()
            })
        );
        assert!(graph.find("carol").expect("carol").following.is_empty());
    }

    #[test]
    fn unfollow_without_edge_is_not_following() {
        let mut graph = graph_with(&["alice", "bob"]);

        assert_eq!(
            graph.unfollow("bob", "alice"),
            Err(DomainError::NotFollowing {
                follower: "bob".to_string(),
                followee: "alice".to_string()
            })
        );
    }

    #[test]
    fn unfollow_unknown_endpoint_is_unknown_user() {
        let mut graph = graph_with(&["bob"]);

        assert_eq!(
            graph.unfollow("bob", "ghost"),
            Err(DomainError::UnknownUser {
                username: "ghost".to_string()
            })
        );
    }

    #[test]
    fn duplicate_follow_is_already_following() {
        let mut graph = graph_with(&["alice", "bob"]);

        graph.follow("bob", "alice").expect("follow");
        assert_eq!(
            graph.follow("bob", "alice"),
            Err(DomainError::AlreadyFollowing {
                follower: "bob".to_string(),
                followee: "alice".to_string()
            })
        );
    }

    #[test]
    fn list_returns_all_users_and_exact_followers() {
        let mut graph = graph_with(&["alice", "bob", "carol"]);

        graph.follow("bob", "alice").expect("follow");
        graph.follow("carol", "alice").expect("follow");

        let (mut all_users, mut followers) = graph.list("alice").expect("list");
        all_users.sort();
        followers.sort();

        assert_eq!(all_users, vec!["alice", "bob", "carol"]);
        assert_eq!(followers, vec!["bob", "carol"]);
    }

    #[test]
    fn list_unknown_user_is_unknown_user() {
        let graph = SocialGraph::new();
        assert_eq!(
            graph.list("nobody"),
            Err(DomainError::UnknownUser {
                username: "nobody".to_string()
            })
        );
    }

    #[test]
    fn followers_of_copies_current_set() {
        let mut graph = graph_with(&["alice", "bob"]);
        graph.follow("bob", "alice").expect("follow");

        let snapshot = graph.followers_of("alice").expect("followers");
        graph.unfollow("bob", "alice").expect("unfollow");

        assert_eq!(snapshot, vec!["bob".to_string()]);
        assert!(graph.followers_of("alice").expect("followers").is_empty());
    }
}

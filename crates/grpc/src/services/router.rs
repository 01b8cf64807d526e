//! Session registry and post fan-out.
//!
//! Each streaming user owns one bounded channel registered here. `publish`
//! copies the follower set under the graph lock, releases it, then delivers
//! best-effort: a slow, closed or absent follower channel never blocks
//! delivery to the others.

use std::collections::HashMap;
use std::sync::Arc;

use sns_domain::{Result as DomainResult, SocialGraph};
use sns_proto::Post;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Outbound buffer per timeline session.
pub const SESSION_BUFFER: usize = 64;

/// Manages live timeline sessions and broadcasts posts to followers.
#[derive(Clone)]
pub struct BroadcastRouter {
    graph: Arc<RwLock<SocialGraph>>,
    sessions: Arc<RwLock<HashMap<String, mpsc::Sender<Post>>>>,
}

impl BroadcastRouter {
    pub fn new(graph: Arc<RwLock<SocialGraph>>) -> Self {
        Self {
            graph,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the live output channel for `username`. A later attach
    /// wins: the previous channel, if any, is dropped and its session
    /// counts as detached. Fails for a user that never logged in, keeping
    /// the session-implies-connected invariant.
    pub async fn attach(&self, username: &str, tx: mpsc::Sender<Post>) -> DomainResult<()> {
        self.graph.write().await.set_connected(username, true)?;
        let previous = self.sessions.write().await.insert(username.to_string(), tx);
        if previous.is_some() {
            debug!(%username, "timeline session replaced");
        }
        Ok(())
    }

    /// Clears the session if `tx` is still the registered channel, so a
    /// teardown of a replaced session never detaches its successor.
    /// Idempotent and safe to race with `publish`.
    pub async fn detach(&self, username: &str, tx: &mpsc::Sender<Post>) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            match sessions.get(username) {
                Some(current) if current.same_channel(tx) => {
                    sessions.remove(username);
                    true
                }
                _ => false,
            }
        };
        if removed {
            if let Err(err) = self.graph.write().await.set_connected(username, false) {
                warn!(%username, %err, "detach for unknown user");
            }
            debug!(%username, "timeline session detached");
        }
    }

    pub async fn is_attached(&self, username: &str) -> bool {
        self.sessions.read().await.contains_key(username)
    }

    /// Fans `post` out to every follower of `sender` with an attached
    /// session and returns the delivery count. A follower without a session
    /// is skipped, a follower with a full buffer loses this post rather
    /// than stalling the rest, and a closed channel gets its session
    /// pruned. Posts from one sender to one follower keep send order.
    pub async fn publish(&self, sender: &str, post: Post) -> usize {
        // Copy the follower set under the lock, then release it: delivery
        // must never hold up graph mutations.
        let followers = match self.graph.read().await.followers_of(sender) {
            Ok(followers) => followers,
            Err(err) => {
                warn!(%sender, %err, "post from unknown sender dropped");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for follower in &followers {
                let Some(tx) = sessions.get(follower) else {
                    // No attached session: a normal skip, not an error.
                    continue;
                };
                match tx.try_send(post.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(%follower, "timeline buffer full, post dropped for follower");
                    }
                    Err(TrySendError::Closed(_)) => stale.push(follower.clone()),
                }
            }
        }

        if !stale.is_empty() {
            self.prune(&stale).await;
        }
        delivered
    }

    /// Removes sessions whose channel closed, unless a new session was
    /// attached for that user in the meantime.
    async fn prune(&self, usernames: &[String]) {
        let mut disconnected = Vec::new();
        {
            let mut sessions = self.sessions.write().await;
            for username in usernames {
                if sessions.get(username).is_some_and(|tx| tx.is_closed()) {
                    sessions.remove(username);
                    disconnected.push(username.clone());
                }
            }
        }
        for username in disconnected {
            if let Err(err) = self.graph.write().await.set_connected(&username, false) {
                warn!(%username, %err, "prune for unknown user");
            }
            debug!(%username, "stale timeline session pruned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn graph_with(users: &[&str], edges: &[(&str, &str)]) -> Arc<RwLock<SocialGraph>> {
        let mut graph = SocialGraph::new();
        for user in users {
            graph.login(user).expect("login");
        }
        for (follower, followee) in edges {
            graph.follow(follower, followee).expect("follow");
        }
        Arc::new(RwLock::new(graph))
    }

    fn post(author: &str, text: &str) -> Post {
        Post {
            author: author.to_string(),
            text: text.to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn publish_reaches_attached_followers_only() {
        let graph = graph_with(
            &["alice", "bob", "carol", "dave"],
            &[("bob", "alice"), ("carol", "alice")],
        );
        let router = BroadcastRouter::new(graph);

        // bob is attached and follows alice; dave is attached but does not
        // follow her; carol follows her but never attached.
        let (bob_tx, mut bob_rx) = mpsc::channel(8);
        router.attach("bob", bob_tx).await.expect("attach");
        let (dave_tx, mut dave_rx) = mpsc::channel(8);
        router.attach("dave", dave_tx).await.expect("attach");

        let delivered = router.publish("alice", post("alice", "hi")).await;
        assert_eq!(delivered, 1);

        let received = bob_rx.recv().await.expect("bob receives");
        assert_eq!(received.author, "alice");
        assert_eq!(received.text, "hi");

        let nothing = tokio::time::timeout(Duration::from_millis(50), dave_rx.recv()).await;
        assert!(nothing.is_err(), "dave must not receive alice's post");
    }

    #[tokio::test]
    async fn no_delivery_after_detach() {
        let graph = graph_with(&["alice", "bob"], &[("bob", "alice")]);
        let router = BroadcastRouter::new(graph.clone());

        let (bob_tx, mut bob_rx) = mpsc::channel(8);
        router.attach("bob", bob_tx.clone()).await.expect("attach");
        router.detach("bob", &bob_tx).await;
        // idempotent
        router.detach("bob", &bob_tx).await;

        let delivered = router.publish("alice", post("alice", "bye")).await;
        assert_eq!(delivered, 0);

        let nothing = tokio::time::timeout(Duration::from_millis(50), bob_rx.recv()).await;
        assert!(nothing.is_err() || nothing.expect("recv").is_none());
        assert!(!graph.read().await.find("bob").expect("bob").connected);
    }

    #[tokio::test]
    async fn later_attach_wins_and_stale_detach_is_ignored() {
        let graph = graph_with(&["alice", "bob"], &[("bob", "alice")]);
        let router = BroadcastRouter::new(graph);

        let (old_tx, _old_rx) = mpsc::channel(8);
        router.attach("bob", old_tx.clone()).await.expect("attach");
        let (new_tx, mut new_rx) = mpsc::channel(8);
        router.attach("bob", new_tx).await.expect("attach");

        // teardown of the replaced session must not touch the new one
        router.detach("bob", &old_tx).await;
        assert!(router.is_attached("bob").await);

        router.publish("alice", post("alice", "still here")).await;
        let received = new_rx.recv().await.expect("new session receives");
        assert_eq!(received.text, "still here");
    }

    #[tokio::test]
    async fn closed_channel_is_pruned_without_failing_others() {
        let graph = graph_with(
            &["alice", "bob", "carol"],
            &[("bob", "alice"), ("carol", "alice")],
        );
        let router = BroadcastRouter::new(graph.clone());

        let (bob_tx, bob_rx) = mpsc::channel(8);
        router.attach("bob", bob_tx).await.expect("attach");
        drop(bob_rx); // bob's client went away without detaching

        let (carol_tx, mut carol_rx) = mpsc::channel(8);
        router.attach("carol", carol_tx).await.expect("attach");

        let delivered = router.publish("alice", post("alice", "hi")).await;
        assert_eq!(delivered, 1);
        assert_eq!(carol_rx.recv().await.expect("carol receives").text, "hi");

        assert!(!router.is_attached("bob").await);
        assert!(!graph.read().await.find("bob").expect("bob").connected);
    }

    #[tokio::test]
    async fn full_buffer_drops_post_instead_of_blocking() {
        let graph = graph_with(&["alice", "bob"], &[("bob", "alice")]);
        let router = BroadcastRouter::new(graph);

        let (bob_tx, mut bob_rx) = mpsc::channel(1);
        router.attach("bob", bob_tx).await.expect("attach");

        assert_eq!(router.publish("alice", post("alice", "one")).await, 1);
        // buffer is full now; this must return immediately with no delivery
        assert_eq!(router.publish("alice", post("alice", "two")).await, 0);

        assert_eq!(bob_rx.recv().await.expect("first post").text, "one");
    }

    #[tokio::test]
    async fn posts_per_sender_keep_send_order() {
        let graph = graph_with(&["alice", "bob"], &[("bob", "alice")]);
        let router = BroadcastRouter::new(graph);

        let (bob_tx, mut bob_rx) = mpsc::channel(8);
        router.attach("bob", bob_tx).await.expect("attach");

        for text in ["first", "second", "third"] {
            router.publish("alice", post("alice", text)).await;
        }

        assert_eq!(bob_rx.recv().await.expect("recv").text, "first");
        assert_eq!(bob_rx.recv().await.expect("recv").text, "second");
        assert_eq!(bob_rx.recv().await.expect("recv").text, "third");
    }

    #[tokio::test]
    async fn attach_unknown_user_fails() {
        let graph = graph_with(&[], &[]);
        let router = BroadcastRouter::new(graph);

        let (tx, _rx) = mpsc::channel(8);
        assert!(router.attach("ghost", tx).await.is_err());
        assert!(!router.is_attached("ghost").await);
    }

    #[tokio::test]
    async fn detach_races_with_publish() {
        let graph = graph_with(&["alice", "bob"], &[("bob", "alice")]);
        let router = BroadcastRouter::new(graph);

        let (bob_tx, mut bob_rx) = mpsc::channel(64);
        router.attach("bob", bob_tx.clone()).await.expect("attach");

        let publisher = {
            let router = router.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    router.publish("alice", post("alice", &format!("p{i}"))).await;
                }
            })
        };
        let detacher = {
            let router = router.clone();
            tokio::spawn(async move {
                router.detach("bob", &bob_tx).await;
            })
        };

        publisher.await.expect("publisher");
        detacher.await.expect("detacher");

        // bob is detached; whatever was delivered before the detach is
        // still readable, but nothing arrives afterwards.
        assert!(!router.is_attached("bob").await);
        let drained = router.publish("alice", post("alice", "late")).await;
        assert_eq!(drained, 0);
        while let Ok(Some(received)) =
            tokio::time::timeout(Duration::from_millis(20), bob_rx.recv()).await
        {
            assert_ne!(received.text, "late");
        }
    }
}

//! Error taxonomy shared by the graph and the RPC adapter.

/// Failures of graph and session operations. Every variant is reported to
/// the caller as a typed result; none of them corrupts shared state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown user: {username}")]
    UnknownUser { username: String },

    #[error("{username} cannot follow themselves")]
    SelfFollow { username: String },

    #[error("{follower} already follows {followee}")]
    AlreadyFollowing { follower: String, followee: String },

    #[error("{follower} does not follow {followee}")]
    NotFollowing { follower: String, followee: String },

    #[error("{username} has already joined")]
    AlreadyJoined { username: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;

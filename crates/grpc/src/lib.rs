//! gRPC adapter for the SNS social network.
//!
//! This crate bridges the tonic transport to the domain model in
//! `sns-domain`:
//!
//! ```text
//! gRPC Request → [grpc adapter] → SocialGraph / BroadcastRouter → Response
//! ```

pub mod services;

// Re-export proto types for convenience
pub use sns_proto::*;

use sns_domain::DomainError;
use tonic::Status;

/// Maps domain failures that have no reply-status representation onto a
/// classified gRPC status. Nothing escapes as an unclassified failure.
pub fn to_status(err: DomainError) -> Status {
    match err {
        DomainError::UnknownUser { .. } => Status::not_found(err.to_string()),
        DomainError::SelfFollow { .. }
        | DomainError::AlreadyFollowing { .. }
        | DomainError::NotFollowing { .. }
        | DomainError::AlreadyJoined { .. } => Status::failed_precondition(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_maps_to_not_found() {
        let status = to_status(DomainError::UnknownUser {
            username: "ghost".to_string(),
        });
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("ghost"));
    }

    #[test]
    fn edge_failures_map_to_failed_precondition() {
        let status = to_status(DomainError::SelfFollow {
            username: "alice".to_string(),
        });
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status = to_status(DomainError::NotFollowing {
            follower: "bob".to_string(),
            followee: "alice".to_string(),
        });
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }
}

//! Domain model for the SNS social network.
//!
//! Pure synchronous state: the user directory, the follow-edge graph and
//! the shared error taxonomy. The domain performs no locking and knows
//! nothing about transports; concurrency is applied by the layer that owns
//! the store (see `sns-grpc`).

pub mod directory;
pub mod error;
pub mod graph;
pub mod user;

pub use directory::UserDirectory;
pub use error::{DomainError, Result};
pub use graph::SocialGraph;
pub use user::User;

//! gRPC service implementations.
//!
//! Adapters between the tonic transport layer and the domain model: the
//! request handlers and the broadcast router that fans posts out to live
//! timeline sessions.

pub mod router;
pub mod sns;

pub use router::BroadcastRouter;
pub use sns::SnsServiceImpl;

//! Generated Protocol Buffer types for the SNS service.
//!
//! This crate contains the generated Rust types from the Protocol Buffer
//! definition of the social network service: messages, the service trait
//! and the client stub.
//!
//! Service implementations are in `sns-grpc`.

include!("generated/sns.rs");

/// File descriptor set for gRPC reflection
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("generated/sns_descriptor.bin");

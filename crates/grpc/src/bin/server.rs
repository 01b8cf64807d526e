//! SNS gRPC Server
//!
//! Main entry point for the gRPC server.

use std::env;

use sns_grpc::services::SnsServiceImpl;
use sns_proto::sns_service_server::SnsServiceServer;
use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Get port from environment or default
    let port = env::var("SNS_PORT").unwrap_or_else(|_| "3010".to_string());
    let addr = format!("0.0.0.0:{}", port).parse()?;

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(sns_proto::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let sns_service = SnsServiceImpl::new();

    info!("SNS server listening on {}", addr);

    Server::builder()
        .add_service(reflection_service)
        .add_service(SnsServiceServer::new(sns_service))
        .serve(addr)
        .await?;

    Ok(())
}

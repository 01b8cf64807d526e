//! SNS gRPC service implementation.
//!
//! Unary handlers are thin mutations/queries over the shared graph; the
//! `Timeline` handler owns the duplex session: an inbound drain task that
//! publishes client posts and an outbound forwarder that pushes router
//! deliveries back to the client. Either side ending tears the session
//! down and detaches it.

use std::pin::Pin;
use std::sync::Arc;

use sns_domain::{DomainError, SocialGraph};
use tokio::sync::{mpsc, RwLock};
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use sns_proto::{
    sns_service_server::SnsService, FollowReply, FollowRequest, FollowStatus, ListReply,
    ListRequest, LoginReply, LoginRequest, LoginStatus, Post, UnFollowReply, UnFollowRequest,
    UnFollowStatus,
};

use crate::services::router::{BroadcastRouter, SESSION_BUFFER};

#[derive(Clone)]
pub struct SnsServiceImpl {
    graph: Arc<RwLock<SocialGraph>>,
    router: BroadcastRouter,
}

impl SnsServiceImpl {
    pub fn new() -> Self {
        let graph = Arc::new(RwLock::new(SocialGraph::new()));
        let router = BroadcastRouter::new(graph.clone());
        Self { graph, router }
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    fn now_timestamp() -> prost_types::Timestamp {
        let now = chrono::Utc::now();
        prost_types::Timestamp {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() as i32,
        }
    }

    fn require(field: &str, value: &str) -> Result<(), Status> {
        if value.is_empty() {
            Err(Status::invalid_argument(format!("{field} is required")))
        } else {
            Ok(())
        }
    }
}

impl Default for SnsServiceImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[tonic::async_trait]
impl SnsService for SnsServiceImpl {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginReply>, Status> {
        let req = request.into_inner();
        Self::require("username", &req.username)?;

        let reply = match self.graph.write().await.login(&req.username) {
            Ok(()) => {
                info!(username = %req.username, "user logged in");
                LoginReply {
                    status: LoginStatus::Success as i32,
                    message: "login successful".to_string(),
                }
            }
            Err(err @ DomainError::AlreadyJoined { .. }) => LoginReply {
                status: LoginStatus::AlreadyJoined as i32,
                message: err.to_string(),
            },
            Err(err) => return Err(crate::to_status(err)),
        };
        Ok(Response::new(reply))
    }

    async fn follow(
        &self,
        request: Request<FollowRequest>,
    ) -> Result<Response<FollowReply>, Status> {
        let req = request.into_inner();
        Self::require("username", &req.username)?;
        Self::require("target", &req.target)?;

        let reply = match self.graph.write().await.follow(&req.username, &req.target) {
            Ok(()) => {
                info!(follower = %req.username, followee = %req.target, "follow");
                FollowReply {
                    status: FollowStatus::Success as i32,
                    message: "follow successful".to_string(),
                }
            }
            Err(err) => {
                let status = match &err {
                    DomainError::UnknownUser { .. } => FollowStatus::InvalidTarget,
                    DomainError::SelfFollow { .. } => FollowStatus::SelfFollow,
                    DomainError::AlreadyFollowing { .. } => FollowStatus::AlreadyFollowing,
                    _ => return Err(crate::to_status(err)),
                };
                FollowReply {
                    status: status as i32,
                    message: err.to_string(),
                }
            }
        };
        Ok(Response::new(reply))
    }

    async fn un_follow(
        &self,
        request: Request<UnFollowRequest>,
    ) -> Result<Response<UnFollowReply>, Status> {
        let req = request.into_inner();
        Self::require("username", &req.username)?;
        Self::require("target", &req.target)?;

        let reply = match self.graph.write().await.unfollow(&req.username, &req.target) {
            Ok(()) => {
                info!(follower = %req.username, followee = %req.target, "unfollow");
                UnFollowReply {
                    status: UnFollowStatus::Success as i32,
                    message: "unfollow successful".to_string(),
                }
            }
            Err(err) => {
                let status = match &err {
                    DomainError::UnknownUser { .. } => UnFollowStatus::InvalidTarget,
                    DomainError::NotFollowing { .. } => UnFollowStatus::NotFollowing,
                    _ => return Err(crate::to_status(err)),
                };
                UnFollowReply {
                    status: status as i32,
                    message: err.to_string(),
                }
            }
        };
        Ok(Response::new(reply))
    }

    async fn list(&self, request: Request<ListRequest>) -> Result<Response<ListReply>, Status> {
        let req = request.into_inner();
        Self::require("username", &req.username)?;

        let (all_users, followers) = self
            .graph
            .read()
            .await
            .list(&req.username)
            .map_err(crate::to_status)?;

        Ok(Response::new(ListReply {
            all_users,
            followers,
        }))
    }

    type TimelineStream = Pin<Box<dyn Stream<Item = Result<Post, Status>> + Send>>;

    async fn timeline(
        &self,
        request: Request<Streaming<Post>>,
    ) -> Result<Response<Self::TimelineStream>, Status> {
        let mut inbound = request.into_inner();
        let graph = self.graph.clone();
        let router = self.router.clone();

        // Channel feeding the outbound half of the duplex stream.
        let (out_tx, out_rx) = mpsc::channel::<Result<Post, Status>>(SESSION_BUFFER);

        tokio::spawn(async move {
            // Bound once the first inbound post identifies the author.
            let mut session: Option<(String, mpsc::Sender<Post>)> = None;

            while let Some(next) = inbound.next().await {
                let mut post = match next {
                    Ok(post) => post,
                    Err(err) => {
                        debug!(%err, "timeline stream error");
                        break;
                    }
                };

                if session.is_none() {
                    let author = post.author.clone();
                    if graph.read().await.find(&author).is_none() {
                        warn!(%author, "timeline post from unknown user skipped");
                        continue;
                    }

                    let (session_tx, mut session_rx) = mpsc::channel::<Post>(SESSION_BUFFER);
                    if let Err(err) = router.attach(&author, session_tx.clone()).await {
                        warn!(%author, %err, "timeline attach failed");
                        continue;
                    }
                    info!(username = %author, "timeline session attached");

                    // Outbound forwarder: pushes router deliveries to the
                    // client and detaches when the client side goes away.
                    // It holds only a weak handle so a drained session
                    // channel actually closes.
                    let forward_tx = out_tx.clone();
                    let forward_router = router.clone();
                    let forward_user = author.clone();
                    let forward_session = session_tx.downgrade();
                    tokio::spawn(async move {
                        while let Some(post) = session_rx.recv().await {
                            if forward_tx.send(Ok(post)).await.is_err() {
                                break;
                            }
                        }
                        if let Some(session_tx) = forward_session.upgrade() {
                            forward_router.detach(&forward_user, &session_tx).await;
                        }
                    });

                    session = Some((author, session_tx));
                }

                let Some((author, _)) = session.as_ref() else {
                    continue;
                };
                // The session owner is the author, whatever the client put
                // in the post; stamp receipt time when the client sent none.
                post.author = author.clone();
                if post.timestamp.is_none() {
                    post.timestamp = Some(Self::now_timestamp());
                }
                router.publish(author, post).await;
            }

            // Inbound side ended: tear the session down. Dropping our
            // sender lets the forwarder drain and exit.
            if let Some((author, session_tx)) = session {
                router.detach(&author, &session_tx).await;
                info!(username = %author, "timeline session closed");
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(out_rx))))
    }
}

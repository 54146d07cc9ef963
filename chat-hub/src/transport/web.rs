//! WebSocket transport plus the landing page that opens it.
//!
//! `GET /` serves a static chat page; `GET /ws?name=<name>` upgrades to a
//! WebSocket where every text frame is one chat message.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        ConnectInfo, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Deserialize;
use tokio::{sync::Mutex, time::timeout};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{
    boundary::validate_name,
    config::Limits,
    error::SendError,
    hub::HubHandle,
    notice,
    participant::{Inbound, Lifecycle, Participant, ParticipantId, Transport},
};

const LANDING_PAGE: &str = include_str!("landing.html");

/// How long a terminating participant waits for its close frame to go out.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Clone)]
struct WebState {
    hub: HubHandle,
    limits: Limits,
}

#[derive(Debug, Deserialize)]
struct JoinParams {
    name: Option<String>,
}

/// Builds the HTTP router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()` so peers can be named.
pub fn router(hub: HubHandle, limits: Limits) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/ws", get(upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(WebState { hub, limits })
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<JoinParams>,
    State(state): State<WebState>,
) -> Response {
    let requested = params
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("guest-{}", peer.port()));

    let name = match validate_name(&requested, &state.limits) {
        Ok(name) => name,
        Err(error) => {
            warn!(%peer, ?error, "refusing websocket join");
            return (StatusCode::BAD_REQUEST, notice::name_rejected(&error)).into_response();
        }
    };

    ws.on_upgrade(move |socket| join(socket, name, peer, state.hub))
}

async fn join(socket: WebSocket, name: String, peer: SocketAddr, hub: HubHandle) {
    info!(%peer, %name, "websocket client connected");
    let participant = WebParticipant::new(name, peer, socket);
    if let Err(err) = hub.arrive(Arc::new(participant)) {
        warn!(%peer, error = ?err, "hub stopped before the participant could join");
    }
}

pub struct WebParticipant {
    id: ParticipantId,
    name: String,
    peer: SocketAddr,
    sink: Mutex<Option<SplitSink<WebSocket, Message>>>,
    stream: Mutex<Option<SplitStream<WebSocket>>>,
    lifecycle: Lifecycle,
}

impl WebParticipant {
    pub fn new(name: String, peer: SocketAddr, socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self {
            id: ParticipantId::next(),
            name,
            peer,
            sink: Mutex::new(Some(sink)),
            stream: Mutex::new(Some(stream)),
            lifecycle: Lifecycle::default(),
        }
    }
}

#[async_trait]
impl Participant for WebParticipant {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transport(&self) -> Transport {
        Transport::WebSocket
    }

    async fn send(&self, text: &str) -> Result<(), SendError> {
        if self.lifecycle.is_terminated() {
            return Err(SendError::Closed);
        }
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(SendError::Closed)?;
        sink.send(Message::Text(text.to_owned())).await?;
        Ok(())
    }

    async fn receive_loop(&self, inbound: Inbound) {
        let Some(mut stream) = self.stream.lock().await.take() else {
            warn!(name = %self.name, participant = %self.id, "receive loop already ran");
            return;
        };

        loop {
            let frame = tokio::select! {
                () = self.lifecycle.closed() => break,
                frame = inbound.within_idle(stream.next()) => frame,
            };

            match frame {
                Some(Some(Ok(Message::Text(text)))) => {
                    if inbound.offer(self, &text).await.is_break() {
                        break;
                    }
                }
                Some(Some(Ok(Message::Binary(_)))) => {
                    debug!(name = %self.name, "ignoring binary frame");
                }
                Some(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
                Some(Some(Ok(Message::Close(_)))) | Some(None) => {
                    debug!(name = %self.name, peer = %self.peer, "websocket closed");
                    break;
                }
                Some(Some(Err(error))) => {
                    debug!(name = %self.name, peer = %self.peer, ?error, "websocket read failed");
                    break;
                }
                None => {
                    info!(name = %self.name, peer = %self.peer, "idle timeout reached");
                    break;
                }
            }
        }
    }

    async fn terminate(&self) {
        if !self.lifecycle.begin_termination() {
            return;
        }

        if let Ok(mut sink) = self.sink.try_lock() {
            if let Some(mut sink) = sink.take() {
                match timeout(CLOSE_GRACE, sink.close()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => debug!(name = %self.name, ?error, "failed to close websocket"),
                    Err(_) => debug!(name = %self.name, "websocket close timed out"),
                }
            }
        }
        if let Ok(mut stream) = self.stream.try_lock() {
            *stream = None;
        }
    }
}

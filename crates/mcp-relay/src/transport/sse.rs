//! SSE transport: HTTP server with an event stream per connection, auth, and /health.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tower_http::cors::CorsLayer;

use crate::protocol::codec::{self, Malformed};
use crate::protocol::Dispatcher;
use crate::session::{SessionId, TransportKind};
use crate::types::{Inbound, JsonRpcRequest, McpError, McpResult, RequestId};

use super::auth::{AllowAll, CredentialCheck};
use super::{ChannelSink, FrameSink};

/// Event name of the first event on every stream.
pub const ENDPOINT_EVENT: &str = "endpoint";
/// Event name for responses and notifications.
pub const MESSAGE_EVENT: &str = "message";
/// Default per-connection queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

type Queued = Result<JsonRpcRequest, Malformed>;

struct Connection {
    inbound: mpsc::Sender<Queued>,
}

/// Open push connections and their request queues.
///
/// Each connection has one worker that drains its queue in arrival order, so
/// requests on one connection are serialized while separate connections run
/// concurrently.
pub struct ConnectionHub {
    dispatcher: Arc<Dispatcher>,
    connections: DashMap<SessionId, Connection>,
    queue_depth: usize,
}

impl ConnectionHub {
    pub fn new(dispatcher: Arc<Dispatcher>, queue_depth: usize) -> Self {
        Self {
            dispatcher,
            connections: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Open a connection. The receiver yields every frame destined for it.
    pub fn connect(self: &Arc<Self>) -> (SessionId, mpsc::Receiver<String>) {
        let session = self.dispatcher.open_session(TransportKind::PushStream);
        let (out_tx, out_rx) = mpsc::channel(self.queue_depth);
        let (in_tx, in_rx) = mpsc::channel(self.queue_depth);

        self.connections
            .insert(session.clone(), Connection { inbound: in_tx });
        tokio::spawn(drain(
            self.clone(),
            session.clone(),
            in_rx,
            Arc::new(ChannelSink::new(out_tx)),
        ));

        tracing::info!(session = %session, "SSE connection opened");
        (session, out_rx)
    }

    /// Accept one frame for a connection.
    ///
    /// Notifications take effect immediately so a cancellation can overtake
    /// queued work; requests wait their turn.
    pub fn submit(&self, session: &SessionId, frame: &[u8]) -> McpResult<()> {
        let inbound = self
            .connections
            .get(session)
            .map(|c| c.inbound.clone())
            .ok_or_else(|| McpError::SessionNotFound(session.to_string()))?;

        let queued = match codec::decode(frame) {
            Ok(Inbound::Notification(notification)) => {
                self.dispatcher.handle_notification(session, notification);
                return Ok(());
            }
            Ok(Inbound::Request(request)) => Ok(request),
            Err(malformed) if malformed.id.is_none() => {
                tracing::warn!(session = %session, "Dropping malformed message: {malformed}");
                return Err(malformed.error);
            }
            Err(malformed) => Err(malformed),
        };

        inbound.try_send(queued).map_err(|e| match e {
            TrySendError::Full(_) => {
                McpError::Transport(format!("request queue full ({} pending)", self.queue_depth))
            }
            TrySendError::Closed(_) => McpError::ConnectionClosed,
        })
    }

    /// Remove a connection, cancelling its in-flight work and closing its session.
    pub fn disconnect(&self, session: &SessionId) -> bool {
        let removed = self.connections.remove(session).is_some();
        if removed {
            self.dispatcher.close_session(session);
            tracing::info!(session = %session, "SSE connection closed");
        }
        removed
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        self.connections.contains_key(session)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

/// Per-connection worker.
async fn drain(
    hub: Arc<ConnectionHub>,
    session: SessionId,
    mut queue: mpsc::Receiver<Queued>,
    events: Arc<ChannelSink>,
) {
    while let Some(item) = queue.recv().await {
        let reply = match item {
            Ok(request) => {
                let sink: Arc<dyn FrameSink> = events.clone();
                hub.dispatcher.dispatch(&session, request, Some(sink)).await
            }
            Err(malformed) => {
                tracing::warn!(session = %session, "Malformed message: {malformed}");
                malformed.to_reply()
            }
        };

        if let Some(reply) = reply {
            if events.send(codec::encode(&reply)).await.is_err() {
                tracing::debug!(session = %session, "Event stream gone, dropping reply");
                break;
            }
        }

        if hub.dispatcher.is_closed(&session) {
            break;
        }
    }
    hub.disconnect(&session);
}

/// Disconnects when the event stream is dropped by the server.
struct StreamGuard {
    hub: Arc<ConnectionHub>,
    session: SessionId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.hub.disconnect(&self.session);
    }
}

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub hub: Arc<ConnectionHub>,
    pub credentials: Arc<dyn CredentialCheck>,
}

/// SSE transport for web-based MCP clients.
pub struct SseTransport {
    state: Arc<ServerState>,
}

impl SseTransport {
    /// Transport with no credential check.
    pub fn new(dispatcher: Arc<Dispatcher>, queue_depth: usize) -> Self {
        Self::with_credentials(dispatcher, queue_depth, Arc::new(AllowAll))
    }

    pub fn with_credentials(
        dispatcher: Arc<Dispatcher>,
        queue_depth: usize,
        credentials: Arc<dyn CredentialCheck>,
    ) -> Self {
        Self {
            state: Arc::new(ServerState {
                hub: Arc::new(ConnectionHub::new(dispatcher, queue_depth)),
                credentials,
            }),
        }
    }

    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.state.hub
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("SSE transport listening on {addr}");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Build the HTTP routes. `/health` bypasses the credential check.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/sse", get(handle_stream))
        .route("/message", post(handle_message))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, error: &McpError) -> Response {
    (status, AxumJson(error.to_json_rpc_error(RequestId::Null))).into_response()
}

async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !state.credentials.verify(authorization) {
        tracing::warn!("Rejected request to {}: bad credentials", request.uri().path());
        return error_response(StatusCode::UNAUTHORIZED, &McpError::Unauthorized);
    }

    next.run(request).await
}

async fn handle_stream(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session, mut frames) = state.hub.connect();
    let guard = StreamGuard {
        hub: state.hub.clone(),
        session: session.clone(),
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default()
            .event(ENDPOINT_EVENT)
            .data(format!("/message?sessionId={session}")));
        while let Some(frame) = frames.recv().await {
            yield Ok(Event::default().event(MESSAGE_EVENT).data(frame));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn handle_message(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let session = SessionId::from(query.session_id);

    match state.hub.submit(&session, &body) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e @ McpError::SessionNotFound(_)) => error_response(StatusCode::NOT_FOUND, &e),
        Err(e @ McpError::ConnectionClosed) => error_response(StatusCode::GONE, &e),
        Err(e @ McpError::Transport(_)) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e),
    }
}

/// Health check endpoint: no auth required.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.hub.count(),
        "tools": state.hub.dispatcher().registry().len(),
    }))
}

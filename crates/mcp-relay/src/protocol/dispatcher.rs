//! Request dispatcher: resolves, validates, and invokes tools for a session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use crate::session::{SessionId, SessionInfo, SessionManager, SessionState, TransportKind};
use crate::tools::{CallContext, ToolRegistry};
use crate::transport::FrameSink;
use crate::types::*;

use super::codec;
use super::inflight::InFlight;
use super::negotiation;

/// Default handler deadline.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Deadline for a handler without its own override.
    pub handler_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

/// What a routed request produced.
enum Outcome {
    Reply(Value),
    /// The client cancelled the request; it gets no reply.
    Cancelled,
}

/// Routes decoded requests for every session.
///
/// Holds the registry read-only and the session table for brief, per-session
/// mutations; no lock is ever held while a handler runs.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
    inflight: InFlight,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionManager>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            registry,
            sessions,
            inflight: InFlight::new(),
            options,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn open_session(&self, transport: TransportKind) -> SessionId {
        self.sessions.open(transport)
    }

    /// Tear down a session and signal anything it still has running.
    pub fn close_session(&self, session: &SessionId) -> Option<SessionInfo> {
        let cancelled = self.inflight.cancel_session(session);
        if cancelled > 0 {
            tracing::debug!(session = %session, "Cancelled {cancelled} in-flight request(s) on close");
        }
        self.sessions.close(session)
    }

    /// True once the session has reached `Closed` (or is gone).
    pub fn is_closed(&self, session: &SessionId) -> bool {
        self.sessions
            .info(session)
            .map_or(true, |info| info.state == SessionState::Closed)
    }

    /// Decode one frame and handle it. Returns the encoded reply, if any.
    pub async fn handle_frame(
        &self,
        session: &SessionId,
        frame: &[u8],
        events: Option<Arc<dyn FrameSink>>,
    ) -> Option<String> {
        match codec::decode(frame) {
            Ok(Inbound::Request(request)) => self
                .dispatch(session, request, events)
                .await
                .map(|reply| codec::encode(&reply)),
            Ok(Inbound::Notification(notification)) => {
                self.handle_notification(session, notification);
                None
            }
            Err(malformed) => match malformed.to_reply() {
                Some(reply) => {
                    tracing::warn!(session = %session, "Malformed message: {malformed}");
                    Some(codec::encode(&reply))
                }
                None => {
                    tracing::warn!(session = %session, "Dropping malformed message: {malformed}");
                    None
                }
            },
        }
    }

    /// Handle one request. `None` only when the client cancelled it.
    pub async fn dispatch(
        &self,
        session: &SessionId,
        request: JsonRpcRequest,
        events: Option<Arc<dyn FrameSink>>,
    ) -> Option<JsonRpcReply> {
        let id = request.id.clone();
        let method = request.method.clone();
        let started = Instant::now();

        let outcome = self.route(session, request, events).await;

        tracing::debug!(
            session = %session,
            id = %id,
            method = %method,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Request handled"
        );

        match outcome {
            Ok(Outcome::Reply(result)) => {
                Some(JsonRpcReply::Success(JsonRpcResponse::new(id, result)))
            }
            Ok(Outcome::Cancelled) => None,
            Err(e) => {
                match &e {
                    McpError::HandlerFailure { .. } | McpError::HandlerTimeout { .. } => {
                        tracing::warn!(session = %session, id = %id, "{e}")
                    }
                    _ => tracing::debug!(session = %session, id = %id, "{e}"),
                }
                Some(JsonRpcReply::Error(e.to_json_rpc_error(id)))
            }
        }
    }

    pub fn handle_notification(&self, session: &SessionId, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            INITIALIZED_METHOD | "initialized" => {
                if let Err(e) = self.sessions.with_session(session, |s| s.acknowledge()) {
                    tracing::warn!("Failed to mark initialized: {e}");
                } else {
                    tracing::info!(session = %session, "MCP handshake acknowledged");
                }
            }
            CANCELLED_METHOD | "$/cancelRequest" => {
                let params: CancelRequestParams = match notification
                    .params
                    .map(serde_json::from_value)
                    .transpose()
                {
                    Ok(Some(params)) => params,
                    Ok(None) => {
                        tracing::warn!("Cancellation without params ignored");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Invalid cancellation params: {e}");
                        return;
                    }
                };
                if self.inflight.cancel(session, &params.request_id) {
                    tracing::info!(
                        session = %session,
                        id = %params.request_id,
                        reason = params.reason.as_deref().unwrap_or(""),
                        "Cancellation requested"
                    );
                } else {
                    tracing::debug!(
                        session = %session,
                        id = %params.request_id,
                        "Cancellation for a request that is not in flight"
                    );
                }
            }
            other => {
                tracing::debug!("Unknown notification: {other}");
            }
        }
    }

    async fn route(
        &self,
        session: &SessionId,
        request: JsonRpcRequest,
        events: Option<Arc<dyn FrameSink>>,
    ) -> McpResult<Outcome> {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        if method == "initialize" {
            return self.initialize(session, params).map(Outcome::Reply);
        }

        self.ensure_ready(session, &method)?;

        let mut params = match params {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let progress_token = take_progress_token(&mut params);

        match method.as_str() {
            "ping" => Ok(Outcome::Reply(json!({}))),
            "shutdown" => self.shutdown(session).map(Outcome::Reply),
            "tools/list" => self.tools_list().map(Outcome::Reply),
            "tools/call" => {
                let (name, arguments) = tool_call_params(params)?;
                match self
                    .invoke(session, &id, &name, arguments, progress_token, events)
                    .await?
                {
                    Outcome::Reply(value) => Ok(Outcome::Reply(serde_json::to_value(
                        ToolCallResult::json(value),
                    )?)),
                    Outcome::Cancelled => Ok(Outcome::Cancelled),
                }
            }
            name => {
                self.invoke(session, &id, name, params, progress_token, events)
                    .await
            }
        }
    }

    fn initialize(&self, session: &SessionId, params: Option<Value>) -> McpResult<Value> {
        self.sessions.with_session(session, |session| {
            session.begin_handshake()?;
            match negotiation::negotiate(params, session.transport().can_push()) {
                Ok((negotiated, result)) => {
                    session.complete_handshake(negotiated)?;
                    Ok(serde_json::to_value(result)?)
                }
                Err(e) => {
                    session.fail_handshake();
                    Err(e)
                }
            }
        })?
    }

    /// Gate on the Ready state. A duplex session that never sent `initialize`
    /// completes an implicit handshake here.
    fn ensure_ready(&self, session: &SessionId, method: &str) -> McpResult<()> {
        self.sessions.with_session(session, |session| {
            session.record_request();
            if session.is_ready() {
                return Ok(());
            }
            if session.state() == SessionState::Uninitialized
                && session.transport().implicit_handshake()
            {
                session.begin_handshake()?;
                session.complete_handshake(negotiation::implicit(session.transport().can_push()))?;
                tracing::debug!(session = %session.id(), "Implicit handshake");
                return Ok(());
            }
            Err(McpError::SessionNotReady {
                method: method.to_string(),
            })
        })?
    }

    fn shutdown(&self, session: &SessionId) -> McpResult<Value> {
        tracing::info!(session = %session, "Shutdown requested");
        self.inflight.cancel_session(session);
        self.sessions.with_session(session, |s| s.close())?;
        Ok(json!({}))
    }

    fn tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: self.registry.definitions(),
            next_cursor: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn invoke(
        &self,
        session: &SessionId,
        id: &RequestId,
        name: &str,
        arguments: Map<String, Value>,
        progress_token: Option<ProgressToken>,
        events: Option<Arc<dyn FrameSink>>,
    ) -> McpResult<Outcome> {
        let descriptor = self.registry.lookup(name)?;
        let arguments = descriptor.validate(arguments)?;
        let timeout = descriptor.timeout().unwrap_or(self.options.handler_timeout);

        let guard = self.inflight.register(session, id);
        let token = guard.token().clone();
        let ctx = CallContext::new(
            session.clone(),
            id.clone(),
            token.clone(),
            progress_token,
            events,
        );

        // A separate task isolates panics. On timeout or cancellation it is
        // aborted so it can no longer push events for the finished request.
        let handler = descriptor.handler();
        let mut task = tokio::spawn(async move { handler.call(arguments, ctx).await });
        let abort = task.abort_handle();

        let joined = tokio::select! {
            biased;
            joined = &mut task => joined,
            _ = token.cancelled() => {
                abort.abort();
                tracing::info!(session = %session, id = %id, tool = name, "Invocation cancelled");
                return Ok(Outcome::Cancelled);
            }
            _ = tokio::time::sleep(timeout) => {
                token.cancel();
                abort.abort();
                return Err(McpError::HandlerTimeout {
                    tool: name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };
        drop(guard);

        match joined {
            Ok(Ok(value)) => {
                let declared = descriptor.returns();
                if declared.matches(&value) {
                    Ok(Outcome::Reply(value))
                } else {
                    Err(McpError::HandlerFailure {
                        tool: name.to_string(),
                        message: format!(
                            "returned {}, declared {declared}",
                            crate::tools::schema::value_type_name(&value)
                        ),
                        detail: None,
                    })
                }
            }
            Ok(Err(failure)) => Err(McpError::HandlerFailure {
                tool: name.to_string(),
                message: failure.message,
                detail: failure.detail,
            }),
            Err(join_error) => Err(McpError::HandlerFailure {
                tool: name.to_string(),
                message: panic_message(join_error),
                detail: None,
            }),
        }
    }
}

/// Strip `_meta` from params, returning its progress token if any.
fn take_progress_token(params: &mut Map<String, Value>) -> Option<ProgressToken> {
    let meta = params.remove("_meta")?;
    meta.get("progressToken")
        .cloned()
        .and_then(|token| serde_json::from_value(token).ok())
}

/// Split `tools/call` params into a tool name and its arguments.
fn tool_call_params(mut params: Map<String, Value>) -> McpResult<(String, Map<String, Value>)> {
    let mut violations = Vec::new();

    let name = match params.remove("name") {
        Some(Value::String(name)) => Some(name),
        Some(other) => {
            violations.push(ArgumentViolation {
                param: "name".to_string(),
                problem: ViolationKind::TypeMismatch,
                expected: Some("string".to_string()),
                found: Some(crate::tools::schema::value_type_name(&other).to_string()),
            });
            None
        }
        None => {
            violations.push(ArgumentViolation {
                param: "name".to_string(),
                problem: ViolationKind::Missing,
                expected: Some("string".to_string()),
                found: None,
            });
            None
        }
    };

    let arguments = match params.remove("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            violations.push(ArgumentViolation {
                param: "arguments".to_string(),
                problem: ViolationKind::TypeMismatch,
                expected: Some("object".to_string()),
                found: Some(crate::tools::schema::value_type_name(&other).to_string()),
            });
            Map::new()
        }
    };

    match name {
        Some(name) if violations.is_empty() => Ok((name, arguments)),
        _ => Err(McpError::InvalidArguments {
            tool: "tools/call".to_string(),
            violations,
        }),
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if error.is_cancelled() {
        return "handler task was cancelled".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                format!("handler panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("handler panicked: {s}")
            } else {
                "handler panicked".to_string()
            }
        }
        Err(error) => error.to_string(),
    }
}

//! The tool handler contract and the per-invocation context handed to it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::protocol::codec;
use crate::session::SessionId;
use crate::transport::FrameSink;
use crate::types::{
    JsonRpcNotification, McpResult, PartialResultParams, ProgressParams, ProgressToken,
    RequestId, PARTIAL_METHOD, PROGRESS_METHOD,
};

/// Validated arguments, defaults already applied.
pub type ToolArgs = Map<String, Value>;

/// What a handler produces: a JSON value or a failure.
pub type ToolResult = Result<Value, ToolFailure>;

/// A handler-reported failure. Becomes a `HandlerFailure` error response.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ToolFailure {
    pub message: String,
    pub detail: Option<Value>,
}

impl ToolFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl From<mcp_relay_toolbox::ToolboxError> for ToolFailure {
    fn from(e: mcp_relay_toolbox::ToolboxError) -> Self {
        ToolFailure::new(e.to_string())
    }
}

/// Anything that can serve a tool invocation.
///
/// Handlers may suspend on their own I/O. They own any synchronization of
/// state shared across concurrent invocations.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    async fn call(&self, args: ToolArgs, ctx: CallContext) -> ToolResult;
}

/// Adapter for async closures.
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArgs, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    async fn call(&self, args: ToolArgs, ctx: CallContext) -> ToolResult {
        (self.0)(args, ctx).await
    }
}

/// Adapter for plain synchronous functions that never suspend.
pub struct SyncHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for SyncHandler<F>
where
    F: Fn(ToolArgs) -> ToolResult + Send + Sync + 'static,
{
    async fn call(&self, args: ToolArgs, _ctx: CallContext) -> ToolResult {
        (self.0)(args)
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArgs, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

pub fn sync_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArgs) -> ToolResult + Send + Sync + 'static,
{
    Arc::new(SyncHandler(f))
}

/// Cooperative cancellation flag shared between the dispatcher and a handler.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Whether both tokens control the same invocation.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }

    /// Resolves once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Per-invocation context.
#[derive(Clone)]
pub struct CallContext {
    session_id: SessionId,
    request_id: RequestId,
    cancel: CancelToken,
    progress_token: Option<ProgressToken>,
    events: Option<Arc<dyn FrameSink>>,
}

impl CallContext {
    pub fn new(
        session_id: SessionId,
        request_id: RequestId,
        cancel: CancelToken,
        progress_token: Option<ProgressToken>,
        events: Option<Arc<dyn FrameSink>>,
    ) -> Self {
        Self {
            session_id,
            request_id,
            cancel,
            progress_token,
            events,
        }
    }

    /// A context with no event channel and a fresh cancel token.
    pub fn detached(session_id: SessionId, request_id: RequestId) -> Self {
        Self::new(session_id, request_id, CancelToken::new(), None, None)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// True when pushed events reach the client.
    pub fn can_stream(&self) -> bool {
        self.events.is_some()
    }

    /// Emit `notifications/progress`. No-op unless the request carried a
    /// progress token and the connection can carry pushed events.
    pub async fn report_progress(
        &self,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) -> McpResult<()> {
        let (Some(events), Some(token)) = (&self.events, &self.progress_token) else {
            return Ok(());
        };
        let params = ProgressParams {
            progress_token: token.clone(),
            progress,
            total,
            message,
        };
        let notification =
            JsonRpcNotification::new(PROGRESS_METHOD, Some(serde_json::to_value(params)?));
        events.send(codec::encode_notification(&notification)).await
    }

    /// Emit `notifications/partial` tagged with this request's id.
    pub async fn emit_partial(&self, partial: Value) -> McpResult<()> {
        let Some(events) = &self.events else {
            return Ok(());
        };
        let params = PartialResultParams {
            request_id: self.request_id.clone(),
            partial,
        };
        let notification =
            JsonRpcNotification::new(PARTIAL_METHOD, Some(serde_json::to_value(params)?));
        events.send(codec::encode_notification(&notification)).await
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("session_id", &self.session_id)
            .field("request_id", &self.request_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("streaming", &self.events.is_some())
            .finish()
    }
}

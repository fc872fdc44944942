//! Dispatcher integration tests for mcp-relay.
//!
//! Covers routing, validation, the session lifecycle, and handler failure,
//! timeout and cancellation, all driven through raw JSON frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use mcp_relay::protocol::{DispatchOptions, Dispatcher};
use mcp_relay::session::{SessionId, SessionManager, SessionState, TransportKind};
use mcp_relay::tools::{
    handler_fn, register_builtin, sync_fn, ParamSpec, ToolDescriptor, ToolFailure, ToolRegistry,
    Toolbox, TypeTag,
};
use mcp_relay::transport::{ChannelSink, FrameSink};
use mcp_relay_toolbox::{FileReader, KvStore};

// ─────────────────────── helpers ───────────────────────

/// Builtins plus a few misbehaving tools.
fn registry(dir: &tempfile::TempDir) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let toolbox = Toolbox::new(KvStore::new(), FileReader::new(dir.path()).unwrap());
    register_builtin(&mut registry, &toolbox).unwrap();

    registry
        .register(
            ToolDescriptor::builder(
                "explode",
                sync_fn(|_| -> Result<Value, ToolFailure> { panic!("boom") }),
            )
            .returns(TypeTag::Any)
            .build(),
        )
        .unwrap();
    registry
        .register(
            ToolDescriptor::builder(
                "refuse",
                sync_fn(|_| Err(ToolFailure::new("not today").with_detail(json!({"retry": false})))),
            )
            .returns(TypeTag::Any)
            .build(),
        )
        .unwrap();
    registry
        .register(
            ToolDescriptor::builder(
                "stall",
                handler_fn(|_, _| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(json!(null))
                }),
            )
            .returns(TypeTag::Any)
            .timeout(Duration::from_millis(100))
            .build(),
        )
        .unwrap();
    registry
        .register(
            ToolDescriptor::builder(
                "chatter",
                handler_fn(|_, ctx| async move {
                    // Never checks its cancel token.
                    for tick in 0..1000 {
                        let _ = ctx.emit_partial(json!(tick)).await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Ok(json!(null))
                }),
            )
            .returns(TypeTag::Any)
            .timeout(Duration::from_millis(50))
            .build(),
        )
        .unwrap();
    registry
        .register(
            ToolDescriptor::builder("liar", sync_fn(|_| Ok(json!(42))))
                .returns(TypeTag::String)
                .build(),
        )
        .unwrap();
    registry
        .register(
            ToolDescriptor::builder("greet", sync_fn(|args| {
                Ok(json!(format!(
                    "{}, {}",
                    args["greeting"].as_str().unwrap_or_default(),
                    args["name"].as_str().unwrap_or_default()
                )))
            }))
            .param(ParamSpec::required("name", TypeTag::String))
            .param(ParamSpec::optional("greeting", TypeTag::String).with_default(json!("hello")))
            .param(ParamSpec::required("times", TypeTag::Integer))
            .returns(TypeTag::String)
            .build(),
        )
        .unwrap();
    registry
}

fn dispatcher(dir: &tempfile::TempDir) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        Arc::new(registry(dir)),
        Arc::new(SessionManager::new()),
        DispatchOptions::default(),
    ))
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

fn init_request(version: &str) -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

/// Send one frame and decode the reply, if any.
async fn send(dispatcher: &Dispatcher, session: &SessionId, msg: Value) -> Option<Value> {
    send_with(dispatcher, session, msg, None).await
}

async fn send_with(
    dispatcher: &Dispatcher,
    session: &SessionId,
    msg: Value,
    events: Option<Arc<dyn FrameSink>>,
) -> Option<Value> {
    let frame = serde_json::to_vec(&msg).unwrap();
    dispatcher
        .handle_frame(session, &frame, events)
        .await
        .map(|reply| serde_json::from_str(&reply).unwrap())
}

async fn send_unwrap(dispatcher: &Dispatcher, session: &SessionId, msg: Value) -> Value {
    send(dispatcher, session, msg).await.expect("expected response")
}

fn state(dispatcher: &Dispatcher, session: &SessionId) -> SessionState {
    dispatcher.sessions().info(session).unwrap().state
}

/// A push session that completed the handshake.
async fn ready_push_session(dispatcher: &Dispatcher) -> SessionId {
    let session = dispatcher.open_session(TransportKind::PushStream);
    let resp = send_unwrap(dispatcher, &session, init_request("2025-06-18")).await;
    assert!(resp.get("result").is_some(), "handshake failed: {resp}");
    session
}

// ═══════════════════════════════════════════════════════
// ROUTING
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_01_echo_direct_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "echo", json!({"text": "hi"}))).await;
    assert_eq!(resp, json!({"jsonrpc": "2.0", "id": 1, "result": "hi"}));

    println!("TEST 01 — Echo: PASS");
}

#[tokio::test]
async fn test_02_unknown_tool_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(2, "vanish", json!({}))).await;
    assert_eq!(resp["id"], 2);
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["data"]["kind"], "ToolNotFound");
    assert_eq!(state(&dispatcher, &session), SessionState::Ready);

    println!("TEST 02 — Unknown tool: PASS");
}

#[tokio::test]
async fn test_03_missing_argument_lists_every_violation() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(3, "echo", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(resp["error"]["data"]["kind"], "InvalidArguments");
    let violations = resp["error"]["data"]["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0]["param"], "text");

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(4, "greet", json!({"greeting": 7, "extra": true})),
    )
    .await;
    let params: Vec<&str> = resp["error"]["data"]["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["param"].as_str().unwrap())
        .collect();
    assert!(params.contains(&"name"));
    assert!(params.contains(&"times"));
    assert!(params.contains(&"greeting"));
    assert!(params.contains(&"extra"));

    println!("TEST 03 — Invalid arguments: PASS");
}

#[tokio::test]
async fn test_04_defaults_are_filled() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(5, "greet", json!({"name": "ada", "times": 1})),
    )
    .await;
    assert_eq!(resp["result"], "hello, ada");

    println!("TEST 04 — Defaults: PASS");
}

#[tokio::test]
async fn test_05_tools_list_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(6, "tools/list", json!({}))).await;
    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(&names[..3], &["echo", "sleep", "text_stats"]);
    assert_eq!(names.last(), Some(&"greet"));

    let echo = &resp["result"]["tools"][0];
    assert_eq!(echo["inputSchema"]["required"], json!(["text"]));
    assert_eq!(echo["inputSchema"]["properties"]["text"]["type"], "string");

    println!("TEST 05 — tools/list: PASS");
}

#[tokio::test]
async fn test_06_tools_call_alias() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(
            7,
            "tools/call",
            json!({"name": "text_stats", "arguments": {"text": "two words\nline"}}),
        ),
    )
    .await;
    let result = &resp["result"];
    assert_eq!(result["structuredContent"]["words"], 3);
    assert_eq!(result["structuredContent"]["lines"], 2);
    let text = result["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed["words"], 3);

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(8, "tools/call", json!({"name": "vanish"})),
    )
    .await;
    assert_eq!(resp["error"]["data"]["kind"], "ToolNotFound");

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(9, "tools/call", json!({"arguments": []})),
    )
    .await;
    assert_eq!(resp["error"]["data"]["kind"], "InvalidArguments");
    assert_eq!(resp["error"]["data"]["violations"].as_array().unwrap().len(), 2);

    println!("TEST 06 — tools/call: PASS");
}

#[tokio::test]
async fn test_07_meta_is_stripped_before_validation() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(10, "echo", json!({"text": "x", "_meta": {"progressToken": "p"}})),
    )
    .await;
    assert_eq!(resp["result"], "x");

    println!("TEST 07 — _meta: PASS");
}

// ═══════════════════════════════════════════════════════
// SESSION LIFECYCLE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_08_push_session_requires_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::PushStream);

    for (id, method) in [(1, "echo"), (2, "tools/list"), (3, "ping"), (4, "vanish")] {
        let resp = send_unwrap(&dispatcher, &session, mcp_request(id, method, json!({"text": "x"}))).await;
        assert_eq!(resp["error"]["code"], -32002, "{method}: {resp}");
        assert_eq!(resp["error"]["data"]["kind"], "SessionNotReady");
        assert_eq!(state(&dispatcher, &session), SessionState::Uninitialized);
    }

    let resp = send_unwrap(&dispatcher, &session, init_request("2024-11-05")).await;
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "mcp-relay");
    assert_eq!(state(&dispatcher, &session), SessionState::Ready);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(5, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));

    println!("TEST 08 — Handshake required: PASS");
}

#[tokio::test]
async fn test_09_failed_handshake_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::PushStream);

    let resp = send_unwrap(&dispatcher, &session, init_request("1999-01-01")).await;
    assert_eq!(resp["error"]["code"], -32003);
    assert_eq!(resp["error"]["data"]["kind"], "HandshakeError");
    assert_eq!(state(&dispatcher, &session), SessionState::Closed);
    assert!(dispatcher.is_closed(&session));

    println!("TEST 09 — Failed handshake: PASS");
}

#[tokio::test]
async fn test_10_second_initialize_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let resp = send_unwrap(&dispatcher, &session, init_request("2025-06-18")).await;
    assert_eq!(resp["error"]["data"]["kind"], "AlreadyInitialized");
    assert_eq!(state(&dispatcher, &session), SessionState::Ready);

    println!("TEST 10 — Double initialize: PASS");
}

#[tokio::test]
async fn test_11_shutdown_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "shutdown", json!(null))).await;
    assert_eq!(resp["result"], json!({}));
    assert!(dispatcher.is_closed(&session));

    let resp = send_unwrap(&dispatcher, &session, mcp_request(2, "echo", json!({"text": "x"}))).await;
    assert_eq!(resp["error"]["data"]["kind"], "SessionNotReady");

    println!("TEST 11 — Shutdown: PASS");
}

#[tokio::test]
async fn test_12_initialized_notification_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let reply = send(
        &dispatcher,
        &session,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(reply.is_none());
    assert!(dispatcher.sessions().info(&session).unwrap().acknowledged);

    println!("TEST 12 — initialized notification: PASS");
}

// ═══════════════════════════════════════════════════════
// MALFORMED INPUT
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_13_malformed_frames() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    // Unparseable: nobody to answer.
    assert!(dispatcher.handle_frame(&session, br#"{"broken":"#, None).await.is_none());

    // Recoverable id gets an answer.
    let reply = dispatcher
        .handle_frame(&session, br#"{"jsonrpc":"1.0","id":9,"method":"echo"}"#, None)
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["id"], 9);
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["error"]["data"]["kind"], "MalformedMessage");

    assert_eq!(state(&dispatcher, &session), SessionState::Uninitialized);

    println!("TEST 13 — Malformed frames: PASS");
}

// ═══════════════════════════════════════════════════════
// HANDLER FAILURES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_14_panic_becomes_handler_failure() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "explode", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32010);
    assert_eq!(resp["error"]["data"]["kind"], "HandlerFailure");
    assert!(resp["error"]["data"]["detail"].as_str().unwrap().contains("boom"));

    // The session keeps working.
    let resp = send_unwrap(&dispatcher, &session, mcp_request(2, "echo", json!({"text": "ok"}))).await;
    assert_eq!(resp["result"], "ok");

    println!("TEST 14 — Panic: PASS");
}

#[tokio::test]
async fn test_15_failure_detail_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "refuse", json!({}))).await;
    assert_eq!(resp["error"]["data"]["kind"], "HandlerFailure");
    assert!(resp["error"]["message"].as_str().unwrap().contains("not today"));
    assert_eq!(resp["error"]["data"]["detail"], json!({"retry": false}));

    let resp = send_unwrap(&dispatcher, &session, mcp_request(2, "liar", json!({}))).await;
    assert_eq!(resp["error"]["data"]["kind"], "HandlerFailure");

    println!("TEST 15 — Failure detail: PASS");
}

#[tokio::test]
async fn test_16_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let started = Instant::now();
    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "stall", json!({}))).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(resp["error"]["code"], -32011);
    assert_eq!(resp["error"]["data"]["kind"], "HandlerTimeout");
    assert_eq!(resp["error"]["data"]["timeoutMs"], 100);
    assert!(dispatcher.inflight().is_empty());
    assert_eq!(state(&dispatcher, &session), SessionState::Ready);

    println!("TEST 16 — Timeout: PASS");
}

#[tokio::test]
async fn test_17_cancellation_suppresses_reply() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let call = {
        let dispatcher = dispatcher.clone();
        let session = session.clone();
        tokio::spawn(async move {
            send(&dispatcher, &session, mcp_request(41, "sleep", json!({"seconds": 30}))).await
        })
    };

    // Wait until the request is registered as in flight.
    let deadline = Instant::now() + Duration::from_secs(2);
    while dispatcher.inflight().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": {"requestId": 41, "reason": "user abort"}
    });
    assert!(send(&dispatcher, &session, cancel).await.is_none());

    let reply = tokio::time::timeout(Duration::from_secs(2), call)
        .await
        .unwrap()
        .unwrap();
    assert!(reply.is_none());
    assert!(dispatcher.inflight().is_empty());

    // Unknown ids are ignored.
    let stray = json!({
        "jsonrpc": "2.0",
        "method": "$/cancelRequest",
        "params": {"requestId": "nope"}
    });
    assert!(send(&dispatcher, &session, stray).await.is_none());

    println!("TEST 17 — Cancellation: PASS");
}

#[tokio::test]
async fn test_18_progress_reaches_push_sink() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let (tx, mut rx) = mpsc::channel(64);
    let sink: Arc<dyn FrameSink> = Arc::new(ChannelSink::new(tx));
    let resp = send_with(
        &dispatcher,
        &session,
        mcp_request(
            1,
            "tools/call",
            json!({
                "name": "sleep",
                "arguments": {"seconds": 0.05, "label": "nap"},
                "_meta": {"progressToken": "tok-1"}
            }),
        ),
        Some(sink),
    )
    .await
    .unwrap();
    assert_eq!(resp["result"]["structuredContent"]["label"], "nap");

    let mut progress = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let event: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(event["method"], "notifications/progress");
        assert_eq!(event["params"]["progressToken"], "tok-1");
        progress.push(event["params"]["progress"].as_f64().unwrap());
    }
    assert_eq!(progress.len(), 10);
    assert!(progress.windows(2).all(|w| w[0] < w[1]));

    println!("TEST 18 — Progress: PASS");
}

#[tokio::test]
async fn test_19_kv_round_trip_through_tools() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(1, "kv_set", json!({"key": "color", "value": {"hex": "#fff"}})),
    )
    .await;
    assert_eq!(resp["result"]["previous"], Value::Null);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(2, "kv_get", json!({"key": "color"}))).await;
    assert_eq!(resp["result"], json!({"hex": "#fff"}));

    let resp = send_unwrap(&dispatcher, &session, mcp_request(3, "kv_get", json!({"key": "none"}))).await;
    assert_eq!(resp["result"], Value::Null);

    println!("TEST 19 — Key/value tools: PASS");
}

#[tokio::test]
async fn test_20_read_file_stays_in_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let dispatcher = dispatcher(&dir);
    let session = dispatcher.open_session(TransportKind::DuplexStream);

    let resp = send_unwrap(&dispatcher, &session, mcp_request(1, "read_file", json!({"path": "a.txt"}))).await;
    assert_eq!(resp["result"]["text"], "alpha");

    let resp = send_unwrap(
        &dispatcher,
        &session,
        mcp_request(2, "read_file", json!({"path": "../../etc/passwd"})),
    )
    .await;
    assert_eq!(resp["error"]["data"]["kind"], "HandlerFailure");

    println!("TEST 20 — read_file sandbox: PASS");
}

#[tokio::test]
async fn test_21_partials_arrive_before_reply() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let (tx, mut rx) = mpsc::channel(64);
    let sink: Arc<dyn FrameSink> = Arc::new(ChannelSink::new(tx));
    let resp = send_with(
        &dispatcher,
        &session,
        mcp_request(3, "split_lines", json!({"text": "a\n\nb", "skip_blank": true})),
        Some(sink),
    )
    .await
    .unwrap();

    // The reply is only returned once every partial is already queued.
    let mut partials = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let event: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(event["method"], "notifications/partial");
        assert_eq!(event["params"]["requestId"], 3);
        partials.push(event["params"]["partial"]["line"].clone());
    }
    assert_eq!(partials, vec![json!("a"), json!("b")]);
    assert_eq!(resp["result"], json!({"lines": 2, "streamed": true}));

    println!("TEST 21 — Partial results: PASS");
}

#[tokio::test]
async fn test_22_timed_out_handler_goes_silent() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(&dir);
    let session = ready_push_session(&dispatcher).await;

    let (tx, mut rx) = mpsc::channel(256);
    let sink: Arc<dyn FrameSink> = Arc::new(ChannelSink::new(tx));
    let resp = send_with(&dispatcher, &session, mcp_request(4, "chatter", json!({})), Some(sink))
        .await
        .unwrap();
    assert_eq!(resp["error"]["data"]["kind"], "HandlerTimeout");

    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "events kept flowing after the timeout");
    assert!(dispatcher.inflight().is_empty());

    println!("TEST 22 — Timeout stops events: PASS");
}

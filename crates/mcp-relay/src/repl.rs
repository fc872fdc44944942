//! Interactive REPL for the MCP relay.
//!
//! Launch with `mcp-relay repl` to call tools against an in-process
//! dispatcher. Type `/help` for available commands, Tab for completion.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::protocol::Dispatcher;
use crate::session::{SessionId, TransportKind};
use crate::types::{InitializeResult, JsonRpcReply, JsonRpcRequest, SUPPORTED_VERSIONS};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/tools", "List registered tools"),
    ("/call", "Call a tool: /call <tool> [json arguments]"),
    ("/info", "Show server info and protocol versions"),
    ("/session", "Show the REPL session"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
struct RelayHelper {
    tools: Vec<String>,
}

impl Completer for RelayHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Tool names after /call, only for the first argument.
        if let Some(rest) = input.strip_prefix("/call ") {
            if !rest.contains(' ') {
                let matches: Vec<Pair> = self
                    .tools
                    .iter()
                    .filter(|t| t.starts_with(rest))
                    .map(|t| Pair {
                        display: t.clone(),
                        replacement: format!("{t} "),
                    })
                    .collect();
                return Ok((input.len() - rest.len(), matches));
            }
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for RelayHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for RelayHelper {}
impl Validator for RelayHelper {}
impl Helper for RelayHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// The REPL's own session and request counter.
struct ReplState {
    dispatcher: Arc<Dispatcher>,
    runtime: Handle,
    session: SessionId,
    next_id: i64,
}

/// Run the interactive REPL. Blocks the calling thread; call it from a
/// blocking task, never from inside an async context.
pub fn run(dispatcher: Arc<Dispatcher>, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mmcp-relay v{}\x1b[0m \x1b[90m({} tools)\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        dispatcher.registry().len()
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<RelayHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(RelayHelper {
        tools: dispatcher.registry().names(),
    }));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".mcp_relay_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let session = dispatcher.open_session(TransportKind::DuplexStream);
    let mut state = ReplState {
        dispatcher,
        runtime,
        session,
        next_id: 1,
    };
    let prompt = " \x1b[36mrelay>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&state),
                    "tools" => cmd_tools(&state),
                    "call" => cmd_call(args, &mut state),
                    "session" => cmd_session(&state),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    state.dispatcher.close_session(&state.session);
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and tool names after /call.");
    eprintln!();
}

fn cmd_info(state: &ReplState) {
    let info = InitializeResult::default_result();
    eprintln!();
    eprintln!("  Server:    {} v{}", info.server_info.name, info.server_info.version);
    eprintln!("  Protocol:  {}", info.protocol_version);
    eprintln!("  Supported: {}", SUPPORTED_VERSIONS.join(", "));
    eprintln!("  Tools:     {}", state.dispatcher.registry().len());
    eprintln!("  Timeout:   {:?}", state.dispatcher.options().handler_timeout);
    eprintln!();
}

fn cmd_tools(state: &ReplState) {
    let registry = state.dispatcher.registry();
    eprintln!();
    eprintln!("  {} tools available:", registry.len());
    eprintln!();
    for tool in registry.list() {
        let params: Vec<String> = tool
            .params()
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}: {}", p.name, p.type_tag)
                } else {
                    format!("{}?: {}", p.name, p.type_tag)
                }
            })
            .collect();
        eprintln!(
            "    {:<12} ({}) -> {}",
            tool.name(),
            params.join(", "),
            tool.returns()
        );
        if !tool.description().is_empty() {
            eprintln!("    {:<12} \x1b[90m{}\x1b[0m", "", tool.description());
        }
    }
    eprintln!();
}

fn cmd_call(args: &str, state: &mut ReplState) {
    let mut parts = args.splitn(2, ' ');
    let tool = parts.next().unwrap_or("").trim();
    if tool.is_empty() {
        eprintln!("  Usage: /call <tool> [json arguments]");
        return;
    }

    let raw = parts.next().unwrap_or("").trim();
    let params = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                eprintln!("  Arguments are not valid JSON: {e}");
                return;
            }
        }
    };

    let request = JsonRpcRequest::new(state.next_id, tool, Some(params));
    state.next_id += 1;

    let reply = state
        .runtime
        .block_on(state.dispatcher.dispatch(&state.session, request, None));

    match reply {
        Some(JsonRpcReply::Success(response)) => {
            let pretty = serde_json::to_string_pretty(&response.result)
                .unwrap_or_else(|_| response.result.to_string());
            eprintln!();
            for line in pretty.lines() {
                eprintln!("  {line}");
            }
            eprintln!();
        }
        Some(JsonRpcReply::Error(error)) => {
            eprintln!(
                "  \x1b[31mError {}\x1b[0m: {}",
                error.error.code, error.error.message
            );
            if let Some(data) = error.error.data {
                eprintln!("  \x1b[90m{data}\x1b[0m");
            }
        }
        None => eprintln!("  (cancelled)"),
    }
}

fn cmd_session(state: &ReplState) {
    match state.dispatcher.sessions().info(&state.session) {
        Some(info) => {
            eprintln!();
            eprintln!("  Session:   {}", info.id);
            eprintln!("  State:     {:?}", info.state);
            eprintln!(
                "  Protocol:  {}",
                info.protocol_version.as_deref().unwrap_or("(not negotiated)")
            );
            eprintln!("  Requests:  {}", info.requests);
            eprintln!("  Opened:    {}", info.created_at.to_rfc3339());
            eprintln!();
        }
        None => eprintln!("  Session is gone."),
    }
}

//! MCP relay: entry point.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mcp_relay::config::{ConfigOverrides, RelayConfig};
use mcp_relay::transport::StdioTransport;
use mcp_relay::types::{InitializeResult, SUPPORTED_VERSIONS};

#[derive(Parser)]
#[command(
    name = "mcp-relay",
    about = "MCP request/response bridge: JSON-RPC 2.0 tool dispatch over stdio or SSE",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings shared by every command; each also reads an MCP_RELAY_* env var.
#[derive(Args, Debug, Clone, Default)]
struct Settings {
    /// Handler timeout in milliseconds [env: MCP_RELAY_TIMEOUT_MS].
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Largest accepted frame in bytes [env: MCP_RELAY_MAX_FRAME_BYTES].
    #[arg(long, global = true)]
    max_frame_bytes: Option<usize>,

    /// Sandbox root for read_file [env: MCP_RELAY_ROOT].
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Key/value snapshot file [env: MCP_RELAY_KV_FILE].
    #[arg(long, global = true)]
    kv_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Start MCP server over HTTP with an SSE event stream.
    #[cfg(feature = "sse")]
    ServeHttp {
        /// Listen address (host:port) [env: MCP_RELAY_ADDR].
        #[arg(long)]
        addr: Option<String>,

        /// Bearer token for authentication [env: MCP_RELAY_TOKEN].
        #[arg(long)]
        token: Option<String>,

        /// Pending requests allowed per connection [env: MCP_RELAY_QUEUE_DEPTH].
        #[arg(long)]
        queue_depth: Option<usize>,
    },

    /// Print server info and the tool listing as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   mcp-relay completions bash > ~/.local/share/bash-completion/completions/mcp-relay
    ///   mcp-relay completions zsh > ~/.zfunc/_mcp-relay
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

impl Settings {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout_ms: self.timeout_ms,
            max_frame_bytes: self.max_frame_bytes,
            root: self.root.clone(),
            kv_file: self.kv_file.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout belongs to the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = RelayConfig::resolve(cli.settings.overrides())?;
            let dispatcher = mcp_relay::build_dispatcher(&config)?;
            tracing::info!("MCP relay (stdio), {} tools", dispatcher.registry().len());
            StdioTransport::new(dispatcher, config.max_frame_bytes)
                .run()
                .await?;
        }

        #[cfg(feature = "sse")]
        Commands::ServeHttp {
            addr,
            token,
            queue_depth,
        } => {
            use std::sync::Arc;

            use mcp_relay::transport::{AllowAll, BearerToken, CredentialCheck, SseTransport};

            let config = RelayConfig::resolve(ConfigOverrides {
                addr,
                token,
                queue_depth,
                ..cli.settings.overrides()
            })?;
            let dispatcher = mcp_relay::build_dispatcher(&config)?;

            let credentials: Arc<dyn CredentialCheck> = match &config.token {
                Some(token) => {
                    tracing::info!("Auth: bearer token required");
                    Arc::new(BearerToken::new(token.clone()))
                }
                None => Arc::new(AllowAll),
            };

            tracing::info!("MCP relay (SSE), {} tools", dispatcher.registry().len());
            let transport =
                SseTransport::with_credentials(dispatcher, config.queue_depth, credentials);
            transport.run(&config.addr).await?;
        }

        Commands::Info => {
            let config = RelayConfig::resolve(cli.settings.overrides())?;
            let dispatcher = mcp_relay::build_dispatcher(&config)?;
            let capabilities = InitializeResult::default_result();
            let tools = dispatcher.registry().definitions();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "supported_versions": SUPPORTED_VERSIONS,
                "capabilities": capabilities.capabilities,
                "tools": tools,
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mcp-relay", &mut std::io::stdout());
        }

        Commands::Repl => {
            let config = RelayConfig::resolve(cli.settings.overrides())?;
            let dispatcher = mcp_relay::build_dispatcher(&config)?;
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || mcp_relay::repl::run(dispatcher, runtime))
                .await??;
        }
    }

    Ok(())
}

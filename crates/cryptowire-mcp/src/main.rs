//! Cryptowire MCP Server — entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use cryptowire::ApiClient;
use cryptowire_mcp::config::ServerConfig;
use cryptowire_mcp::protocol::ProtocolHandler;
use cryptowire_mcp::tools::ToolRegistry;
use cryptowire_mcp::transport::stdio::{StdioTransport, STDIO_SESSION_ID};

#[derive(Parser)]
#[command(
    name = "cryptowire-mcp",
    about = "MCP server for Cryptowire — crypto market data, news, and quotes for AI agents",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Start MCP server over streamable HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen host. Also reads HOST.
        #[arg(long)]
        host: Option<String>,

        /// Listen port. Also reads PORT.
        #[arg(long)]
        port: Option<u16>,

        /// Bearer token clients must present.
        /// Also reads from MCP_AUTH_TOKEN env var.
        #[arg(long)]
        token: Option<String>,

        /// Seconds of inactivity before a session is closed.
        /// Also reads MCP_SESSION_IDLE_SECS.
        #[arg(long)]
        idle_timeout: Option<u64>,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Check that the upstream API is reachable.
    Check,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   cryptowire-mcp completions bash > ~/.local/share/bash-completion/completions/cryptowire-mcp
    ///   cryptowire-mcp completions zsh > ~/.zfunc/_cryptowire-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env()?;
    if !config.upstream.has_token() {
        tracing::warn!("UPSTREAM_API_TOKEN is not set; upstream requests are unauthenticated");
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let api = ApiClient::new(config.upstream.clone());
            let handler = ProtocolHandler::new(STDIO_SESSION_ID, api);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp {
            host,
            port,
            token,
            idle_timeout,
        } => {
            use std::sync::Arc;

            use cryptowire_mcp::session::SessionRouter;
            use cryptowire_mcp::transport::HttpTransport;

            let config = config.with_overrides(host, port, token, idle_timeout)?;
            let token = config.require_auth_token()?.to_string();

            tracing::info!("Cryptowire MCP server (streamable HTTP)");
            tracing::info!("Upstream: {}", config.upstream.base_url);
            tracing::info!("Auth: bearer token required");

            let api = ApiClient::new(config.upstream.clone());
            let router = Arc::new(
                SessionRouter::new(ProtocolHandler::factory(api))
                    .with_idle_timeout(config.idle_timeout)
                    .with_sweep_interval(config.sweep_interval),
            );
            let transport = HttpTransport::new(router, token);
            transport.run(&config.bind_addr()).await?;
        }

        Commands::Info => {
            let capabilities = cryptowire_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Check => {
            let api = ApiClient::new(config.upstream.clone());
            match api.try_request("/markets", &[]).await {
                Ok(_) => println!("Upstream reachable: {}", config.upstream.base_url),
                Err(e) => {
                    eprintln!("Upstream check failed for {}: {e}", config.upstream.base_url);
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cryptowire-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let api = ApiClient::new(config.upstream.clone());
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || cryptowire_mcp::repl::run(runtime, api, config))
                .await??;
        }
    }

    Ok(())
}

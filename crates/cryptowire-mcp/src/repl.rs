//! Interactive REPL for the Cryptowire MCP server.
//!
//! Launch with `cryptowire-mcp repl` to enter interactive mode.
//! Type `/help` for available commands, Tab for completion.

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

use cryptowire::ApiClient;

use crate::config::ServerConfig;
use crate::tools::ToolRegistry;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/info", "Show server capabilities and tools"),
    ("/tools", "List available MCP tools"),
    ("/call", "Call a tool: /call <tool> [json arguments]"),
    ("/config", "Show resolved configuration"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
struct ToolHelper;

impl Default for ToolHelper {
    fn default() -> Self {
        Self
    }
}

impl Completer for ToolHelper {
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

        // Tool name completion
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let cmd = parts[0];
        let args = if parts.len() > 1 { parts[1] } else { "" };

        if cmd == "/call" && !args.contains(' ') {
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = ToolRegistry::list_tools()
                .into_iter()
                .filter(|t| t.name.starts_with(args))
                .map(|t| Pair {
                    display: t.name.clone(),
                    replacement: format!("{} ", t.name),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for ToolHelper {
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

impl Highlighter for ToolHelper {}
impl Validator for ToolHelper {}
impl Helper for ToolHelper {}

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

/// Run the interactive REPL.
///
/// Blocks the calling thread; `runtime` drives tool calls. Call it from a
/// blocking context such as `tokio::task::spawn_blocking`.
pub fn run(runtime: Handle, api: ApiClient, config: ServerConfig) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mcryptowire-mcp v{}\x1b[0m \x1b[90m\u{2014} Crypto market data for AI Agents\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ToolHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(ToolHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".cryptowire_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mcrypto>\x1b[0m ";

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
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(),
                    "tools" => cmd_tools(),
                    "call" => cmd_call(args, &runtime, &api),
                    "config" => cmd_config(&config),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
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
    eprintln!("  Tip: Tab completion works for commands and tool names.");
    eprintln!();
}

fn cmd_info() {
    let capabilities = crate::types::InitializeResult::default_result();
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        capabilities.server_info.name, capabilities.server_info.version
    );
    eprintln!("  Protocol: {}", capabilities.protocol_version);
    eprintln!("  Tools:    {}", tools.len());
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} MCP tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        eprintln!(
            "    {:<28} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}

/// Split `/call` arguments into a tool name and optional JSON arguments.
fn parse_call(args: &str) -> Result<(String, Option<Value>), String> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").trim();
    if name.is_empty() {
        return Err("Usage: /call <tool> [json arguments]".to_string());
    }
    let arguments = match parts.next().map(str::trim).filter(|a| !a.is_empty()) {
        Some(raw) => Some(
            serde_json::from_str::<Value>(raw).map_err(|e| format!("Invalid JSON arguments: {e}"))?,
        ),
        None => None,
    };
    Ok((name.to_string(), arguments))
}

fn cmd_call(args: &str, runtime: &Handle, api: &ApiClient) {
    let (name, arguments) = match parse_call(args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("  {msg}");
            return;
        }
    };

    match runtime.block_on(ToolRegistry::call(&name, arguments, api)) {
        Ok(outcome) => {
            eprintln!();
            for block in &outcome.result.content {
                for line in block.as_text().lines() {
                    eprintln!("  {line}");
                }
            }
            if outcome.unavailable.is_some() {
                eprintln!();
                eprintln!("  \x1b[33mUpstream unavailable.\x1b[0m Try /config to check the base URL and token.");
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Error ({}): {e}", e.code()),
    }
}

fn cmd_config(config: &ServerConfig) {
    let masked = |token: &Option<String>| if token.is_some() { "set" } else { "not set" };
    eprintln!();
    eprintln!("  HTTP bind:        {}", config.bind_addr());
    eprintln!("  HTTP auth token:  {}", masked(&config.auth_token));
    eprintln!("  Idle timeout:     {}s", config.idle_timeout.as_secs());
    eprintln!("  Sweep interval:   {}s", config.sweep_interval.as_secs());
    eprintln!("  Upstream URL:     {}", config.upstream.base_url);
    eprintln!("  Upstream token:   {}", masked(&config.upstream.api_token));
    eprintln!("  User agent:       {}", config.upstream.user_agent);
    eprintln!("  Upstream timeout: {}s", config.upstream.timeout.as_secs());
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_name_only() {
        let (name, args) = parse_call("get_market_overview").unwrap();
        assert_eq!(name, "get_market_overview");
        assert!(args.is_none());
    }

    #[test]
    fn test_parse_call_with_json() {
        let (name, args) = parse_call(r#"get_news {"type": "trending", "limit": 3}"#).unwrap();
        assert_eq!(name, "get_news");
        assert_eq!(args.unwrap()["limit"], 3);
    }

    #[test]
    fn test_parse_call_errors() {
        assert!(parse_call("").is_err());
        assert!(parse_call("get_news {oops").unwrap_err().starts_with("Invalid JSON"));
    }
}

//! Cryptowire MCP Server — read-only crypto market data for LLM agents.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::{ProtocolHandler, SessionEngine};
pub use session::SessionRouter;
pub use transport::StdioTransport;

//! MCP protocol handling — JSON-RPC dispatch.

pub mod engine;
pub mod handler;
pub mod negotiation;
pub mod validator;

pub use engine::{EngineFactory, EngineReply, SessionEngine};
pub use handler::ProtocolHandler;

//! Cryptowire — core library for crypto market data, news, and quotes.

pub mod client;
pub mod config;
pub mod format;
pub mod schema;
pub mod types;

pub use client::ApiClient;
pub use config::UpstreamConfig;
pub use schema::{ArgValue, Arguments, FieldKind, FieldSpec, InputSchema, SchemaError};
pub use types::*;

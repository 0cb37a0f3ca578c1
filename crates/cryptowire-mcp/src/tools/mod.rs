//! MCP tool implementations.

pub mod get_coin_by_id;
pub mod get_coins;
pub mod get_market_overview;
pub mod get_news;
pub mod get_quotes;
pub mod get_random_quote;
pub mod registry;

pub use registry::{ToolOutcome, ToolRegistry};

use crate::types::ToolCallResult;

/// Quote currencies accepted by the market data tools.
pub const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "BTC", "ETH"];

/// The upstream call behind a tool produced nothing usable.
///
/// Carries a short noun phrase naming what could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable(pub &'static str);

impl Unavailable {
    pub fn message(&self) -> String {
        format!("Failed to fetch {}", self.0)
    }
}

/// What a tool handler returns. `Err` becomes a text block, never a
/// protocol error.
pub type ToolResult = Result<ToolCallResult, Unavailable>;

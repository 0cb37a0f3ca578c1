//! Tool: get_market_overview — Global market cap, volume, and BTC dominance.

use cryptowire::{format, ApiClient, Arguments, InputSchema, MarketOverview};

use super::{ToolResult, Unavailable};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_market_overview";

pub fn schema() -> InputSchema {
    InputSchema::empty()
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some(
            "Get global crypto market figures: total market cap, volume, BTC dominance"
                .to_string(),
        ),
        input_schema: schema().to_json_schema(),
    }
}

pub async fn execute(_args: &Arguments, api: &ApiClient) -> ToolResult {
    let market: MarketOverview = api
        .fetch("/markets", &[])
        .await
        .ok_or(Unavailable("market overview"))?;

    Ok(ToolCallResult::text(format::market_overview(&market)))
}

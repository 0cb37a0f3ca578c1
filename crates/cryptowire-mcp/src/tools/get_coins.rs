//! Tool: get_coins — List coins with market data.

use cryptowire::{format, ApiClient, ArgValue, Arguments, Coin, FieldSpec, InputSchema, Page};

use super::{ToolResult, Unavailable, CURRENCIES};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_coins";

pub fn schema() -> InputSchema {
    InputSchema::new(vec![
        FieldSpec::integer("limit", "Number of coins to return", Some(1.0), Some(100.0))
            .with_default(ArgValue::Number(20.0)),
        FieldSpec::choice("currency", "Quote currency", CURRENCIES)
            .with_default(ArgValue::Text("USD".to_string())),
        FieldSpec::text("symbol", "Only return the coin with this ticker symbol"),
        FieldSpec::flag("include_risk_score", "Include the risk score of each coin")
            .with_default(ArgValue::Flag(false)),
    ])
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("List cryptocurrencies ranked by market cap, with prices".to_string()),
        input_schema: schema().to_json_schema(),
    }
}

pub async fn execute(args: &Arguments, api: &ApiClient) -> ToolResult {
    let limit = args.number("limit").unwrap_or(20.0) as u32;
    let currency = args.text("currency").unwrap_or("USD");
    let with_risk = args.flag("include_risk_score").unwrap_or(false);

    let mut query = vec![
        ("limit", limit.to_string()),
        ("currency", currency.to_string()),
        ("includeRiskScore", with_risk.to_string()),
    ];
    if let Some(symbol) = args.text("symbol").filter(|s| !s.trim().is_empty()) {
        query.push(("symbol", symbol.trim().to_uppercase()));
    }

    let page: Page<Coin> = api
        .fetch("/coins", &query)
        .await
        .ok_or(Unavailable("coins data"))?;

    Ok(ToolCallResult::text(format::coin_list(
        &page.result,
        currency,
        with_risk,
    )))
}

//! Tool: get_quotes — Current price quotes for ticker symbols.

use cryptowire::{format, ApiClient, ArgValue, Arguments, FieldSpec, InputSchema, Page, TickerQuote};

use super::{ToolResult, Unavailable, CURRENCIES};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_quotes";

pub fn schema() -> InputSchema {
    InputSchema::new(vec![
        FieldSpec::text_list("symbols", "Ticker symbols, e.g. [\"BTC\", \"ETH\"]").required(),
        FieldSpec::choice("currency", "Quote currency", CURRENCIES)
            .with_default(ArgValue::Text("USD".to_string())),
    ])
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("Get current price quotes for one or more ticker symbols".to_string()),
        input_schema: schema().to_json_schema(),
    }
}

pub async fn execute(args: &Arguments, api: &ApiClient) -> ToolResult {
    let currency = args.text("currency").unwrap_or("USD");
    let symbols: Vec<String> = args
        .text_list("symbols")
        .unwrap_or_default()
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Ok(ToolCallResult::text("No symbols requested"));
    }

    let page: Page<TickerQuote> = api
        .fetch(
            "/tickers/quotes",
            &[
                ("symbols", symbols.join(",")),
                ("currency", currency.to_string()),
            ],
        )
        .await
        .ok_or(Unavailable("quotes"))?;

    Ok(ToolCallResult::text(format::quote_list(&page.result, currency)))
}

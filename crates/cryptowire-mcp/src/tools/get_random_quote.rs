//! Tool: get_random_quote — A random quotation.

use cryptowire::{format, ApiClient, Arguments, FieldSpec, InputSchema, Quotation};

use super::{ToolResult, Unavailable};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_random_quote";

pub fn schema() -> InputSchema {
    InputSchema::new(vec![FieldSpec::text(
        "category",
        "Optional quote category, e.g. \"investing\"",
    )])
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("Get a random quote".to_string()),
        input_schema: schema().to_json_schema(),
    }
}

pub async fn execute(args: &Arguments, api: &ApiClient) -> ToolResult {
    let query: Vec<(&str, String)> = args
        .text("category")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| vec![("category", c.to_string())])
        .unwrap_or_default();

    let quote: Quotation = api
        .fetch("/quotes/random", &query)
        .await
        .ok_or(Unavailable("a quote"))?;

    Ok(ToolCallResult::text(format::quotation(&quote)))
}

//! Tool: get_coin_by_id — Detailed market data for one coin.

use cryptowire::{format, ApiClient, ArgValue, Arguments, Coin, FieldSpec, InputSchema};

use super::{ToolResult, Unavailable, CURRENCIES};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_coin_by_id";

pub fn schema() -> InputSchema {
    InputSchema::new(vec![
        FieldSpec::text("coin_id", "Coin identifier, e.g. \"bitcoin\"").required(),
        FieldSpec::choice("currency", "Quote currency", CURRENCIES)
            .with_default(ArgValue::Text("USD".to_string())),
    ])
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("Get detailed market data for a single coin".to_string()),
        input_schema: schema().to_json_schema(),
    }
}

/// Identifiers are interpolated into the URL path.
fn is_path_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && id != "."
        && id != ".."
}

pub async fn execute(args: &Arguments, api: &ApiClient) -> ToolResult {
    let coin_id = args.text("coin_id").unwrap_or_default().trim();
    let currency = args.text("currency").unwrap_or("USD");

    if !is_path_safe(coin_id) {
        return Ok(ToolCallResult::text(format!(
            "{} for coin id '{coin_id}'",
            format::NO_DATA
        )));
    }

    let coin: Coin = api
        .fetch(
            &format!("/coins/{coin_id}"),
            &[("currency", currency.to_string())],
        )
        .await
        .ok_or(Unavailable("coin data"))?;

    Ok(ToolCallResult::text(format::coin_detail(&coin, currency)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_safety() {
        assert!(is_path_safe("bitcoin"));
        assert!(is_path_safe("usd-coin"));
        assert!(is_path_safe("wrapped_eth.v2"));
        assert!(!is_path_safe(""));
        assert!(!is_path_safe(".."));
        assert!(!is_path_safe("../admin"));
        assert!(!is_path_safe("bit coin"));
        assert!(!is_path_safe("a?b=c"));
    }
}

//! Tool registration and dispatch.

use std::collections::HashSet;

use serde_json::Value;

use cryptowire::{ApiClient, InputSchema};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    get_coin_by_id, get_coins, get_market_overview, get_news, get_quotes, get_random_quote,
};

/// Result of a tool call as seen by the protocol layer.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub result: ToolCallResult,
    /// Set when the upstream call failed and `result` carries the
    /// failure text.
    pub unavailable: Option<&'static str>,
}

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            get_coins::definition(),
            get_coin_by_id::definition(),
            get_market_overview::definition(),
            get_news::definition(),
            get_quotes::definition(),
            get_random_quote::definition(),
        ]
    }

    pub fn schema(name: &str) -> Option<InputSchema> {
        match name {
            get_coins::NAME => Some(get_coins::schema()),
            get_coin_by_id::NAME => Some(get_coin_by_id::schema()),
            get_market_overview::NAME => Some(get_market_overview::schema()),
            get_news::NAME => Some(get_news::schema()),
            get_quotes::NAME => Some(get_quotes::schema()),
            get_random_quote::NAME => Some(get_random_quote::schema()),
            _ => None,
        }
    }

    /// Check that tool names are unique and every listed tool dispatches.
    pub fn verify() -> McpResult<()> {
        let mut seen = HashSet::new();
        for tool in Self::list_tools() {
            if !seen.insert(tool.name.clone()) {
                return Err(McpError::InternalError(format!(
                    "Duplicate tool name: {}",
                    tool.name
                )));
            }
            if Self::schema(&tool.name).is_none() {
                return Err(McpError::InternalError(format!(
                    "Tool {} is listed but not dispatchable",
                    tool.name
                )));
            }
        }
        Ok(())
    }

    /// Validate `arguments` against the tool's schema and run it.
    ///
    /// Unknown tools and schema violations are protocol errors. Upstream
    /// failures are not: they come back as a text block.
    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        api: &ApiClient,
    ) -> McpResult<ToolOutcome> {
        let schema = Self::schema(name).ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        let args = schema.validate(&arguments.unwrap_or(Value::Null))?;

        let result = match name {
            get_coins::NAME => get_coins::execute(&args, api).await,
            get_coin_by_id::NAME => get_coin_by_id::execute(&args, api).await,
            get_market_overview::NAME => get_market_overview::execute(&args, api).await,
            get_news::NAME => get_news::execute(&args, api).await,
            get_quotes::NAME => get_quotes::execute(&args, api).await,
            get_random_quote::NAME => get_random_quote::execute(&args, api).await,
            _ => return Err(McpError::ToolNotFound(name.to_string())),
        };

        Ok(match result {
            Ok(result) => ToolOutcome {
                result,
                unavailable: None,
            },
            Err(unavailable) => {
                tracing::warn!("Tool {name}: {}", unavailable.message());
                ToolOutcome {
                    result: ToolCallResult::text(unavailable.message()),
                    unavailable: Some(unavailable.0),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_consistent() {
        ToolRegistry::verify().unwrap();
        assert_eq!(ToolRegistry::list_tools().len(), 6);
    }

    #[test]
    fn test_every_definition_has_object_schema() {
        for tool in ToolRegistry::list_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.description.is_some());
        }
    }
}

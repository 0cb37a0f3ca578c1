//! Tool: get_news — Crypto news by category.

use cryptowire::{format, ApiClient, ArgValue, Arguments, FieldSpec, InputSchema, NewsArticle};

use super::{ToolResult, Unavailable};
use crate::types::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "get_news";

const NEWS_TYPES: &[&str] = &["latest", "trending", "handpicked", "bullish", "bearish"];

pub fn schema() -> InputSchema {
    InputSchema::new(vec![
        FieldSpec::choice("type", "News category", NEWS_TYPES)
            .with_default(ArgValue::Text("latest".to_string())),
        FieldSpec::integer("limit", "Number of articles", Some(1.0), Some(50.0))
            .with_default(ArgValue::Number(10.0)),
    ])
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("Get crypto news: latest, trending, handpicked, bullish or bearish".to_string()),
        input_schema: schema().to_json_schema(),
    }
}

pub async fn execute(args: &Arguments, api: &ApiClient) -> ToolResult {
    let kind = args.text("type").unwrap_or("latest");
    let limit = args.number("limit").unwrap_or(10.0) as usize;

    let mut articles: Vec<NewsArticle> = api
        .fetch(
            &format!("/news/type/{kind}"),
            &[("page", "1".to_string()), ("limit", limit.to_string())],
        )
        .await
        .ok_or(Unavailable("news"))?;
    articles.truncate(limit);

    Ok(ToolCallResult::text(format::news_list(&articles)))
}

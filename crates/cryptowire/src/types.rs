//! Upstream data shapes and library errors.

use serde::{Deserialize, Serialize};

/// A coin as returned by the market data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "priceChange24h")]
    pub price_change1d: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub risk_score: Option<f64>,
}

/// Paged list envelope used by list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
}

/// Global market figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub btc_dominance: Option<f64>,
    #[serde(default)]
    pub market_cap_change: Option<f64>,
    #[serde(default)]
    pub volume_change: Option<f64>,
}

/// A news article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Publication time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub feed_date: Option<i64>,
}

/// A price quote for a single ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerQuote {
    pub symbol: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "change24h")]
    pub price_change1d: Option<f64>,
}

/// A quotation with attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(alias = "quote", alias = "q")]
    pub content: String,
    #[serde(default, alias = "a")]
    pub author: Option<String>,
}

/// Errors raised while talking to the upstream API.
///
/// These never leave [`crate::ApiClient::request`]; they are logged and
/// collapsed to `None` there.
#[derive(thiserror::Error, Debug)]
pub enum CryptowireError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Malformed JSON from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

/// Convenience result type.
pub type CryptowireResult<T> = Result<T, CryptowireError>;

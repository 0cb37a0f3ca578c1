//! Plain-text rendering of upstream data for tool results.

use chrono::{TimeZone, Utc};

use crate::types::{Coin, MarketOverview, NewsArticle, Quotation, TickerQuote};

/// Text returned when an upstream call yields nothing usable.
pub const NO_DATA: &str = "No data found";

/// Format a money amount with thousands separators and a currency suffix.
pub fn money(value: f64, currency: &str) -> String {
    let decimals = if value.abs() >= 1.0 { 2 } else { 6 };
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped} {currency}")
    } else {
        format!("{sign}{grouped}.{frac_part} {currency}")
    }
}

/// Format a percentage change with an explicit sign.
pub fn percent(value: f64) -> String {
    format!("{value:+.2}%")
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "n/a".to_string())
}

pub fn coin_line(coin: &Coin, currency: &str, with_risk: bool) -> String {
    let rank = coin
        .rank
        .map(|r| format!("#{r} "))
        .unwrap_or_default();
    let mut line = format!(
        "{rank}{} ({}) — price {}, 24h {}, market cap {}",
        coin.name,
        coin.symbol,
        or_na(coin.price.map(|p| money(p, currency))),
        or_na(coin.price_change1d.map(percent)),
        or_na(coin.market_cap.map(|m| money(m, currency))),
    );
    if with_risk {
        line.push_str(&format!(
            ", risk score {}",
            or_na(coin.risk_score.map(|r| format!("{r:.1}")))
        ));
    }
    line
}

pub fn coin_list(coins: &[Coin], currency: &str, with_risk: bool) -> String {
    if coins.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = format!("{} coins:\n", coins.len());
    for coin in coins {
        out.push_str("- ");
        out.push_str(&coin_line(coin, currency, with_risk));
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn coin_detail(coin: &Coin, currency: &str) -> String {
    [
        format!("{} ({})", coin.name, coin.symbol),
        format!("ID: {}", coin.id),
        format!("Rank: {}", or_na(coin.rank.map(|r| r.to_string()))),
        format!("Price: {}", or_na(coin.price.map(|p| money(p, currency)))),
        format!("24h change: {}", or_na(coin.price_change1d.map(percent))),
        format!("Market cap: {}", or_na(coin.market_cap.map(|m| money(m, currency)))),
        format!("Volume: {}", or_na(coin.volume.map(|v| money(v, currency)))),
    ]
    .join("\n")
}

pub fn market_overview(market: &MarketOverview) -> String {
    [
        format!(
            "Total market cap: {} ({})",
            or_na(market.market_cap.map(|m| money(m, "USD"))),
            or_na(market.market_cap_change.map(percent))
        ),
        format!(
            "24h volume: {} ({})",
            or_na(market.volume.map(|v| money(v, "USD"))),
            or_na(market.volume_change.map(percent))
        ),
        format!(
            "BTC dominance: {}",
            or_na(market.btc_dominance.map(|d| format!("{d:.2}%")))
        ),
    ]
    .join("\n")
}

/// Render a millisecond timestamp as UTC.
pub fn timestamp_ms(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}

pub fn news_list(articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = String::new();
    for (i, article) in articles.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, article.title));
        if let Some(source) = &article.source {
            out.push_str(&format!("   Source: {source}\n"));
        }
        if let Some(published) = article.feed_date.and_then(timestamp_ms) {
            out.push_str(&format!("   Published: {published}\n"));
        }
        if let Some(link) = &article.link {
            out.push_str(&format!("   {link}\n"));
        }
    }
    out.trim_end().to_string()
}

pub fn quote_list(quotes: &[TickerQuote], currency: &str) -> String {
    if quotes.is_empty() {
        return NO_DATA.to_string();
    }
    quotes
        .iter()
        .map(|q| {
            format!(
                "{}: {} ({})",
                q.symbol,
                or_na(q.price.map(|p| money(p, currency))),
                or_na(q.price_change1d.map(percent))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn quotation(quote: &Quotation) -> String {
    match quote.author.as_deref().filter(|a| !a.trim().is_empty()) {
        Some(author) => format!("\"{}\" — {author}", quote.content.trim()),
        None => format!("\"{}\"", quote.content.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> Coin {
        Coin {
            id: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            rank: Some(1),
            price: Some(64250.5),
            price_change1d: Some(-1.234),
            market_cap: Some(1_265_000_000_000.0),
            volume: None,
            risk_score: Some(12.0),
        }
    }

    #[test]
    fn test_money_grouping() {
        assert_eq!(money(1234567.891, "USD"), "1,234,567.89 USD");
        assert_eq!(money(999.0, "EUR"), "999.00 EUR");
        assert_eq!(money(-1500.0, "USD"), "-1,500.00 USD");
        assert_eq!(money(0.00012345, "BTC"), "0.000123 BTC");
    }

    #[test]
    fn test_percent_sign() {
        assert_eq!(percent(2.5), "+2.50%");
        assert_eq!(percent(-0.456), "-0.46%");
    }

    #[test]
    fn test_coin_line_with_and_without_risk() {
        let c = coin();
        let plain = coin_line(&c, "USD", false);
        assert!(plain.starts_with("#1 Bitcoin (BTC)"));
        assert!(plain.contains("64,250.50 USD"));
        assert!(plain.contains("-1.23%"));
        assert!(!plain.contains("risk"));

        let risky = coin_line(&c, "USD", true);
        assert!(risky.ends_with("risk score 12.0"));
    }

    #[test]
    fn test_empty_lists_say_no_data() {
        assert_eq!(coin_list(&[], "USD", false), NO_DATA);
        assert_eq!(news_list(&[]), NO_DATA);
        assert_eq!(quote_list(&[], "USD"), NO_DATA);
    }

    #[test]
    fn test_coin_detail_marks_missing_fields() {
        let text = coin_detail(&coin(), "USD");
        assert!(text.contains("ID: bitcoin"));
        assert!(text.contains("Volume: n/a"));
    }

    #[test]
    fn test_news_list_renders_dates() {
        let articles = vec![NewsArticle {
            id: None,
            title: "Bitcoin hits new high".to_string(),
            source: Some("Wire".to_string()),
            link: Some("https://example.com/a".to_string()),
            feed_date: Some(1_700_000_000_000),
        }];
        let text = news_list(&articles);
        assert!(text.starts_with("1. Bitcoin hits new high"));
        assert!(text.contains("Published: 2023-11-14 22:13 UTC"));
        assert!(text.contains("https://example.com/a"));
    }

    #[test]
    fn test_quotation_attribution() {
        let q = Quotation {
            content: " Stay humble. ".to_string(),
            author: Some("Anon".to_string()),
        };
        assert_eq!(quotation(&q), "\"Stay humble.\" — Anon");

        let unattributed = Quotation {
            content: "Stack sats.".to_string(),
            author: Some(" ".to_string()),
        };
        assert_eq!(quotation(&unattributed), "\"Stack sats.\"");
    }
}

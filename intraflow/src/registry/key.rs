//! Deterministic record-key derivation.
//!
//! Template: the request kind followed by the rendered values of the
//! entry's key params, joined with `_`. Runs of characters outside
//! `[A-Za-z0-9_.-]` collapse to a single `_`. Requests with no registered
//! entry use every rendered param in sorted-name order.

use super::CapabilityEntry;
use crate::core::RequestItem;
use regex::Regex;
use std::sync::OnceLock;

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("static key pattern compiles"))
}

/// Replaces unsafe character runs with `_` and trims stray separators.
#[must_use]
pub fn sanitize_key_part(raw: &str) -> String {
    separator_pattern()
        .replace_all(raw.trim(), "_")
        .trim_matches('_')
        .to_string()
}

/// Derives the record key for a request.
#[must_use]
pub fn derive_key(item: &RequestItem, entry: Option<&CapabilityEntry>) -> String {
    let mut parts = vec![sanitize_key_part(item.kind())];

    match entry {
        Some(entry) => {
            for name in &entry.key_params {
                if let Some(value) = item.get(name) {
                    render_value(value, &mut parts);
                }
            }
        }
        None => {
            for value in item.params().values() {
                render_value(value, &mut parts);
            }
        }
    }

    parts.retain(|p| !p.is_empty());
    parts.join("_")
}

fn render_value(value: &serde_json::Value, parts: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => parts.push(sanitize_key_part(s)),
        serde_json::Value::Number(n) => parts.push(n.to_string()),
        serde_json::Value::Bool(b) => parts.push(b.to_string()),
        serde_json::Value::Array(items) => {
            for item in items {
                render_value(item, parts);
            }
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketData;
    use crate::core::Params;
    use crate::registry::{CapabilityHandler, FnHandler, HandlerFailure};
    use serde_json::json;
    use std::sync::Arc;

    fn entry(kind: &str, key_params: &[&str]) -> CapabilityEntry {
        let handler: Arc<dyn CapabilityHandler> = Arc::new(FnHandler::new(
            |_: &Params, _: &MarketData| -> Result<serde_json::Value, HandlerFailure> { Ok(json!(null)) },
        ));
        CapabilityEntry::new(kind, handler).keyed_by(key_params.iter().copied())
    }

    #[test]
    fn test_intraday_prices_key() {
        let item = RequestItem::new("intraday_prices")
            .param("ticker", "AAPL")
            .param("interval", "5min")
            .param("count", 12);
        let key = derive_key(&item, Some(&entry("intraday_prices", &["ticker", "interval"])));
        assert_eq!(key, "intraday_prices_AAPL_5min");
    }

    #[test]
    fn test_news_feed_key_uses_keywords_only() {
        let item = RequestItem::new("news_feed")
            .param("keywords", json!(["AAPL", "earnings"]))
            .param("sources", json!(["bloomberg", "reuters"]))
            .param("max_articles", 5);
        let key = derive_key(&item, Some(&entry("news_feed", &["keywords"])));
        assert_eq!(key, "news_feed_AAPL_earnings");
    }

    #[test]
    fn test_economic_data_key_sanitizes_spaces() {
        let item = RequestItem::new("economic_data")
            .param("indicator_name", "Non-Farm Payroll")
            .param("country", "USA");
        let key = derive_key(
            &item,
            Some(&entry("economic_data", &["indicator_name", "country"])),
        );
        assert_eq!(key, "economic_data_Non-Farm_Payroll_USA");
    }

    #[test]
    fn test_pattern_key_is_kind() {
        let item = RequestItem::new("price_volume_surge");
        assert_eq!(
            derive_key(&item, Some(&entry("price_volume_surge", &[]))),
            "price_volume_surge"
        );
    }

    #[test]
    fn test_unknown_kind_uses_sorted_params() {
        let item = RequestItem::new("crypto_prices")
            .param("symbol", "BTC")
            .param("exchange", "kraken")
            .param("depth", json!({"levels": 5}));
        assert_eq!(derive_key(&item, None), "crypto_prices_kraken_BTC");
    }

    #[test]
    fn test_missing_key_param_is_skipped() {
        let item = RequestItem::new("intraday_prices").param("ticker", "AAPL");
        let key = derive_key(&item, Some(&entry("intraday_prices", &["ticker", "interval"])));
        assert_eq!(key, "intraday_prices_AAPL");
    }

    #[test]
    fn test_same_item_same_key() {
        let item = RequestItem::new("unsupported_pattern");
        assert_eq!(derive_key(&item, None), derive_key(&item.clone(), None));
    }

    #[test]
    fn test_sanitize_key_part() {
        assert_eq!(sanitize_key_part("  S&P 500 / futures "), "S_P_500_futures");
        assert_eq!(sanitize_key_part("BRK.B"), "BRK.B");
    }
}

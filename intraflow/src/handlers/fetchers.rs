//! Simulated market-data sources.
//!
//! Every source derives its RNG seed from the identifying params, so the same
//! request always yields the same payload.

use super::round2;
use crate::core::Params;
use crate::market::{EconomicDataPoint, MarketData, NewsArticle, NewsBatch, PriceBar, PriceSeries};
use crate::registry::{CapabilityHandler, HandlerFailure};
use crate::utils::{session_open, stable_seed};
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::OnceLock;

/// Bars in a regular US equity session at one-minute resolution.
pub const MAX_BARS: u64 = 390;

/// Articles a single news request may return.
pub const MAX_ARTICLES: u64 = 50;

/// Longest bar interval accepted, in minutes.
pub const MAX_INTERVAL_MINUTES: i64 = 1_440;

const DEFAULT_NEWS_SOURCE: &str = "newswire";

fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)(min|m|h)$").expect("static interval pattern compiles"))
}

/// Parses an interval such as `5min`, `15m` or `1h` into minutes.
pub(crate) fn parse_interval_minutes(raw: &str) -> Option<i64> {
    let captures = interval_pattern().captures(raw.trim())?;
    let amount: i64 = captures.get(1)?.as_str().parse().ok()?;
    let minutes = match captures.get(2)?.as_str() {
        "h" => amount.checked_mul(60)?,
        _ => amount,
    };
    (1..=MAX_INTERVAL_MINUTES).contains(&minutes).then_some(minutes)
}

fn str_param<'a>(params: &'a Params, name: &str) -> Result<&'a str, HandlerFailure> {
    params
        .get(name)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerFailure::invalid_param(name, "expected a non-empty string"))
}

fn bounded_param(params: &Params, name: &str, max: u64) -> Result<u64, HandlerFailure> {
    let value = params
        .get(name)
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| HandlerFailure::invalid_param(name, "expected a positive integer"))?;
    if value == 0 || value > max {
        return Err(HandlerFailure::invalid_param(
            name,
            format!("must be between 1 and {max}"),
        ));
    }
    Ok(value)
}

/// Accepts either a single string or an array of strings.
fn string_list(params: &Params, name: &str) -> Result<Vec<String>, HandlerFailure> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::String(s)) => Ok(vec![s.trim().to_string()]),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| HandlerFailure::invalid_param(name, "expected strings"))
            })
            .collect(),
        Some(_) => Err(HandlerFailure::invalid_param(
            name,
            "expected a string or a list of strings",
        )),
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HandlerFailure> {
    serde_json::to_value(value).map_err(|e| HandlerFailure::new(format!("serialization failed: {e}")))
}

/// Intraday OHLCV bars for one ticker.
///
/// Params: `ticker`, `interval`, `count`. Bars start at the session open and
/// step by the interval. When three or more bars are requested, the bar two
/// thirds of the way in carries a volume spike and a sharp move.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntradayPricesSource;

impl CapabilityHandler for IntradayPricesSource {
    fn invoke(&self, params: &Params, _data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let ticker = str_param(params, "ticker")?;
        let interval = str_param(params, "interval")?;
        let minutes = parse_interval_minutes(interval).ok_or_else(|| {
            HandlerFailure::invalid_param(
                "interval",
                format!("unrecognised interval '{interval}' (1min to {MAX_INTERVAL_MINUTES}min)"),
            )
        })?;
        let count = bounded_param(params, "count", MAX_BARS)?;

        let series = PriceSeries {
            ticker: ticker.to_string(),
            interval: interval.to_string(),
            bars: simulate_bars(ticker, interval, minutes, count)?,
        };
        to_payload(&series)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn simulate_bars(ticker: &str, interval: &str, minutes: i64, count: u64) -> Result<Vec<PriceBar>, HandlerFailure> {
    let mut rng = StdRng::seed_from_u64(stable_seed(&["intraday_prices", ticker, interval]));
    let surge_index = (count >= 3).then(|| count * 2 / 3);
    let start = session_open();

    let mut bars = Vec::with_capacity(count as usize);
    let mut price = round2(rng.gen_range(40.0..400.0));

    for i in 0..count {
        let open = price;
        let is_surge = surge_index == Some(i);
        let (move_pct, volume) = if is_surge {
            let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            (direction * rng.gen_range(2.0..3.5), rng.gen_range(400_000..600_000))
        } else {
            (rng.gen_range(-0.25..0.25), rng.gen_range(80_000..120_000))
        };

        let close = round2(open * (1.0 + move_pct / 100.0));
        let wick = rng.gen_range(0.0..0.1) / 100.0;
        let timestamp = i64::try_from(i)
            .ok()
            .and_then(|step| minutes.checked_mul(step))
            .and_then(|offset| start.checked_add_signed(Duration::minutes(offset)))
            .ok_or_else(|| HandlerFailure::invalid_param("interval", "bar timestamps run past the calendar"))?;
        bars.push(PriceBar {
            timestamp,
            open,
            high: round2(open.max(close) * (1.0 + wick)),
            low: round2(open.min(close) * (1.0 - wick)),
            close,
            volume,
        });
        price = close;
    }

    Ok(bars)
}

/// News articles matching keywords.
///
/// Params: `keywords` (string or list), `max_articles`, and optional
/// `sources` (defaults to a generic wire).
#[derive(Debug, Clone, Copy, Default)]
pub struct NewsFeedSource;

const HEADLINE_TEMPLATES: [&str; 6] = [
    "{kw} draws heavy trading as investors digest the latest update",
    "Analysts revisit {kw} outlook after morning session",
    "{kw} in focus as sector peers move",
    "Options activity picks up around {kw}",
    "{kw}: what traders are watching into the close",
    "Fund managers weigh positioning on {kw}",
];

impl CapabilityHandler for NewsFeedSource {
    fn invoke(&self, params: &Params, _data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let keywords: Vec<String> = string_list(params, "keywords")?
            .into_iter()
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(HandlerFailure::invalid_param("keywords", "no usable keywords"));
        }
        let mut sources = string_list(params, "sources")?;
        sources.retain(|s| !s.is_empty());
        if sources.is_empty() {
            sources.push(DEFAULT_NEWS_SOURCE.to_string());
        }
        let max_articles = bounded_param(params, "max_articles", MAX_ARTICLES)?;

        let seed_parts: Vec<&str> = std::iter::once("news_feed")
            .chain(keywords.iter().map(String::as_str))
            .chain(std::iter::once("|"))
            .chain(sources.iter().map(String::as_str))
            .collect();
        let mut rng = StdRng::seed_from_u64(stable_seed(&seed_parts));
        let tilt: f64 = rng.gen_range(-0.6..0.6);
        let subject = keywords.join(" ");
        let start = session_open();

        let articles = (0..max_articles)
            .map(|i| {
                let template = HEADLINE_TEMPLATES[rng.gen_range(0..HEADLINE_TEMPLATES.len())];
                let source = &sources[rng.gen_range(0..sources.len())];
                let sentiment = (tilt + rng.gen_range(-0.3..0.3)).clamp(-1.0, 1.0);
                #[allow(clippy::cast_possible_wrap)]
                let offset = Duration::minutes(15 * i as i64 - 60);
                NewsArticle {
                    headline: template.replace("{kw}", &subject),
                    source: source.clone(),
                    published_at: start + offset,
                    sentiment: round2(sentiment),
                }
            })
            .collect();

        to_payload(&NewsBatch {
            keywords,
            sources,
            articles,
        })
    }
}

/// Latest reading of an economic indicator.
///
/// Params: `indicator_name`, `country`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EconomicDataSource;

impl CapabilityHandler for EconomicDataSource {
    fn invoke(&self, params: &Params, _data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let indicator = str_param(params, "indicator_name")?;
        let country = str_param(params, "country")?;

        let mut rng = StdRng::seed_from_u64(stable_seed(&["economic_data", indicator, country]));
        let previous: f64 = rng.gen_range(1.0..300.0);
        let value = previous * (1.0 + rng.gen_range(-0.05..0.05));

        to_payload(&EconomicDataPoint {
            indicator_name: indicator.to_string(),
            country: country.to_string(),
            value: round2(value),
            previous: round2(previous),
            period: "2023-09".to_string(),
        })
    }
}

//! Tests for the exchange-rate cache and watcher.

use std::collections::HashMap;

use autopilot_core::profitability::ExchangeRate;
use autopilot_infra::controller::RigEvent;
use autopilot_infra::rates::{RateWatcher, parse_ticker, rate_cache};

const TICKER: &str = r#"{
  "USD": {"15m": 43012.5, "last": 43012.5, "buy": 43012.5, "sell": 43012.5, "symbol": "$"},
  "EUR": {"15m": 39500.1, "last": 39500.1, "buy": 39500.1, "sell": 39500.1, "symbol": "€"}
}"#;

fn usd(price: f64) -> HashMap<String, ExchangeRate> {
    HashMap::from([(
        "USD".to_string(),
        ExchangeRate {
            instant_price: price,
            symbol: "$".to_string(),
        },
    )])
}

#[test]
fn test_ticker_parses_last_and_symbol() {
    let rates = parse_ticker(TICKER).unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates["USD"].instant_price, 43012.5);
    assert_eq!(rates["EUR"].symbol, "€");
}

#[test]
fn test_malformed_ticker_is_an_error() {
    assert!(parse_ticker("<html>rate limited</html>").is_err());
}

#[test]
fn test_cache_is_empty_until_first_publish() {
    let (writer, cache) = rate_cache();
    assert_eq!(cache.get_rate("USD"), None);
    writer.publish(parse_ticker(TICKER).unwrap());
    assert_eq!(cache.get_rate("usd").unwrap().instant_price, 43012.5);
    assert_eq!(cache.get_rate("JPY"), None);
}

#[test]
fn test_cache_keeps_last_value_until_replaced() {
    let (writer, cache) = rate_cache();
    writer.publish(usd(100.0));
    let late_reader = cache.clone();
    assert_eq!(late_reader.get_rate("USD").unwrap().instant_price, 100.0);
    writer.publish(usd(101.0));
    assert_eq!(cache.get_rate("USD").unwrap().instant_price, 101.0);
}

#[test]
fn test_watcher_reports_only_changes() {
    let (writer, cache) = rate_cache();
    let mut watcher = RateWatcher::new(cache, "USD");
    assert_eq!(watcher.check(), None);

    writer.publish(usd(100.0));
    assert_eq!(
        watcher.check(),
        Some(RigEvent::RateChanged {
            currency: "USD".to_string(),
            instant_price: 100.0
        })
    );
    assert_eq!(watcher.check(), None);

    writer.publish(usd(99.5));
    assert!(matches!(
        watcher.check(),
        Some(RigEvent::RateChanged { instant_price, .. }) if instant_price == 99.5
    ));
}

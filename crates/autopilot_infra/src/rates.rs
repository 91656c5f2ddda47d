//! Exchange-rate cache fed by the BTC ticker.
//!
//! The poller refreshes the whole currency map on a fixed period. A failed
//! refresh is silent and leaves the previous map in place; readers always
//! get the last value that was successfully fetched, or nothing before the
//! first success.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use autopilot_core::profitability::ExchangeRate;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::controller::RigEvent;
use crate::error::ApiError;

pub type RateMap = HashMap<String, ExchangeRate>;

#[derive(Debug, Deserialize)]
struct TickerEntry {
    last: f64,
    #[serde(default)]
    symbol: String,
}

/// Decode `{"USD": {"last": .., "symbol": "$"}, ...}`. Currency codes are
/// upper-cased.
pub fn parse_ticker(raw: &str) -> Result<RateMap, serde_json::Error> {
    let entries: HashMap<String, TickerEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .map(|(code, e)| {
            (
                code.to_ascii_uppercase(),
                ExchangeRate {
                    instant_price: e.last,
                    symbol: e.symbol,
                },
            )
        })
        .collect())
}

pub struct RateCacheWriter {
    tx: watch::Sender<Arc<RateMap>>,
}

#[derive(Debug, Clone)]
pub struct RateCache {
    rx: watch::Receiver<Arc<RateMap>>,
}

pub fn rate_cache() -> (RateCacheWriter, RateCache) {
    let (tx, rx) = watch::channel(Arc::new(RateMap::new()));
    (RateCacheWriter { tx }, RateCache { rx })
}

impl RateCacheWriter {
    pub fn publish(&self, rates: RateMap) {
        self.tx.send_replace(Arc::new(rates));
    }
}

impl RateCache {
    /// Rate for `currency`, `None` before the first fetch or for an unknown
    /// code. Never fails.
    pub fn get_rate(&self, currency: &str) -> Option<ExchangeRate> {
        self.rx
            .borrow()
            .get(&currency.to_ascii_uppercase())
            .cloned()
    }
}

pub struct RatePoller {
    http: reqwest::Client,
    ticker_url: String,
    writer: RateCacheWriter,
}

impl RatePoller {
    pub fn new(http: reqwest::Client, ticker_url: impl Into<String>, writer: RateCacheWriter) -> Self {
        Self {
            http,
            ticker_url: ticker_url.into(),
            writer,
        }
    }

    /// Fetch the ticker once and publish it.
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        let resp = self.http.get(&self.ticker_url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                body: text,
            });
        }
        let rates = parse_ticker(&text)?;
        let count = rates.len();
        self.writer.publish(rates);
        Ok(count)
    }

    /// Refresh forever on `period`; failures keep the previous rates.
    pub async fn run(self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.refresh().await {
                Ok(count) => debug!(currencies = count, "exchange rates refreshed"),
                Err(e) => debug!(error = %e, "exchange rate refresh failed"),
            }
        }
    }
}

/// Compares the cached rate against the previous reading.
#[derive(Debug)]
pub struct RateWatcher {
    cache: RateCache,
    currency: String,
    last_price: Option<f64>,
}

impl RateWatcher {
    pub fn new(cache: RateCache, currency: impl Into<String>) -> Self {
        Self {
            cache,
            currency: currency.into(),
            last_price: None,
        }
    }

    /// A `RateChanged` event if the cached price moved since the last check.
    pub fn check(&mut self) -> Option<RigEvent> {
        let price = self.cache.get_rate(&self.currency)?.instant_price;
        if self.last_price == Some(price) {
            return None;
        }
        self.last_price = Some(price);
        Some(RigEvent::RateChanged {
            currency: self.currency.clone(),
            instant_price: price,
        })
    }

    pub async fn run(mut self, period: Duration, events: mpsc::UnboundedSender<RigEvent>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Some(event) = self.check() {
                if let RigEvent::RateChanged { instant_price, .. } = &event {
                    info!(currency = %self.currency, price = instant_price, "exchange rate changed");
                }
                // No listener is fine.
                let _ = events.send(event);
            }
        }
    }
}

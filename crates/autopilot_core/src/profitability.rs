//! Profitability engine.
//!
//! Puts revenue and electricity cost into one unit (mBTC/day) and derives
//! the net profit percentage the autopilot acts on:
//!
//! - revenue_mbtc = provider_btc_day * 1000, forced to 0 for an idle rig
//! - cost_local   = cost_per_kwh * watts / 1000 * 24
//! - mbtc_rate    = instant_price / 1000 (local currency per mBTC)
//! - cost_mbtc    = cost_local / mbtc_rate
//! - net_pct      = round((revenue_mbtc - cost_mbtc) / cost_mbtc * 100)
//!
//! Missing or zero rate, or a zero cost basis, leaves the percentage
//! undefined. No clamping is applied to tiny but nonzero costs.

use std::fmt;

use crate::telemetry::MetricsSnapshot;

/// Electricity tariff, owned outside the control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffConfig {
    pub cost_per_kwh: f64,
    pub currency: String,
}

/// Last known BTC price in one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    /// Local currency per 1 BTC.
    pub instant_price: f64,
    pub symbol: String,
}

/// Why a tick's profitability could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndeterminateProfitability {
    /// No rate cached yet, or unknown currency.
    MissingRate,
    /// Rate present but zero, negative or non-finite.
    ZeroRate,
    /// Cost basis is zero (no power draw or free electricity).
    ZeroCost,
}

impl fmt::Display for IndeterminateProfitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndeterminateProfitability::MissingRate => "exchange rate missing",
            IndeterminateProfitability::ZeroRate => "exchange rate is zero",
            IndeterminateProfitability::ZeroCost => "cost basis is zero",
        };
        f.write_str(s)
    }
}

impl std::error::Error for IndeterminateProfitability {}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitabilityResult {
    pub revenue_mbtc_day: f64,
    pub cost_local_day: f64,
    /// Local currency per mBTC; `None` when the rate is unusable.
    pub mbtc_rate: Option<f64>,
    pub cost_mbtc_day: Option<f64>,
    /// Rounded net profit percentage; `None` when indeterminate.
    pub net_profit_pct: Option<f64>,
    pub indeterminate: Option<IndeterminateProfitability>,
}

impl ProfitabilityResult {
    pub fn is_determinate(&self) -> bool {
        self.net_profit_pct.is_some()
    }

    pub fn profit_mbtc_day(&self) -> Option<f64> {
        self.cost_mbtc_day.map(|c| self.revenue_mbtc_day - c)
    }

    pub fn revenue_local_day(&self) -> Option<f64> {
        self.mbtc_rate.map(|r| self.revenue_mbtc_day * r)
    }

    pub fn profit_local_day(&self) -> Option<f64> {
        self.revenue_local_day().map(|rev| rev - self.cost_local_day)
    }
}

/// Check a cached rate and turn it into local currency per mBTC.
pub fn mbtc_rate(rate: Option<&ExchangeRate>) -> Result<f64, IndeterminateProfitability> {
    let rate = rate.ok_or(IndeterminateProfitability::MissingRate)?;
    let per_mbtc = rate.instant_price / 1000.0;
    if !per_mbtc.is_finite() || per_mbtc <= 0.0 {
        return Err(IndeterminateProfitability::ZeroRate);
    }
    Ok(per_mbtc)
}

/// Round to the nearest whole percent, halves toward positive infinity:
/// `-0.5` rounds to `0`, `2.5` to `3`.
pub fn round_pct(pct: f64) -> f64 {
    (pct + 0.5).floor()
}

/// Evaluate one tick's profitability.
pub fn evaluate(
    snapshot: &MetricsSnapshot,
    provider_daily_revenue_btc: f64,
    tariff: &TariffConfig,
    rate: Option<&ExchangeRate>,
) -> ProfitabilityResult {
    // Online but between jobs: never credit idle time.
    let revenue_mbtc_day = if snapshot.mining_devices == 0 || snapshot.hashrate_mh == 0.0 {
        0.0
    } else {
        provider_daily_revenue_btc * 1000.0
    };
    let cost_local_day = tariff.cost_per_kwh * snapshot.power_watts / 1000.0 * 24.0;

    let (mbtc_rate, rate_error) = match mbtc_rate(rate) {
        Ok(r) => (Some(r), None),
        Err(e) => (None, Some(e)),
    };
    let cost_mbtc_day = mbtc_rate.map(|r| cost_local_day / r);
    let net_profit_pct = cost_mbtc_day
        .filter(|c| *c > 0.0)
        .map(|c| round_pct((revenue_mbtc_day - c) / c * 100.0));
    let indeterminate = match (rate_error, net_profit_pct) {
        (Some(e), _) => Some(e),
        (None, None) => Some(IndeterminateProfitability::ZeroCost),
        (None, Some(_)) => None,
    };

    ProfitabilityResult {
        revenue_mbtc_day,
        cost_local_day,
        mbtc_rate,
        cost_mbtc_day,
        net_profit_pct,
        indeterminate,
    }
}

//! Tests for the profitability engine.

use autopilot_core::profitability::{
    ExchangeRate, IndeterminateProfitability, TariffConfig, evaluate, round_pct,
};
use autopilot_core::telemetry::MetricsSnapshot;

fn mining_snapshot(watts: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        power_watts: watts,
        hashrate_mh: 100.0,
        mining_devices: 1,
        ..MetricsSnapshot::default()
    }
}

fn tariff(cost: f64) -> TariffConfig {
    TariffConfig {
        cost_per_kwh: cost,
        currency: "USD".to_string(),
    }
}

fn usd(price: f64) -> ExchangeRate {
    ExchangeRate {
        instant_price: price,
        symbol: "$".to_string(),
    }
}

#[test]
fn test_revenue_cost_and_percentage() {
    // 1000 W at 0.10/kWh = 2.4 USD/day. At 40_000 USD/BTC an mBTC is 40 USD,
    // so cost = 0.06 mBTC/day. Revenue 0.00012 BTC/day = 0.12 mBTC/day.
    let r = evaluate(&mining_snapshot(1000.0), 0.00012, &tariff(0.10), Some(&usd(40_000.0)));
    assert!((r.revenue_mbtc_day - 0.12).abs() < 1e-12);
    assert!((r.cost_local_day - 2.4).abs() < 1e-12);
    assert_eq!(r.mbtc_rate, Some(40.0));
    assert!((r.cost_mbtc_day.unwrap() - 0.06).abs() < 1e-12);
    assert_eq!(r.net_profit_pct, Some(100.0));
    assert_eq!(r.indeterminate, None);
    assert!((r.profit_mbtc_day().unwrap() - 0.06).abs() < 1e-12);
    assert!((r.revenue_local_day().unwrap() - 4.8).abs() < 1e-9);
    assert!((r.profit_local_day().unwrap() - 2.4).abs() < 1e-9);
}

#[test]
fn test_percentage_is_rounded() {
    // revenue 10, cost 30 -> -66.66..% -> -67
    let snap = mining_snapshot(1000.0);
    // cost_local = 2.4/day; rate 0.08/mBTC -> cost 30 mBTC/day
    let r = evaluate(&snap, 0.010, &tariff(0.10), Some(&usd(80.0)));
    assert!((r.cost_mbtc_day.unwrap() - 30.0).abs() < 1e-9);
    assert_eq!(r.net_profit_pct, Some(-67.0));
}

#[test]
fn test_idle_rig_earns_nothing() {
    let idle = MetricsSnapshot {
        power_watts: 50.0,
        hashrate_mh: 0.0,
        mining_devices: 0,
        ..MetricsSnapshot::default()
    };
    let r = evaluate(&idle, 0.0005, &tariff(0.10), Some(&usd(40_000.0)));
    assert_eq!(r.revenue_mbtc_day, 0.0);
    assert_eq!(r.net_profit_pct, Some(-100.0));
}

#[test]
fn test_zero_hashrate_with_counted_devices_earns_nothing() {
    let snap = MetricsSnapshot {
        power_watts: 50.0,
        hashrate_mh: 0.0,
        mining_devices: 1,
        ..MetricsSnapshot::default()
    };
    let r = evaluate(&snap, 0.0005, &tariff(0.10), Some(&usd(40_000.0)));
    assert_eq!(r.revenue_mbtc_day, 0.0);
}

#[test]
fn test_missing_rate_is_indeterminate() {
    let r = evaluate(&mining_snapshot(1000.0), 0.0001, &tariff(0.10), None);
    assert_eq!(r.mbtc_rate, None);
    assert_eq!(r.cost_mbtc_day, None);
    assert_eq!(r.net_profit_pct, None);
    assert_eq!(r.indeterminate, Some(IndeterminateProfitability::MissingRate));
    assert!(!r.is_determinate());
    // Local cost is still known.
    assert!((r.cost_local_day - 2.4).abs() < 1e-12);
}

#[test]
fn test_zero_rate_is_indeterminate() {
    let r = evaluate(&mining_snapshot(1000.0), 0.0001, &tariff(0.10), Some(&usd(0.0)));
    assert_eq!(r.net_profit_pct, None);
    assert_eq!(r.indeterminate, Some(IndeterminateProfitability::ZeroRate));
}

#[test]
fn test_zero_cost_is_indeterminate() {
    let r = evaluate(&mining_snapshot(1000.0), 0.0001, &tariff(0.0), Some(&usd(40_000.0)));
    assert_eq!(r.cost_mbtc_day, Some(0.0));
    assert_eq!(r.net_profit_pct, None);
    assert_eq!(r.indeterminate, Some(IndeterminateProfitability::ZeroCost));
}

#[test]
fn test_tiny_cost_is_not_clamped() {
    // 1 W at 0.0001/kWh: cost is minuscule, percentage is huge but defined.
    let r = evaluate(&mining_snapshot(1.0), 0.0001, &tariff(0.0001), Some(&usd(40_000.0)));
    let pct = r.net_profit_pct.unwrap();
    assert!(pct > 1_000_000.0, "pct = {pct}");
}

#[test]
fn test_percent_rounds_halves_up() {
    assert_eq!(round_pct(-0.5), 0.0);
    assert!(round_pct(-0.5) >= 0.0);
    assert_eq!(round_pct(-2.5), -2.0);
    assert_eq!(round_pct(-2.51), -3.0);
    assert_eq!(round_pct(2.5), 3.0);
    assert_eq!(round_pct(-49.6), -50.0);
    assert_eq!(round_pct(12.4), 12.0);
}

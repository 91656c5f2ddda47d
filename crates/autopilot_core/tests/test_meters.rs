//! Tests for the cumulative meter accumulator.

use autopilot_core::meters::CumulativeMeters;
use autopilot_core::profitability::ProfitabilityResult;

const HOUR: u64 = 3_600_000;
const T0: u64 = 1_700_000_000_000;

fn result(revenue: f64, cost: Option<f64>, rate: Option<f64>) -> ProfitabilityResult {
    ProfitabilityResult {
        revenue_mbtc_day: revenue,
        cost_local_day: 0.0,
        mbtc_rate: rate,
        cost_mbtc_day: cost,
        net_profit_pct: None,
        indeterminate: None,
    }
}

#[test]
fn test_first_tick_integrates_nothing() {
    let mut m = CumulativeMeters::new();
    let inc = m.accumulate(None, T0, 1000.0, &result(24.0, Some(12.0), Some(40.0)));
    assert!(inc.is_none());
    assert_eq!(m, CumulativeMeters::default());
}

#[test]
fn test_one_kilowatt_for_one_hour_is_one_kwh() {
    let mut m = CumulativeMeters::new();
    m.accumulate(Some(T0), T0 + HOUR, 1000.0, &result(0.0, None, None));
    assert_eq!(m.energy_kwh, 1.0);
}

#[test]
fn test_revenue_and_cost_prorated_per_day() {
    let mut m = CumulativeMeters::new();
    // 24 mBTC/day over one hour = 1 mBTC; 48 mBTC/day cost = 2 mBTC.
    let inc = m
        .accumulate(Some(T0), T0 + HOUR, 500.0, &result(24.0, Some(48.0), Some(40.0)))
        .unwrap();
    assert_eq!(inc.elapsed_hours, 1.0);
    assert!((m.revenue_mbtc - 1.0).abs() < 1e-12);
    assert!((m.cost_mbtc - 2.0).abs() < 1e-12);
    assert!((m.revenue_local - 40.0).abs() < 1e-9);
    assert!((m.cost_local - 80.0).abs() < 1e-9);
    assert!((m.profit_mbtc() + 1.0).abs() < 1e-12);
    assert!((m.profit_local() + 40.0).abs() < 1e-9);
    assert_eq!(m.energy_kwh, 0.5);
}

#[test]
fn test_local_totals_use_rate_at_accumulation_time() {
    let mut m = CumulativeMeters::new();
    m.accumulate(Some(T0), T0 + HOUR, 0.0, &result(24.0, None, Some(40.0)));
    m.accumulate(Some(T0 + HOUR), T0 + 2 * HOUR, 0.0, &result(24.0, None, Some(50.0)));
    assert!((m.revenue_mbtc - 2.0).abs() < 1e-12);
    assert!((m.revenue_local - 90.0).abs() < 1e-9);
}

#[test]
fn test_missing_rate_skips_local_and_mbtc_cost() {
    let mut m = CumulativeMeters::new();
    m.accumulate(Some(T0), T0 + HOUR, 1000.0, &result(24.0, None, None));
    assert_eq!(m.energy_kwh, 1.0);
    assert!((m.revenue_mbtc - 1.0).abs() < 1e-12);
    assert_eq!(m.cost_mbtc, 0.0);
    assert_eq!(m.revenue_local, 0.0);
    assert_eq!(m.cost_local, 0.0);
}

#[test]
fn test_totals_never_decrease() {
    let mut m = CumulativeMeters::new();
    let mut prev = m.clone();
    let mut last = T0;
    // Includes a clock step backwards and a negative revenue figure.
    let steps = [
        (T0 + HOUR, 800.0, 10.0),
        (T0 + HOUR / 2, 800.0, 10.0),
        (T0 + 3 * HOUR, 800.0, -5.0),
        (T0 + 4 * HOUR, 0.0, 0.0),
    ];
    for (now, watts, revenue) in steps {
        m.accumulate(Some(last), now, watts, &result(revenue, Some(3.0), Some(40.0)));
        assert!(m.energy_kwh >= prev.energy_kwh);
        assert!(m.revenue_mbtc >= prev.revenue_mbtc);
        assert!(m.cost_mbtc >= prev.cost_mbtc);
        assert!(m.revenue_local >= prev.revenue_local);
        assert!(m.cost_local >= prev.cost_local);
        prev = m.clone();
        last = now;
    }
}

//! Tests for configuration loading and the fail-closed default table.

use std::time::Duration;

use autopilot_infra::config::{
    ALL_PARAMS, AppConfig, ConfigError, ConfigParam, DEFAULT_API_BASE_URL, DEFAULT_TICKER_URL,
    TimingOverrides, default_value, param_name, resolve_config_value,
};
use autopilot_infra::nicehash::PowerMode;

const MINIMAL: &str = r#"
[api]
api_key = "key"
api_secret = "secret"
org_id = "org"

[tariff]
cost_per_kwh = 0.10
"#;

// ─── Resolver ───────────────────────────────────────────────────────────

#[test]
fn test_missing_value_uses_default() {
    assert_eq!(resolve_config_value(ConfigParam::PollIntervalS, None).unwrap(), 60.0);
    assert_eq!(resolve_config_value(ConfigParam::RateWatchS, None).unwrap(), 13.0);
    assert_eq!(
        resolve_config_value(ConfigParam::RebenchmarkAfterS, None).unwrap(),
        7.0 * 3600.0
    );
}

#[test]
fn test_explicit_value_overrides_default() {
    assert_eq!(
        resolve_config_value(ConfigParam::PollIntervalS, Some(30.0)).unwrap(),
        30.0
    );
}

#[test]
fn test_non_finite_and_negative_values_fail_closed() {
    for bad in [f64::NAN, f64::INFINITY, -1.0] {
        let err = resolve_config_value(ConfigParam::BenchmarkWindowS, Some(bad)).unwrap_err();
        assert_eq!(err.param_name, "benchmark_window_s");
    }
}

#[test]
fn test_every_param_resolves_without_overrides() {
    for &p in ALL_PARAMS {
        let v = resolve_config_value(p, None).unwrap();
        assert_eq!(Some(v), default_value(p), "{}", param_name(p));
    }
}

// ─── Timing ─────────────────────────────────────────────────────────────

#[test]
fn test_default_timing() {
    let t = TimingOverrides::default().resolve().unwrap();
    assert_eq!(t.poll_interval, Duration::from_secs(60));
    assert_eq!(t.algorithm_refresh, Duration::from_secs(3600));
    assert_eq!(t.rate_refresh, Duration::from_secs(60));
    assert_eq!(t.rate_watch, Duration::from_secs(13));
    assert_eq!(t.time_resync, Duration::from_secs(3600));
    assert_eq!(t.http_timeout, Duration::from_secs(30));
    assert_eq!(t.benchmark_window_ms, 7 * 60_000);
    assert_eq!(t.smoothing_window, 7.0);
    assert_eq!(t.rebenchmark_after_ms, 7 * 60 * 60_000);
}

#[test]
fn test_zero_period_is_invalid() {
    let t = TimingOverrides {
        poll_interval_s: Some(0.0),
        ..TimingOverrides::default()
    };
    assert!(matches!(t.resolve(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_smoothing_window_below_one_is_invalid() {
    let t = TimingOverrides {
        smoothing_window_ticks: Some(0.5),
        ..TimingOverrides::default()
    };
    assert!(matches!(t.resolve(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_negative_override_is_missing_error() {
    let t = TimingOverrides {
        rate_watch_s: Some(-13.0),
        ..TimingOverrides::default()
    };
    assert!(matches!(t.resolve(), Err(ConfigError::Missing(_))));
}

// ─── File ───────────────────────────────────────────────────────────────

#[test]
fn test_minimal_file_fills_defaults() {
    let c = AppConfig::from_toml_str(MINIMAL).unwrap();
    assert_eq!(c.api.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(c.api.locale, "en");
    assert_eq!(c.tariff.currency, "USD");
    assert_eq!(c.rates.ticker_url, DEFAULT_TICKER_URL);
    assert!(c.rigs.is_empty());
    let tariff = c.tariff.to_tariff();
    assert_eq!(tariff.cost_per_kwh, 0.10);
    assert_eq!(tariff.currency, "USD");
}

#[test]
fn test_full_file() {
    let raw = r#"
[api]
base_url = "https://api-test.nicehash.com"
api_key = "key"
api_secret = "secret"
org_id = "org"
locale = "de"

[tariff]
cost_per_kwh = 0.31
currency = "EUR"

[timing]
poll_interval_s = 30
benchmark_window_s = 600

[[rigs]]
id = "0-rig-a"
name = "basement"
autopilot = true
min_profitability_pct = 10
power_mode = "HIGH"

[[rigs]]
id = "0-rig-b"
"#;
    let c = AppConfig::from_toml_str(raw).unwrap();
    assert_eq!(c.api.locale, "de");
    assert_eq!(c.tariff.currency, "EUR");
    let timing = c.timing().unwrap();
    assert_eq!(timing.poll_interval, Duration::from_secs(30));
    assert_eq!(timing.benchmark_window_ms, 600_000);

    let a = &c.rigs[0];
    assert_eq!(a.display_name(), "basement");
    let settings = a.settings(&timing);
    assert!(settings.autopilot.enabled);
    assert_eq!(settings.autopilot.min_profitability_pct, 10.0);
    assert_eq!(settings.autopilot.benchmark_window_ms, 600_000);
    assert_eq!(settings.power_mode, Some(PowerMode::High));

    let b = &c.rigs[1];
    assert_eq!(b.display_name(), "0-rig-b");
    let settings = b.settings(&timing);
    assert!(!settings.autopilot.enabled);
    assert_eq!(settings.autopilot.min_profitability_pct, 0.0);
    assert_eq!(settings.power_mode, None);
}

#[test]
fn test_duplicate_rig_ids_are_rejected() {
    let raw = format!("{MINIMAL}\n[[rigs]]\nid = \"r\"\n\n[[rigs]]\nid = \"r\"\n");
    assert!(matches!(AppConfig::from_toml_str(&raw), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_negative_tariff_is_rejected() {
    let raw = MINIMAL.replace("0.10", "-0.10");
    assert!(matches!(AppConfig::from_toml_str(&raw), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_credentials_fail_to_parse() {
    let raw = "[tariff]\ncost_per_kwh = 0.1\n";
    assert!(matches!(AppConfig::from_toml_str(raw), Err(ConfigError::Parse(_))));
}

#[test]
fn test_invalid_timing_fails_load() {
    let raw = format!("{MINIMAL}\n[timing]\npoll_interval_s = -5\n");
    assert!(matches!(AppConfig::from_toml_str(&raw), Err(ConfigError::Missing(_))));
}

#[test]
fn test_unknown_power_mode_fails_to_parse() {
    let raw = format!("{MINIMAL}\n[[rigs]]\nid = \"r\"\npower_mode = \"TURBO\"\n");
    assert!(matches!(AppConfig::from_toml_str(&raw), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = AppConfig::from_file("/nonexistent/rig-autopilot.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

//! Runtime configuration.
//!
//! The TOML file carries credentials, the tariff, and the rig list. Timing
//! and autopilot constants come from a default table: if a parameter is
//! omitted, its default applies; an explicit value must be finite and
//! non-negative or the load fails closed.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use autopilot_core::autopilot::AutopilotConfig;
use autopilot_core::profitability::TariffConfig;
use serde::Deserialize;

use crate::controller::RigSettings;
use crate::nicehash::PowerMode;

pub const DEFAULT_CONFIG_PATH: &str = "rig-autopilot.toml";
pub const CONFIG_PATH_ENV: &str = "RIG_AUTOPILOT_CONFIG";
pub const DEFAULT_API_BASE_URL: &str = "https://api2.nicehash.com";
pub const DEFAULT_TICKER_URL: &str = "https://blockchain.info/ticker";

/// Tunable timing and autopilot parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    PollIntervalS,
    AlgorithmRefreshS,
    RateRefreshS,
    RateWatchS,
    TimeResyncS,
    HttpTimeoutS,
    BenchmarkWindowS,
    SmoothingWindowTicks,
    RebenchmarkAfterS,
}

/// Error when a parameter is missing without a default, or invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingConfigError {
    pub param_name: &'static str,
    pub reason: &'static str,
}

impl fmt::Display for MissingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config fail-closed: '{}' rejected ({})",
            self.param_name, self.reason
        )
    }
}

impl std::error::Error for MissingConfigError {}

/// Default for a parameter, or `None` if it has none.
pub fn default_value(param: ConfigParam) -> Option<f64> {
    match param {
        ConfigParam::PollIntervalS => Some(60.0),
        ConfigParam::AlgorithmRefreshS => Some(3600.0),
        ConfigParam::RateRefreshS => Some(60.0),
        ConfigParam::RateWatchS => Some(13.0),
        ConfigParam::TimeResyncS => Some(3600.0),
        ConfigParam::HttpTimeoutS => Some(30.0),
        ConfigParam::BenchmarkWindowS => Some(420.0),
        ConfigParam::SmoothingWindowTicks => Some(7.0),
        ConfigParam::RebenchmarkAfterS => Some(25_200.0),
    }
}

/// snake_case key used in the `[timing]` table.
pub fn param_name(param: ConfigParam) -> &'static str {
    match param {
        ConfigParam::PollIntervalS => "poll_interval_s",
        ConfigParam::AlgorithmRefreshS => "algorithm_refresh_s",
        ConfigParam::RateRefreshS => "rate_refresh_s",
        ConfigParam::RateWatchS => "rate_watch_s",
        ConfigParam::TimeResyncS => "time_resync_s",
        ConfigParam::HttpTimeoutS => "http_timeout_s",
        ConfigParam::BenchmarkWindowS => "benchmark_window_s",
        ConfigParam::SmoothingWindowTicks => "smoothing_window_ticks",
        ConfigParam::RebenchmarkAfterS => "rebenchmark_after_s",
    }
}

/// Expected number of ConfigParam variants. Update when adding new variants.
pub const EXPECTED_PARAM_COUNT: usize = 9;

pub const ALL_PARAMS: &[ConfigParam] = &[
    ConfigParam::PollIntervalS,
    ConfigParam::AlgorithmRefreshS,
    ConfigParam::RateRefreshS,
    ConfigParam::RateWatchS,
    ConfigParam::TimeResyncS,
    ConfigParam::HttpTimeoutS,
    ConfigParam::BenchmarkWindowS,
    ConfigParam::SmoothingWindowTicks,
    ConfigParam::RebenchmarkAfterS,
];

/// Resolve a parameter with fail-safe semantics.
///
/// - `Some(v)`: returned if finite and non-negative, else `Err`.
/// - `None`: the default, or `Err` when there is none.
pub fn resolve_config_value(
    param: ConfigParam,
    value: Option<f64>,
) -> Result<f64, MissingConfigError> {
    if let Some(v) = value {
        if !v.is_finite() {
            return Err(MissingConfigError {
                param_name: param_name(param),
                reason: "value is non-finite (NaN or Infinity)",
            });
        }
        if v < 0.0 {
            return Err(MissingConfigError {
                param_name: param_name(param),
                reason: "value is negative",
            });
        }
        return Ok(v);
    }
    default_value(param).ok_or_else(|| MissingConfigError {
        param_name: param_name(param),
        reason: "no default",
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Missing(#[from] MissingConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── File model ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub tariff: TariffSection,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub timing: TimingOverrides,
    #[serde(default)]
    pub rigs: Vec<RigConfig>,
}

#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub org_id: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

// Keep the secret out of logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("locale", &self.locale)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TariffSection {
    pub cost_per_kwh: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl TariffSection {
    pub fn to_tariff(&self) -> TariffConfig {
        TariffConfig {
            cost_per_kwh: self.cost_per_kwh,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_ticker_url")]
    pub ticker_url: String,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            ticker_url: default_ticker_url(),
        }
    }
}

/// Optional `[timing]` overrides, resolved through [`resolve_config_value`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingOverrides {
    pub poll_interval_s: Option<f64>,
    pub algorithm_refresh_s: Option<f64>,
    pub rate_refresh_s: Option<f64>,
    pub rate_watch_s: Option<f64>,
    pub time_resync_s: Option<f64>,
    pub http_timeout_s: Option<f64>,
    pub benchmark_window_s: Option<f64>,
    pub smoothing_window_ticks: Option<f64>,
    pub rebenchmark_after_s: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RigConfig {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub autopilot: bool,
    #[serde(default)]
    pub min_profitability_pct: f64,
    pub power_mode: Option<PowerMode>,
}

impl RigConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn autopilot_config(&self, timing: &Timing) -> AutopilotConfig {
        AutopilotConfig {
            enabled: self.autopilot,
            min_profitability_pct: self.min_profitability_pct,
            benchmark_window_ms: timing.benchmark_window_ms,
            smoothing_window: timing.smoothing_window,
            rebenchmark_after_ms: timing.rebenchmark_after_ms,
        }
    }

    pub fn settings(&self, timing: &Timing) -> RigSettings {
        RigSettings {
            autopilot: self.autopilot_config(timing),
            power_mode: self.power_mode,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_ticker_url() -> String {
    DEFAULT_TICKER_URL.to_string()
}

// ─── Resolved timing ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub algorithm_refresh: Duration,
    pub rate_refresh: Duration,
    pub rate_watch: Duration,
    pub time_resync: Duration,
    pub http_timeout: Duration,
    pub benchmark_window_ms: u64,
    pub smoothing_window: f64,
    pub rebenchmark_after_ms: u64,
}

impl TimingOverrides {
    fn value(&self, param: ConfigParam) -> Option<f64> {
        match param {
            ConfigParam::PollIntervalS => self.poll_interval_s,
            ConfigParam::AlgorithmRefreshS => self.algorithm_refresh_s,
            ConfigParam::RateRefreshS => self.rate_refresh_s,
            ConfigParam::RateWatchS => self.rate_watch_s,
            ConfigParam::TimeResyncS => self.time_resync_s,
            ConfigParam::HttpTimeoutS => self.http_timeout_s,
            ConfigParam::BenchmarkWindowS => self.benchmark_window_s,
            ConfigParam::SmoothingWindowTicks => self.smoothing_window_ticks,
            ConfigParam::RebenchmarkAfterS => self.rebenchmark_after_s,
        }
    }

    pub fn resolve(&self) -> Result<Timing, ConfigError> {
        let get = |p: ConfigParam| resolve_config_value(p, self.value(p));
        // Timers cannot run at a zero period.
        let period = |p: ConfigParam| -> Result<Duration, ConfigError> {
            let secs = get(p)?;
            if secs <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive",
                    param_name(p)
                )));
            }
            Ok(Duration::from_secs_f64(secs))
        };

        let smoothing_window = get(ConfigParam::SmoothingWindowTicks)?;
        if smoothing_window < 1.0 {
            return Err(ConfigError::Invalid(
                "smoothing_window_ticks must be at least 1".to_string(),
            ));
        }

        Ok(Timing {
            poll_interval: period(ConfigParam::PollIntervalS)?,
            algorithm_refresh: period(ConfigParam::AlgorithmRefreshS)?,
            rate_refresh: period(ConfigParam::RateRefreshS)?,
            rate_watch: period(ConfigParam::RateWatchS)?,
            time_resync: period(ConfigParam::TimeResyncS)?,
            http_timeout: period(ConfigParam::HttpTimeoutS)?,
            benchmark_window_ms: (get(ConfigParam::BenchmarkWindowS)? * 1000.0) as u64,
            smoothing_window,
            rebenchmark_after_ms: (get(ConfigParam::RebenchmarkAfterS)? * 1000.0) as u64,
        })
    }
}

// ─── Loading ────────────────────────────────────────────────────────────

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Path from the first CLI argument, then the environment, then the
    /// default file name.
    pub fn path_from_args() -> String {
        std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn timing(&self) -> Result<Timing, ConfigError> {
        self.timing.resolve()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.api_key.trim().is_empty() || self.api.api_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api_key and api_secret are required".to_string(),
            ));
        }
        let cost = self.tariff.cost_per_kwh;
        if !cost.is_finite() || cost < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tariff cost_per_kwh must be finite and non-negative, got {cost}"
            )));
        }
        let mut seen = HashSet::new();
        for rig in &self.rigs {
            if rig.id.trim().is_empty() {
                return Err(ConfigError::Invalid("rig id must not be empty".to_string()));
            }
            if !seen.insert(rig.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate rig id {}", rig.id)));
            }
            if !rig.min_profitability_pct.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "rig {} min_profitability_pct must be finite",
                    rig.id
                )));
            }
        }
        self.timing()?;
        Ok(())
    }
}

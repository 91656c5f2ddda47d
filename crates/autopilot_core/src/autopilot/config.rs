/// Length of the averaging window after a mining start (7 minutes).
pub const BENCHMARK_WINDOW_MS: u64 = 7 * 60_000;

/// EMA smoothing constant, in polling ticks.
pub const SMOOTHING_WINDOW_TICKS: f64 = 7.0;

/// Idle time after which a negative verdict is re-tested (7 hours).
pub const REBENCHMARK_AFTER_MS: u64 = 7 * 60 * 60_000;

/// Per-rig autopilot settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotConfig {
    /// Whether the autopilot may issue start/stop commands.
    pub enabled: bool,
    /// Net profit percentage below which the rig is considered unprofitable.
    pub min_profitability_pct: f64,
    pub benchmark_window_ms: u64,
    pub smoothing_window: f64,
    pub rebenchmark_after_ms: u64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_profitability_pct: 0.0,
            benchmark_window_ms: BENCHMARK_WINDOW_MS,
            smoothing_window: SMOOTHING_WINDOW_TICKS,
            rebenchmark_after_ms: REBENCHMARK_AFTER_MS,
        }
    }
}

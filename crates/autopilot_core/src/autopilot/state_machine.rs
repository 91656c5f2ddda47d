//! Autopilot state machine.
//!
//! **Phases:** `Idle -> Benchmarking -> Steady -> Idle`
//!
//! - Idle: not mining. The rolling average and benchmark window are cleared.
//!   A start is issued when no tariff limit is learned, the tariff is below
//!   the learned limit, or the rig has not mined for `rebenchmark_after_ms`.
//! - Benchmarking: mining, inside `benchmark_window_ms` of the first mining
//!   tick. The EMA accumulates; no decisions are taken.
//! - Steady: mining, past the window. Stop only when BOTH the rolling and
//!   the instantaneous percentage are below the threshold; the learned
//!   limit is set to the current tariff on that stop. While profitable the
//!   limit only rises.
//!
//! Ticks with an undefined profit percentage never touch the EMA, the
//! learned limit, or issue commands.

use super::config::AutopilotConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutopilotPhase {
    Idle,
    Benchmarking,
    Steady,
}

impl AutopilotPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            AutopilotPhase::Idle => "idle",
            AutopilotPhase::Benchmarking => "benchmarking",
            AutopilotPhase::Steady => "steady",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutopilotCommand {
    StartMining,
    StopMining,
}

/// Why a tick ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Idle with autopilot off; nothing to do.
    Disabled,
    /// Idle and no tariff limit learned yet.
    NoLearnedLimit,
    /// Idle and the tariff dropped below the learned limit.
    BelowLearnedLimit,
    /// Idle past the rebenchmark timeout; the stale verdict is re-tested.
    StaleVerdict,
    /// Idle and the learned limit still forbids mining.
    HeldByLearnedLimit,
    /// First mining tick; EMA seeded.
    BenchmarkSeeded,
    /// Mining inside the averaging window.
    Benchmarking,
    /// Mining but profitability undefined this tick.
    Indeterminate,
    Profitable,
    Unprofitable,
    /// Explicit re-benchmark request.
    Rebenchmark,
}

/// Observations for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub now_ms: u64,
    /// At least one device producing hash rate.
    pub mining: bool,
    /// Current electricity cost per kWh.
    pub tariff: f64,
    /// Rounded net profit percentage, `None` when indeterminate.
    pub profit_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotDecision {
    pub phase: AutopilotPhase,
    pub command: Option<AutopilotCommand>,
    pub reason: DecisionReason,
    /// Rolling average, present only while a benchmark window is open.
    pub rolling_profit_pct: Option<f64>,
    pub learned_tariff_limit: Option<f64>,
}

/// Per-rig autopilot state. Exactly one instance per rig, mutated only by
/// that rig's tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutopilotState {
    rolling_profit_pct: f64,
    benchmark_started_at_ms: Option<u64>,
    learned_tariff_limit: Option<f64>,
    last_mined_at_ms: Option<u64>,
    last_sync_at_ms: Option<u64>,
}

impl AutopilotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from a persisted learned limit and last mining instant.
    pub fn restored(learned_tariff_limit: Option<f64>, last_mined_at_ms: Option<u64>) -> Self {
        Self {
            learned_tariff_limit,
            last_mined_at_ms,
            ..Self::default()
        }
    }

    pub fn rolling_profit_pct(&self) -> Option<f64> {
        self.benchmark_started_at_ms
            .map(|_| self.rolling_profit_pct)
    }

    pub fn benchmark_started_at_ms(&self) -> Option<u64> {
        self.benchmark_started_at_ms
    }

    pub fn learned_tariff_limit(&self) -> Option<f64> {
        self.learned_tariff_limit
    }

    pub fn last_mined_at_ms(&self) -> Option<u64> {
        self.last_mined_at_ms
    }

    pub fn last_sync_at_ms(&self) -> Option<u64> {
        self.last_sync_at_ms
    }

    /// Advance the sync marker. Called after every tick, failed or not.
    pub fn mark_synced(&mut self, now_ms: u64) {
        self.last_sync_at_ms = Some(now_ms);
    }

    /// Phase implied by the current state at `now_ms`.
    pub fn phase_at(&self, now_ms: u64, config: &AutopilotConfig) -> AutopilotPhase {
        match self.benchmark_started_at_ms {
            None => AutopilotPhase::Idle,
            Some(started) if now_ms.saturating_sub(started) > config.benchmark_window_ms => {
                AutopilotPhase::Steady
            }
            Some(_) => AutopilotPhase::Benchmarking,
        }
    }

    /// Apply one tick.
    pub fn step(&mut self, input: &TickInput, config: &AutopilotConfig) -> AutopilotDecision {
        if !input.mining {
            return self.step_idle(input, config);
        }
        self.last_mined_at_ms = Some(input.now_ms);

        let Some(pct) = input.profit_pct else {
            let phase = match self.phase_at(input.now_ms, config) {
                // Mining but not yet seeded.
                AutopilotPhase::Idle => AutopilotPhase::Benchmarking,
                p => p,
            };
            return self.decision(phase, None, DecisionReason::Indeterminate);
        };

        let Some(started) = self.benchmark_started_at_ms else {
            self.benchmark_started_at_ms = Some(input.now_ms);
            self.rolling_profit_pct = pct;
            tracing::debug!(profit_pct = pct, "benchmark window opened");
            return self.decision(
                AutopilotPhase::Benchmarking,
                None,
                DecisionReason::BenchmarkSeeded,
            );
        };

        let k = config.smoothing_window;
        self.rolling_profit_pct = self.rolling_profit_pct * ((k - 1.0) / k) + pct * (1.0 / k);

        if input.now_ms.saturating_sub(started) <= config.benchmark_window_ms {
            return self.decision(
                AutopilotPhase::Benchmarking,
                None,
                DecisionReason::Benchmarking,
            );
        }

        let threshold = config.min_profitability_pct;
        if self.rolling_profit_pct < threshold && pct < threshold {
            self.learned_tariff_limit = Some(input.tariff);
            tracing::info!(
                rolling_profit_pct = self.rolling_profit_pct,
                profit_pct = pct,
                tariff = input.tariff,
                "unprofitable; learned tariff limit set"
            );
            let command = config.enabled.then_some(AutopilotCommand::StopMining);
            return self.decision(AutopilotPhase::Steady, command, DecisionReason::Unprofitable);
        }

        if let Some(limit) = self.learned_tariff_limit {
            if input.tariff > limit {
                tracing::info!(from = limit, to = input.tariff, "learned tariff limit raised");
                self.learned_tariff_limit = Some(input.tariff);
            }
        }
        self.decision(AutopilotPhase::Steady, None, DecisionReason::Profitable)
    }

    /// Manual re-benchmark: restart the averaging window and ask for a
    /// start. The learned tariff limit is left untouched.
    pub fn request_rebenchmark(&mut self, config: &AutopilotConfig) -> AutopilotDecision {
        self.clear_benchmark();
        let command = config.enabled.then_some(AutopilotCommand::StartMining);
        self.decision(AutopilotPhase::Idle, command, DecisionReason::Rebenchmark)
    }

    fn step_idle(&mut self, input: &TickInput, config: &AutopilotConfig) -> AutopilotDecision {
        if self.benchmark_started_at_ms.is_some() {
            tracing::debug!("mining stopped; benchmark window cleared");
        }
        self.clear_benchmark();

        if !config.enabled {
            return self.decision(AutopilotPhase::Idle, None, DecisionReason::Disabled);
        }

        let stale = match self.last_mined_at_ms {
            None => true,
            Some(t) => input.now_ms.saturating_sub(t) > config.rebenchmark_after_ms,
        };
        let reason = match self.learned_tariff_limit {
            None => DecisionReason::NoLearnedLimit,
            Some(limit) if input.tariff < limit => DecisionReason::BelowLearnedLimit,
            Some(_) if stale => DecisionReason::StaleVerdict,
            Some(_) => DecisionReason::HeldByLearnedLimit,
        };
        let command = match reason {
            DecisionReason::HeldByLearnedLimit => None,
            _ => Some(AutopilotCommand::StartMining),
        };
        self.decision(AutopilotPhase::Idle, command, reason)
    }

    fn clear_benchmark(&mut self) {
        self.rolling_profit_pct = 0.0;
        self.benchmark_started_at_ms = None;
    }

    fn decision(
        &self,
        phase: AutopilotPhase,
        command: Option<AutopilotCommand>,
        reason: DecisionReason,
    ) -> AutopilotDecision {
        AutopilotDecision {
            phase,
            command,
            reason,
            rolling_profit_pct: self.rolling_profit_pct(),
            learned_tariff_limit: self.learned_tariff_limit,
        }
    }
}

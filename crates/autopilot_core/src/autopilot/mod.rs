//! Autopilot start/stop control.

pub mod config;
pub mod state_machine;

pub use config::{
    AutopilotConfig, BENCHMARK_WINDOW_MS, REBENCHMARK_AFTER_MS, SMOOTHING_WINDOW_TICKS,
};
pub use state_machine::{
    AutopilotCommand, AutopilotDecision, AutopilotPhase, AutopilotState, DecisionReason,
    TickInput,
};

#![forbid(unsafe_code)]

pub mod autopilot;
pub mod meters;
pub mod profitability;
pub mod telemetry;

//! Provider-agnostic rig telemetry as handed to the normalizer.
//!
//! The provider reports devices in two shapes: the "legacy" per-device
//! record with titled speeds and unit suffixes, and the "v4" record with
//! algorithm ids, raw H/s speeds and a free-form list of labeled metrics.
//! Both are variants of [`RigDevice`] so a third shape is one more arm.

use std::collections::HashMap;

/// Rig type reported for rigs the provider cannot control or report on.
pub const RIG_TYPE_UNMANAGED: &str = "UNMANAGED";

/// Device status as reported by the provider (`status.enumName`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Mining,
    Benchmarking,
    Inactive,
    Pending,
    Error,
    Disabled,
    Offline,
    Unknown(String),
}

impl DeviceStatus {
    pub fn from_enum_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "MINING" => DeviceStatus::Mining,
            "BENCHMARKING" => DeviceStatus::Benchmarking,
            "INACTIVE" => DeviceStatus::Inactive,
            "PENDING" => DeviceStatus::Pending,
            "ERROR" => DeviceStatus::Error,
            "DISABLED" => DeviceStatus::Disabled,
            "OFFLINE" => DeviceStatus::Offline,
            _ => DeviceStatus::Unknown(name.to_string()),
        }
    }

    /// Disabled and offline devices never contribute to rig aggregates.
    pub fn contributes(&self) -> bool {
        !matches!(self, DeviceStatus::Disabled | DeviceStatus::Offline)
    }
}

/// One speed entry of a legacy device.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacySpeed {
    pub algorithm_title: String,
    pub speed: f64,
    /// Display suffix, e.g. `"MH"` or `"TH"`.
    pub unit_suffix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDevice {
    pub name: String,
    pub status: DeviceStatus,
    pub temperature: f64,
    pub power_usage_w: f64,
    pub load: f64,
    pub speeds: Vec<LegacySpeed>,
}

/// One speed entry of a v4 device. Speed is always raw H/s.
#[derive(Debug, Clone, PartialEq)]
pub struct V4Speed {
    pub algorithm_id: String,
    pub speed_hs: f64,
}

/// A labeled key/value metric of a v4 device (e.g. `"Power usage"`).
#[derive(Debug, Clone, PartialEq)]
pub struct V4Metric {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct V4Device {
    pub name: String,
    pub status: DeviceStatus,
    pub speeds: Vec<V4Speed>,
    pub metrics: Vec<V4Metric>,
}

impl V4Device {
    /// First metric whose key matches `label`, ignoring ASCII case.
    pub fn metric(&self, label: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(label))
            .map(|m| m.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RigDevice {
    Legacy(LegacyDevice),
    V4(V4Device),
}

/// Rig details payload after wire decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RigDetails {
    pub rig_id: String,
    pub name: String,
    /// `None` when the payload carries no type at all.
    pub rig_type: Option<String>,
    /// Provider-reported rig mining status (`minerStatus`).
    pub miner_status: Option<String>,
    pub devices: Vec<RigDevice>,
    /// Provider-estimated revenue in BTC/day.
    pub profitability_btc_day: f64,
}

/// Read access to the algorithm-id → title directory.
///
/// Implementations must never block; a missing id yields `None` and the
/// label is simply omitted.
pub trait AlgorithmLookup {
    fn title(&self, algorithm_id: &str) -> Option<String>;
}

impl AlgorithmLookup for HashMap<String, String> {
    fn title(&self, algorithm_id: &str) -> Option<String> {
        self.get(algorithm_id).cloned()
    }
}

//! Rig telemetry normalizer.
//!
//! Folds every contributing device of a [`RigDetails`] payload into one
//! [`MetricsSnapshot`]: power and load are summed, hash rates are converted
//! to MH and summed, temperature is the maximum, and the mining-device
//! count only includes devices with a positive hash-rate reading.

use std::collections::BTreeSet;
use std::fmt;

use super::rig::{
    AlgorithmLookup, LegacyDevice, RIG_TYPE_UNMANAGED, RigDetails, RigDevice, V4Device,
};
use super::units::{HashUnit, to_mh};

pub const V4_POWER_USAGE: &str = "Power usage";
pub const V4_TEMPERATURE: &str = "Temperature";
pub const V4_LOAD: &str = "Load";

/// One tick's normalized view of a rig.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsSnapshot {
    pub rig_name: String,
    pub miner_status: Option<String>,
    pub power_watts: f64,
    pub hashrate_mh: f64,
    pub algorithms: BTreeSet<String>,
    /// Highest device temperature; 0 when no device reports one.
    pub max_temperature: f64,
    pub load: f64,
    pub mining_devices: u32,
    /// Provider-reported revenue in BTC/day, unadjusted.
    pub daily_revenue_btc: f64,
}

impl MetricsSnapshot {
    /// True when at least one device is producing hash rate.
    pub fn is_mining(&self) -> bool {
        self.mining_devices > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Rig type is `UNMANAGED` or absent; nothing usable to report.
    NotManaged { rig_type: Option<String> },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::NotManaged { rig_type: Some(t) } => {
                write!(f, "rig is not managed (type {t})")
            }
            NormalizeError::NotManaged { rig_type: None } => {
                write!(f, "rig is not managed (no type reported)")
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// What one device adds to the rig aggregates.
#[derive(Debug, Default)]
struct DeviceContribution {
    power_watts: f64,
    hashrate_mh: f64,
    temperature: Option<f64>,
    load: f64,
    algorithms: Vec<String>,
}

/// Normalize a rig-details payload into a [`MetricsSnapshot`].
///
/// Fails with [`NormalizeError::NotManaged`] when the rig type is missing
/// or `UNMANAGED`. Unknown unit suffixes and unknown algorithm ids never
/// fail the tick: the reading or the label is dropped.
pub fn normalize(
    details: &RigDetails,
    algorithms: &dyn AlgorithmLookup,
) -> Result<MetricsSnapshot, NormalizeError> {
    match details.rig_type.as_deref() {
        None => return Err(NormalizeError::NotManaged { rig_type: None }),
        Some(t) if t.eq_ignore_ascii_case(RIG_TYPE_UNMANAGED) => {
            return Err(NormalizeError::NotManaged {
                rig_type: Some(t.to_string()),
            });
        }
        Some(_) => {}
    }

    let mut snapshot = MetricsSnapshot {
        rig_name: details.name.clone(),
        miner_status: details.miner_status.clone(),
        daily_revenue_btc: details.profitability_btc_day,
        ..MetricsSnapshot::default()
    };

    for device in &details.devices {
        let Some(c) = contribution(device, algorithms) else {
            continue;
        };
        snapshot.power_watts += c.power_watts;
        snapshot.hashrate_mh += c.hashrate_mh;
        snapshot.load += c.load;
        if let Some(t) = c.temperature {
            snapshot.max_temperature = snapshot.max_temperature.max(t);
        }
        if c.hashrate_mh > 0.0 {
            snapshot.mining_devices += 1;
        }
        snapshot.algorithms.extend(c.algorithms);
    }

    Ok(snapshot)
}

fn contribution(device: &RigDevice, algorithms: &dyn AlgorithmLookup) -> Option<DeviceContribution> {
    match device {
        RigDevice::Legacy(d) if d.status.contributes() => Some(legacy_contribution(d)),
        RigDevice::V4(d) if d.status.contributes() => Some(v4_contribution(d, algorithms)),
        _ => None,
    }
}

fn legacy_contribution(device: &LegacyDevice) -> DeviceContribution {
    let mut c = DeviceContribution {
        power_watts: device.power_usage_w.max(0.0),
        load: device.load.max(0.0),
        temperature: (device.temperature >= 0.0).then_some(device.temperature),
        ..DeviceContribution::default()
    };
    for speed in &device.speeds {
        let Some(unit) = HashUnit::from_suffix(&speed.unit_suffix) else {
            tracing::debug!(
                device = %device.name,
                suffix = %speed.unit_suffix,
                "skipping speed with unknown unit"
            );
            continue;
        };
        if speed.speed > 0.0 {
            c.hashrate_mh += to_mh(speed.speed, unit);
            c.algorithms.push(speed.algorithm_title.clone());
        }
    }
    c
}

fn v4_contribution(device: &V4Device, algorithms: &dyn AlgorithmLookup) -> DeviceContribution {
    let mut c = DeviceContribution {
        power_watts: device.metric(V4_POWER_USAGE).unwrap_or(0.0).max(0.0),
        load: device.metric(V4_LOAD).unwrap_or(0.0).max(0.0),
        temperature: device.metric(V4_TEMPERATURE).filter(|t| *t >= 0.0),
        ..DeviceContribution::default()
    };
    for speed in &device.speeds {
        if speed.speed_hs > 0.0 {
            c.hashrate_mh += to_mh(speed.speed_hs, HashUnit::H);
            // Directory may be stale or still empty: drop the label only.
            if let Some(title) = algorithms.title(&speed.algorithm_id) {
                c.algorithms.push(title);
            }
        }
    }
    c
}

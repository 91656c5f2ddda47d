//! Wire model of `GET /main/api/v2/mining/rig2/{rigId}`.
//!
//! The provider is loose with numeric types: speeds and metric values arrive
//! as strings as often as numbers, and absent fields are common. Decoding is
//! lenient; a numeric field that cannot be read becomes `0` (or is dropped
//! for v4 metrics) instead of failing the whole payload.

use autopilot_core::telemetry::{
    DeviceStatus, LegacyDevice, LegacySpeed, RigDetails, RigDevice, V4Device, V4Metric, V4Speed,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigDetailsWire {
    #[serde(default)]
    pub rig_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub rig_type: Option<String>,
    pub miner_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub profitability: f64,
    #[serde(default)]
    pub devices: Vec<LegacyDeviceWire>,
    pub v4: Option<V4Section>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusWire {
    #[serde(rename = "enumName", default)]
    pub enum_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDeviceWire {
    #[serde(default)]
    pub name: String,
    pub status: Option<StatusWire>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub power_usage: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub load: f64,
    #[serde(default)]
    pub speeds: Vec<LegacySpeedWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySpeedWire {
    #[serde(default)]
    pub title: String,
    /// Enum-style algorithm name, used when `title` is absent.
    #[serde(default)]
    pub algorithm: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: f64,
    #[serde(default)]
    pub display_suffix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct V4Section {
    #[serde(default)]
    pub devices: Vec<V4DeviceWire>,
}

/// v4 device: `dsv` static description, `mdv` mining data, `odv` other data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct V4DeviceWire {
    #[serde(default)]
    pub dsv: V4StaticWire,
    #[serde(default)]
    pub mdv: V4MiningWire,
    #[serde(default)]
    pub odv: Vec<V4MetricWire>,
    pub status: Option<StatusWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct V4StaticWire {
    #[serde(default)]
    pub n: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V4MiningWire {
    #[serde(default)]
    pub algorithms_speed: Vec<V4SpeedWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct V4SpeedWire {
    #[serde(default, deserialize_with = "id_string")]
    pub algorithm: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct V4MetricWire {
    #[serde(default)]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub value: Option<f64>,
}

impl RigDetailsWire {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Map the wire payload onto the normalizer's input model.
    pub fn into_details(self) -> RigDetails {
        let mut devices: Vec<RigDevice> = self
            .devices
            .into_iter()
            .map(|d| RigDevice::Legacy(d.into_device()))
            .collect();
        if let Some(v4) = self.v4 {
            devices.extend(v4.devices.into_iter().map(|d| RigDevice::V4(d.into_device())));
        }
        RigDetails {
            rig_id: self.rig_id,
            name: self.name,
            rig_type: self.rig_type,
            miner_status: self.miner_status,
            devices,
            profitability_btc_day: self.profitability,
        }
    }
}

fn status_of(status: Option<StatusWire>) -> DeviceStatus {
    match status {
        Some(s) => DeviceStatus::from_enum_name(&s.enum_name),
        None => DeviceStatus::Unknown(String::new()),
    }
}

impl LegacyDeviceWire {
    fn into_device(self) -> LegacyDevice {
        LegacyDevice {
            name: self.name,
            status: status_of(self.status),
            temperature: self.temperature,
            power_usage_w: self.power_usage,
            load: self.load,
            speeds: self
                .speeds
                .into_iter()
                .map(|s| LegacySpeed {
                    algorithm_title: if s.title.is_empty() { s.algorithm } else { s.title },
                    speed: s.speed,
                    unit_suffix: s.display_suffix,
                })
                .collect(),
        }
    }
}

impl V4DeviceWire {
    fn into_device(self) -> V4Device {
        V4Device {
            name: self.dsv.n,
            status: status_of(self.status),
            speeds: self
                .mdv
                .algorithms_speed
                .into_iter()
                .map(|s| V4Speed {
                    algorithm_id: s.algorithm,
                    speed_hs: s.speed,
                })
                .collect(),
            metrics: self
                .odv
                .into_iter()
                .filter_map(|m| m.value.map(|value| V4Metric { key: m.key, value }))
                .collect(),
        }
    }
}

// ─── Lenient scalars ────────────────────────────────────────────────────

fn scalar_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(lenient_opt_f64(d)?.unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(raw.as_ref().and_then(scalar_f64))
}

/// Ids arrive as `20` or `"20"`; both become `"20"`.
pub(crate) fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(match raw {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

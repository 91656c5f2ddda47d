//! Rig telemetry: input model, hash-rate units, normalization.

pub mod normalize;
pub mod rig;
pub mod units;

pub use normalize::{MetricsSnapshot, NormalizeError, normalize};
pub use rig::{
    AlgorithmLookup, DeviceStatus, LegacyDevice, LegacySpeed, RIG_TYPE_UNMANAGED, RigDetails,
    RigDevice, V4Device, V4Metric, V4Speed,
};
pub use units::{ALL_UNITS, HashUnit, to_mh};

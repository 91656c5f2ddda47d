//! NiceHash API v2 plumbing: request signing, the time-synced client, and
//! the JSON wire model of the endpoints the autopilot uses.

pub mod algorithms;
pub mod client;
pub mod commands;
pub mod rig_details;
pub mod signing;

pub use algorithms::{AlgorithmEntry, AlgorithmTable, AlgorithmTableWriter, algorithm_table};
pub use client::{CallOptions, NiceHashClient, build_headers, split_and_merge_query};
pub use commands::{PowerMode, RigAction, RigStatusRequest};
pub use rig_details::RigDetailsWire;
pub use signing::{QueryParams, SignableRequest, canonical_message, generate_nonce, sign};

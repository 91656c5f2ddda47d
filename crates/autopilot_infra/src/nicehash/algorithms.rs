//! Algorithm directory: `GET /main/api/v2/mining/algorithms` and the
//! id → title table the normalizer reads.
//!
//! The table has a single writer (the refresh timer) and any number of
//! readers. Readers never wait on a refresh; they see the previous table
//! until the new one is published, or an empty one before the first.

use std::collections::HashMap;
use std::sync::Arc;

use autopilot_core::telemetry::AlgorithmLookup;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use super::rig_details::id_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmEntry {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlgorithmsResponse {
    #[serde(default)]
    mining_algorithms: Vec<AlgorithmWire>,
}

#[derive(Debug, Deserialize)]
struct AlgorithmWire {
    #[serde(default, deserialize_with = "id_string")]
    order: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    algorithm: String,
}

/// Decode the directory response. Entries without an id are dropped.
pub fn parse_algorithms(value: Value) -> Result<Vec<AlgorithmEntry>, serde_json::Error> {
    let resp: AlgorithmsResponse = serde_json::from_value(value)?;
    Ok(resp
        .mining_algorithms
        .into_iter()
        .filter(|a| !a.order.is_empty())
        .map(|a| AlgorithmEntry {
            id: a.order,
            title: if a.title.is_empty() { a.algorithm } else { a.title },
        })
        .collect())
}

type Table = Arc<HashMap<String, String>>;

pub struct AlgorithmTableWriter {
    tx: watch::Sender<Table>,
}

#[derive(Debug, Clone)]
pub struct AlgorithmTable {
    rx: watch::Receiver<Table>,
}

/// Create an empty table and its writer.
pub fn algorithm_table() -> (AlgorithmTableWriter, AlgorithmTable) {
    let (tx, rx) = watch::channel(Table::default());
    (AlgorithmTableWriter { tx }, AlgorithmTable { rx })
}

impl AlgorithmTableWriter {
    /// Publish a new table, replacing the previous one wholesale.
    pub fn replace(&self, entries: Vec<AlgorithmEntry>) {
        let map: HashMap<String, String> =
            entries.into_iter().map(|e| (e.id, e.title)).collect();
        self.tx.send_replace(Arc::new(map));
    }
}

impl AlgorithmLookup for AlgorithmTable {
    fn title(&self, algorithm_id: &str) -> Option<String> {
        self.rx.borrow().get(algorithm_id).cloned()
    }
}

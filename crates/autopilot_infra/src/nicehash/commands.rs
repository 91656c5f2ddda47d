//! Rig command payloads for `POST /main/api/v2/mining/rigs/status2`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerMode {
    Low,
    Medium,
    High,
}

impl PowerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerMode::Low => "LOW",
            PowerMode::Medium => "MEDIUM",
            PowerMode::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RigAction {
    Start,
    Stop,
    PowerMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RigStatusRequest {
    pub rig_id: String,
    pub action: RigAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl RigStatusRequest {
    pub fn status(rig_id: &str, on: bool) -> Self {
        Self {
            rig_id: rig_id.to_string(),
            action: if on { RigAction::Start } else { RigAction::Stop },
            options: Vec::new(),
        }
    }

    pub fn power_mode(rig_id: &str, mode: PowerMode) -> Self {
        Self {
            rig_id: rig_id.to_string(),
            action: RigAction::PowerMode,
            options: vec![mode.as_str().to_string()],
        }
    }
}

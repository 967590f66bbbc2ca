//! Fleet models

use serde::{Deserialize, Serialize};

/// A bus in the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    #[serde(alias = "_id")]
    pub id: String,
    pub license_plate: String,
    #[serde(default)]
    pub seat_count: Option<u32>,
    /// Coach type, e.g. "giường nằm" (sleeper) or "ghế ngồi" (seated)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Payload for registering a bus
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub license_plate: String,
    pub seat_count: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

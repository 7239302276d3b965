// Telemetry data domain models
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one analog channel as reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleKey(pub u32);

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyReading {
    pub id: SampleKey,
    #[serde(rename = "ad")]
    pub value: i32,
    #[serde(default)]
    pub pressed: bool,
}

impl KeyReading {
    pub fn new(id: u32, value: i32, pressed: bool) -> Self {
        Self {
            id: SampleKey(id),
            value,
            pressed,
        }
    }
}

pub const ANALOG_BATCH_TYPE: &str = "analog_values";

fn analog_batch_type() -> String {
    ANALOG_BATCH_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    #[serde(rename = "type", default = "analog_batch_type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(rename = "keys", default)]
    pub readings: Vec<KeyReading>,
}

impl SampleBatch {
    pub fn new(timestamp: u64, readings: Vec<KeyReading>) -> Self {
        Self {
            kind: analog_batch_type(),
            timestamp,
            readings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    /// Firmware gave up waiting for a heartbeat and stopped streaming on its own
    pub fn is_heartbeat_timeout(&self) -> bool {
        self.status == "timeout"
    }
}

pub const SERIES_PALETTE: [&str; 12] = [
    "#0000FF", // blue
    "#FF0000", // red
    "#008000", // green
    "#FFA500", // orange
    "#800080", // purple
    "#A52A2A", // brown
    "#FFC0CB", // pink
    "#00FFFF", // cyan
    "#FF00FF", // magenta
    "#FFFF00", // yellow
    "#00FF00", // lime
    "#4B0082", // indigo
];

/// Display identity of a series, fixed when its key is first observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub key: SampleKey,
    pub index: usize,
    pub color: &'static str,
    pub label: String,
}

impl SeriesInfo {
    pub fn new(key: SampleKey, index: usize) -> Self {
        Self {
            key,
            index,
            color: SERIES_PALETTE[index % SERIES_PALETTE.len()],
            label: format!("Key {}", key),
        }
    }
}

/// Point-in-time copy of one series for late-joining renderers
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub info: SeriesInfo,
    pub values: Vec<f64>,
}

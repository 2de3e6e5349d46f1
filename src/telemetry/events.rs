//! Event schema for cascade telemetry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ATTEMPT_SUCCEEDED: &str = "attempt_succeeded";
pub const TRANSIENT_FAILURE: &str = "transient_failure";
pub const OUTPUT_REJECTED: &str = "output_rejected";
pub const EXHAUSTION: &str = "exhaustion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts: String,
    pub session: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl TelemetryEvent {
    /// Decode `data` into a typed payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSucceededData {
    pub provider_id: String,
    pub kind: String,
    pub topic: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientFailureData {
    pub provider_id: String,
    pub kind: String,
    pub topic: String,
    pub reason: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRejectedData {
    pub provider_id: String,
    pub kind: String,
    pub topic: String,
    pub reason: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionData {
    pub kind: String,
    pub topic: String,
    pub attempts: usize,
}

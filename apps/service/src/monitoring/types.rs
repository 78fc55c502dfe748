use std::time::SystemTime;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Health verdict of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Up => "up",
            ServiceStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(ServiceStatus::Up),
            "down" => Ok(ServiceStatus::Down),
            other => Err(anyhow!("unknown service status: {other}")),
        }
    }
}

/// What a probe observed about a target.
///
/// Probes never fail out; every failure mode is folded into a down outcome
/// whose detail names the cause.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: ServiceStatus,
    pub latency_ms: Option<u64>,
    pub detail: Value,
}

impl ProbeOutcome {
    /// Target answered.
    pub fn up(latency_ms: u64, detail: Value) -> Self {
        Self { status: ServiceStatus::Up, latency_ms: Some(latency_ms), detail }
    }

    /// Probe could not complete; no latency to report.
    pub fn down(detail: Value) -> Self {
        Self { status: ServiceStatus::Down, latency_ms: None, detail }
    }

    /// Exchange completed but the target is failing (e.g. an HTTP 5xx):
    /// the round trip still yields a latency sample.
    pub fn down_with_latency(latency_ms: u64, detail: Value) -> Self {
        Self { status: ServiceStatus::Down, latency_ms: Some(latency_ms), detail }
    }
}

/// One service check, stamped for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub service_uuid: Uuid,
    pub timestamp: SystemTime,
    pub status: ServiceStatus,
    pub latency_ms: Option<u64>,
    pub detail: Value,
}

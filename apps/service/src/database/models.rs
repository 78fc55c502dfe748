use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::alerting::AlertKind;
use crate::monitoring::checker::ProbeKind;
use crate::monitoring::types::{CheckOutcome, ServiceStatus};

/// Convert SystemTime to a unix-second timestamp.
pub fn timestamp_to_i64(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Convert a unix-second timestamp back to SystemTime.
pub fn i64_to_timestamp(timestamp: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
}

/// A monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub kind: ProbeKind,
    pub target: String,
    /// Desired cadence in minutes. Stored for the dashboard; the scheduler
    /// checks every service on its fixed global tick.
    pub check_frequency_minutes: u32,
    /// Consecutive failing checks required before a down alert.
    pub retry_threshold: u32,
    /// Minutes bounding the failure lookback and gating alert resends.
    pub grace_period_minutes: u32,
    pub alert_email: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Service {
    pub fn new(name: String, kind: ProbeKind, target: String, alert_email: String) -> Self {
        let now = SystemTime::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name,
            kind,
            target,
            check_frequency_minutes: 1,
            retry_threshold: 3,
            grace_period_minutes: 5,
            alert_email,
            created_at: now,
            updated_at: now,
        }
    }

    /// Failure-lookback and alert-resend window.
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.grace_period_minutes) * 60)
    }

    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

/// One probe outcome in the append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: Option<i64>,
    pub service_uuid: Uuid,
    pub timestamp: SystemTime,
    pub status: ServiceStatus,
    pub latency_ms: Option<u64>,
    pub detail: Value,
}

impl CheckRecord {
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        Self {
            id: None,
            service_uuid: outcome.service_uuid,
            timestamp: outcome.timestamp,
            status: outcome.status,
            latency_ms: outcome.latency_ms,
            detail: outcome.detail.clone(),
        }
    }
}

/// A notification event in the append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Option<i64>,
    pub service_uuid: Uuid,
    pub timestamp: SystemTime,
    pub kind: AlertKind,
    pub detail: Value,
}

impl AlertRecord {
    /// Snapshot the triggering check into an alert row.
    pub fn from_check(kind: AlertKind, outcome: &CheckOutcome) -> Self {
        Self {
            id: None,
            service_uuid: outcome.service_uuid,
            timestamp: outcome.timestamp,
            kind,
            detail: json!({
                "status": outcome.status,
                "detail": outcome.detail,
                "latency_ms": outcome.latency_ms,
            }),
        }
    }
}

/// Internal fault note. No foreign relation; written, never read back by
/// the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Option<i64>,
    pub timestamp: SystemTime,
    pub message: String,
}

/// Singleton SMTP relay settings, managed by the administrative layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRelayConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    /// Upgrade the session with STARTTLS before sending.
    pub use_tls: bool,
}

use std::time::{Duration, SystemTime};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::database::models::CheckRecord;
use crate::monitoring::types::ServiceStatus;

/// Kind of alert dispatched on a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Down,
    Recovery,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Recovery => "recovery",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(AlertKind::Down),
            "recovery" => Ok(AlertKind::Recovery),
            other => Err(anyhow!("unknown alert kind: {other}")),
        }
    }
}

/// Per-service alerting thresholds.
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    /// Consecutive failing checks required before a down alert.
    pub retry_threshold: usize,
    /// Window bounding the failure lookback and gating alert resends.
    pub grace_period: Duration,
}

/// History a decision is made against.
///
/// `recent_window` holds the service's checks inside the grace window,
/// newest first, capped at the retry threshold and including the check
/// under evaluation. `previous` is the check immediately preceding it,
/// regardless of age. Callers fill in whichever side the current status
/// needs; the other is ignored.
#[derive(Debug, Default)]
pub struct AlertContext<'a> {
    pub recent_window: &'a [CheckRecord],
    pub previous: Option<&'a CheckRecord>,
    pub last_alert_at: Option<SystemTime>,
}

/// Decide whether the current check warrants an alert.
///
/// The two paths are deliberately asymmetric. A down alert requires a full
/// window of consecutive failures and respects the grace-period resend
/// gate, so an ongoing outage alerts once per grace period rather than
/// once per tick. A recovery alert fires on any down-to-up transition,
/// immediately and ungated.
pub fn decide(
    status: ServiceStatus,
    policy: &AlertPolicy,
    context: &AlertContext<'_>,
    now: SystemTime,
) -> Option<AlertKind> {
    match status {
        ServiceStatus::Down => down_alert_due(policy, context, now).then_some(AlertKind::Down),
        ServiceStatus::Up => recovery_due(context).then_some(AlertKind::Recovery),
    }
}

fn down_alert_due(policy: &AlertPolicy, context: &AlertContext<'_>, now: SystemTime) -> bool {
    let window = context.recent_window;

    if window.len() < policy.retry_threshold {
        return false;
    }
    if !window.iter().all(|check| check.status == ServiceStatus::Down) {
        return false;
    }

    resend_allowed(context.last_alert_at, policy.grace_period, now)
}

/// A previous alert of any kind suppresses a new down alert until the
/// grace period has elapsed since it was emitted.
fn resend_allowed(last_alert_at: Option<SystemTime>, grace: Duration, now: SystemTime) -> bool {
    match last_alert_at {
        None => true,
        Some(at) => now.duration_since(at).map(|since| since >= grace).unwrap_or(false),
    }
}

fn recovery_due(context: &AlertContext<'_>) -> bool {
    context.previous.is_some_and(|check| check.status == ServiceStatus::Down)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use uuid::Uuid;

    const MINUTE: Duration = Duration::from_secs(60);

    fn policy(retry_threshold: usize, grace_minutes: u32) -> AlertPolicy {
        AlertPolicy { retry_threshold, grace_period: grace_minutes * MINUTE }
    }

    fn check(status: ServiceStatus, seconds_ago: u64, now: SystemTime) -> CheckRecord {
        CheckRecord {
            id: None,
            service_uuid: Uuid::nil(),
            timestamp: now - Duration::from_secs(seconds_ago),
            status,
            latency_ms: None,
            detail: Value::Null,
        }
    }

    fn downs(count: usize, now: SystemTime) -> Vec<CheckRecord> {
        (0..count).map(|i| check(ServiceStatus::Down, i as u64 * 60, now)).collect()
    }

    #[test]
    fn down_alert_when_window_full_of_failures() {
        let now = SystemTime::now();
        let window = downs(3, now);
        let context = AlertContext { recent_window: &window, ..Default::default() };

        assert_eq!(
            decide(ServiceStatus::Down, &policy(3, 5), &context, now),
            Some(AlertKind::Down)
        );
    }

    #[test]
    fn no_down_alert_below_threshold() {
        let now = SystemTime::now();
        let window = downs(2, now);
        let context = AlertContext { recent_window: &window, ..Default::default() };

        assert_eq!(decide(ServiceStatus::Down, &policy(3, 5), &context, now), None);
    }

    #[test]
    fn no_down_alert_when_window_interrupted_by_success() {
        let now = SystemTime::now();
        let window = vec![
            check(ServiceStatus::Down, 0, now),
            check(ServiceStatus::Up, 60, now),
            check(ServiceStatus::Down, 120, now),
        ];
        let context = AlertContext { recent_window: &window, ..Default::default() };

        assert_eq!(decide(ServiceStatus::Down, &policy(3, 5), &context, now), None);
    }

    #[test]
    fn resend_suppressed_within_grace_period() {
        let now = SystemTime::now();
        let window = downs(3, now);
        let context = AlertContext {
            recent_window: &window,
            last_alert_at: Some(now - 2 * MINUTE),
            ..Default::default()
        };

        assert_eq!(decide(ServiceStatus::Down, &policy(3, 5), &context, now), None);
    }

    #[test]
    fn resend_allowed_once_grace_period_elapses() {
        let now = SystemTime::now();
        let window = downs(3, now);
        let context = AlertContext {
            recent_window: &window,
            last_alert_at: Some(now - 6 * MINUTE),
            ..Default::default()
        };

        assert_eq!(
            decide(ServiceStatus::Down, &policy(3, 5), &context, now),
            Some(AlertKind::Down)
        );
    }

    #[test]
    fn future_alert_timestamp_suppresses_resend() {
        let now = SystemTime::now();
        let window = downs(3, now);
        let context = AlertContext {
            recent_window: &window,
            last_alert_at: Some(now + MINUTE),
            ..Default::default()
        };

        assert_eq!(decide(ServiceStatus::Down, &policy(3, 5), &context, now), None);
    }

    #[test]
    fn recovery_on_down_to_up_transition() {
        let now = SystemTime::now();
        let previous = check(ServiceStatus::Down, 60, now);
        let context = AlertContext { previous: Some(&previous), ..Default::default() };

        assert_eq!(
            decide(ServiceStatus::Up, &policy(3, 5), &context, now),
            Some(AlertKind::Recovery)
        );
    }

    #[test]
    fn recovery_ignores_threshold_and_grace() {
        let now = SystemTime::now();
        // A single failure long outside the grace window still recovers.
        let previous = check(ServiceStatus::Down, 3600, now);
        let context = AlertContext { previous: Some(&previous), ..Default::default() };

        assert_eq!(
            decide(ServiceStatus::Up, &policy(100, 1), &context, now),
            Some(AlertKind::Recovery)
        );
    }

    #[test]
    fn no_recovery_when_previous_check_was_up() {
        let now = SystemTime::now();
        let previous = check(ServiceStatus::Up, 60, now);
        let context = AlertContext { previous: Some(&previous), ..Default::default() };

        assert_eq!(decide(ServiceStatus::Up, &policy(3, 5), &context, now), None);
    }

    #[test]
    fn no_recovery_without_history() {
        let now = SystemTime::now();
        let context = AlertContext::default();

        assert_eq!(decide(ServiceStatus::Up, &policy(3, 5), &context, now), None);
    }

    /// threshold=3, grace=5m: three failures inside four minutes alert on
    /// the third; a fourth failure inside the grace window stays quiet;
    /// the following success recovers immediately.
    #[test]
    fn sustained_outage_then_recovery_scenario() {
        let now = SystemTime::now();
        let policy = policy(3, 5);

        let window = vec![
            check(ServiceStatus::Down, 0, now),
            check(ServiceStatus::Down, 120, now),
            check(ServiceStatus::Down, 240, now),
        ];
        let third = AlertContext { recent_window: &window, ..Default::default() };
        assert_eq!(decide(ServiceStatus::Down, &policy, &third, now), Some(AlertKind::Down));

        let later = now + MINUTE;
        let window = vec![
            check(ServiceStatus::Down, 0, later),
            check(ServiceStatus::Down, 60, later),
            check(ServiceStatus::Down, 180, later),
        ];
        let fourth = AlertContext {
            recent_window: &window,
            last_alert_at: Some(now),
            ..Default::default()
        };
        assert_eq!(decide(ServiceStatus::Down, &policy, &fourth, later), None);

        let previous = check(ServiceStatus::Down, 60, later + MINUTE);
        let fifth = AlertContext {
            previous: Some(&previous),
            last_alert_at: Some(now),
            ..Default::default()
        };
        assert_eq!(
            decide(ServiceStatus::Up, &policy, &fifth, later + MINUTE),
            Some(AlertKind::Recovery)
        );
    }
}

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::checker::{Checker, HttpChecker, PingChecker, ProbeKind};
use super::types::{CheckOutcome, ProbeOutcome};
use crate::database::models::Service;

/// Settings shared by every probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Total timeout applied to one probe.
    pub timeout: Duration,
    /// Skip peer-certificate validation in HTTP probes.
    pub accept_invalid_certs: bool,
}

/// Dispatches each check to the strategy matching the service's kind.
pub struct ProbeExecutor {
    ping: Arc<dyn Checker>,
    http: Arc<dyn Checker>,
}

impl ProbeExecutor {
    pub fn new(settings: &ProbeSettings) -> Self {
        Self {
            ping: Arc::new(PingChecker::new(settings.timeout)),
            http: Arc::new(HttpChecker::new(settings.timeout, settings.accept_invalid_certs)),
        }
    }

    /// Build an executor from explicit checkers. Lets tests script outcomes.
    pub fn with_checkers(ping: Arc<dyn Checker>, http: Arc<dyn Checker>) -> Self {
        Self { ping, http }
    }

    /// Probe one service and stamp the outcome for persistence.
    pub async fn execute(&self, service: &Service) -> CheckOutcome {
        let checker = match service.kind {
            ProbeKind::Ping => self.ping.as_ref(),
            ProbeKind::Http => self.http.as_ref(),
        };

        let ProbeOutcome { status, latency_ms, detail } = checker.probe(&service.target).await;

        CheckOutcome {
            service_uuid: service.uuid,
            timestamp: SystemTime::now(),
            status,
            latency_ms,
            detail,
        }
    }
}

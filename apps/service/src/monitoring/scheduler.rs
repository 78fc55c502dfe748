use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info};

use super::executor::ProbeExecutor;
use super::types::{CheckOutcome, ServiceStatus};
use crate::alerting::{AlertContext, AlertPolicy, Notifier, decide};
use crate::database::models::{AlertRecord, CheckRecord, Service};
use crate::database::{Database, ErrorSink};

/// Fixed-cadence check scheduler.
///
/// Each tick reads the service roster once, runs one pipeline per service
/// concurrently, waits for all of them, then sleeps. A pipeline failure is
/// contained to its service and a roster failure to its tick; both land in
/// the error sink and the loop carries on.
pub struct Scheduler {
    database: Arc<dyn Database>,
    executor: Arc<ProbeExecutor>,
    notifier: Arc<Notifier>,
    sink: ErrorSink,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        database: Arc<dyn Database>,
        executor: Arc<ProbeExecutor>,
        notifier: Arc<Notifier>,
        sink: ErrorSink,
        tick_interval: Duration,
    ) -> Self {
        Self { database, executor, notifier, sink, tick_interval }
    }

    /// Run ticks until the shutdown signal fires.
    ///
    /// The signal is only checked between ticks, so an in-flight tick
    /// always completes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler started, tick every {:?}", self.tick_interval);

        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = shutdown.changed() => {
                    info!("scheduler stopping");
                    break;
                }
            }
        }
    }

    /// One full tick: roster fetch, concurrent pipelines, error collection.
    pub async fn tick(&self) {
        let services = match self.database.list_services().await {
            Ok(services) => services,
            Err(e) => {
                self.sink.record(format!("failed to load service roster: {e:#}")).await;
                return;
            }
        };

        debug!("tick: checking {} services", services.len());

        let pipelines = services.iter().map(|service| self.check_service(service));
        let results = join_all(pipelines).await;

        for (service, result) in services.iter().zip(results) {
            if let Err(e) = result {
                self.sink
                    .record(format!("check pipeline for {} failed: {e:#}", service.name))
                    .await;
            }
        }
    }

    /// The per-service pipeline: probe, persist the check, evaluate the
    /// alert rules and persist/notify as decided.
    pub async fn check_service(&self, service: &Service) -> Result<CheckOutcome> {
        let outcome = self.executor.execute(service).await;

        let check_id = self
            .database
            .save_check(&CheckRecord::from_outcome(&outcome))
            .await
            .context("failed to persist check record")?;

        let policy = AlertPolicy {
            retry_threshold: service.retry_threshold as usize,
            grace_period: service.grace_period(),
        };

        let decision = match outcome.status {
            ServiceStatus::Down => {
                let since = outcome.timestamp - policy.grace_period;
                let window = self
                    .database
                    .checks_in_window(service.uuid, since, policy.retry_threshold)
                    .await?;
                let last_alert_at =
                    self.database.latest_alert(service.uuid).await?.map(|alert| alert.timestamp);

                decide(
                    outcome.status,
                    &policy,
                    &AlertContext {
                        recent_window: &window,
                        previous: None,
                        last_alert_at,
                    },
                    outcome.timestamp,
                )
            }
            ServiceStatus::Up => {
                let previous = self.database.previous_check(service.uuid, check_id).await?;

                decide(
                    outcome.status,
                    &policy,
                    &AlertContext {
                        recent_window: &[],
                        previous: previous.as_ref(),
                        last_alert_at: None,
                    },
                    outcome.timestamp,
                )
            }
        };

        if let Some(kind) = decision {
            self.notifier.notify(&service.alert_email, &service.name, kind).await;
            self.database
                .save_alert(&AlertRecord::from_check(kind, &outcome))
                .await
                .context("failed to persist alert record")?;
        }

        Ok(outcome)
    }
}

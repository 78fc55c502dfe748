//! Orchestrator module - coordinates all components
//!
//! The orchestrator wires configuration, storage, probes, alerting and the
//! scheduler together, runs the monitoring loop, and exposes the
//! operations the administrative layer calls: on-demand checks, service
//! and mail-relay management, and history reads.

#![allow(dead_code)] // Administration methods are called by the API layer


use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::alerting::{AlertKind, Notifier};
use crate::config::Config;
use crate::database::models::{AlertRecord, CheckRecord, MailRelayConfig, Service};
use crate::database::{Database, ErrorSink, LibsqlRepository, initialize_database};
use crate::monitoring::types::{CheckOutcome, ServiceStatus};
use crate::monitoring::{ProbeExecutor, ProbeSettings, Scheduler};
use crate::pool::LibsqlPool;
use crate::validation::validate_target;

/// Main orchestrator for the Lookout service.
pub struct Orchestrator {
    database: Arc<dyn Database>,
    executor: Arc<ProbeExecutor>,
    notifier: Arc<Notifier>,
    scheduler: Arc<Scheduler>,
}

impl Orchestrator {
    /// Create an orchestrator and run it until the shutdown signal fires.
    pub async fn start(
        config: Config,
        pool: LibsqlPool,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let orchestrator = Self::new(config, pool).await?;
        orchestrator.run(shutdown).await
    }

    pub async fn new(config: Config, pool: LibsqlPool) -> Result<Self> {
        let conn = pool.get().await?;
        info!("initializing database schema");
        initialize_database(&conn).await?;
        drop(conn);

        let database: Arc<dyn Database> = Arc::new(LibsqlRepository::new(pool));
        let sink = ErrorSink::new(database.clone());
        let notifier = Arc::new(Notifier::new(database.clone(), sink.clone()));

        let executor = Arc::new(ProbeExecutor::new(&ProbeSettings {
            timeout: config.probe_timeout(),
            accept_invalid_certs: config.monitor.accept_invalid_certs,
        }));

        let scheduler = Arc::new(Scheduler::new(
            database.clone(),
            executor.clone(),
            notifier.clone(),
            sink,
            config.tick_interval(),
        ));

        Ok(Self { database, executor, notifier, scheduler })
    }

    /// Run the monitoring loop until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.scheduler.run(shutdown).await;
        Ok(())
    }

    /// Probe a service immediately, outside the tick cadence.
    ///
    /// Persists the check like a scheduled probe. A down result triggers
    /// an immediate notification with no threshold gating and no alert
    /// record; only the scheduler writes alert rows.
    pub async fn check_now(&self, uuid: Uuid) -> Result<CheckOutcome> {
        let service = self
            .database
            .get_service(uuid)
            .await?
            .ok_or_else(|| anyhow!("no such service: {uuid}"))?;

        let outcome = self.executor.execute(&service).await;
        self.database.save_check(&CheckRecord::from_outcome(&outcome)).await?;

        if outcome.status == ServiceStatus::Down {
            self.notifier.notify(&service.alert_email, &service.name, AlertKind::Down).await;
        }

        Ok(outcome)
    }

    /// Register a new service after validating its target.
    pub async fn add_service(&self, service: Service) -> Result<i64> {
        validate_target(service.kind, &service.target)?;
        self.database.save_service(&service).await
    }

    /// Update an already-registered service.
    pub async fn update_service(&self, mut service: Service) -> Result<i64> {
        if service.id.is_none() {
            return Err(anyhow!("service has not been persisted yet"));
        }
        validate_target(service.kind, &service.target)?;
        service.touch();
        self.database.save_service(&service).await
    }

    pub async fn remove_service(&self, uuid: Uuid) -> Result<()> {
        self.database.delete_service(uuid).await
    }

    pub async fn services(&self) -> Result<Vec<Service>> {
        self.database.list_services().await
    }

    pub async fn recent_checks(&self, uuid: Uuid, limit: usize) -> Result<Vec<CheckRecord>> {
        self.database.recent_checks(uuid, limit).await
    }

    pub async fn recent_alerts(&self, uuid: Uuid, limit: usize) -> Result<Vec<AlertRecord>> {
        self.database.recent_alerts(uuid, limit).await
    }

    pub async fn mail_relay(&self) -> Result<Option<MailRelayConfig>> {
        self.database.mail_relay_config().await
    }

    pub async fn set_mail_relay(&self, config: MailRelayConfig) -> Result<()> {
        self.database.save_mail_relay_config(&config).await
    }
}

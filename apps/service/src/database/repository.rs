#![allow(dead_code)]
use std::time::SystemTime;

use anyhow::Result;
use async_trait::async_trait;
use libsql::{Row, params};
use serde_json::Value;
use uuid::Uuid;

use super::models::{
    AlertRecord, CheckRecord, ErrorRecord, MailRelayConfig, Service, i64_to_timestamp,
    timestamp_to_i64,
};
use crate::pool::{LibsqlManager, LibsqlPool};

/// Persistence interface consumed by the monitoring core and exposed to
/// the administrative layer.
#[async_trait]
pub trait Database: Send + Sync {
    /// List every registered service.
    async fn list_services(&self) -> Result<Vec<Service>>;

    async fn get_service(&self, uuid: Uuid) -> Result<Option<Service>>;

    /// Insert or update a service, returning its rowid.
    async fn save_service(&self, service: &Service) -> Result<i64>;

    async fn delete_service(&self, uuid: Uuid) -> Result<()>;

    /// Append a check record, returning its rowid.
    async fn save_check(&self, record: &CheckRecord) -> Result<i64>;

    /// Most recent checks for a service, newest first.
    async fn recent_checks(&self, service_uuid: Uuid, limit: usize) -> Result<Vec<CheckRecord>>;

    /// Checks no older than `since`, newest first, capped at `limit`.
    async fn checks_in_window(
        &self,
        service_uuid: Uuid,
        since: SystemTime,
        limit: usize,
    ) -> Result<Vec<CheckRecord>>;

    /// The check appended immediately before the given rowid.
    async fn previous_check(
        &self,
        service_uuid: Uuid,
        before_id: i64,
    ) -> Result<Option<CheckRecord>>;

    /// Append an alert record, returning its rowid.
    async fn save_alert(&self, record: &AlertRecord) -> Result<i64>;

    /// Most recent alert of any kind for a service.
    async fn latest_alert(&self, service_uuid: Uuid) -> Result<Option<AlertRecord>>;

    async fn recent_alerts(&self, service_uuid: Uuid, limit: usize) -> Result<Vec<AlertRecord>>;

    /// Append an internal fault note.
    async fn record_error(&self, message: &str) -> Result<()>;

    async fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>>;

    /// The singleton mail relay configuration, if one has been saved.
    async fn mail_relay_config(&self) -> Result<Option<MailRelayConfig>>;

    async fn save_mail_relay_config(&self, config: &MailRelayConfig) -> Result<()>;
}

/// LibSQL-backed repository.
pub struct LibsqlRepository {
    pool: LibsqlPool,
}

impl LibsqlRepository {
    pub fn new(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

const SERVICE_COLUMNS: &str = "id, uuid, name, kind, target, check_frequency_minutes, \
     retry_threshold, grace_period_minutes, alert_email, created_at, updated_at";

const CHECK_COLUMNS: &str = "id, service_uuid, timestamp, status, latency_ms, detail";

const ALERT_COLUMNS: &str = "id, service_uuid, timestamp, kind, detail";

fn service_from_row(row: &Row) -> Result<Service> {
    let uuid: String = row.get(1)?;
    Ok(Service {
        id: Some(row.get(0)?),
        uuid: Uuid::parse_str(&uuid)?,
        name: row.get(2)?,
        kind: row.get::<String>(3)?.parse()?,
        target: row.get(4)?,
        check_frequency_minutes: row.get::<i64>(5)? as u32,
        retry_threshold: row.get::<i64>(6)? as u32,
        grace_period_minutes: row.get::<i64>(7)? as u32,
        alert_email: row.get(8)?,
        created_at: i64_to_timestamp(row.get(9)?),
        updated_at: i64_to_timestamp(row.get(10)?),
    })
}

fn check_from_row(row: &Row) -> Result<CheckRecord> {
    let uuid: String = row.get(1)?;
    Ok(CheckRecord {
        id: Some(row.get(0)?),
        service_uuid: Uuid::parse_str(&uuid)?,
        timestamp: i64_to_timestamp(row.get(2)?),
        status: row.get::<String>(3)?.parse()?,
        latency_ms: row.get::<Option<i64>>(4)?.map(|v| v as u64),
        detail: detail_from_column(row.get(5)?),
    })
}

fn alert_from_row(row: &Row) -> Result<AlertRecord> {
    let uuid: String = row.get(1)?;
    Ok(AlertRecord {
        id: Some(row.get(0)?),
        service_uuid: Uuid::parse_str(&uuid)?,
        timestamp: i64_to_timestamp(row.get(2)?),
        kind: row.get::<String>(3)?.parse()?,
        detail: detail_from_column(row.get(4)?),
    })
}

fn detail_from_column(raw: Option<String>) -> Value {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or(Value::Null)
}

#[async_trait]
impl Database for LibsqlRepository {
    async fn list_services(&self) -> Result<Vec<Service>> {
        let conn = self.get_conn().await?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY id")).await?;

        let mut rows = stmt.query(()).await?;
        let mut services = Vec::new();
        while let Some(row) = rows.next().await? {
            services.push(service_from_row(&row)?);
        }

        Ok(services)
    }

    async fn get_service(&self, uuid: Uuid) -> Result<Option<Service>> {
        let conn = self.get_conn().await?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE uuid = ?")).await?;

        let mut rows = stmt.query(params![uuid.to_string()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(service_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_service(&self, service: &Service) -> Result<i64> {
        let conn = self.get_conn().await?;
        let created_at = timestamp_to_i64(service.created_at);
        let updated_at = timestamp_to_i64(service.updated_at);

        if let Some(id) = service.id {
            conn.execute(
                "UPDATE services SET name = ?, kind = ?, target = ?, \
                 check_frequency_minutes = ?, retry_threshold = ?, grace_period_minutes = ?, \
                 alert_email = ?, updated_at = ? WHERE id = ?",
                params![
                    service.name.clone(),
                    service.kind.as_str(),
                    service.target.clone(),
                    service.check_frequency_minutes as i64,
                    service.retry_threshold as i64,
                    service.grace_period_minutes as i64,
                    service.alert_email.clone(),
                    updated_at,
                    id
                ],
            )
            .await?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO services (uuid, name, kind, target, check_frequency_minutes, \
                 retry_threshold, grace_period_minutes, alert_email, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    service.uuid.to_string(),
                    service.name.clone(),
                    service.kind.as_str(),
                    service.target.clone(),
                    service.check_frequency_minutes as i64,
                    service.retry_threshold as i64,
                    service.grace_period_minutes as i64,
                    service.alert_email.clone(),
                    created_at,
                    updated_at
                ],
            )
            .await?;

            Ok(conn.last_insert_rowid())
        }
    }

    async fn delete_service(&self, uuid: Uuid) -> Result<()> {
        let conn = self.get_conn().await?;

        // Check and alert rows go with it via ON DELETE CASCADE.
        conn.execute("DELETE FROM services WHERE uuid = ?", params![uuid.to_string()]).await?;
        Ok(())
    }

    async fn save_check(&self, record: &CheckRecord) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO checks (service_uuid, timestamp, status, latency_ms, detail) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.service_uuid.to_string(),
                timestamp_to_i64(record.timestamp),
                record.status.as_str(),
                record.latency_ms.map(|v| v as i64),
                record.detail.to_string()
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn recent_checks(&self, service_uuid: Uuid, limit: usize) -> Result<Vec<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHECK_COLUMNS} FROM checks WHERE service_uuid = ? \
                 ORDER BY timestamp DESC, id DESC LIMIT ?"
            ))
            .await?;

        let mut rows = stmt.query(params![service_uuid.to_string(), limit as i64]).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(check_from_row(&row)?);
        }

        Ok(records)
    }

    async fn checks_in_window(
        &self,
        service_uuid: Uuid,
        since: SystemTime,
        limit: usize,
    ) -> Result<Vec<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHECK_COLUMNS} FROM checks WHERE service_uuid = ? AND timestamp >= ? \
                 ORDER BY timestamp DESC, id DESC LIMIT ?"
            ))
            .await?;

        let mut rows = stmt
            .query(params![service_uuid.to_string(), timestamp_to_i64(since), limit as i64])
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(check_from_row(&row)?);
        }

        Ok(records)
    }

    async fn previous_check(
        &self,
        service_uuid: Uuid,
        before_id: i64,
    ) -> Result<Option<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHECK_COLUMNS} FROM checks WHERE service_uuid = ? AND id < ? \
                 ORDER BY id DESC LIMIT 1"
            ))
            .await?;

        let mut rows = stmt.query(params![service_uuid.to_string(), before_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(check_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_alert(&self, record: &AlertRecord) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO alerts (service_uuid, timestamp, kind, detail) VALUES (?, ?, ?, ?)",
            params![
                record.service_uuid.to_string(),
                timestamp_to_i64(record.timestamp),
                record.kind.as_str(),
                record.detail.to_string()
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn latest_alert(&self, service_uuid: Uuid) -> Result<Option<AlertRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM alerts WHERE service_uuid = ? \
                 ORDER BY timestamp DESC, id DESC LIMIT 1"
            ))
            .await?;

        let mut rows = stmt.query(params![service_uuid.to_string()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(alert_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn recent_alerts(&self, service_uuid: Uuid, limit: usize) -> Result<Vec<AlertRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM alerts WHERE service_uuid = ? \
                 ORDER BY timestamp DESC, id DESC LIMIT ?"
            ))
            .await?;

        let mut rows = stmt.query(params![service_uuid.to_string(), limit as i64]).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(alert_from_row(&row)?);
        }

        Ok(records)
    }

    async fn record_error(&self, message: &str) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO errors (timestamp, message) VALUES (?, ?)",
            params![timestamp_to_i64(SystemTime::now()), message],
        )
        .await?;

        Ok(())
    }

    async fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, message FROM errors ORDER BY timestamp DESC, id DESC \
                 LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![limit as i64]).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(ErrorRecord {
                id: Some(row.get(0)?),
                timestamp: i64_to_timestamp(row.get(1)?),
                message: row.get(2)?,
            });
        }

        Ok(records)
    }

    async fn mail_relay_config(&self) -> Result<Option<MailRelayConfig>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT host, port, username, password, from_email, use_tls \
                 FROM mail_relay_config WHERE id = 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(MailRelayConfig {
                host: row.get(0)?,
                port: row.get::<i64>(1)? as u16,
                username: row.get(2)?,
                password: row.get(3)?,
                from_email: row.get(4)?,
                use_tls: row.get::<i64>(5)? != 0,
            })),
            None => Ok(None),
        }
    }

    async fn save_mail_relay_config(&self, config: &MailRelayConfig) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT OR REPLACE INTO mail_relay_config \
             (id, host, port, username, password, from_email, use_tls) \
             VALUES (1, ?, ?, ?, ?, ?, ?)",
            params![
                config.host.clone(),
                config.port as i64,
                config.username.clone(),
                config.password.clone(),
                config.from_email.clone(),
                if config.use_tls { 1 } else { 0 }
            ],
        )
        .await?;

        Ok(())
    }
}

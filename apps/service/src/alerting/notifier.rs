use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::evaluator::AlertKind;
use crate::database::models::MailRelayConfig;
use crate::database::{Database, ErrorSink};

/// Timeout for the whole SMTP session.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers alert e-mails through the configured relay.
///
/// Delivery is best-effort: a missing relay configuration is a logged
/// no-op and a failed send is recorded to the error sink and swallowed.
/// Alert bookkeeping never depends on delivery succeeding.
pub struct Notifier {
    database: Arc<dyn Database>,
    sink: ErrorSink,
}

impl Notifier {
    pub fn new(database: Arc<dyn Database>, sink: ErrorSink) -> Self {
        Self { database, sink }
    }

    pub async fn notify(&self, recipient: &str, service_name: &str, kind: AlertKind) {
        let config = match self.database.mail_relay_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("alert for {service_name} not sent: mail relay not configured");
                return;
            }
            Err(e) => {
                self.sink.record(format!("failed to load mail relay config: {e:#}")).await;
                return;
            }
        };

        match self.send(&config, recipient, service_name, kind).await {
            Ok(()) => {
                info!("alert sent to {recipient}: {service_name} is {}", status_word(kind));
            }
            Err(e) => self.sink.record(format!("smtp error: {e:#}")).await,
        }
    }

    async fn send(
        &self,
        config: &MailRelayConfig,
        recipient: &str,
        service_name: &str,
        kind: AlertKind,
    ) -> Result<()> {
        let status = status_word(kind);
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S");

        let message = Message::builder()
            .from(config.from_email.parse().context("invalid sender address")?)
            .to(recipient.parse().context("invalid recipient address")?)
            .subject(format!("Service Alert: {service_name} is {status}"))
            .header(ContentType::TEXT_PLAIN)
            .body(format!("Service: {service_name}\nStatus: {status}\nTime: {now}\n"))?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if !config.username.is_empty() {
            builder = builder
                .credentials(Credentials::new(config.username.clone(), config.password.clone()));
        }

        let mailer: AsyncSmtpTransport<Tokio1Executor> = builder.build();
        mailer.send(message).await.context("failed to send alert mail")?;
        Ok(())
    }
}

/// Wording used in the alert subject and body.
fn status_word(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Down => "DOWN",
        AlertKind::Recovery => "UP",
    }
}

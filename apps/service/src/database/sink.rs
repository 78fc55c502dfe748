use std::sync::Arc;

use tracing::error;

use super::Database;

/// Write-only diagnostics channel backed by the errors table.
///
/// Recording is best-effort: a failure to persist is logged and dropped so
/// that diagnostics can never take down the path that emitted them.
#[derive(Clone)]
pub struct ErrorSink {
    database: Arc<dyn Database>,
}

impl ErrorSink {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    pub async fn record(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");

        if let Err(e) = self.database.record_error(&message).await {
            error!("failed to record error: {e:#}");
        }
    }
}

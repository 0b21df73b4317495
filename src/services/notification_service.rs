//! Fire-and-forget user notifications.
//!
//! Notifications are enqueued after a financial change has committed. Their
//! delivery is outside the financial contract: failures are logged and
//! never roll back or fail the operation that triggered them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{db::DbPool, error::AppError, models::notification::Notification};

/// Destination for notification requests.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError>;
}

/// Stores notifications in the `notifications` table for the app to fetch.
pub struct PgNotificationSink {
    pool: DbPool,
}

impl PgNotificationSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (account_id, title, message, kind)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(notification.account_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Cloneable handle that hands notifications to a sink on a background task.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Queue a notification without waiting for delivery.
    pub fn enqueue(&self, notification: Notification) {
        let Some(sink) = self.sink.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&notification).await {
                tracing::error!(
                    account_id = %notification.account_id,
                    title = %notification.title,
                    error = %e,
                    "failed to deliver notification"
                );
            }
        });
    }
}

//! Notification repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tempora_core::{
    new_v7, DeliveryMethod, Error, NewNotification, Notification, NotificationRepository,
    NotificationSource, NotificationStatus, Result,
};

/// PostgreSQL implementation of NotificationRepository.
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, source_kind::text, source_id, trigger_date, \
     trigger_at, title, message, delivery_method::text, status::text, sent_at, error_message, \
     created_at";

fn parse_notification_row(row: sqlx::postgres::PgRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        source_kind: NotificationSource::parse(row.get("source_kind")),
        source_id: row.get("source_id"),
        trigger_date: row.get("trigger_date"),
        trigger_at: row.get("trigger_at"),
        title: row.get("title"),
        message: row.get("message"),
        delivery_method: DeliveryMethod::parse(row.get("delivery_method")),
        status: NotificationStatus::parse(row.get("status")),
        sent_at: row.get("sent_at"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    }
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create_if_absent(&self, notification: &NewNotification) -> Result<Option<Uuid>> {
        // Atomic insert-unless-present on the dedup key; a concurrent
        // duplicate lands on the unique index and is ignored.
        let id: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO notification (id, user_id, source_kind, source_id, trigger_date,
                                       trigger_at, title, message, delivery_method, created_at)
             VALUES ($1, $2, $3::notification_source, $4, $5, $6, $7, $8, $9::delivery_method, $10)
             ON CONFLICT (source_kind, source_id, trigger_date) DO NOTHING
             RETURNING id",
        )
        .bind(new_v7())
        .bind(notification.user_id)
        .bind(notification.source_kind.as_str())
        .bind(notification.source_id)
        .bind(notification.trigger_date)
        .bind(notification.trigger_at)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.delivery_method.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn list_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notification
             WHERE status = 'pending'::notification_status AND trigger_at <= $1
             ORDER BY trigger_at ASC
             LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_notification_row).collect())
    }

    async fn mark_sent(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notification
             SET status = 'sent'::notification_status, sent_at = $1
             WHERE id = $2 AND status = 'pending'::notification_status",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("notification {id} is not pending")));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notification
             SET status = 'failed'::notification_status, error_message = $1
             WHERE id = $2 AND status = 'pending'::notification_status",
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("notification {id} is not pending")));
        }
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notification
             SET status = 'cancelled'::notification_status
             WHERE id = $1 AND status = 'pending'::notification_status",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("notification {id} is not pending")));
        }
        Ok(())
    }
}

//! Event repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tempora_core::{
    defaults, new_v7, AiAnalysisStatus, CreateEventRequest, Error, Event, EventRepository,
    EventStatus, ImportEntry, Result,
};

/// PostgreSQL implementation of EventRepository.
pub struct PgEventRepository {
    pool: Pool<Postgres>,
}

const EVENT_COLUMNS: &str = "id, user_id, title, description, location, start_at, end_at, \
     status::text, priority, completion_percent, metadata, source_entry_id, \
     ai_analysis_status::text, ai_analysis_locked, ai_analysis_batch_id, ai_analysis_error, \
     analyzed_at, created_at, updated_at";

fn parse_event_row(row: sqlx::postgres::PgRow) -> Event {
    Event {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        status: EventStatus::parse(row.get("status")),
        priority: row.get("priority"),
        completion_percent: row.get("completion_percent"),
        metadata: row.get("metadata"),
        source_entry_id: row.get("source_entry_id"),
        ai_analysis_status: AiAnalysisStatus::parse(row.get("ai_analysis_status")),
        ai_analysis_locked: row.get("ai_analysis_locked"),
        ai_analysis_batch_id: row.get("ai_analysis_batch_id"),
        ai_analysis_error: row.get("ai_analysis_error"),
        analyzed_at: row.get("analyzed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgEventRepository {
    /// Create a new PgEventRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create(&self, user_id: Uuid, req: &CreateEventRequest) -> Result<Uuid> {
        if req.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }

        let event_id = new_v7();
        let end_at = req
            .end_at
            .unwrap_or(req.start_at + Duration::minutes(defaults::DEFAULT_EVENT_DURATION_MINUTES));

        sqlx::query(
            "INSERT INTO event (id, user_id, title, description, location, start_at, end_at,
                                priority, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, '{}'::jsonb), $10, $10)",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.location)
        .bind(req.start_at)
        .bind(end_at)
        .bind(req.priority)
        .bind(&req.metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(event_id)
    }

    async fn create_from_entry(&self, entry: &ImportEntry) -> Result<Uuid> {
        // Preconditions are the converter's contract; re-checked here so the
        // invariant cannot be bypassed by a direct repository call.
        let title = entry
            .parsed_title
            .as_deref()
            .ok_or_else(|| Error::Precondition(format!("entry {} has no parsed title", entry.id)))?;
        let start_at = entry.parsed_start_at.ok_or_else(|| {
            Error::Precondition(format!("entry {} has no parsed start datetime", entry.id))
        })?;
        let end_at = entry
            .parsed_end_at
            .unwrap_or(start_at + Duration::minutes(defaults::DEFAULT_EVENT_DURATION_MINUTES));

        let event_id = new_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO event (id, user_id, title, description, location, start_at, end_at,
                                priority, metadata, source_entry_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)",
        )
        .bind(event_id)
        .bind(entry.user_id)
        .bind(title)
        .bind(&entry.parsed_description)
        .bind(&entry.parsed_location)
        .bind(start_at)
        .bind(end_at)
        .bind(entry.parsed_priority)
        .bind(serde_json::json!({
            "import_id": entry.import_id,
            "row_number": entry.row_number,
            "detected_keywords": entry.detected_keywords,
            "ai_confidence": entry.ai_confidence,
        }))
        .bind(entry.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        // One statement closes the conversion: success, converted, event id.
        // Only a still-convertible entry is updated, so a concurrent convert
        // of the same entry cannot produce two linked events.
        let updated = sqlx::query(
            "UPDATE import_entry
             SET conversion_status = 'success'::conversion_status,
                 processing_status = 'converted'::processing_status,
                 converted_event_id = $1, updated_at = $2
             WHERE id = $3
               AND processing_status = 'parsed'::processing_status
               AND conversion_status IN ('pending'::conversion_status, 'failed'::conversion_status)",
        )
        .bind(event_id)
        .bind(now)
        .bind(entry.id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(Error::Database)?;
            return Err(Error::Conflict(format!(
                "entry {} is no longer convertible",
                entry.id
            )));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(event_id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(parse_event_row))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM event
             WHERE user_id = $1 AND start_at >= $2 AND start_at < $3
             ORDER BY start_at ASC"
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_event_row).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: EventStatus,
        completion_percent: i16,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE event
             SET status = $1::event_status, completion_percent = $2, updated_at = $3
             WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(completion_percent.clamp(0, 100))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EventNotFound(id));
        }
        Ok(())
    }
}

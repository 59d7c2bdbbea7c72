//! Analysis and slot repository implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tempora_core::{
    new_v7, AnalysisCompletion, AnalysisRepository, AnalysisStatus, Error, Result,
    ScheduleAnalysis, ScheduleSlot, SlotStatus, TaskPriority,
};

/// PostgreSQL implementation of AnalysisRepository.
pub struct PgAnalysisRepository {
    pool: Pool<Postgres>,
}

const ANALYSIS_COLUMNS: &str = "id, user_id, target_date, status::text, input_snapshot, \
     optimized_schedule, optimization_summary, confidence_score, prompt_tokens, \
     completion_tokens, cost_usd, model, error_message, user_feedback, created_at, completed_at";

const SLOT_COLUMNS: &str = "id, analysis_id, user_id, slot_date, start_at, end_at, \
     duration_minutes, title, priority, location, category, reasoning, energy_level, \
     reminder_minutes_before, status::text, notification_sent, event_id, created_at";

fn parse_analysis_row(row: sqlx::postgres::PgRow) -> ScheduleAnalysis {
    ScheduleAnalysis {
        id: row.get("id"),
        user_id: row.get("user_id"),
        target_date: row.get("target_date"),
        status: AnalysisStatus::parse(row.get("status")),
        input_snapshot: row.get("input_snapshot"),
        optimized_schedule: row.get("optimized_schedule"),
        optimization_summary: row.get("optimization_summary"),
        confidence_score: row.get("confidence_score"),
        prompt_tokens: row.get("prompt_tokens"),
        completion_tokens: row.get("completion_tokens"),
        cost_usd: row.get("cost_usd"),
        model: row.get("model"),
        error_message: row.get("error_message"),
        user_feedback: row.get("user_feedback"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

fn parse_slot_row(row: sqlx::postgres::PgRow) -> ScheduleSlot {
    ScheduleSlot {
        id: row.get("id"),
        analysis_id: row.get("analysis_id"),
        user_id: row.get("user_id"),
        slot_date: row.get("slot_date"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        duration_minutes: row.get("duration_minutes"),
        title: row.get("title"),
        priority: TaskPriority::from_str_loose(row.get("priority")),
        location: row.get("location"),
        category: row.get("category"),
        reasoning: row.get("reasoning"),
        energy_level: row.get("energy_level"),
        reminder_minutes_before: row.get("reminder_minutes_before"),
        status: SlotStatus::parse(row.get("status")),
        notification_sent: row.get("notification_sent"),
        event_id: row.get("event_id"),
        created_at: row.get("created_at"),
    }
}

impl PgAnalysisRepository {
    /// Create a new PgAnalysisRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisRepository for PgAnalysisRepository {
    async fn create(
        &self,
        user_id: Uuid,
        target_date: NaiveDate,
        input_snapshot: JsonValue,
    ) -> Result<Uuid> {
        let analysis_id = new_v7();
        sqlx::query(
            "INSERT INTO schedule_analysis (id, user_id, target_date, status, input_snapshot, created_at)
             VALUES ($1, $2, $3, 'processing'::analysis_status, $4, $5)",
        )
        .bind(analysis_id)
        .bind(user_id)
        .bind(target_date)
        .bind(&input_snapshot)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(analysis_id)
    }

    async fn complete(&self, id: Uuid, completion: &AnalysisCompletion) -> Result<Vec<Uuid>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (user_id,): (Uuid,) =
            sqlx::query_as("SELECT user_id FROM schedule_analysis WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?
                .ok_or(Error::AnalysisNotFound(id))?;

        let updated = sqlx::query(
            "UPDATE schedule_analysis
             SET status = 'completed'::analysis_status, optimized_schedule = $1,
                 optimization_summary = $2, confidence_score = $3, prompt_tokens = $4,
                 completion_tokens = $5, cost_usd = $6, model = $7, completed_at = $8
             WHERE id = $9 AND status = 'processing'::analysis_status",
        )
        .bind(&completion.optimized_schedule)
        .bind(&completion.optimization_summary)
        .bind(completion.confidence_score)
        .bind(completion.prompt_tokens)
        .bind(completion.completion_tokens)
        .bind(completion.cost_usd)
        .bind(&completion.model)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(Error::Database)?;
            return Err(Error::Conflict(format!(
                "analysis {id} is not in processing state"
            )));
        }

        let mut slot_ids = Vec::with_capacity(completion.slots.len());
        for slot in &completion.slots {
            let slot_id = new_v7();
            sqlx::query(
                "INSERT INTO schedule_slot (id, analysis_id, user_id, slot_date, start_at, end_at,
                                            duration_minutes, title, priority, location, category,
                                            reasoning, energy_level, reminder_minutes_before,
                                            event_id, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            )
            .bind(slot_id)
            .bind(id)
            .bind(user_id)
            .bind(slot.slot_date)
            .bind(slot.start_at)
            .bind(slot.end_at)
            .bind(slot.duration_minutes)
            .bind(&slot.title)
            .bind(slot.priority.as_str())
            .bind(&slot.location)
            .bind(&slot.category)
            .bind(&slot.reasoning)
            .bind(&slot.energy_level)
            .bind(slot.reminder_minutes_before)
            .bind(slot.event_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            slot_ids.push(slot_id);
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(slot_ids)
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE schedule_analysis
             SET status = 'failed'::analysis_status, error_message = $1, completed_at = $2
             WHERE id = $3 AND status IN ('pending'::analysis_status, 'processing'::analysis_status)",
        )
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "analysis {id} is already finalized"
            )));
        }
        Ok(())
    }

    async fn mark_partial(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE schedule_analysis
             SET status = 'partial'::analysis_status
             WHERE id = $1 AND status = 'completed'::analysis_status",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("analysis {id} is not completed")));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduleAnalysis>> {
        let row = sqlx::query(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM schedule_analysis WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(parse_analysis_row))
    }

    async fn slots(&self, analysis_id: Uuid) -> Result<Vec<ScheduleSlot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slot
             WHERE analysis_id = $1
             ORDER BY start_at ASC"
        ))
        .bind(analysis_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_slot_row).collect())
    }

    async fn pending_reminder_slots(&self, user_id: Uuid) -> Result<Vec<ScheduleSlot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slot
             WHERE user_id = $1
               AND reminder_minutes_before IS NOT NULL
               AND NOT notification_sent
               AND status = 'scheduled'::slot_status
             ORDER BY start_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_slot_row).collect())
    }

    async fn slots_for_date(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleSlot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slot
             WHERE user_id = $1 AND slot_date = $2
               AND status = 'scheduled'::slot_status
             ORDER BY start_at ASC"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_slot_row).collect())
    }

    async fn update_slot_status(&self, slot_id: Uuid, status: SlotStatus) -> Result<()> {
        let result = sqlx::query("UPDATE schedule_slot SET status = $1::slot_status WHERE id = $2")
            .bind(status.as_str())
            .bind(slot_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("slot {slot_id}")));
        }
        Ok(())
    }

    async fn mark_slot_notified(&self, slot_id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE schedule_slot SET notification_sent = TRUE WHERE id = $1")
            .bind(slot_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("slot {slot_id}")));
        }
        Ok(())
    }

    async fn record_feedback(&self, id: Uuid, feedback: &str) -> Result<()> {
        let result = sqlx::query("UPDATE schedule_analysis SET user_feedback = $1 WHERE id = $2")
            .bind(feedback)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::AnalysisNotFound(id));
        }
        Ok(())
    }
}

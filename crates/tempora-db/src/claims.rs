//! Task claim repository: the locking protocol guarding concurrent AI
//! analysis.
//!
//! Import entries and events carry an identical
//! `(ai_analysis_status, ai_analysis_locked)` pair; a [`TaskRef`] addresses
//! either. The claim is a single conditional `UPDATE … RETURNING`, so two
//! concurrent claimers can never both observe a task claimable: the loser
//! gets zero rows and a diagnosed rejection. Locks are released exactly once,
//! by `complete` or `fail`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use tempora_core::{
    AnalysisResult, BatchClaimOutcome, ClaimRejectReason, ClaimRejection, ClaimRepository, Error,
    Result, TaskRef, TaskSource,
};

/// PostgreSQL implementation of ClaimRepository over both task tables.
pub struct PgClaimRepository {
    pool: Pool<Postgres>,
}

fn task_table(source: TaskSource) -> &'static str {
    match source {
        TaskSource::Entry => "import_entry",
        TaskSource::Event => "event",
    }
}

fn not_found(task: TaskRef) -> Error {
    match task.source {
        TaskSource::Entry => Error::EntryNotFound(task.id),
        TaskSource::Event => Error::EventNotFound(task.id),
    }
}

impl PgClaimRepository {
    /// Create a new PgClaimRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Inspect a task after a failed claim to tell the caller why.
    async fn diagnose(&self, task: TaskRef) -> Result<ClaimRejectReason> {
        let table = task_table(task.source);
        let row = sqlx::query(&format!(
            "SELECT ai_analysis_locked, ai_analysis_status::text FROM {table} WHERE id = $1"
        ))
        .bind(task.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(ClaimRejectReason::NotFound);
        };

        let locked: bool = row.get("ai_analysis_locked");
        let status: String = row.get("ai_analysis_status");
        if locked || status == "in_progress" {
            // Reported as a conflict, not a rejection reason.
            Err(Error::Conflict(format!(
                "task {} is already claimed for analysis",
                task.id
            )))
        } else {
            Ok(ClaimRejectReason::NotEligible)
        }
    }
}

#[async_trait]
impl ClaimRepository for PgClaimRepository {
    async fn is_available(&self, task: TaskRef) -> Result<bool> {
        let table = task_table(task.source);
        let available: Option<bool> = sqlx::query_scalar(&format!(
            "SELECT NOT ai_analysis_locked
                    AND ai_analysis_status IN ('pending'::ai_analysis_status,
                                               'failed'::ai_analysis_status,
                                               'skipped'::ai_analysis_status)
             FROM {table} WHERE id = $1"
        ))
        .bind(task.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        available.ok_or_else(|| not_found(task))
    }

    async fn claim(&self, task: TaskRef, batch_id: Uuid) -> Result<()> {
        let table = task_table(task.source);

        // Check-and-set in one atomic statement: the WHERE clause is the
        // availability check, the row count is the verification.
        let claimed: Option<Uuid> = sqlx::query_scalar(&format!(
            "UPDATE {table}
             SET ai_analysis_locked = TRUE,
                 ai_analysis_status = 'in_progress'::ai_analysis_status,
                 ai_analysis_batch_id = $1,
                 ai_analysis_error = NULL,
                 updated_at = $2
             WHERE id = $3
               AND NOT ai_analysis_locked
               AND ai_analysis_status IN ('pending'::ai_analysis_status,
                                          'failed'::ai_analysis_status,
                                          'skipped'::ai_analysis_status)
             RETURNING id"
        ))
        .bind(batch_id)
        .bind(Utc::now())
        .bind(task.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if claimed.is_some() {
            debug!(
                subsystem = "db",
                component = "claims",
                op = "claim",
                batch_id = %batch_id,
                task_id = %task.id,
                "Task claimed for analysis"
            );
            return Ok(());
        }

        match self.diagnose(task).await? {
            ClaimRejectReason::NotFound => Err(not_found(task)),
            ClaimRejectReason::NotEligible => Err(Error::Validation(format!(
                "task {} is not eligible for analysis",
                task.id
            ))),
        }
    }

    async fn claim_batch(&self, tasks: &[TaskRef], batch_id: Uuid) -> Result<BatchClaimOutcome> {
        let mut outcome = BatchClaimOutcome::default();

        // Every item is attempted; per-item failures never abort siblings.
        for &task in tasks {
            match self.claim(task, batch_id).await {
                Ok(()) => outcome.claimed.push(task),
                Err(Error::Conflict(_)) => outcome.already_locked.push(task),
                Err(Error::EntryNotFound(_)) | Err(Error::EventNotFound(_)) => {
                    outcome.rejected.push(ClaimRejection {
                        task,
                        reason: ClaimRejectReason::NotFound,
                    })
                }
                Err(Error::Validation(_)) => outcome.rejected.push(ClaimRejection {
                    task,
                    reason: ClaimRejectReason::NotEligible,
                }),
                Err(other) => return Err(other),
            }
        }

        debug!(
            subsystem = "db",
            component = "claims",
            op = "claim_batch",
            batch_id = %batch_id,
            claimed = outcome.claimed.len(),
            already_locked = outcome.already_locked.len(),
            rejected = outcome.rejected.len(),
            "Batch claim finished"
        );
        Ok(outcome)
    }

    async fn complete(&self, task: TaskRef, result: &AnalysisResult) -> Result<()> {
        let now = Utc::now();
        let updated = match task.source {
            TaskSource::Entry => sqlx::query(
                "UPDATE import_entry
                 SET ai_analysis_status = 'completed'::ai_analysis_status,
                     ai_analysis_locked = FALSE,
                     ai_detected_category = COALESCE($1, ai_detected_category),
                     ai_detected_importance = COALESCE($2, ai_detected_importance),
                     ai_confidence = COALESCE($3, ai_confidence),
                     analyzed_at = $4, updated_at = $4
                 WHERE id = $5
                   AND ai_analysis_status = 'in_progress'::ai_analysis_status",
            )
            .bind(&result.category)
            .bind(&result.importance)
            .bind(result.confidence)
            .bind(now)
            .bind(task.id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?,
            TaskSource::Event => sqlx::query(
                "UPDATE event
                 SET ai_analysis_status = 'completed'::ai_analysis_status,
                     ai_analysis_locked = FALSE,
                     metadata = metadata || jsonb_build_object(
                         'ai_detected_category', $1::text,
                         'ai_detected_importance', $2::text,
                         'ai_confidence', $3::real),
                     analyzed_at = $4, updated_at = $4
                 WHERE id = $5
                   AND ai_analysis_status = 'in_progress'::ai_analysis_status",
            )
            .bind(&result.category)
            .bind(&result.importance)
            .bind(result.confidence)
            .bind(now)
            .bind(task.id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?,
        };

        if updated.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "task {} is not in progress; complete refused",
                task.id
            )));
        }
        Ok(())
    }

    async fn fail(&self, task: TaskRef, reason: &str) -> Result<()> {
        let table = task_table(task.source);
        let updated = sqlx::query(&format!(
            "UPDATE {table}
             SET ai_analysis_status = 'failed'::ai_analysis_status,
                 ai_analysis_locked = FALSE,
                 ai_analysis_error = $1,
                 updated_at = $2
             WHERE id = $3
               AND ai_analysis_status = 'in_progress'::ai_analysis_status"
        ))
        .bind(reason)
        .bind(Utc::now())
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "task {} is not in progress; fail refused",
                task.id
            )));
        }
        Ok(())
    }

    async fn reset(&self, task: TaskRef) -> Result<()> {
        let table = task_table(task.source);
        let updated = sqlx::query(&format!(
            "UPDATE {table}
             SET ai_analysis_status = 'pending'::ai_analysis_status,
                 ai_analysis_locked = FALSE,
                 ai_analysis_batch_id = NULL,
                 ai_analysis_error = NULL,
                 updated_at = $1
             WHERE id = $2"
        ))
        .bind(Utc::now())
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(not_found(task));
        }

        warn!(
            subsystem = "db",
            component = "claims",
            op = "reset",
            task_id = %task.id,
            "Task analysis state force-reset to pending"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_table_dispatch() {
        assert_eq!(task_table(TaskSource::Entry), "import_entry");
        assert_eq!(task_table(TaskSource::Event), "event");
    }

    #[test]
    fn not_found_is_typed_per_source() {
        let id = Uuid::new_v4();
        assert!(matches!(
            not_found(TaskRef::entry(id)),
            Error::EntryNotFound(_)
        ));
        assert!(matches!(
            not_found(TaskRef::event(id)),
            Error::EventNotFound(_)
        ));
    }
}

//! Import entry repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tempora_core::{
    new_v7, AiAnalysisStatus, ConversionStatus, EntryRepository, Error, ImportEntry, NewEntry,
    ProcessingStatus, Result,
};

/// PostgreSQL implementation of EntryRepository.
pub struct PgEntryRepository {
    pool: Pool<Postgres>,
}

const ENTRY_COLUMNS: &str = "id, import_id, user_id, row_number, raw_text, original_data, \
     parsed_title, parsed_description, parsed_location, parsed_start_at, parsed_end_at, \
     parsed_priority, detected_keywords, ai_confidence, ai_detected_category, \
     ai_detected_importance, processing_status::text, conversion_status::text, \
     converted_event_id, manual_review_required, manual_review_notes, \
     ai_analysis_status::text, ai_analysis_locked, ai_analysis_batch_id, ai_analysis_error, \
     analyzed_at, created_at, updated_at";

fn parse_entry_row(row: sqlx::postgres::PgRow) -> ImportEntry {
    ImportEntry {
        id: row.get("id"),
        import_id: row.get("import_id"),
        user_id: row.get("user_id"),
        row_number: row.get("row_number"),
        raw_text: row.get("raw_text"),
        original_data: row.get("original_data"),
        parsed_title: row.get("parsed_title"),
        parsed_description: row.get("parsed_description"),
        parsed_location: row.get("parsed_location"),
        parsed_start_at: row.get("parsed_start_at"),
        parsed_end_at: row.get("parsed_end_at"),
        parsed_priority: row.get("parsed_priority"),
        detected_keywords: row.get("detected_keywords"),
        ai_confidence: row.get("ai_confidence"),
        ai_detected_category: row.get("ai_detected_category"),
        ai_detected_importance: row.get("ai_detected_importance"),
        processing_status: ProcessingStatus::parse(row.get("processing_status")),
        conversion_status: ConversionStatus::parse(row.get("conversion_status")),
        converted_event_id: row.get("converted_event_id"),
        manual_review_required: row.get("manual_review_required"),
        manual_review_notes: row.get("manual_review_notes"),
        ai_analysis_status: AiAnalysisStatus::parse(row.get("ai_analysis_status")),
        ai_analysis_locked: row.get("ai_analysis_locked"),
        ai_analysis_batch_id: row.get("ai_analysis_batch_id"),
        ai_analysis_error: row.get("ai_analysis_error"),
        analyzed_at: row.get("analyzed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgEntryRepository {
    /// Create a new PgEntryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn insert_batch(
        &self,
        import_id: Uuid,
        user_id: Uuid,
        entries: &[NewEntry],
    ) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let now = Utc::now();
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = new_v7();
            sqlx::query(
                "INSERT INTO import_entry (
                     id, import_id, user_id, row_number, raw_text, original_data,
                     parsed_title, parsed_description, parsed_location,
                     parsed_start_at, parsed_end_at, parsed_priority, detected_keywords,
                     ai_confidence, ai_detected_category, processing_status,
                     manual_review_required, manual_review_notes, created_at, updated_at
                 )
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                         $16::processing_status, $17, $18, $19, $19)",
            )
            .bind(id)
            .bind(import_id)
            .bind(user_id)
            .bind(entry.row_number)
            .bind(&entry.raw_text)
            .bind(&entry.original_data)
            .bind(&entry.parsed_title)
            .bind(&entry.parsed_description)
            .bind(&entry.parsed_location)
            .bind(entry.parsed_start_at)
            .bind(entry.parsed_end_at)
            .bind(entry.parsed_priority)
            .bind(&entry.detected_keywords)
            .bind(entry.ai_confidence)
            .bind(&entry.ai_detected_category)
            .bind(entry.processing_status.as_str())
            .bind(entry.manual_review_required)
            .bind(&entry.manual_review_notes)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            ids.push(id);
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(ids)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ImportEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM import_entry WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(parse_entry_row))
    }

    async fn list_for_import(&self, import_id: Uuid) -> Result<Vec<ImportEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM import_entry
             WHERE import_id = $1
             ORDER BY row_number ASC"
        ))
        .bind(import_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_entry_row).collect())
    }

    async fn list_convertible(
        &self,
        user_id: Uuid,
        import_id: Option<Uuid>,
        threshold: f32,
    ) -> Result<Vec<ImportEntry>> {
        // The selection predicate is what makes conversion idempotent:
        // converted entries leave the parsed/pending set and are never
        // picked up again.
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM import_entry
             WHERE user_id = $1
               AND ($2::uuid IS NULL OR import_id = $2)
               AND processing_status = 'parsed'::processing_status
               AND conversion_status IN ('pending'::conversion_status, 'failed'::conversion_status)
               AND ai_confidence >= $3
               AND NOT manual_review_required
             ORDER BY row_number ASC"
        ))
        .bind(user_id)
        .bind(import_id)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(parse_entry_row).collect())
    }

    async fn mark_conversion_failed(&self, id: Uuid, note: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import_entry
             SET conversion_status = 'failed'::conversion_status,
                 manual_review_notes = $1, updated_at = $2
             WHERE id = $3",
        )
        .bind(note)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }

    async fn mark_manual_review(&self, id: Uuid, note: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import_entry
             SET conversion_status = 'manual_review'::conversion_status,
                 manual_review_required = TRUE, manual_review_notes = $1, updated_at = $2
             WHERE id = $3",
        )
        .bind(note)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }
}

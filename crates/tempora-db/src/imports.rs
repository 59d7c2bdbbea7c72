//! Import repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tempora_core::{
    new_v7, CreateImportRequest, Error, Import, ImportCounters, ImportRepository, ImportStatus,
    Result, SourceType,
};

/// PostgreSQL implementation of ImportRepository.
pub struct PgImportRepository {
    pool: Pool<Postgres>,
}

impl PgImportRepository {
    /// Create a new PgImportRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Sha-256 digest of raw content, hex encoded.
    pub fn content_hash(content: &str) -> String {
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    fn parse_import_row(row: sqlx::postgres::PgRow) -> Import {
        Import {
            id: row.get("id"),
            user_id: row.get("user_id"),
            import_type: row.get("import_type"),
            source_type: SourceType::parse(row.get("source_type")),
            raw_content: row.get("raw_content"),
            content_hash: row.get("content_hash"),
            status: ImportStatus::parse(row.get("status")),
            total_found: row.get("total_found"),
            success_count: row.get("success_count"),
            failed_count: row.get("failed_count"),
            ai_confidence_score: row.get("ai_confidence_score"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

const IMPORT_COLUMNS: &str = "id, user_id, import_type, source_type::text, raw_content, \
     content_hash, status::text, total_found, success_count, failed_count, \
     ai_confidence_score, error_message, created_at, completed_at";

#[async_trait]
impl ImportRepository for PgImportRepository {
    async fn create(&self, user_id: Uuid, req: &CreateImportRequest) -> Result<Uuid> {
        if req.raw_content.trim().is_empty() {
            return Err(Error::Validation("raw_content must not be empty".into()));
        }

        let import_id = new_v7();
        let hash = Self::content_hash(&req.raw_content);

        sqlx::query(
            "INSERT INTO import (id, user_id, import_type, source_type, raw_content, content_hash, status, created_at)
             VALUES ($1, $2, $3, $4::source_type, $5, $6, 'processing'::import_status, $7)",
        )
        .bind(import_id)
        .bind(user_id)
        .bind(&req.import_type)
        .bind(req.source_type.as_str())
        .bind(&req.raw_content)
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(import_id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Import>> {
        let row = sqlx::query(&format!("SELECT {IMPORT_COLUMNS} FROM import WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_import_row))
    }

    async fn complete(&self, id: Uuid, counters: ImportCounters) -> Result<()> {
        // Guarded transition: only a processing import can complete.
        let result = sqlx::query(
            "UPDATE import
             SET status = 'completed'::import_status, total_found = $1, success_count = $2,
                 failed_count = $3, ai_confidence_score = $4, completed_at = $5
             WHERE id = $6 AND status = 'processing'::import_status",
        )
        .bind(counters.total_found)
        .bind(counters.success_count)
        .bind(counters.failed_count)
        .bind(counters.ai_confidence_score)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "import {id} is not in processing state"
            )));
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import
             SET status = 'failed'::import_status, error_message = $1, completed_at = $2
             WHERE id = $3 AND status = 'processing'::import_status",
        )
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "import {id} is not in processing state"
            )));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Import>> {
        let rows = sqlx::query(&format!(
            "SELECT {IMPORT_COLUMNS} FROM import
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_import_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_sha256() {
        let a = PgImportRepository::content_hash("title,start\nA,2024-01-01");
        let b = PgImportRepository::content_hash("title,start\nA,2024-01-01");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_hash_distinguishes_content() {
        let a = PgImportRepository::content_hash("a");
        let b = PgImportRepository::content_hash("b");
        assert_ne!(a, b);
    }
}

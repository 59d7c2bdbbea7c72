//! Parsing rule repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use tempora_core::{
    new_v7, CreateRuleRequest, Error, ParsingRule, Result, RuleAction, RuleRepository, RuleType,
};

/// PostgreSQL implementation of RuleRepository.
pub struct PgRuleRepository {
    pool: Pool<Postgres>,
}

const RULE_COLUMNS: &str = "id, rule_type::text, profession_id, pattern, action, priority_order, \
     is_active, positive_examples, negative_examples, match_count, hit_count, created_at";

/// Decode a stored rule row. The action payload is decoded into its tagged
/// variant here, once, so no caller re-branches on `rule_type`.
fn parse_rule_row(row: sqlx::postgres::PgRow) -> Result<ParsingRule> {
    let id: Uuid = row.get("id");
    let action_json: serde_json::Value = row.get("action");
    let action: RuleAction = serde_json::from_value(action_json)
        .map_err(|e| Error::Serialization(format!("rule {id} has an invalid action: {e}")))?;

    Ok(ParsingRule {
        id,
        rule_type: RuleType::parse(row.get("rule_type")),
        profession_id: row.get("profession_id"),
        pattern: row.get("pattern"),
        action,
        priority_order: row.get("priority_order"),
        is_active: row.get("is_active"),
        positive_examples: row.get("positive_examples"),
        negative_examples: row.get("negative_examples"),
        match_count: row.get("match_count"),
        hit_count: row.get("hit_count"),
        created_at: row.get("created_at"),
    })
}

impl PgRuleRepository {
    /// Create a new PgRuleRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn create(&self, req: &CreateRuleRequest) -> Result<Uuid> {
        if req.pattern.trim().is_empty() {
            return Err(Error::Validation("rule pattern must not be empty".into()));
        }

        let rule_id = new_v7();
        sqlx::query(
            "INSERT INTO parsing_rule (id, rule_type, profession_id, pattern, action,
                                       priority_order, positive_examples, negative_examples, created_at)
             VALUES ($1, $2::rule_type, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(rule_id)
        .bind(req.rule_type.as_str())
        .bind(req.profession_id)
        .bind(&req.pattern)
        .bind(serde_json::to_value(&req.action)?)
        .bind(req.priority_order)
        .bind(&req.positive_examples)
        .bind(&req.negative_examples)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rule_id)
    }

    async fn list_active(&self, profession_id: Option<Uuid>) -> Result<Vec<ParsingRule>> {
        // Ascending priority_order is the evaluation order the rule engine
        // relies on.
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM parsing_rule
             WHERE is_active
               AND (profession_id IS NULL OR profession_id = $1)
             ORDER BY priority_order ASC, created_at ASC"
        ))
        .bind(profession_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        // A rule with an undecodable action is skipped with a warning rather
        // than poisoning the whole scope.
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_rule_row(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!(
                    subsystem = "db",
                    component = "rules",
                    error = %e,
                    "Skipping rule with invalid action payload"
                ),
            }
        }
        Ok(rules)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ParsingRule>> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM parsing_rule WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(parse_rule_row).transpose()
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE parsing_rule SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("rule {id}")));
        }
        Ok(())
    }

    async fn record_evaluations(&self, id: Uuid, evaluated: i64, hits: i64) -> Result<()> {
        sqlx::query(
            "UPDATE parsing_rule
             SET match_count = match_count + $1,
                 hit_count = hit_count + $2
             WHERE id = $3",
        )
        .bind(evaluated)
        .bind(hits)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

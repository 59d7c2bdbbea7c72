//! Import service: parse → normalize → enrich → persist.
//!
//! Row-local problems (malformed records, unparseable dates) are absorbed
//! into per-row outcomes; only a content-level parse failure fails the
//! Import itself. AI availability plays no part here; ingestion never
//! waits on a provider.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tempora_core::{
    CreateImportRequest, EntryRepository, ImportCounters, ImportRepository, NewEntry,
    ProcessingStatus, Result, RuleRepository,
};
use tempora_db::Database;
use tempora_ingest::{normalize_row, parse, ImportTemplate, RuleEngine};

/// Baseline confidence below which an entry is routed to manual review at
/// ingestion time.
const MANUAL_REVIEW_CONFIDENCE: f32 = 0.5;

/// Result of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub import_id: Uuid,
    pub entry_ids: Vec<Uuid>,
    pub counters: ImportCounters,
    /// Row-local warnings accumulated during parsing and normalization.
    pub warnings: Vec<String>,
}

/// The ingestion half of the pipeline.
pub struct ImportService {
    db: Database,
}

impl ImportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ingest one validated import payload for an explicit actor.
    ///
    /// Creates the Import, decodes and normalizes every row, applies the
    /// rule scope selected by the template's profession, stores the
    /// entries, and completes the Import with its counter rollup.
    pub async fn ingest(
        &self,
        actor: Uuid,
        request: &CreateImportRequest,
        template: Option<&ImportTemplate>,
    ) -> Result<ImportOutcome> {
        let import_id = self.db.imports.create(actor, request).await?;

        let parsed = match parse(&request.raw_content, request.source_type, template) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Content-level failure: the import dies, nothing else does.
                self.db.imports.fail(import_id, &e.to_string()).await?;
                return Err(e);
            }
        };

        let rules = self
            .db
            .rules
            .list_active(template.and_then(|t| t.profession_id))
            .await?;
        let engine = RuleEngine::new(rules);

        let mut warnings: Vec<String> = parsed
            .warnings
            .iter()
            .map(|w| match w.row_number {
                Some(line) => format!("row {line}: {}", w.message),
                None => w.message.clone(),
            })
            .collect();

        let mut new_entries = Vec::with_capacity(parsed.rows.len());
        let mut rule_stats: HashMap<Uuid, (i64, i64)> = HashMap::new();
        let mut confidence_sum = 0.0f32;

        for row in &parsed.rows {
            let mut normalized = normalize_row(row, template);
            for evaluation in engine.apply(&mut normalized, &row.raw_text, &row.original_data) {
                let stats = rule_stats.entry(evaluation.rule_id).or_insert((0, 0));
                stats.0 += 1;
                if evaluation.hit {
                    stats.1 += 1;
                }
            }

            for warning in &normalized.warnings {
                warnings.push(format!("row {}: {warning}", row.row_number));
            }

            let manual_review = normalized.confidence < MANUAL_REVIEW_CONFIDENCE;
            confidence_sum += normalized.confidence;
            new_entries.push(NewEntry {
                row_number: row.row_number,
                raw_text: row.raw_text.clone(),
                original_data: serde_json::Value::Object(row.original_data.clone()),
                parsed_title: normalized.parsed_title,
                parsed_description: normalized.parsed_description,
                parsed_location: normalized.parsed_location,
                parsed_start_at: normalized.parsed_start_at,
                parsed_end_at: normalized.parsed_end_at,
                parsed_priority: normalized.parsed_priority,
                detected_keywords: normalized.detected_keywords,
                ai_confidence: normalized.confidence,
                ai_detected_category: normalized.detected_category,
                processing_status: ProcessingStatus::Parsed,
                manual_review_required: manual_review,
                manual_review_notes: manual_review
                    .then(|| "low baseline confidence at ingestion".to_string()),
            });
        }

        // Rows the parser could not decode are still recorded, as failed
        // entries, so the per-row audit trail stays complete.
        for warning in &parsed.warnings {
            if let Some(line) = warning.row_number {
                new_entries.push(NewEntry {
                    row_number: line,
                    raw_text: String::new(),
                    original_data: serde_json::json!({}),
                    parsed_title: None,
                    parsed_description: None,
                    parsed_location: None,
                    parsed_start_at: None,
                    parsed_end_at: None,
                    parsed_priority: tempora_core::defaults::DEFAULT_PRIORITY,
                    detected_keywords: vec![],
                    ai_confidence: tempora_core::defaults::CONFIDENCE_BASE,
                    ai_detected_category: None,
                    processing_status: ProcessingStatus::Failed,
                    manual_review_required: false,
                    manual_review_notes: Some(warning.message.clone()),
                });
            }
        }

        let entry_ids = self
            .db
            .entries
            .insert_batch(import_id, actor, &new_entries)
            .await?;

        for (rule_id, (evaluated, hits)) in rule_stats {
            if let Err(e) = self.db.rules.record_evaluations(rule_id, evaluated, hits).await {
                warn!(
                    subsystem = "pipeline",
                    component = "importer",
                    rule_id = %rule_id,
                    error = %e,
                    "Failed to record rule accuracy stats"
                );
            }
        }

        let success_count = parsed.rows.len() as i32;
        let failed_count = parsed.warnings.len() as i32;
        let counters = ImportCounters {
            total_found: success_count + failed_count,
            success_count,
            failed_count,
            ai_confidence_score: (success_count > 0)
                .then(|| confidence_sum / success_count as f32),
        };
        self.db.imports.complete(import_id, counters).await?;

        info!(
            subsystem = "pipeline",
            component = "importer",
            op = "ingest",
            import_id = %import_id,
            user_id = %actor,
            row_count = counters.total_found,
            entry_count = entry_ids.len(),
            "Import processed"
        );

        Ok(ImportOutcome {
            import_id,
            entry_ids,
            counters,
            warnings,
        })
    }
}

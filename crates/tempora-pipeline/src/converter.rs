//! Entry→event converter: confidence-gated, idempotent promotion.
//!
//! Each entry converts independently; one failure never aborts the batch.
//! Re-running over the same set is idempotent because converted entries no
//! longer satisfy the selection predicate.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use tempora_core::{
    defaults, ConversionStatus, EntryRepository, Error, EventRepository, ImportEntry,
    ProcessingStatus, Result,
};
use tempora_db::Database;

/// Itemized result of one conversion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub manual_review: usize,
    /// (entry id, created event id) pairs.
    pub converted: Vec<(Uuid, Uuid)>,
    /// (entry id, reason) pairs for entries that failed.
    pub failures: Vec<(Uuid, String)>,
}

/// The promotion half of the pipeline.
pub struct ConversionService {
    db: Database,
    threshold: f32,
}

impl ConversionService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            threshold: defaults::CONVERSION_CONFIDENCE_THRESHOLD,
        }
    }

    /// Override the confidence threshold gating automatic conversion.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Convert every currently convertible entry of a user (optionally
    /// restricted to one import).
    pub async fn convert_pending(
        &self,
        actor: Uuid,
        import_id: Option<Uuid>,
    ) -> Result<ConversionReport> {
        let entries = self
            .db
            .entries
            .list_convertible(actor, import_id, self.threshold)
            .await?;

        let mut report = ConversionReport {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            self.convert_one(&entry, &mut report).await;
        }

        info!(
            subsystem = "pipeline",
            component = "converter",
            op = "convert_pending",
            user_id = %actor,
            entry_count = report.total,
            success = report.success,
            failed = report.failed,
            "Conversion run finished"
        );
        Ok(report)
    }

    /// Convert an explicit list of entries, reporting per-entry outcomes.
    /// Entries that are not convertible (wrong status, low confidence,
    /// flagged for manual review, or foreign ownership) are itemized, never
    /// silently dropped.
    pub async fn convert_entries(&self, actor: Uuid, entry_ids: &[Uuid]) -> Result<ConversionReport> {
        let mut report = ConversionReport {
            total: entry_ids.len(),
            ..Default::default()
        };

        for &entry_id in entry_ids {
            let entry = match self.db.entries.get(entry_id).await {
                Ok(Some(entry)) if entry.user_id == actor => entry,
                Ok(Some(_)) => {
                    report.failed += 1;
                    report.failures.push((
                        entry_id,
                        "entry does not belong to the requesting user".to_string(),
                    ));
                    continue;
                }
                Ok(None) => {
                    report.failed += 1;
                    report.failures.push((entry_id, "entry not found".to_string()));
                    continue;
                }
                Err(e) => {
                    report.failed += 1;
                    report.failures.push((entry_id, e.to_string()));
                    continue;
                }
            };

            if entry.manual_review_required
                || entry.conversion_status == ConversionStatus::ManualReview
            {
                report.manual_review += 1;
                continue;
            }
            if let Err(reason) = Self::check_selectable(&entry, self.threshold) {
                report.failed += 1;
                report.failures.push((entry_id, reason));
                continue;
            }

            self.convert_one(&entry, &mut report).await;
        }

        Ok(report)
    }

    /// The selection predicate for an explicitly named entry, as a reason
    /// string on rejection.
    fn check_selectable(entry: &ImportEntry, threshold: f32) -> std::result::Result<(), String> {
        if entry.processing_status != ProcessingStatus::Parsed {
            return Err(format!(
                "processing status is {}, not parsed",
                entry.processing_status.as_str()
            ));
        }
        if !matches!(
            entry.conversion_status,
            ConversionStatus::Pending | ConversionStatus::Failed
        ) {
            return Err(format!(
                "conversion status is {}",
                entry.conversion_status.as_str()
            ));
        }
        if entry.ai_confidence < threshold {
            return Err(format!(
                "confidence {:.2} is below the {threshold:.2} threshold",
                entry.ai_confidence
            ));
        }
        Ok(())
    }

    /// Hard precondition for one entry: a parsed title and start datetime.
    fn check_preconditions(entry: &ImportEntry) -> std::result::Result<(), String> {
        if entry.parsed_title.is_none() {
            return Err("no parsed title".to_string());
        }
        if entry.parsed_start_at.is_none() {
            return Err("no parsed start datetime".to_string());
        }
        Ok(())
    }

    async fn convert_one(&self, entry: &ImportEntry, report: &mut ConversionReport) {
        if let Err(reason) = Self::check_preconditions(entry) {
            // Recorded as failed, never silently skipped.
            report.failed += 1;
            report.failures.push((entry.id, reason.clone()));
            if let Err(e) = self.db.entries.mark_conversion_failed(entry.id, &reason).await {
                report
                    .failures
                    .push((entry.id, format!("failed to record failure: {e}")));
            }
            return;
        }

        match self.db.events.create_from_entry(entry).await {
            Ok(event_id) => {
                report.success += 1;
                report.converted.push((entry.id, event_id));
            }
            Err(Error::Conflict(reason)) => {
                // Lost a race with a concurrent conversion of the same
                // entry; the entry is already settled, count it as failed
                // here without overwriting its state.
                report.failed += 1;
                report.failures.push((entry.id, reason));
            }
            Err(e) => {
                let reason = e.to_string();
                report.failed += 1;
                report.failures.push((entry.id, reason.clone()));
                let _ = self.db.entries.mark_conversion_failed(entry.id, &reason).await;
            }
        }
    }
}

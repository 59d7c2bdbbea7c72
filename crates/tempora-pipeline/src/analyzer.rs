//! Batch analysis service: claim → optimize → complete/fail.
//!
//! The provider call is made while holding only the claims on the tasks
//! being analyzed, and those claims are released exactly once on every exit
//! path: success, provider error, or deadline expiry. A failed call marks
//! the owning analysis `failed` and touches nothing else; ingestion state
//! is never affected by AI availability.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use tempora_ai::{
    call_cost, schedule_confidence, OptimizeRequest, SchedulePreferences, SchedulingBackend,
    TaskInput,
};
use tempora_core::{
    defaults, AnalysisCompletion, AnalysisRepository, AnalysisResult, BatchClaimOutcome,
    ClaimRepository, EntryRepository, Error, EventRepository, NewSlot, Result, TaskRef,
    TaskSource,
};
use tempora_db::Database;

/// Itemized result of one batch analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchAnalysisReport {
    /// The owning analysis, when one was created (at least one task claimed).
    pub analysis_id: Option<Uuid>,
    /// Per-item claim outcomes: claimed / already locked / rejected.
    pub claim: BatchClaimOutcome,
    /// Tasks whose analysis completed.
    pub completed: Vec<TaskRef>,
    /// Tasks whose analysis failed, with reasons.
    pub failed: Vec<(TaskRef, String)>,
    /// Slots created by a successful run.
    pub slot_ids: Vec<Uuid>,
    /// Provider error when the run as a whole failed.
    pub error: Option<String>,
}

/// The analysis half of the pipeline.
pub struct AnalysisService {
    db: Database,
    backend: Arc<dyn SchedulingBackend>,
    deadline: Duration,
}

impl AnalysisService {
    pub fn new(db: Database, backend: Arc<dyn SchedulingBackend>) -> Self {
        Self {
            db,
            backend,
            deadline: Duration::from_secs(defaults::OPTIMIZE_TIMEOUT_SECS),
        }
    }

    /// Bound the provider call with a custom deadline (30–120 s by call
    /// site).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Claim the batch, run one optimization over the claimed tasks, and
    /// finalize every claim.
    pub async fn analyze_batch(
        &self,
        actor: Uuid,
        tasks: &[TaskRef],
        target_date: NaiveDate,
        preferences: SchedulePreferences,
    ) -> Result<BatchAnalysisReport> {
        if tasks.is_empty() {
            return Err(Error::Validation("no tasks to analyze".into()));
        }
        if tasks.len() > defaults::ANALYSIS_BATCH_MAX {
            return Err(Error::Validation(format!(
                "batch exceeds {} tasks",
                defaults::ANALYSIS_BATCH_MAX
            )));
        }

        let batch_id = tempora_core::new_v7();
        let claim = self.db.claims.claim_batch(tasks, batch_id).await?;
        let mut report = BatchAnalysisReport {
            claim,
            ..Default::default()
        };
        if report.claim.claimed.is_empty() {
            return Ok(report);
        }

        // Snapshot the claimed tasks. A task that vanished between claim and
        // fetch fails its claim and drops out; the batch continues.
        let claimed = report.claim.claimed.clone();
        let mut inputs: Vec<(TaskRef, TaskInput)> = Vec::with_capacity(claimed.len());
        for &task in &claimed {
            match self.load_input(task, actor).await {
                Ok(input) => inputs.push((task, input)),
                Err(e) => {
                    let reason = e.to_string();
                    self.release_failed(task, &reason).await;
                    report.failed.push((task, reason));
                }
            }
        }
        if inputs.is_empty() {
            return Ok(report);
        }

        let task_inputs: Vec<TaskInput> = inputs.iter().map(|(_, i)| i.clone()).collect();
        let snapshot = serde_json::to_value(&task_inputs)?;
        let analysis_id = self.db.analyses.create(actor, target_date, snapshot).await?;
        report.analysis_id = Some(analysis_id);

        let request = OptimizeRequest {
            target_date,
            tasks: task_inputs,
            preferences,
        };

        let outcome = match tokio::time::timeout(
            self.deadline,
            self.backend.optimize_schedule(&request),
        )
        .await
        {
            Err(_) => Err(Error::ExternalService(format!(
                "optimization exceeded the {}s deadline",
                self.deadline.as_secs()
            ))),
            Ok(result) => result,
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                // Provider failure or deadline expiry: the analysis dies and
                // every claim is released. Nothing upstream is touched.
                let reason = e.to_string();
                if let Err(db_err) = self.db.analyses.fail(analysis_id, &reason).await {
                    error!(
                        subsystem = "pipeline",
                        component = "analyzer",
                        analysis_id = %analysis_id,
                        error = %db_err,
                        "Failed to mark analysis failed"
                    );
                }
                futures::future::join_all(
                    inputs.iter().map(|(task, _)| self.release_failed(*task, &reason)),
                )
                .await;
                for (task, _) in inputs {
                    report.failed.push((task, reason.clone()));
                }
                report.error = Some(reason);
                return Ok(report);
            }
        };

        // Validate slot times up front; a malformed slot means the reply did
        // not honor the schema and the whole call is treated as failed.
        let event_task_ids: Vec<Uuid> = inputs
            .iter()
            .filter(|(task, _)| task.source == TaskSource::Event)
            .map(|(task, _)| task.id)
            .collect();
        let mut slots = Vec::with_capacity(outcome.schedule.schedule_slots.len());
        let mut slot_error = None;
        for planned in &outcome.schedule.schedule_slots {
            match (
                planned.start_datetime(outcome.schedule.date),
                planned.end_datetime(outcome.schedule.date),
            ) {
                (Ok(start_at), Ok(end_at)) => slots.push(NewSlot {
                    slot_date: outcome.schedule.date,
                    start_at,
                    end_at,
                    duration_minutes: planned.duration_minutes,
                    title: planned.title.clone(),
                    priority: planned.priority,
                    location: planned.location.clone(),
                    category: planned.category.clone(),
                    reasoning: planned.reasoning.clone(),
                    energy_level: planned.energy_level.clone(),
                    reminder_minutes_before: planned.reminder_minutes_before,
                    // slots placed for an event-backed task keep the link
                    event_id: planned.task_id.filter(|id| event_task_ids.contains(id)),
                }),
                (Err(e), _) | (_, Err(e)) => {
                    slot_error = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = slot_error {
            let reason = e.to_string();
            self.db.analyses.fail(analysis_id, &reason).await?;
            futures::future::join_all(
                inputs.iter().map(|(task, _)| self.release_failed(*task, &reason)),
            )
            .await;
            for (task, _) in inputs {
                report.failed.push((task, reason.clone()));
            }
            report.error = Some(reason);
            return Ok(report);
        }

        let confidence = schedule_confidence(&outcome.schedule, &request);
        let completion = AnalysisCompletion {
            optimized_schedule: serde_json::to_value(&outcome.schedule)?,
            optimization_summary: outcome.schedule.optimization_summary.clone(),
            confidence_score: confidence,
            prompt_tokens: outcome.prompt_tokens,
            completion_tokens: outcome.completion_tokens,
            cost_usd: call_cost(outcome.prompt_tokens, outcome.completion_tokens),
            model: outcome.model.clone(),
            slots,
        };
        report.slot_ids = self.db.analyses.complete(analysis_id, &completion).await?;

        // Finalize each claim with its per-task result.
        for (task, _) in &inputs {
            let slot = outcome
                .schedule
                .schedule_slots
                .iter()
                .find(|s| s.task_id == Some(task.id));
            let result = AnalysisResult {
                category: slot.and_then(|s| s.category.clone()),
                importance: slot.map(|s| s.priority.as_str().to_string()),
                confidence: Some(confidence),
            };
            match self.db.claims.complete(*task, &result).await {
                Ok(()) => report.completed.push(*task),
                Err(e) => {
                    warn!(
                        subsystem = "pipeline",
                        component = "analyzer",
                        batch_id = %batch_id,
                        task_id = %task.id,
                        error = %e,
                        "Failed to finalize a completed claim"
                    );
                    report.failed.push((*task, e.to_string()));
                }
            }
        }

        // Some claims could not be finalized: the schedule landed, but the
        // run is only partially applied.
        if !report.failed.is_empty() {
            self.db.analyses.mark_partial(analysis_id).await?;
        }

        info!(
            subsystem = "pipeline",
            component = "analyzer",
            op = "analyze_batch",
            analysis_id = %analysis_id,
            batch_id = %batch_id,
            user_id = %actor,
            slot_count = report.slot_ids.len(),
            completed = report.completed.len(),
            failed = report.failed.len(),
            "Batch analysis finished"
        );
        Ok(report)
    }

    async fn load_input(&self, task: TaskRef, actor: Uuid) -> Result<TaskInput> {
        match task.source {
            TaskSource::Entry => {
                let entry = self
                    .db
                    .entries
                    .get(task.id)
                    .await?
                    .ok_or(Error::EntryNotFound(task.id))?;
                if entry.user_id != actor {
                    return Err(Error::Validation(format!(
                        "entry {} does not belong to the requesting user",
                        task.id
                    )));
                }
                Ok(TaskInput::from_entry(&entry))
            }
            TaskSource::Event => {
                let event = self
                    .db
                    .events
                    .get(task.id)
                    .await?
                    .ok_or(Error::EventNotFound(task.id))?;
                if event.user_id != actor {
                    return Err(Error::Validation(format!(
                        "event {} does not belong to the requesting user",
                        task.id
                    )));
                }
                Ok(TaskInput::from_event(&event))
            }
        }
    }

    /// Release a claim into `failed`; never propagates, so release runs for
    /// every task even when one release itself errors.
    async fn release_failed(&self, task: TaskRef, reason: &str) {
        if let Err(e) = self.db.claims.fail(task, reason).await {
            error!(
                subsystem = "pipeline",
                component = "analyzer",
                task_id = %task.id,
                error = %e,
                "Failed to release a claim; task may need an administrative reset"
            );
        }
    }
}

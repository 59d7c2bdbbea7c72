//! Repository traits for tempora abstractions.
//!
//! These traits define the persistence interfaces the pipeline services
//! depend on, enabling pluggable stores and testability. Every write path
//! takes an explicit actor (`user_id`); no repository creates a user as a
//! side effect.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// IMPORT REPOSITORY
// =============================================================================

/// Request for creating a new import from validated upload data.
#[derive(Debug, Clone)]
pub struct CreateImportRequest {
    pub import_type: String,
    pub source_type: SourceType,
    pub raw_content: String,
    pub template_id: Option<Uuid>,
}

/// Counter rollup written when an import finishes processing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportCounters {
    pub total_found: i32,
    pub success_count: i32,
    pub failed_count: i32,
    /// Mean baseline confidence across successfully parsed entries.
    pub ai_confidence_score: Option<f32>,
}

/// Repository for import lifecycle operations.
#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// Create an import in `processing` state. `raw_content` is immutable
    /// once stored; its sha-256 hash is persisted beside it.
    async fn create(&self, user_id: Uuid, req: &CreateImportRequest) -> Result<Uuid>;

    /// Fetch an import by id.
    async fn get(&self, id: Uuid) -> Result<Option<Import>>;

    /// Transition `processing → completed` and write the counter rollup.
    async fn complete(&self, id: Uuid, counters: ImportCounters) -> Result<()>;

    /// Transition `processing → failed` with an error message.
    async fn fail(&self, id: Uuid, error: &str) -> Result<()>;

    /// List imports for a user, newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Import>>;
}

// =============================================================================
// ENTRY REPOSITORY
// =============================================================================

/// A normalized, rule-enriched entry ready for insertion.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub row_number: i32,
    pub raw_text: String,
    pub original_data: JsonValue,
    pub parsed_title: Option<String>,
    pub parsed_description: Option<String>,
    pub parsed_location: Option<String>,
    pub parsed_start_at: Option<DateTime<Utc>>,
    pub parsed_end_at: Option<DateTime<Utc>>,
    pub parsed_priority: i16,
    pub detected_keywords: Vec<String>,
    pub ai_confidence: f32,
    pub ai_detected_category: Option<String>,
    pub processing_status: ProcessingStatus,
    pub manual_review_required: bool,
    pub manual_review_notes: Option<String>,
}

/// Repository for import entry operations.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Insert a batch of entries for one import in a single transaction.
    async fn insert_batch(
        &self,
        import_id: Uuid,
        user_id: Uuid,
        entries: &[NewEntry],
    ) -> Result<Vec<Uuid>>;

    /// Fetch an entry by id.
    async fn get(&self, id: Uuid) -> Result<Option<ImportEntry>>;

    /// List all entries of an import, ordered by row number.
    async fn list_for_import(&self, import_id: Uuid) -> Result<Vec<ImportEntry>>;

    /// Entries satisfying the conversion selection predicate:
    /// `processing_status = parsed AND conversion_status IN (pending, failed)
    /// AND ai_confidence >= threshold AND NOT manual_review_required`.
    async fn list_convertible(
        &self,
        user_id: Uuid,
        import_id: Option<Uuid>,
        threshold: f32,
    ) -> Result<Vec<ImportEntry>>;

    /// Record a conversion failure for one entry; the batch continues.
    async fn mark_conversion_failed(&self, id: Uuid, note: &str) -> Result<()>;

    /// Route an entry to manual review with a note.
    async fn mark_manual_review(&self, id: Uuid, note: &str) -> Result<()>;
}

// =============================================================================
// EVENT REPOSITORY
// =============================================================================

/// Request for creating a canonical event directly (manual task creation).
#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub priority: i16,
    pub metadata: Option<JsonValue>,
}

/// Repository for canonical events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Create an event for an explicit actor.
    async fn create(&self, user_id: Uuid, req: &CreateEventRequest) -> Result<Uuid>;

    /// Promote an entry into an event. The event insert and the entry's
    /// `converted/success/converted_event_id` update happen in one
    /// transaction so the conversion invariant cannot be observed half-done.
    async fn create_from_entry(&self, entry: &ImportEntry) -> Result<Uuid>;

    /// Fetch an event by id.
    async fn get(&self, id: Uuid) -> Result<Option<Event>>;

    /// List events for a user within a date window.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    /// Update event progress.
    async fn update_status(&self, id: Uuid, status: EventStatus, completion_percent: i16)
        -> Result<()>;
}

// =============================================================================
// CLAIM REPOSITORY
// =============================================================================

/// Why a batch claim rejected one task (conflicts are reported separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRejectReason {
    /// No such task.
    NotFound,
    /// Task exists but its analysis status is not claimable.
    NotEligible,
}

/// One rejected item of a batch claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClaimRejection {
    pub task: TaskRef,
    pub reason: ClaimRejectReason,
}

/// Itemized result of a batch claim; partial success is the normal outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchClaimOutcome {
    pub claimed: Vec<TaskRef>,
    pub already_locked: Vec<TaskRef>,
    pub rejected: Vec<ClaimRejection>,
}

/// Per-task result stored when an analysis claim completes.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub category: Option<String>,
    pub importance: Option<String>,
    pub confidence: Option<f32>,
}

/// The claim/lock protocol guarding concurrent AI analysis.
///
/// Guarantees at-most-one in-flight analysis per task: the claim is a single
/// atomic conditional update, never a separate check followed by a set.
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    /// `!locked AND status IN (pending, failed, skipped)`.
    async fn is_available(&self, task: TaskRef) -> Result<bool>;

    /// Atomically claim one task for a batch. Returns `Error::Conflict` when
    /// the task is locked or in progress, `Error::Validation` when its
    /// status is not claimable, and a not-found error when it is missing.
    async fn claim(&self, task: TaskRef, batch_id: Uuid) -> Result<()>;

    /// Claim every claimable task of a batch, reporting per-item outcomes.
    async fn claim_batch(&self, tasks: &[TaskRef], batch_id: Uuid) -> Result<BatchClaimOutcome>;

    /// `in_progress → completed`, unlocked, result fields and `analyzed_at`
    /// stored.
    async fn complete(&self, task: TaskRef, result: &AnalysisResult) -> Result<()>;

    /// `in_progress → failed`, unlocked, reason stored.
    async fn fail(&self, task: TaskRef, reason: &str) -> Result<()>;

    /// Administrative escape hatch: force any state back to `pending`,
    /// unlocked, clearing the batch id.
    async fn reset(&self, task: TaskRef) -> Result<()>;
}

// =============================================================================
// RULE REPOSITORY
// =============================================================================

/// Request for authoring a parsing rule.
#[derive(Debug, Clone)]
pub struct CreateRuleRequest {
    pub rule_type: RuleType,
    pub profession_id: Option<Uuid>,
    pub pattern: String,
    pub action: RuleAction,
    pub priority_order: i32,
    pub positive_examples: Vec<String>,
    pub negative_examples: Vec<String>,
}

/// Repository for parsing rules.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Create an active rule; the action payload is stored in its tagged form.
    async fn create(&self, req: &CreateRuleRequest) -> Result<Uuid>;

    /// Active rules in scope (global plus the given profession), ordered by
    /// `priority_order` ascending, which is the evaluation order.
    async fn list_active(&self, profession_id: Option<Uuid>) -> Result<Vec<ParsingRule>>;

    /// Fetch a rule by id.
    async fn get(&self, id: Uuid) -> Result<Option<ParsingRule>>;

    /// Activate or deactivate a rule.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<()>;

    /// Fold a batch's evaluation/hit counts into a rule's accuracy stats.
    async fn record_evaluations(&self, id: Uuid, evaluated: i64, hits: i64) -> Result<()>;
}

// =============================================================================
// ANALYSIS REPOSITORY
// =============================================================================

/// One slot of a completed optimization, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub slot_date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub title: String,
    pub priority: TaskPriority,
    pub location: Option<String>,
    pub category: Option<String>,
    pub reasoning: Option<String>,
    pub energy_level: Option<String>,
    pub reminder_minutes_before: Option<i32>,
    pub event_id: Option<Uuid>,
}

/// Everything written when an optimization run completes.
#[derive(Debug, Clone)]
pub struct AnalysisCompletion {
    pub optimized_schedule: JsonValue,
    pub optimization_summary: Option<String>,
    pub confidence_score: f32,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub cost_usd: f64,
    pub model: String,
    pub slots: Vec<NewSlot>,
}

/// Repository for optimization runs and their slots.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Create an analysis in `processing` state with its input snapshot.
    async fn create(
        &self,
        user_id: Uuid,
        target_date: NaiveDate,
        input_snapshot: JsonValue,
    ) -> Result<Uuid>;

    /// Store the optimized schedule, metrics, and slots in one transaction;
    /// transitions `processing → completed`. Returns the slot ids.
    async fn complete(&self, id: Uuid, completion: &AnalysisCompletion) -> Result<Vec<Uuid>>;

    /// Transition to `failed` with an error message.
    async fn fail(&self, id: Uuid, error: &str) -> Result<()>;

    /// Mark a run `partial`: the schedule landed but some claimed tasks
    /// could not be finalized.
    async fn mark_partial(&self, id: Uuid) -> Result<()>;

    /// Fetch an analysis by id.
    async fn get(&self, id: Uuid) -> Result<Option<ScheduleAnalysis>>;

    /// All slots of an analysis, ordered by start time.
    async fn slots(&self, analysis_id: Uuid) -> Result<Vec<ScheduleSlot>>;

    /// Scheduled slots carrying a reminder that have not been notified yet.
    async fn pending_reminder_slots(&self, user_id: Uuid) -> Result<Vec<ScheduleSlot>>;

    /// Scheduled slots of one user on one date (daily summary input).
    async fn slots_for_date(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleSlot>>;

    /// Update one slot's lifecycle status.
    async fn update_slot_status(&self, slot_id: Uuid, status: SlotStatus) -> Result<()>;

    /// Flag a slot as having its reminder notification created.
    async fn mark_slot_notified(&self, slot_id: Uuid) -> Result<()>;

    /// Attach user feedback to a completed run.
    async fn record_feedback(&self, id: Uuid, feedback: &str) -> Result<()>;
}

// =============================================================================
// NOTIFICATION REPOSITORY
// =============================================================================

/// A notification ready for idempotent creation.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub source_kind: NotificationSource,
    pub source_id: Uuid,
    pub trigger_date: NaiveDate,
    pub trigger_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub delivery_method: DeliveryMethod,
}

/// Repository for notification records.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Create unless one already exists for the `(source_kind, source_id,
    /// trigger_date)` key. Returns `None` when deduplicated.
    async fn create_if_absent(&self, notification: &NewNotification) -> Result<Option<Uuid>>;

    /// Pending notifications due at or before `now`, oldest trigger first.
    async fn list_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>>;

    /// Mark delivered.
    async fn mark_sent(&self, id: Uuid) -> Result<()>;

    /// Mark delivery failed; only this notification is affected.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()>;

    /// Cancel a pending notification.
    async fn cancel(&self, id: Uuid) -> Result<()>;
}

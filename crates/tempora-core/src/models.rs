//! Core data models for tempora.
//!
//! These types are shared across all tempora crates and represent the
//! domain entities of the import → normalize → enrich → convert → notify
//! pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// STATUS TRACKS
// =============================================================================

/// Lifecycle of an Import. Once created with `processing`, the only legal
/// transitions are to `completed` or `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse from a database string. Unknown values fall back to `Pending`.
    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Source format of an import payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Csv,
    Json,
    Text,
    Manual,
    Excel,
    Ics,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "text",
            Self::Manual => "manual",
            Self::Excel => "excel",
            Self::Ics => "ics",
        }
    }

    /// Parse from a database string. Unknown values fall back to `Text`.
    pub fn parse(s: &str) -> Self {
        match s {
            "csv" => Self::Csv,
            "json" => Self::Json,
            "manual" => Self::Manual,
            "excel" => Self::Excel,
            "ics" => Self::Ics,
            _ => Self::Text,
        }
    }
}

/// Parsing track of an import entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Parsed,
    Converted,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Parsed => "parsed",
            Self::Converted => "converted",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "parsed" => Self::Parsed,
            "converted" => Self::Converted,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Conversion track of an import entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    #[default]
    Pending,
    Success,
    Failed,
    ManualReview,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::ManualReview => "manual_review",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "manual_review" => Self::ManualReview,
            _ => Self::Pending,
        }
    }
}

/// AI analysis track shared by import entries and events.
///
/// `pending → in_progress → {completed, failed}`; `skipped` marks tasks
/// excluded from analysis, and `reset` returns any state to `pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiAnalysisStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl AiAnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            _ => Self::Pending,
        }
    }

    /// Whether a task in this state may be claimed for analysis.
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed | Self::Skipped)
    }
}

/// Lifecycle of an optimization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Partial,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "partial" => Self::Partial,
            _ => Self::Pending,
        }
    }
}

/// Lifecycle of one optimized schedule slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "rescheduled" => Self::Rescheduled,
            _ => Self::Scheduled,
        }
    }
}

/// Lifecycle of a canonical event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Scheduled,
        }
    }
}

// =============================================================================
// TASK PRIORITY
// =============================================================================

/// Normalized task priority used by the optimizer and notification routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Normalize a numeric priority level (1 = most urgent, 5 = least).
    ///
    /// 1→critical, 2→high, 3→medium, 4–5→low; anything else→medium.
    pub fn from_level(level: i16) -> Self {
        match level {
            1 => Self::Critical,
            2 => Self::High,
            3 => Self::Medium,
            4 | 5 => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Normalize a free-form priority string, accepting common synonyms.
    /// Unrecognized values map to `Medium`.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" | "urgent" | "asap" => Self::Critical,
            "high" | "important" => Self::High,
            "medium" | "normal" => Self::Medium,
            "low" | "minor" => Self::Low,
            other => {
                if let Ok(level) = other.parse::<i16>() {
                    Self::from_level(level)
                } else {
                    Self::Medium
                }
            }
        }
    }

    /// Default slot duration in minutes when no other derivation applies.
    pub fn default_duration_minutes(&self) -> i32 {
        match self {
            Self::Critical | Self::High => 60,
            Self::Medium => 45,
            Self::Low => 30,
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ANALYZABLE TASK REFERENCE
// =============================================================================

/// The two sources of one logical analyzable task.
///
/// Import entries and manually created events carry an identical
/// `(ai_analysis_status, ai_analysis_locked)` pair and satisfy the same
/// claim invariants; a `TaskRef` addresses either uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Entry,
    Event,
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "event" => Self::Event,
            _ => Self::Entry,
        }
    }
}

/// Reference to an analyzable task (entry or event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub source: TaskSource,
    pub id: Uuid,
}

impl TaskRef {
    pub fn entry(id: Uuid) -> Self {
        Self {
            source: TaskSource::Entry,
            id,
        }
    }

    pub fn event(id: Uuid) -> Self {
        Self {
            source: TaskSource::Event,
            id,
        }
    }
}

// =============================================================================
// IMPORT
// =============================================================================

/// One ingestion event producing zero or more entries from raw content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub id: Uuid,
    pub user_id: Uuid,
    pub import_type: String,
    pub source_type: SourceType,
    /// Immutable once stored; `content_hash` is its sha-256 digest.
    pub raw_content: String,
    pub content_hash: String,
    pub status: ImportStatus,
    pub total_found: i32,
    pub success_count: i32,
    pub failed_count: i32,
    /// Mean baseline confidence across parsed entries.
    pub ai_confidence_score: Option<f32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One row/record extracted from an import, carrying parsed fields and
/// three independent status tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEntry {
    pub id: Uuid,
    pub import_id: Uuid,
    pub user_id: Uuid,
    /// Physical line/record number in the source content.
    pub row_number: i32,
    pub raw_text: String,
    pub original_data: JsonValue,
    pub parsed_title: Option<String>,
    pub parsed_description: Option<String>,
    pub parsed_location: Option<String>,
    pub parsed_start_at: Option<DateTime<Utc>>,
    pub parsed_end_at: Option<DateTime<Utc>>,
    /// Numeric priority, 1 (most urgent) to 5.
    pub parsed_priority: i16,
    pub detected_keywords: Vec<String>,
    /// Baseline completeness confidence in [0.3, 1.0].
    pub ai_confidence: f32,
    pub ai_detected_category: Option<String>,
    pub ai_detected_importance: Option<String>,
    pub processing_status: ProcessingStatus,
    pub conversion_status: ConversionStatus,
    pub converted_event_id: Option<Uuid>,
    pub manual_review_required: bool,
    pub manual_review_notes: Option<String>,
    pub ai_analysis_status: AiAnalysisStatus,
    pub ai_analysis_locked: bool,
    pub ai_analysis_batch_id: Option<Uuid>,
    pub ai_analysis_error: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// EVENT
// =============================================================================

/// Canonical calendar event: created directly by a user, or promoted from
/// a sufficiently confident import entry by the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: EventStatus,
    pub priority: i16,
    pub completion_percent: i16,
    pub metadata: JsonValue,
    /// Set when this event was promoted from an import entry.
    pub source_entry_id: Option<Uuid>,
    pub ai_analysis_status: AiAnalysisStatus,
    pub ai_analysis_locked: bool,
    pub ai_analysis_batch_id: Option<Uuid>,
    pub ai_analysis_error: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// ANALYSIS & SLOTS
// =============================================================================

/// One optimization run over a set of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAnalysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_date: NaiveDate,
    pub status: AnalysisStatus,
    /// Snapshot of the normalized task list sent to the provider.
    pub input_snapshot: JsonValue,
    pub optimized_schedule: Option<JsonValue>,
    pub optimization_summary: Option<String>,
    pub confidence_score: Option<f32>,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub cost_usd: Option<f64>,
    pub model: Option<String>,
    pub error_message: Option<String>,
    pub user_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One concrete time placement produced by the optimizer for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub user_id: Uuid,
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
    pub status: SlotStatus,
    pub notification_sent: bool,
    /// Set when the slot references a converted event.
    pub event_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// PARSING RULES
// =============================================================================

/// Kind of a parsing rule; governs what text the pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    KeywordDetection,
    PatternMatching,
    PriorityCalculation,
    CategoryAssignment,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordDetection => "keyword_detection",
            Self::PatternMatching => "pattern_matching",
            Self::PriorityCalculation => "priority_calculation",
            Self::CategoryAssignment => "category_assignment",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "keyword_detection" => Self::KeywordDetection,
            "priority_calculation" => Self::PriorityCalculation,
            "category_assignment" => Self::CategoryAssignment,
            _ => Self::PatternMatching,
        }
    }
}

/// Effect of a matching rule, decoded once at rule load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Union these keywords into the entry's detected keywords.
    Keywords { keywords: Vec<String> },
    /// Overwrite the entry's parsed priority (1..5).
    Priority { level: i16 },
    /// Overwrite the entry's detected category.
    Category { name: String },
}

/// One profession-scoped pattern rule.
///
/// Rules are evaluated in ascending `priority_order`; a later match
/// overwrites conflicting fields set by an earlier one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingRule {
    pub id: Uuid,
    pub rule_type: RuleType,
    /// None = global scope.
    pub profession_id: Option<Uuid>,
    pub pattern: String,
    pub action: RuleAction,
    pub priority_order: i32,
    pub is_active: bool,
    pub positive_examples: Vec<String>,
    pub negative_examples: Vec<String>,
    /// Times this rule was evaluated against an entry.
    pub match_count: i64,
    /// Times the pattern actually matched.
    pub hit_count: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// What a notification was derived from; part of its dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSource {
    Slot,
    Event,
    DailySummary,
}

impl NotificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slot => "slot",
            Self::Event => "event",
            Self::DailySummary => "daily_summary",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "event" => Self::Event,
            "daily_summary" => Self::DailySummary,
            _ => Self::Slot,
        }
    }
}

/// How a notification is to be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Push,
    Email,
    InApp,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Email => "email",
            Self::InApp => "in_app",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "push" => Self::Push,
            "email" => Self::Email,
            _ => Self::InApp,
        }
    }

    /// Fixed routing: critical→push, high→email, everything else→in-app.
    pub fn for_priority(priority: TaskPriority) -> Self {
        match priority {
            TaskPriority::Critical => Self::Push,
            TaskPriority::High => Self::Email,
            TaskPriority::Medium | TaskPriority::Low => Self::InApp,
        }
    }
}

/// Delivery state of a notification. Immutable after send except status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

/// A reminder or summary record consumed by delivery-channel collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_kind: NotificationSource,
    /// Owning slot/event id, or the user id for daily summaries.
    pub source_id: Uuid,
    /// Date component of the dedup key (slot date, or summary date).
    pub trigger_date: NaiveDate,
    pub trigger_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub delivery_method: DeliveryMethod,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_from_level_mapping() {
        assert_eq!(TaskPriority::from_level(1), TaskPriority::Critical);
        assert_eq!(TaskPriority::from_level(2), TaskPriority::High);
        assert_eq!(TaskPriority::from_level(3), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_level(4), TaskPriority::Low);
        assert_eq!(TaskPriority::from_level(5), TaskPriority::Low);
        // out of range values normalize to medium
        assert_eq!(TaskPriority::from_level(0), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_level(9), TaskPriority::Medium);
    }

    #[test]
    fn priority_from_str_synonyms() {
        assert_eq!(TaskPriority::from_str_loose("urgent"), TaskPriority::Critical);
        assert_eq!(TaskPriority::from_str_loose("ASAP"), TaskPriority::Critical);
        assert_eq!(TaskPriority::from_str_loose("important"), TaskPriority::High);
        assert_eq!(TaskPriority::from_str_loose("normal"), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_str_loose("minor"), TaskPriority::Low);
        assert_eq!(TaskPriority::from_str_loose("2"), TaskPriority::High);
        assert_eq!(TaskPriority::from_str_loose("whatever"), TaskPriority::Medium);
    }

    #[test]
    fn priority_default_durations() {
        assert_eq!(TaskPriority::Critical.default_duration_minutes(), 60);
        assert_eq!(TaskPriority::High.default_duration_minutes(), 60);
        assert_eq!(TaskPriority::Medium.default_duration_minutes(), 45);
        assert_eq!(TaskPriority::Low.default_duration_minutes(), 30);
    }

    #[test]
    fn delivery_routing_is_fixed_by_priority() {
        assert_eq!(
            DeliveryMethod::for_priority(TaskPriority::Critical),
            DeliveryMethod::Push
        );
        assert_eq!(
            DeliveryMethod::for_priority(TaskPriority::High),
            DeliveryMethod::Email
        );
        assert_eq!(
            DeliveryMethod::for_priority(TaskPriority::Medium),
            DeliveryMethod::InApp
        );
        assert_eq!(
            DeliveryMethod::for_priority(TaskPriority::Low),
            DeliveryMethod::InApp
        );
    }

    #[test]
    fn ai_analysis_claimable_states() {
        assert!(AiAnalysisStatus::Pending.is_claimable());
        assert!(AiAnalysisStatus::Failed.is_claimable());
        assert!(AiAnalysisStatus::Skipped.is_claimable());
        assert!(!AiAnalysisStatus::InProgress.is_claimable());
        assert!(!AiAnalysisStatus::Completed.is_claimable());
    }

    #[test]
    fn status_round_trips() {
        for s in [
            ImportStatus::Pending,
            ImportStatus::Processing,
            ImportStatus::Completed,
            ImportStatus::Failed,
        ] {
            assert_eq!(ImportStatus::parse(s.as_str()), s);
        }
        for s in [
            ProcessingStatus::Pending,
            ProcessingStatus::Parsed,
            ProcessingStatus::Converted,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(ProcessingStatus::parse(s.as_str()), s);
        }
        for s in [
            ConversionStatus::Pending,
            ConversionStatus::Success,
            ConversionStatus::Failed,
            ConversionStatus::ManualReview,
        ] {
            assert_eq!(ConversionStatus::parse(s.as_str()), s);
        }
        for s in [
            AiAnalysisStatus::Pending,
            AiAnalysisStatus::InProgress,
            AiAnalysisStatus::Completed,
            AiAnalysisStatus::Failed,
            AiAnalysisStatus::Skipped,
        ] {
            assert_eq!(AiAnalysisStatus::parse(s.as_str()), s);
        }
        for s in [
            SlotStatus::Scheduled,
            SlotStatus::InProgress,
            SlotStatus::Completed,
            SlotStatus::Cancelled,
            SlotStatus::Rescheduled,
        ] {
            assert_eq!(SlotStatus::parse(s.as_str()), s);
        }
        for s in [
            NotificationStatus::Pending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
            NotificationStatus::Cancelled,
        ] {
            assert_eq!(NotificationStatus::parse(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_strings_fall_back() {
        assert_eq!(ImportStatus::parse("bogus"), ImportStatus::Pending);
        assert_eq!(AiAnalysisStatus::parse(""), AiAnalysisStatus::Pending);
        assert_eq!(SourceType::parse("xml"), SourceType::Text);
    }

    #[test]
    fn rule_action_tagged_encoding() {
        let action = RuleAction::Priority { level: 1 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "priority");
        assert_eq!(json["level"], 1);

        let decoded: RuleAction =
            serde_json::from_value(serde_json::json!({"type": "keywords", "keywords": ["exam"]}))
                .unwrap();
        assert_eq!(
            decoded,
            RuleAction::Keywords {
                keywords: vec!["exam".to_string()]
            }
        );
    }

    #[test]
    fn task_ref_constructors() {
        let id = Uuid::new_v4();
        assert_eq!(TaskRef::entry(id).source, TaskSource::Entry);
        assert_eq!(TaskRef::event(id).source, TaskSource::Event);
        assert_eq!(TaskRef::event(id).id, id);
    }
}

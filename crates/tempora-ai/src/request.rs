//! Optimization request construction: task normalization, prompts, and the
//! structured-output schema.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use tempora_core::{defaults, temporal, Event, ImportEntry, TaskPriority};

/// Name of the function the provider is asked to call.
pub const SCHEDULE_FUNCTION_NAME: &str = "propose_schedule";

/// One normalized task in an optimization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl TaskInput {
    /// Build a task input from an import entry.
    pub fn from_entry(entry: &ImportEntry) -> Self {
        let priority = TaskPriority::from_level(entry.parsed_priority);
        Self {
            id: entry.id,
            title: entry
                .parsed_title
                .clone()
                .unwrap_or_else(|| entry.raw_text.clone()),
            description: entry.parsed_description.clone(),
            duration_minutes: derive_duration(
                None,
                None,
                entry.parsed_start_at,
                entry.parsed_end_at,
                priority,
            ),
            priority,
            preferred_time: entry
                .parsed_start_at
                .map(|dt| dt.format("%H:%M").to_string()),
            deadline: entry.parsed_end_at,
            category: entry.ai_detected_category.clone(),
            location: entry.parsed_location.clone(),
            keywords: entry.detected_keywords.clone(),
        }
    }

    /// Build a task input from a canonical event.
    pub fn from_event(event: &Event) -> Self {
        let priority = TaskPriority::from_level(event.priority);
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            duration_minutes: derive_duration(
                None,
                None,
                Some(event.start_at),
                Some(event.end_at),
                priority,
            ),
            priority,
            preferred_time: Some(event.start_at.format("%H:%M").to_string()),
            deadline: Some(event.end_at),
            category: None,
            location: event.location.clone(),
            keywords: vec![],
        }
    }
}

/// Duration derivation precedence: explicit minutes → parsed duration string
/// → computed from explicit start/end → priority default.
pub fn derive_duration(
    explicit_minutes: Option<i32>,
    duration_text: Option<&str>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    priority: TaskPriority,
) -> i32 {
    if let Some(minutes) = explicit_minutes {
        if minutes > 0 {
            return minutes;
        }
    }
    if let Some(text) = duration_text {
        if let Some(minutes) = temporal::parse_duration_minutes(text) {
            if minutes > 0 {
                return minutes;
            }
        }
    }
    if let (Some(start), Some(end)) = (start, end) {
        let minutes = (end - start).num_minutes();
        if minutes > 0 {
            return minutes as i32;
        }
    }
    priority.default_duration_minutes()
}

/// User scheduling preferences sent alongside the task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePreferences {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub break_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl Default for SchedulePreferences {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_num_seconds_from_midnight_opt(
                defaults::WORK_DAY_START_MINUTES * 60,
                0,
            )
            .expect("default work start is a valid time"),
            work_end: NaiveTime::from_num_seconds_from_midnight_opt(
                defaults::WORK_DAY_END_MINUTES * 60,
                0,
            )
            .expect("default work end is a valid time"),
            break_duration_minutes: defaults::BREAK_DURATION_MINUTES,
            constraints: vec![],
        }
    }
}

impl SchedulePreferences {
    /// Length of the working window in minutes.
    pub fn work_window_minutes(&self) -> i64 {
        (self.work_end - self.work_start).num_minutes()
    }
}

/// One complete optimization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub target_date: NaiveDate,
    pub tasks: Vec<TaskInput>,
    pub preferences: SchedulePreferences,
}

/// System message framing the optimization task.
pub fn system_prompt() -> String {
    "You are a scheduling assistant. Arrange the user's tasks into a realistic, \
     conflict-free day plan inside their working hours. Respect task priorities, \
     preferred times, and deadlines; insert breaks between consecutive slots; \
     place demanding work where energy is typically high. Always respond by \
     calling the provided function with a complete schedule."
        .to_string()
}

/// User message carrying the serialized task list and preferences.
pub fn user_prompt(request: &OptimizeRequest) -> String {
    let tasks = serde_json::to_string_pretty(&request.tasks).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Plan {date} for me.\n\
         Working hours: {start}-{end}, with {break_minutes} minute breaks between slots.\n\
         Constraints: {constraints}\n\
         Tasks:\n{tasks}",
        date = request.target_date,
        start = request.preferences.work_start.format("%H:%M"),
        end = request.preferences.work_end.format("%H:%M"),
        break_minutes = request.preferences.break_duration_minutes,
        constraints = if request.preferences.constraints.is_empty() {
            "none".to_string()
        } else {
            request.preferences.constraints.join("; ")
        },
    )
}

/// The fixed structured-output schema the provider must reply with.
pub fn schedule_function_schema() -> JsonValue {
    json!({
        "name": SCHEDULE_FUNCTION_NAME,
        "description": "Propose an optimized day schedule for the given tasks",
        "parameters": {
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Target date, YYYY-MM-DD"
                },
                "schedule_slots": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "task_id": { "type": "string", "description": "Id of the scheduled task, if any" },
                            "title": { "type": "string" },
                            "start_time": { "type": "string", "description": "HH:MM, 24h" },
                            "end_time": { "type": "string", "description": "HH:MM, 24h" },
                            "duration_minutes": { "type": "integer" },
                            "priority": { "type": "string", "enum": ["critical", "high", "medium", "low"] },
                            "location": { "type": "string" },
                            "category": { "type": "string" },
                            "reasoning": { "type": "string", "description": "Why this placement" },
                            "energy_level": { "type": "string", "enum": ["high", "medium", "low"] },
                            "reminder_minutes_before": { "type": "integer" }
                        },
                        "required": ["title", "start_time", "end_time", "duration_minutes", "priority"]
                    }
                },
                "optimization_summary": { "type": "string" },
                "conflicts": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["date", "schedule_slots"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_minutes_win() {
        assert_eq!(
            derive_duration(Some(25), Some("2h"), None, None, TaskPriority::Low),
            25
        );
    }

    #[test]
    fn duration_string_beats_start_end() {
        let start = Utc::now();
        let end = start + chrono::Duration::minutes(200);
        assert_eq!(
            derive_duration(None, Some("1h30m"), Some(start), Some(end), TaskPriority::Low),
            90
        );
    }

    #[test]
    fn start_end_beats_priority_default() {
        let start = Utc::now();
        let end = start + chrono::Duration::minutes(75);
        assert_eq!(
            derive_duration(None, None, Some(start), Some(end), TaskPriority::Low),
            75
        );
    }

    #[test]
    fn priority_default_is_the_last_resort() {
        assert_eq!(derive_duration(None, None, None, None, TaskPriority::Critical), 60);
        assert_eq!(derive_duration(None, None, None, None, TaskPriority::High), 60);
        assert_eq!(derive_duration(None, None, None, None, TaskPriority::Medium), 45);
        assert_eq!(derive_duration(None, None, None, None, TaskPriority::Low), 30);
    }

    #[test]
    fn invalid_explicit_and_text_fall_through() {
        assert_eq!(
            derive_duration(Some(0), Some("soon"), None, None, TaskPriority::Medium),
            45
        );
    }

    #[test]
    fn negative_start_end_span_falls_through() {
        let start = Utc::now();
        let end = start - chrono::Duration::minutes(30);
        assert_eq!(
            derive_duration(None, None, Some(start), Some(end), TaskPriority::Medium),
            45
        );
    }

    #[test]
    fn default_preferences_window() {
        let prefs = SchedulePreferences::default();
        assert_eq!(prefs.work_window_minutes(), 9 * 60);
    }

    #[test]
    fn function_schema_declares_required_fields() {
        let schema = schedule_function_schema();
        assert_eq!(schema["name"], SCHEDULE_FUNCTION_NAME);
        let required = schema["parameters"]["required"].as_array().unwrap();
        assert!(required.contains(&json!("date")));
        assert!(required.contains(&json!("schedule_slots")));
    }

    #[test]
    fn user_prompt_includes_tasks_and_hours() {
        let request = OptimizeRequest {
            target_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            tasks: vec![TaskInput {
                id: Uuid::new_v4(),
                title: "Write report".into(),
                description: None,
                duration_minutes: 60,
                priority: TaskPriority::High,
                preferred_time: None,
                deadline: None,
                category: None,
                location: None,
                keywords: vec![],
            }],
            preferences: SchedulePreferences::default(),
        };
        let prompt = user_prompt(&request);
        assert!(prompt.contains("2024-06-01"));
        assert!(prompt.contains("Write report"));
        assert!(prompt.contains("08:00-17:00"));
    }
}

//! Typed structured-output schema for provider replies, plus the derived
//! confidence and cost metrics.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tempora_core::{defaults, Error, Result, TaskPriority};

use crate::request::{OptimizeRequest, TaskInput};

/// One slot of the provider's proposed schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedSlot {
    #[serde(default)]
    pub task_id: Option<Uuid>,
    pub title: String,
    /// HH:MM, 24h, on the schedule's date.
    pub start_time: String,
    /// HH:MM, 24h.
    pub end_time: String,
    pub duration_minutes: i32,
    pub priority: TaskPriority,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub energy_level: Option<String>,
    #[serde(default)]
    pub reminder_minutes_before: Option<i32>,
}

impl PlannedSlot {
    /// Anchor this slot's start time on the schedule date (UTC).
    pub fn start_datetime(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        anchor_time(date, &self.start_time)
    }

    /// Anchor this slot's end time on the schedule date (UTC).
    pub fn end_datetime(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        anchor_time(date, &self.end_time)
    }
}

fn anchor_time(date: NaiveDate, time: &str) -> Result<DateTime<Utc>> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| Error::ExternalService(format!("slot carries an invalid time: {time:?}")))?;
    Ok(Utc.from_utc_datetime(&date.and_time(parsed)))
}

/// The provider's complete structured reply.
///
/// Deserialization is the schema validation: a reply that does not decode
/// into this shape is an external-service error, never silently accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedSchedule {
    pub date: NaiveDate,
    pub schedule_slots: Vec<PlannedSlot>,
    #[serde(default)]
    pub optimization_summary: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl OptimizedSchedule {
    /// Decode and validate a function-call `arguments` payload.
    pub fn from_arguments(arguments: &str) -> Result<Self> {
        serde_json::from_str(arguments).map_err(|e| {
            Error::ExternalService(format!("provider reply does not match the schedule schema: {e}"))
        })
    }

    /// Total scheduled minutes across all slots.
    pub fn scheduled_minutes(&self) -> i64 {
        self.schedule_slots
            .iter()
            .map(|s| s.duration_minutes.max(0) as i64)
            .sum()
    }
}

// =============================================================================
// CONFIDENCE & COST
// =============================================================================

/// Analysis confidence:
/// `0.5 + min(0.3·utilization_rate, 0.3) + min(0.2·coverage, 0.2)`, capped
/// at 1.0.
pub fn analysis_confidence(utilization_rate: f32, high_priority_coverage: f32) -> f32 {
    let utilization = (defaults::ANALYSIS_UTILIZATION_WEIGHT * utilization_rate)
        .min(defaults::ANALYSIS_UTILIZATION_WEIGHT);
    let coverage = (defaults::ANALYSIS_COVERAGE_WEIGHT * high_priority_coverage)
        .min(defaults::ANALYSIS_COVERAGE_WEIGHT);
    (defaults::ANALYSIS_CONFIDENCE_BASE + utilization + coverage).min(1.0)
}

/// Derive confidence for a schedule against the request it answers.
///
/// Utilization is scheduled minutes over the working window; coverage is the
/// fraction of critical/high input tasks that landed in a slot.
pub fn schedule_confidence(schedule: &OptimizedSchedule, request: &OptimizeRequest) -> f32 {
    let window = request.preferences.work_window_minutes().max(1) as f32;
    let utilization_rate = schedule.scheduled_minutes() as f32 / window;

    let high_priority: Vec<&TaskInput> = request
        .tasks
        .iter()
        .filter(|t| matches!(t.priority, TaskPriority::Critical | TaskPriority::High))
        .collect();
    let high_priority_coverage = if high_priority.is_empty() {
        1.0
    } else {
        let scheduled_ids: Vec<Uuid> = schedule
            .schedule_slots
            .iter()
            .filter_map(|s| s.task_id)
            .collect();
        let covered = high_priority
            .iter()
            .filter(|t| scheduled_ids.contains(&t.id))
            .count();
        covered as f32 / high_priority.len() as f32
    };

    analysis_confidence(utilization_rate, high_priority_coverage)
}

/// Cost of one provider call in USD:
/// `prompt/1000 · 0.00015 + completion/1000 · 0.0006`, rounded to 4 decimal
/// places, half up.
///
/// Computed in integer hundred-nanodollar units (one prompt token = 15, one
/// completion token = 60) so the rounding mode is exact rather than at the
/// mercy of binary float midpoints.
pub fn call_cost(prompt_tokens: i32, completion_tokens: i32) -> f64 {
    let hundred_nanodollars =
        prompt_tokens.max(0) as i64 * 15 + completion_tokens.max(0) as i64 * 60;
    let ten_thousandths = (hundred_nanodollars + 5_000) / 10_000;
    ten_thousandths as f64 / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(title: &str, duration: i32, priority: TaskPriority, task_id: Option<Uuid>) -> PlannedSlot {
        PlannedSlot {
            task_id,
            title: title.into(),
            start_time: "09:00".into(),
            end_time: "10:00".into(),
            duration_minutes: duration,
            priority,
            location: None,
            category: None,
            reasoning: None,
            energy_level: None,
            reminder_minutes_before: None,
        }
    }

    #[test]
    fn decodes_a_conforming_reply() {
        let arguments = json!({
            "date": "2024-06-01",
            "schedule_slots": [{
                "title": "Deep work",
                "start_time": "09:00",
                "end_time": "10:30",
                "duration_minutes": 90,
                "priority": "high",
                "reminder_minutes_before": 15
            }],
            "optimization_summary": "One focused block",
            "conflicts": []
        })
        .to_string();

        let schedule = OptimizedSchedule::from_arguments(&arguments).unwrap();
        assert_eq!(schedule.schedule_slots.len(), 1);
        assert_eq!(schedule.schedule_slots[0].reminder_minutes_before, Some(15));
        assert_eq!(schedule.scheduled_minutes(), 90);
    }

    #[test]
    fn rejects_schema_mismatch() {
        let err = OptimizedSchedule::from_arguments(r#"{"date": "2024-06-01"}"#).unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));

        let err = OptimizedSchedule::from_arguments("not json at all").unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));
    }

    #[test]
    fn slot_times_anchor_on_the_schedule_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let s = slot("x", 60, TaskPriority::Medium, None);
        assert_eq!(
            s.start_datetime(date).unwrap().to_rfc3339(),
            "2024-06-01T09:00:00+00:00"
        );
        assert_eq!(
            s.end_datetime(date).unwrap().to_rfc3339(),
            "2024-06-01T10:00:00+00:00"
        );
    }

    #[test]
    fn invalid_slot_time_is_an_external_service_error() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut s = slot("x", 60, TaskPriority::Medium, None);
        s.start_time = "quarter past nine".into();
        assert!(matches!(
            s.start_datetime(date),
            Err(Error::ExternalService(_))
        ));
    }

    #[test]
    fn confidence_formula_endpoints() {
        // zero utilization, zero coverage → base
        assert!((analysis_confidence(0.0, 0.0) - 0.5).abs() < 1e-6);
        // full utilization, full coverage → 1.0
        assert!((analysis_confidence(1.0, 1.0) - 1.0).abs() < 1e-6);
        // contributions are capped even when the rates exceed 1
        assert!((analysis_confidence(3.0, 2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_partial_contributions() {
        // 0.5 + 0.3*0.5 + 0.2*0.5 = 0.75
        assert!((analysis_confidence(0.5, 0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn cost_formula_reference_point() {
        // 1000 prompt + 1000 completion ⇒ 0.00015 + 0.0006 = 0.00075 raw,
        // which lands on a 4-decimal midpoint and rounds half-up to 0.0008.
        assert_eq!(call_cost(1000, 1000), 0.0008);
    }

    #[test]
    fn cost_rounding_mode_is_half_up() {
        // 3000 prompt tokens ⇒ 0.00045 raw: half-up gives 0.0005 where
        // half-to-even would give 0.0004.
        assert_eq!(call_cost(3000, 0), 0.0005);
        // 1234 prompt + 5678 completion ⇒ 0.0035919 raw ⇒ 0.0036.
        assert_eq!(call_cost(1234, 5678), 0.0036);
        // 100 prompt tokens ⇒ 0.000015 raw ⇒ rounds to zero.
        assert_eq!(call_cost(100, 0), 0.0);
    }

    #[test]
    fn cost_zero_tokens_is_zero() {
        assert_eq!(call_cost(0, 0), 0.0);
    }

    #[test]
    fn cost_integer_rates_agree_with_published_constants() {
        // 15 and 60 hundred-nanodollars per token are the integer forms of
        // the per-1K pricing constants.
        assert!((15e-8 - defaults::PROMPT_COST_PER_1K_TOKENS / 1000.0).abs() < 1e-18);
        assert!((60e-8 - defaults::COMPLETION_COST_PER_1K_TOKENS / 1000.0).abs() < 1e-18);
    }

    #[test]
    fn schedule_confidence_counts_high_priority_coverage() {
        let critical_id = Uuid::new_v4();
        let request = OptimizeRequest {
            target_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            tasks: vec![
                TaskInput {
                    id: critical_id,
                    title: "Critical".into(),
                    description: None,
                    duration_minutes: 60,
                    priority: TaskPriority::Critical,
                    preferred_time: None,
                    deadline: None,
                    category: None,
                    location: None,
                    keywords: vec![],
                },
                TaskInput {
                    id: Uuid::new_v4(),
                    title: "Unscheduled high".into(),
                    description: None,
                    duration_minutes: 60,
                    priority: TaskPriority::High,
                    preferred_time: None,
                    deadline: None,
                    category: None,
                    location: None,
                    keywords: vec![],
                },
            ],
            preferences: Default::default(),
        };
        let schedule = OptimizedSchedule {
            date: request.target_date,
            schedule_slots: vec![slot("Critical", 270, TaskPriority::Critical, Some(critical_id))],
            optimization_summary: None,
            conflicts: vec![],
        };

        // utilization 270/540 = 0.5, coverage 1/2 = 0.5 → 0.75
        let confidence = schedule_confidence(&schedule, &request);
        assert!((confidence - 0.75).abs() < 1e-5);
    }
}

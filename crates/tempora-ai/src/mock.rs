//! Mock scheduling backend for deterministic testing.
//!
//! Without a fixed schedule, the mock lays the request's tasks out
//! back-to-back from the start of the working window, so pipeline tests get
//! a plausible schedule without a provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use tempora_core::{Error, Result};

use crate::provider::{OptimizeOutcome, SchedulingBackend};
use crate::request::OptimizeRequest;
use crate::schema::{OptimizedSchedule, PlannedSlot};

/// One recorded call, for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub task_count: usize,
    pub target_date: chrono::NaiveDate,
}

#[derive(Debug, Clone)]
struct MockConfig {
    fixed_schedule: Option<OptimizedSchedule>,
    prompt_tokens: i32,
    completion_tokens: i32,
    failure_rate: f64,
    reminder_minutes_before: Option<i32>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fixed_schedule: None,
            prompt_tokens: 500,
            completion_tokens: 250,
            failure_rate: 0.0,
            reminder_minutes_before: Some(15),
        }
    }
}

/// Mock scheduling backend.
#[derive(Clone, Default)]
pub struct MockSchedulingBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockSchedulingBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always return this exact schedule instead of synthesizing one.
    pub fn with_fixed_schedule(mut self, schedule: OptimizedSchedule) -> Self {
        Arc::make_mut(&mut self.config).fixed_schedule = Some(schedule);
        self
    }

    /// Set the token usage reported per call.
    pub fn with_token_usage(mut self, prompt: i32, completion: i32) -> Self {
        let config = Arc::make_mut(&mut self.config);
        config.prompt_tokens = prompt;
        config.completion_tokens = completion;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set the reminder attached to every synthesized slot (None = no
    /// reminders).
    pub fn with_reminder_minutes(mut self, minutes: Option<i32>) -> Self {
        Arc::make_mut(&mut self.config).reminder_minutes_before = minutes;
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of optimize calls made.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        self.config.failure_rate > 0.0
            && rand::thread_rng().gen::<f64>() < self.config.failure_rate
    }

    /// Lay tasks out sequentially from the start of the working window,
    /// separated by the configured break.
    fn synthesize(&self, request: &OptimizeRequest) -> OptimizedSchedule {
        let mut cursor = request.preferences.work_start;
        let break_minutes = request.preferences.break_duration_minutes as i64;

        let slots = request
            .tasks
            .iter()
            .map(|task| {
                let start = cursor;
                let end = start + Duration::minutes(task.duration_minutes as i64);
                cursor = end + Duration::minutes(break_minutes);
                PlannedSlot {
                    task_id: Some(task.id),
                    title: task.title.clone(),
                    start_time: start.format("%H:%M").to_string(),
                    end_time: end.format("%H:%M").to_string(),
                    duration_minutes: task.duration_minutes,
                    priority: task.priority,
                    location: task.location.clone(),
                    category: task.category.clone(),
                    reasoning: Some("sequential placement".to_string()),
                    energy_level: None,
                    reminder_minutes_before: self.config.reminder_minutes_before,
                }
            })
            .collect();

        OptimizedSchedule {
            date: request.target_date,
            schedule_slots: slots,
            optimization_summary: Some(format!("{} tasks placed in order", request.tasks.len())),
            conflicts: vec![],
        }
    }
}

#[async_trait]
impl SchedulingBackend for MockSchedulingBackend {
    async fn optimize_schedule(&self, request: &OptimizeRequest) -> Result<OptimizeOutcome> {
        self.call_log.lock().unwrap().push(MockCall {
            task_count: request.tasks.len(),
            target_date: request.target_date,
        });

        if self.should_fail() {
            return Err(Error::ExternalService(
                "simulated provider failure".to_string(),
            ));
        }

        let schedule = self
            .config
            .fixed_schedule
            .clone()
            .unwrap_or_else(|| self.synthesize(request));

        Ok(OptimizeOutcome {
            schedule,
            prompt_tokens: self.config.prompt_tokens,
            completion_tokens: self.config.completion_tokens,
            model: "mock-scheduler".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-scheduler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{SchedulePreferences, TaskInput};
    use chrono::NaiveDate;
    use tempora_core::TaskPriority;
    use uuid::Uuid;

    fn request(task_count: usize) -> OptimizeRequest {
        OptimizeRequest {
            target_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            tasks: (0..task_count)
                .map(|i| TaskInput {
                    id: Uuid::new_v4(),
                    title: format!("Task {i}"),
                    description: None,
                    duration_minutes: 60,
                    priority: TaskPriority::Medium,
                    preferred_time: None,
                    deadline: None,
                    category: None,
                    location: None,
                    keywords: vec![],
                })
                .collect(),
            preferences: SchedulePreferences::default(),
        }
    }

    #[tokio::test]
    async fn synthesizes_one_slot_per_task() {
        let backend = MockSchedulingBackend::new();
        let outcome = backend.optimize_schedule(&request(3)).await.unwrap();

        assert_eq!(outcome.schedule.schedule_slots.len(), 3);
        assert_eq!(outcome.schedule.schedule_slots[0].start_time, "08:00");
        assert_eq!(outcome.schedule.schedule_slots[0].end_time, "09:00");
        // next slot starts after the 15 minute break
        assert_eq!(outcome.schedule.schedule_slots[1].start_time, "09:15");
    }

    #[tokio::test]
    async fn is_deterministic() {
        let backend = MockSchedulingBackend::new();
        let req = request(2);
        let a = backend.optimize_schedule(&req).await.unwrap();
        let b = backend.optimize_schedule(&req).await.unwrap();
        assert_eq!(
            a.schedule.schedule_slots[1].start_time,
            b.schedule.schedule_slots[1].start_time
        );
    }

    #[tokio::test]
    async fn records_calls() {
        let backend = MockSchedulingBackend::new();
        backend.optimize_schedule(&request(2)).await.unwrap();
        backend.optimize_schedule(&request(5)).await.unwrap();

        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.calls()[1].task_count, 5);
    }

    #[tokio::test]
    async fn failure_rate_one_always_fails() {
        let backend = MockSchedulingBackend::new().with_failure_rate(1.0);
        let err = backend.optimize_schedule(&request(1)).await.unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));
    }

    #[tokio::test]
    async fn fixed_schedule_wins_over_synthesis() {
        let fixed = OptimizedSchedule {
            date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            schedule_slots: vec![],
            optimization_summary: Some("empty day".into()),
            conflicts: vec![],
        };
        let backend = MockSchedulingBackend::new().with_fixed_schedule(fixed);
        let outcome = backend.optimize_schedule(&request(4)).await.unwrap();
        assert!(outcome.schedule.schedule_slots.is_empty());
    }

    #[tokio::test]
    async fn reports_configured_token_usage() {
        let backend = MockSchedulingBackend::new().with_token_usage(1000, 1000);
        let outcome = backend.optimize_schedule(&request(1)).await.unwrap();
        assert_eq!(outcome.prompt_tokens, 1000);
        assert_eq!(outcome.completion_tokens, 1000);
    }
}

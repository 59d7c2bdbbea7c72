//! # tempora-ai
//!
//! Schedule optimization backend abstraction for tempora.
//!
//! This crate owns everything between a normalized task list and a stored
//! optimization result:
//! - [`request`]: task normalization, prompts, and the function schema
//! - [`schema`]: the typed structured-output reply, confidence, and cost
//! - [`openai`]: the OpenAI-compatible HTTP backend
//! - [`mock`]: a deterministic backend for tests

pub mod mock;
pub mod openai;
pub mod provider;
pub mod request;
pub mod schema;

pub use mock::MockSchedulingBackend;
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use provider::{OptimizeOutcome, SchedulingBackend};
pub use request::{
    derive_duration, schedule_function_schema, system_prompt, user_prompt, OptimizeRequest,
    SchedulePreferences, TaskInput, SCHEDULE_FUNCTION_NAME,
};
pub use schema::{analysis_confidence, call_cost, schedule_confidence, OptimizedSchedule, PlannedSlot};

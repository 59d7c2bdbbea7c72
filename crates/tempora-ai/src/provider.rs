//! Scheduling backend abstraction.

use async_trait::async_trait;

use tempora_core::Result;

use crate::request::OptimizeRequest;
use crate::schema::OptimizedSchedule;

/// What a backend returns from one optimization call.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub schedule: OptimizedSchedule,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub model: String,
}

/// A pluggable schedule-optimization provider.
///
/// Implementations are synchronous request/response: no retry, no queueing.
/// A failed call surfaces as `Error::ExternalService` and must leave no
/// state behind; claim handling is the caller's responsibility.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    /// Run one optimization over the request's task list.
    async fn optimize_schedule(&self, request: &OptimizeRequest) -> Result<OptimizeOutcome>;

    /// Model identifier used for cost attribution.
    fn model_name(&self) -> &str;
}

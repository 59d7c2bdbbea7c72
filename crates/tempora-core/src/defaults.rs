//! Centralized default constants for the tempora system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. Organized by domain area.

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Global default priority when neither the row nor the template supplies one.
pub const DEFAULT_PRIORITY: i16 = 3;

/// Floor of the baseline confidence score.
pub const CONFIDENCE_BASE: f32 = 0.3;

/// Confidence contribution of a non-null parsed title.
pub const CONFIDENCE_TITLE_WEIGHT: f32 = 0.2;

/// Confidence contribution of a non-null parsed start datetime.
pub const CONFIDENCE_START_WEIGHT: f32 = 0.2;

/// Confidence contribution of a non-null parsed description.
pub const CONFIDENCE_DESCRIPTION_WEIGHT: f32 = 0.15;

/// Confidence contribution of a non-null parsed location.
pub const CONFIDENCE_LOCATION_WEIGHT: f32 = 0.15;

// =============================================================================
// CONVERSION
// =============================================================================

/// Minimum baseline confidence for automatic entry→event conversion.
pub const CONVERSION_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Event duration assumed when an entry has no end datetime.
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;

// =============================================================================
// OPTIMIZATION
// =============================================================================

/// Base of the analysis confidence score.
pub const ANALYSIS_CONFIDENCE_BASE: f32 = 0.5;

/// Cap on the utilization-rate contribution to analysis confidence.
pub const ANALYSIS_UTILIZATION_WEIGHT: f32 = 0.3;

/// Cap on the high-priority-coverage contribution to analysis confidence.
pub const ANALYSIS_COVERAGE_WEIGHT: f32 = 0.2;

/// Cost per 1000 prompt tokens in USD.
pub const PROMPT_COST_PER_1K_TOKENS: f64 = 0.000_15;

/// Cost per 1000 completion tokens in USD.
pub const COMPLETION_COST_PER_1K_TOKENS: f64 = 0.000_6;

/// Default deadline for one optimization call in seconds.
pub const OPTIMIZE_TIMEOUT_SECS: u64 = 120;

/// Shortest deadline any call site uses.
pub const OPTIMIZE_TIMEOUT_SECS_MIN: u64 = 30;

/// Default working day start, minutes from midnight (08:00).
pub const WORK_DAY_START_MINUTES: u32 = 8 * 60;

/// Default working day end, minutes from midnight (17:00).
pub const WORK_DAY_END_MINUTES: u32 = 17 * 60;

/// Default break between scheduled slots in minutes.
pub const BREAK_DURATION_MINUTES: u32 = 15;

/// Maximum tasks accepted by one batch analysis request.
pub const ANALYSIS_BATCH_MAX: usize = 50;

// =============================================================================
// PROVIDER
// =============================================================================

/// Default OpenAI-compatible API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default scheduling model.
pub const SCHEDULING_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature for schedule generation.
pub const SCHEDULING_TEMPERATURE: f32 = 0.2;

/// Default max completion tokens for schedule generation.
pub const SCHEDULING_MAX_TOKENS: u32 = 2000;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Hour (UTC) of the once-daily summary notification trigger.
pub const DAILY_SUMMARY_HOUR: u32 = 20;

/// Notification sweep interval in milliseconds.
pub const NOTIFY_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Maximum due notifications processed per sweep.
pub const NOTIFY_SWEEP_BATCH: i64 = 100;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_weights_reach_exactly_one() {
        let sum = CONFIDENCE_BASE
            + CONFIDENCE_TITLE_WEIGHT
            + CONFIDENCE_START_WEIGHT
            + CONFIDENCE_DESCRIPTION_WEIGHT
            + CONFIDENCE_LOCATION_WEIGHT;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn analysis_confidence_caps_reach_exactly_one() {
        let sum = ANALYSIS_CONFIDENCE_BASE + ANALYSIS_UTILIZATION_WEIGHT + ANALYSIS_COVERAGE_WEIGHT;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn completion_tokens_cost_more_than_prompt_tokens() {
        assert!(COMPLETION_COST_PER_1K_TOKENS > PROMPT_COST_PER_1K_TOKENS);
    }

    #[test]
    fn work_day_is_ordered() {
        const {
            assert!(WORK_DAY_START_MINUTES < WORK_DAY_END_MINUTES);
        }
    }

    #[test]
    fn timeout_bounds_ordered() {
        const {
            assert!(OPTIMIZE_TIMEOUT_SECS_MIN <= OPTIMIZE_TIMEOUT_SECS);
        }
    }
}

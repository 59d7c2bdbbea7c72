//! Structured logging schema and field name constants for tempora.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-row iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "ingest", "db", "ai", "pipeline", "notify"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "parser", "normalizer", "rules", "claims", "optimizer", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "parse", "claim", "convert", "optimize", "sweep"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Acting user UUID.
pub const USER_ID: &str = "user_id";

/// Import UUID being processed.
pub const IMPORT_ID: &str = "import_id";

/// Import entry UUID.
pub const ENTRY_ID: &str = "entry_id";

/// Event UUID.
pub const EVENT_ID: &str = "event_id";

/// Analysis run UUID.
pub const ANALYSIS_ID: &str = "analysis_id";

/// Claim batch UUID.
pub const BATCH_ID: &str = "batch_id";

/// Notification UUID.
pub const NOTIFICATION_ID: &str = "notification_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows parsed from an import payload.
pub const ROW_COUNT: &str = "row_count";

/// Number of entries affected by a batch operation.
pub const ENTRY_COUNT: &str = "entry_count";

/// Number of slots produced by an optimization run.
pub const SLOT_COUNT: &str = "slot_count";

/// Prompt token count of a provider call.
pub const PROMPT_TOKENS: &str = "prompt_tokens";

/// Completion token count of a provider call.
pub const COMPLETION_TOKENS: &str = "completion_tokens";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for optimization.
pub const MODEL: &str = "model";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

//! # tempora-ingest
//!
//! Content parsing, normalization, and rule enrichment for tempora.
//!
//! This crate turns raw import payloads into typed, enriched entry data:
//! - [`parser`] decodes CSV/JSON/text into row-level records
//! - [`template`] applies non-destructive field renaming
//! - [`normalizer`] extracts typed fields and the baseline confidence score
//! - [`rules`] applies ordered, profession-scoped pattern rules

pub mod normalizer;
pub mod parser;
pub mod rules;
pub mod template;

pub use normalizer::{baseline_confidence, normalize_row, NormalizedEntry};
pub use parser::{parse, ParseOutcome, ParseWarning, RawRow};
pub use rules::{validate_rule, RuleEngine, RuleEvaluation, RuleValidation};
pub use template::ImportTemplate;

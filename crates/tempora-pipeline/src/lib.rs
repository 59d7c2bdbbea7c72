//! # tempora-pipeline
//!
//! Services wiring the tempora pipeline together:
//! - [`importer`]: parse, normalize, enrich, persist
//! - [`analyzer`]: claim a batch, optimize, complete or fail each claim
//! - [`converter`]: confidence-gated, idempotent entry-to-event promotion
//! - [`notifier`]: reminder derivation, daily summaries, and the periodic
//!   delivery sweep

pub mod analyzer;
pub mod converter;
pub mod importer;
pub mod notifier;

pub use analyzer::{AnalysisService, BatchAnalysisReport};
pub use converter::{ConversionReport, ConversionService};
pub use importer::{ImportOutcome, ImportService};
pub use notifier::{
    DeliveryChannel, LogDelivery, NotificationScheduler, NotificationWorker, NotifierConfig,
    NotifierHandle, SweepStats,
};

//! Notification scheduler and the periodic delivery sweep.
//!
//! Reminder notifications are derived from optimized slots; creation is
//! idempotent on the slot's dedup key. Delivery routing is a fixed function
//! of priority. The processor is a periodic sweep over due, pending
//! notifications; delivery itself belongs to channel collaborators behind
//! [`DeliveryChannel`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tempora_core::{
    defaults, AnalysisRepository, DeliveryMethod, Error, NewNotification, Notification,
    NotificationRepository, NotificationSource, Result, ScheduleSlot, TaskPriority,
};
use tempora_db::Database;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Derives notification records from slots and daily summaries.
pub struct NotificationScheduler {
    db: Database,
}

impl NotificationScheduler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a reminder for every scheduled slot of a user that carries a
    /// `reminder_minutes_before` and has not been notified yet. Returns the
    /// number of notifications actually created (dedup hits create none but
    /// still settle the slot's flag).
    pub async fn schedule_reminders(&self, user_id: Uuid) -> Result<usize> {
        let slots = self.db.analyses.pending_reminder_slots(user_id).await?;

        let mut created = 0;
        for slot in slots {
            let Some(reminder_minutes) = slot.reminder_minutes_before else {
                continue;
            };
            let notification = reminder_for_slot(&slot, reminder_minutes);
            if self
                .db
                .notifications
                .create_if_absent(&notification)
                .await?
                .is_some()
            {
                created += 1;
            }
            self.db.analyses.mark_slot_notified(slot.id).await?;
        }

        debug!(
            subsystem = "notify",
            component = "scheduler",
            op = "schedule_reminders",
            user_id = %user_id,
            created,
            "Reminder scheduling pass finished"
        );
        Ok(created)
    }

    /// Create the once-daily summary notification for `date`, triggered at
    /// 20:00 the evening before and aggregating that day's scheduled slots.
    /// Returns `None` when the summary already exists.
    pub async fn schedule_daily_summary(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Uuid>> {
        let slots = self.db.analyses.slots_for_date(user_id, date).await?;
        let notification = daily_summary(user_id, date, &slots);
        self.db.notifications.create_if_absent(&notification).await
    }
}

/// Build the reminder record for one slot:
/// `trigger = start − reminder_minutes`, routed by the slot's priority.
fn reminder_for_slot(slot: &ScheduleSlot, reminder_minutes: i32) -> NewNotification {
    NewNotification {
        user_id: slot.user_id,
        source_kind: NotificationSource::Slot,
        source_id: slot.id,
        trigger_date: slot.slot_date,
        trigger_at: slot.start_at - ChronoDuration::minutes(reminder_minutes as i64),
        title: format!("Upcoming: {}", slot.title),
        message: format!(
            "{} starts at {}{}",
            slot.title,
            slot.start_at.format("%H:%M"),
            slot.location
                .as_deref()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default()
        ),
        delivery_method: DeliveryMethod::for_priority(slot.priority),
    }
}

/// Build the daily summary record for one user and date.
fn daily_summary(user_id: Uuid, date: NaiveDate, slots: &[ScheduleSlot]) -> NewNotification {
    let critical = slots
        .iter()
        .filter(|s| s.priority == TaskPriority::Critical)
        .count();
    let high = slots
        .iter()
        .filter(|s| s.priority == TaskPriority::High)
        .count();

    let mut message = format!(
        "{} task(s) scheduled for {date} ({critical} critical, {high} high priority).",
        slots.len()
    );
    for slot in slots.iter().take(5) {
        message.push_str(&format!(
            "\n- {} {}",
            slot.start_at.format("%H:%M"),
            slot.title
        ));
    }

    let evening_before = date.pred_opt().unwrap_or(date);
    let trigger_at = Utc.from_utc_datetime(
        &evening_before
            .and_hms_opt(defaults::DAILY_SUMMARY_HOUR, 0, 0)
            .expect("summary hour is a valid time"),
    );

    NewNotification {
        user_id,
        source_kind: NotificationSource::DailySummary,
        // The user is the source of a summary; the date completes the key.
        source_id: user_id,
        trigger_date: date,
        trigger_at,
        title: format!("Your schedule for {date}"),
        message,
        delivery_method: DeliveryMethod::InApp,
    }
}

// =============================================================================
// DELIVERY
// =============================================================================

/// A delivery-channel collaborator (email/push/SMS/in-app). This core only
/// produces notification records; channels consume them.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Delivery stub that logs and succeeds; the default wiring until a real
/// channel collaborator is attached.
pub struct LogDelivery;

#[async_trait]
impl DeliveryChannel for LogDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            subsystem = "notify",
            component = "delivery",
            notification_id = %notification.id,
            method = notification.delivery_method.as_str(),
            title = %notification.title,
            "Notification delivered (log channel)"
        );
        Ok(())
    }
}

// =============================================================================
// SWEEP WORKER
// =============================================================================

/// Configuration for the notification sweep worker.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Sweep interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum due notifications processed per sweep.
    pub sweep_batch: i64,
    /// Whether to run the sweep at all.
    pub enabled: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::NOTIFY_SWEEP_INTERVAL_MS,
            sweep_batch: defaults::NOTIFY_SWEEP_BATCH,
            enabled: true,
        }
    }
}

impl NotifierConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_ENABLED` | `true` | Enable/disable the sweep |
    /// | `NOTIFY_POLL_INTERVAL_MS` | `60000` | Sweep interval |
    /// | `NOTIFY_SWEEP_BATCH` | `100` | Max notifications per sweep |
    pub fn from_env() -> Self {
        let enabled = std::env::var("NOTIFY_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let poll_interval_ms = std::env::var("NOTIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::NOTIFY_SWEEP_INTERVAL_MS);
        let sweep_batch = std::env::var("NOTIFY_SWEEP_BATCH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::NOTIFY_SWEEP_BATCH);

        Self {
            poll_interval_ms,
            sweep_batch,
            enabled,
        }
    }
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Handle for controlling a running sweep worker.
pub struct NotifierHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl NotifierHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("failed to send shutdown signal".into()))
    }
}

/// Periodic sweep over due, pending notifications.
pub struct NotificationWorker {
    db: Database,
    config: NotifierConfig,
    channel: Arc<dyn DeliveryChannel>,
}

impl NotificationWorker {
    pub fn new(db: Database, config: NotifierConfig, channel: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            db,
            config,
            channel,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> NotifierHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            if !self.config.enabled {
                info!(
                    subsystem = "notify",
                    component = "worker",
                    "Notification sweep disabled by configuration"
                );
                return;
            }
            let interval = std::time::Duration::from_millis(self.config.poll_interval_ms);
            info!(
                subsystem = "notify",
                component = "worker",
                poll_interval_ms = self.config.poll_interval_ms,
                "Notification sweep started"
            );
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(
                            subsystem = "notify",
                            component = "worker",
                            "Notification sweep stopped"
                        );
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = self.sweep_once(Utc::now()).await {
                            warn!(
                                subsystem = "notify",
                                component = "worker",
                                error = %e,
                                "Notification sweep pass failed"
                            );
                        }
                    }
                }
            }
        });

        NotifierHandle { shutdown_tx }
    }

    /// Run one sweep: deliver every due pending notification. A delivery
    /// failure marks only that notification failed; siblings continue.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepStats> {
        let due = self
            .db
            .notifications
            .list_due(now, self.config.sweep_batch)
            .await?;

        let mut stats = SweepStats::default();
        for notification in due {
            match self.channel.deliver(&notification).await {
                Ok(()) => {
                    self.db.notifications.mark_sent(notification.id).await?;
                    stats.delivered += 1;
                }
                Err(e) => {
                    self.db
                        .notifications
                        .mark_failed(notification.id, &e.to_string())
                        .await?;
                    stats.failed += 1;
                }
            }
        }

        if stats.delivered > 0 || stats.failed > 0 {
            info!(
                subsystem = "notify",
                component = "worker",
                op = "sweep",
                delivered = stats.delivered,
                failed = stats.failed,
                "Sweep pass finished"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_core::SlotStatus;

    fn slot(priority: TaskPriority, reminder: Option<i32>) -> ScheduleSlot {
        let start_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        ScheduleSlot {
            id: tempora_core::new_v7(),
            analysis_id: tempora_core::new_v7(),
            user_id: Uuid::new_v4(),
            slot_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_at,
            end_at: start_at + ChronoDuration::minutes(60),
            duration_minutes: 60,
            title: "Deep work".into(),
            priority,
            location: Some("Room 2".into()),
            category: None,
            reasoning: None,
            energy_level: None,
            reminder_minutes_before: reminder,
            status: SlotStatus::Scheduled,
            notification_sent: false,
            event_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reminder_trigger_is_start_minus_reminder_minutes() {
        let s = slot(TaskPriority::Medium, Some(15));
        let n = reminder_for_slot(&s, 15);
        assert_eq!(
            n.trigger_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 45, 0).unwrap()
        );
        assert_eq!(n.source_kind, NotificationSource::Slot);
        assert_eq!(n.source_id, s.id);
    }

    #[test]
    fn reminder_routing_follows_priority() {
        let critical = reminder_for_slot(&slot(TaskPriority::Critical, Some(5)), 5);
        assert_eq!(critical.delivery_method, DeliveryMethod::Push);

        let high = reminder_for_slot(&slot(TaskPriority::High, Some(5)), 5);
        assert_eq!(high.delivery_method, DeliveryMethod::Email);

        let medium = reminder_for_slot(&slot(TaskPriority::Medium, Some(5)), 5);
        assert_eq!(medium.delivery_method, DeliveryMethod::InApp);
    }

    #[test]
    fn reminder_message_includes_time_and_location() {
        let n = reminder_for_slot(&slot(TaskPriority::Low, Some(10)), 10);
        assert!(n.message.contains("09:00"));
        assert!(n.message.contains("Room 2"));
    }

    #[test]
    fn daily_summary_triggers_the_evening_before_at_twenty() {
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let n = daily_summary(user, date, &[]);

        assert_eq!(
            n.trigger_at,
            Utc.with_ymd_and_hms(2024, 5, 31, 20, 0, 0).unwrap()
        );
        assert_eq!(n.source_kind, NotificationSource::DailySummary);
        assert_eq!(n.source_id, user);
        assert_eq!(n.trigger_date, date);
    }

    #[test]
    fn daily_summary_counts_critical_and_high() {
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let slots = vec![
            slot(TaskPriority::Critical, None),
            slot(TaskPriority::High, None),
            slot(TaskPriority::High, None),
            slot(TaskPriority::Low, None),
        ];
        let n = daily_summary(user, date, &slots);

        assert!(n.message.contains("4 task(s)"));
        assert!(n.message.contains("1 critical"));
        assert!(n.message.contains("2 high"));
    }

    #[test]
    fn notifier_config_defaults() {
        let config = NotifierConfig::default();
        assert!(config.enabled);
        assert_eq!(config.poll_interval_ms, defaults::NOTIFY_SWEEP_INTERVAL_MS);
        assert_eq!(config.sweep_batch, defaults::NOTIFY_SWEEP_BATCH);
    }
}

//! Reminders — the service tying sources, preferences, and delivery together.
//!
//! Every operation runs as one load → mutate → save cycle. Cycles are
//! serialized in-process by a mutex and across processes by the blob
//! store's lock, so the interactive commands and the periodic tick never
//! interleave their writes.

mod scheduler;
mod session;
pub mod sinks;


pub use scheduler::{Dispatch, TickReport};
pub use session::{ContactView, Listing, StatusReport};

use scheduler::NotifyPolicy;

use chrono::{DateTime, Utc};
use intouch_core::{
    config::{NotifyConfig, ReminderConfig, MAX_TICK_INTERVAL_HOURS},
    contact::Roster,
    error::IntouchError,
    traits::{AddressBook, BlobGuard, BlobStore, Clock, MessageHistory, NotificationSink},
};
use intouch_memory::{
    audit::{DispatchStatus, NotificationRecord},
    ContactRepository, NotificationLog, PreferenceStore,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// The reminder service.
pub struct Reminders {
    book: Arc<dyn AddressBook>,
    history: Arc<dyn MessageHistory>,
    sink: Arc<dyn NotificationSink>,
    prefs: PreferenceStore,
    repository: ContactRepository,
    clock: Arc<dyn Clock>,
    log: Option<NotificationLog>,
    policy: NotifyPolicy,
    reminder_config: ReminderConfig,
    /// Held for the duration of every cycle in this process.
    cycle_lock: Mutex<()>,
}

/// An open load → mutate → save cycle. Dropping it without [`Reminders::commit`]
/// discards the changes.
struct Cycle<'a> {
    pub roster: Roster,
    pub now: DateTime<Utc>,
    _blob: BlobGuard,
    _local: MutexGuard<'a, ()>,
}

impl Reminders {
    /// Create the service. Fails on configuration the engine cannot run with.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        book: Arc<dyn AddressBook>,
        history: Arc<dyn MessageHistory>,
        sink: Arc<dyn NotificationSink>,
        blob: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        log: Option<NotificationLog>,
        reminder_config: &ReminderConfig,
        notify_config: &NotifyConfig,
    ) -> Result<Self, IntouchError> {
        let hours = reminder_config.tick_interval_hours;
        if hours == 0 || hours > MAX_TICK_INTERVAL_HOURS {
            return Err(IntouchError::Config(format!(
                "tick interval of {hours}h is out of range"
            )));
        }
        Ok(Self {
            book,
            history,
            sink,
            prefs: PreferenceStore::new(blob),
            repository: ContactRepository::new(reminder_config.default_interval_days)?,
            clock,
            log,
            policy: NotifyPolicy::from_config(reminder_config, notify_config)?,
            reminder_config: reminder_config.clone(),
            cycle_lock: Mutex::new(()),
        })
    }

    /// Lock, then build a fresh roster from the sources and saved preferences.
    async fn begin(&self) -> Result<Cycle<'_>, IntouchError> {
        let local = self.cycle_lock.lock().await;
        let blob = self.prefs.lock()?;
        self.load(local, blob).await
    }

    /// Build a roster for reading only. Skips the cross-process lock, so it
    /// must never be committed.
    async fn snapshot(&self) -> Result<Cycle<'_>, IntouchError> {
        let local = self.cycle_lock.lock().await;
        self.load(local, BlobGuard::noop()).await
    }

    async fn load<'a>(
        &'a self,
        local: MutexGuard<'a, ()>,
        blob: BlobGuard,
    ) -> Result<Cycle<'a>, IntouchError> {
        let now = self.clock.now();
        let saved = self.prefs.load()?;
        let roster = self
            .repository
            .load_from(&*self.book, &*self.history, &saved, now)
            .await?;
        Ok(Cycle {
            roster,
            now,
            _blob: blob,
            _local: local,
        })
    }

    /// Persist the cycle's roster and release its locks.
    fn commit(&self, cycle: Cycle<'_>) -> Result<(), IntouchError> {
        self.prefs.save(cycle.roster.contacts())
    }

    /// Run one reminder check: notify due contacts and save the result.
    pub async fn tick(&self) -> Result<TickReport, IntouchError> {
        let mut cycle = self.begin().await?;
        let report =
            scheduler::run_tick(&mut cycle.roster, &*self.sink, &self.policy, cycle.now).await;
        self.record(&report).await;
        self.commit(cycle)?;

        info!(
            "scheduler: tick at {} done, {} notified, summary: {}, {} failed",
            report.at,
            report.notified().len(),
            report.summary_sent(),
            report.failures().count()
        );
        Ok(report)
    }

    /// Append the tick's dispatches to the notification log, if one is configured.
    async fn record(&self, report: &TickReport) {
        let Some(log) = &self.log else {
            return;
        };
        for dispatch in &report.dispatches {
            let entry = NotificationRecord {
                notification_id: dispatch.notification.id,
                contact_name: dispatch.contact.clone(),
                target_uri: dispatch.notification.target_uri.clone(),
                is_summary: dispatch.notification.is_summary,
                status: if dispatch.delivered() {
                    DispatchStatus::Ok
                } else {
                    DispatchStatus::Error
                },
                error: dispatch.error.clone(),
            };
            if let Err(e) = log.log(&entry).await {
                warn!("scheduler: {e}");
            }
        }
    }

    /// Run ticks on the configured cadence until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run ticks until `shutdown` resolves.
    ///
    /// The first tick runs immediately. A tick in progress is never cut short;
    /// a shutdown requested during a tick stops the loop once it finishes.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let hours = self.reminder_config.tick_interval_hours;
        let period = std::time::Duration::from_secs(hours * 3600);
        info!(
            "InTouch running | sink: {} | tick every {hours}h | repeat after {}h",
            self.sink.name(),
            self.policy.repeat_interval.num_hours()
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick().await {
                error!("scheduler: tick failed: {e}");
            }
        }

        Ok(())
    }
}

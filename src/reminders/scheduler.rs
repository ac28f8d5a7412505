//! Notification scheduler — one tick of the periodic reminder check.
//!
//! A contact is notified when it is enabled, due, and its last notification
//! is older than the repeat interval. Two or more notifications in one tick
//! are grouped under a summary. A failed dispatch leaves the contact's
//! last-notified time untouched so the next tick retries it.

use chrono::{DateTime, Duration, Utc};
use intouch_core::{
    config::{NotifyConfig, ReminderConfig},
    contact::{Contact, Roster},
    error::IntouchError,
    reminder,
    traits::{Notification, NotificationSink, SUMMARY_ID},
};
use tracing::{debug, info, warn};

/// What to send and how often.
#[derive(Debug, Clone)]
pub struct NotifyPolicy {
    /// Minimum gap between two notifications for the same contact.
    pub repeat_interval: Duration,
    pub title: String,
    pub body: String,
    pub group_id: String,
}

impl NotifyPolicy {
    pub fn from_config(
        reminder: &ReminderConfig,
        notify: &NotifyConfig,
    ) -> Result<Self, IntouchError> {
        let hours = reminder.repeat_interval_hours;
        let repeat_interval = Duration::try_hours(hours)
            .filter(|d| *d >= Duration::zero())
            .ok_or_else(|| {
                IntouchError::Config(format!("repeat interval of {hours}h is out of range"))
            })?;
        Ok(Self {
            repeat_interval,
            title: notify.title.clone(),
            body: notify.body.clone(),
            group_id: notify.group_id.clone(),
        })
    }

    fn individual(&self, index: usize, contact: &Contact, target: &str) -> Notification {
        Notification {
            id: index as i64,
            title: format!("{} {}", self.title, contact.name),
            body: self.body.clone(),
            target_uri: format!("sms:{target}"),
            group_id: self.group_id.clone(),
            is_summary: false,
        }
    }

    fn summary(&self, names: &[String]) -> Notification {
        Notification {
            id: SUMMARY_ID,
            title: format!("{} people to reach out to", names.len()),
            body: names.join(", "),
            target_uri: String::new(),
            group_id: self.group_id.clone(),
            is_summary: true,
        }
    }
}

/// One dispatch attempt made during a tick.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub notification: Notification,
    /// Contact name, `None` for the summary.
    pub contact: Option<String>,
    /// Delivery error, `None` when delivered.
    pub error: Option<String>,
}

impl Dispatch {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a tick attempted.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub dispatches: Vec<Dispatch>,
}

impl TickReport {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            dispatches: Vec::new(),
        }
    }

    /// Contacts notified successfully.
    pub fn notified(&self) -> Vec<&str> {
        self.dispatches
            .iter()
            .filter(|d| d.delivered() && !d.notification.is_summary)
            .filter_map(|d| d.contact.as_deref())
            .collect()
    }

    pub fn summary_sent(&self) -> bool {
        self.dispatches
            .iter()
            .any(|d| d.delivered() && d.notification.is_summary)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Dispatch> {
        self.dispatches.iter().filter(|d| !d.delivered())
    }

    /// Notifications actually delivered, summary included.
    pub fn delivered_count(&self) -> usize {
        self.dispatches.iter().filter(|d| d.delivered()).count()
    }
}

/// Whether `contact` should be notified at `now`.
pub fn should_notify(contact: &Contact, policy: &NotifyPolicy, now: DateTime<Utc>) -> bool {
    contact.notify_enabled
        && reminder::is_due(contact, now)
        && contact
            .last_notified_at
            .map_or(true, |last| now.signed_duration_since(last) > policy.repeat_interval)
}

/// Evaluate the whole roster once, dispatching and recording notifications.
pub async fn run_tick(
    roster: &mut Roster,
    sink: &dyn NotificationSink,
    policy: &NotifyPolicy,
    now: DateTime<Utc>,
) -> TickReport {
    let mut report = TickReport::new(now);
    let mut notified: Vec<String> = Vec::new();

    for (index, contact) in roster.contacts_mut().iter_mut().enumerate() {
        if !should_notify(contact, policy, now) {
            continue;
        }
        let Some(target) = contact.target() else {
            warn!("scheduler: {} has no number, skipping", contact.name);
            continue;
        };

        let notification = policy.individual(index, contact, target);
        match sink.deliver(&notification).await {
            Ok(()) => {
                contact.mark_notified(now);
                info!("scheduler: notified {} via {}", contact.name, sink.name());
                notified.push(contact.name.clone());
                report.dispatches.push(Dispatch {
                    notification,
                    contact: Some(contact.name.clone()),
                    error: None,
                });
            }
            Err(e) => {
                warn!("scheduler: failed to notify {}: {e}", contact.name);
                report.dispatches.push(Dispatch {
                    notification,
                    contact: Some(contact.name.clone()),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if notified.len() >= 2 {
        let summary = policy.summary(&notified);
        let error = match sink.deliver(&summary).await {
            Ok(()) => None,
            Err(e) => {
                warn!("scheduler: failed to send summary: {e}");
                Some(e.to_string())
            }
        };
        report.dispatches.push(Dispatch {
            notification: summary,
            contact: None,
            error,
        });
    }

    for transition in roster.refresh(now) {
        debug!("scheduler: {transition:?}");
    }
    debug!(
        "scheduler: tick at {now} delivered {} notifications",
        report.delivered_count()
    );
    report
}

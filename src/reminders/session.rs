//! Interactive operations: list, toggle, set interval, status.

use super::Reminders;
use chrono::{DateTime, Utc};
use intouch_core::{
    contact::Contact,
    error::IntouchError,
    reminder::{due_fraction, interval_from_days},
};
use serde::Serialize;
use tracing::info;

/// One roster row as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ContactView {
    #[serde(flatten)]
    pub contact: Contact,
    pub fraction: f64,
    /// Due and enabled: the user should reach out.
    pub reach_out: bool,
}

/// The ordered roster and the instant it was computed at.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub at: DateTime<Utc>,
    pub contacts: Vec<ContactView>,
}

/// Roster summary for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub at: DateTime<Utc>,
    pub contacts: usize,
    pub enabled: usize,
    pub due: usize,
}

impl Reminders {
    /// Current roster in display order. Nothing is saved.
    pub async fn list(&self) -> Result<Listing, IntouchError> {
        let cycle = self.snapshot().await?;
        let now = cycle.now;
        let contacts = cycle
            .roster
            .ordered(now)
            .into_iter()
            .map(|contact| {
                let fraction = due_fraction(&contact, now);
                ContactView {
                    reach_out: contact.notify_enabled && fraction >= 1.0,
                    fraction,
                    contact,
                }
            })
            .collect();
        Ok(Listing { at: now, contacts })
    }

    /// Turn reminders on or off for one contact.
    pub async fn set_notify(&self, name: &str, enabled: bool) -> Result<(), IntouchError> {
        let mut cycle = self.begin().await?;
        cycle.roster.find_mut(name)?.notify_enabled = enabled;
        self.commit(cycle)?;
        info!(
            "session: notifications {} for {name}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Change one contact's reminder interval, in days.
    pub async fn set_interval(&self, name: &str, days: i64) -> Result<(), IntouchError> {
        let max = self.reminder_config.max_interval_days;
        if !(1..=max).contains(&days) {
            return Err(IntouchError::InvalidInterval(format!(
                "{days} days is outside 1..={max}"
            )));
        }
        let interval = interval_from_days(days)?;

        let mut cycle = self.begin().await?;
        let now = cycle.now;
        cycle.roster.find_mut(name)?.set_interval(interval)?;
        cycle.roster.refresh(now);
        self.commit(cycle)?;
        info!("session: interval for {name} set to {days} days");
        Ok(())
    }

    /// Counts over the current roster. Nothing is saved.
    pub async fn status(&self) -> Result<StatusReport, IntouchError> {
        let cycle = self.snapshot().await?;
        let roster = &cycle.roster;
        Ok(StatusReport {
            at: cycle.now,
            contacts: roster.len(),
            enabled: roster
                .contacts()
                .iter()
                .filter(|c| c.notify_enabled)
                .count(),
            due: roster.due_count(cycle.now),
        })
    }
}

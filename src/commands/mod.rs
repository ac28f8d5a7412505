//! Terminal rendering for the CLI commands.

#[cfg(test)]
mod tests;

use crate::reminders::{Listing, StatusReport, TickReport};
use chrono::{DateTime, Utc};
use intouch_core::config::Config;
use intouch_memory::audit::LoggedNotification;

/// "Reach out!" marker shown next to due, enabled contacts.
const REACH_OUT: &str = "Reach out!";

/// How long ago `at` was, in whole days.
pub fn days_ago(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match at {
        None => "never".to_string(),
        Some(at) => match now.signed_duration_since(at).num_days() {
            d if d <= 0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            d => format!("{d} days ago"),
        },
    }
}

/// The ordered roster as a table.
pub fn format_list(listing: &Listing) -> String {
    let views = &listing.contacts;
    let now = listing.at;
    if views.is_empty() {
        return "No contacts with a phone number.".to_string();
    }

    let width = views
        .iter()
        .map(|v| v.contact.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "{:<width$}  {:>5}  {:>8}  {:<14}  {:<6}\n",
        "Name", "Due", "Interval", "Last contact", "Notify"
    );
    for view in views {
        let c = &view.contact;
        out.push_str(&format!(
            "{:<width$}  {:>4.0}%  {:>7}d  {:<14}  {:<6}{}\n",
            c.name,
            view.fraction * 100.0,
            c.interval.num_days(),
            days_ago(c.last_contacted_at, now),
            if c.notify_enabled { "on" } else { "off" },
            if view.reach_out {
                format!("  {REACH_OUT}")
            } else {
                String::new()
            },
        ));
    }
    out
}

/// Outcome of one tick.
pub fn format_tick(report: &TickReport) -> String {
    let notified = report.notified();
    let mut out = if notified.is_empty() {
        "Nobody to remind.".to_string()
    } else {
        format!("Reminded: {}", notified.join(", "))
    };
    if report.summary_sent() {
        out.push_str("\nSummary sent.");
    }
    for failure in report.failures() {
        out.push_str(&format!(
            "\nFailed: {} ({})",
            failure.contact.as_deref().unwrap_or("summary"),
            failure.error.as_deref().unwrap_or("unknown error"),
        ));
    }
    out
}

/// Recent notification log entries.
pub fn format_history(rows: &[LoggedNotification]) -> String {
    if rows.is_empty() {
        return "No notifications sent yet.".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let who = match (&row.contact_name, row.is_summary) {
            (_, true) => "summary".to_string(),
            (Some(name), false) => name.clone(),
            (None, false) => "?".to_string(),
        };
        out.push_str(&format!("[{}] {who} {}", row.created_at, row.status));
        if let Some(error) = &row.error {
            out.push_str(&format!(": {error}"));
        }
        out.push('\n');
    }
    out
}

/// Configuration and roster counts.
pub fn format_status(config: &Config, status: &StatusReport) -> String {
    format!(
        "InTouch status\n\
         Database:    {}\n\
         Preferences: {}\n\
         Contacts:    {} ({} enabled)\n\
         Due now:     {}\n\
         Check every: {}h (repeat after {}h)",
        config.store.db_path,
        config.store.prefs_path,
        status.contacts,
        status.enabled,
        status.due,
        config.reminder.tick_interval_hours,
        config.reminder.repeat_interval_hours,
    )
}

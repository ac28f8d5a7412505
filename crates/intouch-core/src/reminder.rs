//! Reminder engine: elapsed-interval fraction, due state and display order.
//!
//! All functions take `now` explicitly so callers decide which clock applies.

use crate::contact::Contact;
use crate::error::IntouchError;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Reject intervals that would make the due fraction undefined.
///
/// The fraction is computed in whole hours, so anything under one hour is
/// as unusable as zero.
pub fn validate_interval(interval: Duration) -> Result<Duration, IntouchError> {
    if interval.num_hours() <= 0 {
        return Err(IntouchError::InvalidInterval(format!(
            "reminder interval must be at least one hour, got {}s",
            interval.num_seconds()
        )));
    }
    Ok(interval)
}

/// Interval of `days` whole days, validated.
pub fn interval_from_days(days: i64) -> Result<Duration, IntouchError> {
    if days <= 0 {
        return Err(IntouchError::InvalidInterval(format!(
            "reminder interval must be at least one day, got {days}"
        )));
    }
    let interval = Duration::try_days(days).ok_or_else(|| {
        IntouchError::InvalidInterval(format!("{days} days is out of range"))
    })?;
    validate_interval(interval)
}

/// Fraction of the contact's interval elapsed since it was last contacted.
///
/// Elapsed time and interval are both taken in whole hours. A contact that
/// was never contacted counts from the minimum instant, which makes it
/// overdue by a very large factor.
pub fn due_fraction(contact: &Contact, now: DateTime<Utc>) -> f64 {
    let since = contact.last_contacted_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let elapsed_hours = now.signed_duration_since(since).num_hours();
    let interval_hours = contact.interval.num_hours().max(1);
    elapsed_hours as f64 / interval_hours as f64
}

/// Whether the contact's interval has fully elapsed.
pub fn is_due(contact: &Contact, now: DateTime<Utc>) -> bool {
    due_fraction(contact, now) >= 1.0
}

/// Total display order over two contacts.
///
/// Enabled contacts come first, most overdue on top. Disabled contacts
/// follow, most recently contacted on top.
pub fn compare_order(a: &Contact, b: &Contact, now: DateTime<Utc>) -> Ordering {
    compare_keys(
        (a.notify_enabled, due_fraction(a, now)),
        (b.notify_enabled, due_fraction(b, now)),
    )
}

fn compare_keys(a: (bool, f64), b: (bool, f64)) -> Ordering {
    match (a.0, b.0) {
        (false, false) => a.1.total_cmp(&b.1),
        (true, true) => b.1.total_cmp(&a.1),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    }
}

/// Return the contacts in display order. Stable: equal keys keep input order.
pub fn ordered(contacts: &[Contact], now: DateTime<Utc>) -> Vec<Contact> {
    let mut keyed: Vec<(bool, f64, &Contact)> = contacts
        .iter()
        .map(|c| (c.notify_enabled, due_fraction(c, now), c))
        .collect();
    keyed.sort_by(|a, b| compare_keys((a.0, a.1), (b.0, b.1)));
    keyed.into_iter().map(|(_, _, c)| c.clone()).collect()
}

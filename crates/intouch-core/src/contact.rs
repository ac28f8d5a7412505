//! Contact records and the per-cycle roster.

use crate::error::IntouchError;
use crate::phone::normalize;
use crate::reminder;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// Reminder interval used when nothing is configured or persisted.
pub const DEFAULT_INTERVAL_DAYS: i64 = 14;

/// A contact: identity plus mutable reminder state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    /// Display name. Also the persistence key.
    pub name: String,
    /// Normalized numbers in discovery order. `numbers[0]` is the default target.
    pub numbers: Vec<String>,
    /// Reminder period.
    #[serde(serialize_with = "serialize_days")]
    pub interval: Duration,
    /// Most recent outgoing message, `None` if never observed.
    pub last_contacted_at: Option<DateTime<Utc>>,
    /// User opt-in for notifications.
    pub notify_enabled: bool,
    /// Last notification sent, `None` if never notified.
    pub last_notified_at: Option<DateTime<Utc>>,
    /// Cached due state, only used to detect transitions.
    pub due: bool,
}

fn serialize_days<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_days())
}

impl Contact {
    /// Create a contact with default preferences.
    pub fn new(name: impl Into<String>, numbers: Vec<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            numbers,
            interval,
            last_contacted_at: None,
            notify_enabled: false,
            last_notified_at: None,
            due: false,
        }
    }

    /// Normalize and append a number unless the contact already has it.
    ///
    /// Returns the normalized key when it was inserted.
    pub fn add_number(&mut self, raw: &str) -> Option<String> {
        let number = normalize(raw);
        if self.numbers.contains(&number) {
            return None;
        }
        self.numbers.push(number.clone());
        Some(number)
    }

    /// Default messaging target.
    pub fn target(&self) -> Option<&str> {
        self.numbers.first().map(String::as_str)
    }

    /// Change the reminder interval, rejecting unusable lengths.
    pub fn set_interval(&mut self, interval: Duration) -> Result<(), IntouchError> {
        self.interval = reminder::validate_interval(interval)?;
        Ok(())
    }

    /// Record a notification at `at`. Never moves the timestamp backwards.
    pub fn mark_notified(&mut self, at: DateTime<Utc>) {
        match self.last_notified_at {
            Some(prev) if prev >= at => {
                debug!("contact {}: keeping later notification {prev}", self.name);
            }
            _ => self.last_notified_at = Some(at),
        }
    }
}

/// A change in a contact's due state observed by [`Roster::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueTransition {
    BecameDue(String),
    NoLongerDue(String),
}

/// The full set of contacts for one load → use → save cycle.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    contacts: Vec<Contact>,
}

impl Roster {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Result<&mut Contact, IntouchError> {
        self.contacts
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| IntouchError::ContactNotFound(name.to_string()))
    }

    /// Recompute every cached due flag and report which ones flipped.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Vec<DueTransition> {
        let mut transitions = Vec::new();
        for contact in &mut self.contacts {
            let due = reminder::is_due(contact, now);
            if due != contact.due {
                transitions.push(if due {
                    DueTransition::BecameDue(contact.name.clone())
                } else {
                    DueTransition::NoLongerDue(contact.name.clone())
                });
            }
            contact.due = due;
        }
        transitions
    }

    /// Display order snapshot. The roster itself is left untouched.
    pub fn ordered(&self, now: DateTime<Utc>) -> Vec<Contact> {
        reminder::ordered(&self.contacts, now)
    }

    /// Enabled contacts that are currently due.
    pub fn due_count(&self, now: DateTime<Utc>) -> usize {
        self.contacts
            .iter()
            .filter(|c| c.notify_enabled && reminder::is_due(c, now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn contact(name: &str) -> Contact {
        Contact::new(
            name,
            vec!["15550001".into()],
            Duration::days(DEFAULT_INTERVAL_DAYS),
        )
    }

    #[test]
    fn test_add_number_dedups_after_normalization() {
        let mut c = Contact::new("Ana", Vec::new(), Duration::days(14));
        assert_eq!(c.add_number("+1 (555) 123-4567").as_deref(), Some("15551234567"));
        assert!(c.add_number("15551234567").is_none());
        assert!(c.add_number("1-555-123-4567").is_none());
        assert_eq!(c.numbers, vec!["15551234567".to_string()]);
        assert_eq!(c.target(), Some("15551234567"));
    }

    #[test]
    fn test_mark_notified_only_advances() {
        let mut c = contact("Ana");
        c.mark_notified(now());
        c.mark_notified(now() - Duration::hours(5));
        assert_eq!(c.last_notified_at, Some(now()));
        c.mark_notified(now() + Duration::hours(1));
        assert_eq!(c.last_notified_at, Some(now() + Duration::hours(1)));
    }

    #[test]
    fn test_set_interval_rejects_zero() {
        let mut c = contact("Ana");
        assert!(c.set_interval(Duration::zero()).is_err());
        assert_eq!(c.interval, Duration::days(14));
        c.set_interval(Duration::days(3)).unwrap();
        assert_eq!(c.interval, Duration::days(3));
    }

    #[test]
    fn test_refresh_reports_transitions() {
        let mut a = contact("Ana");
        a.last_contacted_at = Some(now() - Duration::days(20));
        let mut b = contact("Ben");
        b.last_contacted_at = Some(now() - Duration::days(1));
        b.due = true;
        let mut roster = Roster::new(vec![a, b]);

        let transitions = roster.refresh(now());
        assert_eq!(
            transitions,
            vec![
                DueTransition::BecameDue("Ana".into()),
                DueTransition::NoLongerDue("Ben".into()),
            ]
        );
        assert!(roster.refresh(now()).is_empty());
    }

    #[test]
    fn test_find_mut_unknown_name() {
        let mut roster = Roster::new(vec![contact("Ana")]);
        assert!(matches!(
            roster.find_mut("Zoe"),
            Err(IntouchError::ContactNotFound(_))
        ));
    }

    #[test]
    fn test_due_count_only_enabled() {
        let mut a = contact("Ana");
        a.notify_enabled = true;
        let b = contact("Ben"); // never contacted, but disabled
        let roster = Roster::new(vec![a, b]);
        assert_eq!(roster.due_count(now()), 1);
    }
}

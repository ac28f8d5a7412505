//! Contact repository — builds the roster from the address book, message
//! history and persisted preferences.
//!
//! The roster is rebuilt in full on every load. Last-contact timestamps come
//! only from message history; opt-in, interval and last-notified come only
//! from the preference blob.

use crate::prefs::PreferenceMap;
use chrono::{DateTime, Duration, Utc};
use intouch_core::{
    contact::{Contact, Roster},
    error::IntouchError,
    phone::normalize,
    reminder::interval_from_days,
    traits::{AddressBook, AddressBookEntry, MessageHistory, SentMessage},
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Builds rosters with a fixed default interval.
#[derive(Debug, Clone)]
pub struct ContactRepository {
    default_interval: Duration,
}

impl ContactRepository {
    /// Create a repository whose new contacts get `default_interval_days`.
    pub fn new(default_interval_days: i64) -> Result<Self, IntouchError> {
        Ok(Self {
            default_interval: interval_from_days(default_interval_days)?,
        })
    }

    /// Read every named address-book entry together with its numbers.
    ///
    /// Entries without a display name are skipped without querying numbers.
    pub async fn fetch_entries(
        book: &dyn AddressBook,
    ) -> Result<Vec<AddressBookEntry>, IntouchError> {
        let rows = book.contacts().await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            if row.display_name.is_none() {
                debug!("repository: skipping unnamed address-book row {}", row.id);
                continue;
            }
            let numbers = book.numbers(&row.id).await?;
            entries.push(AddressBookEntry {
                id: row.id,
                display_name: row.display_name,
                numbers,
            });
        }
        Ok(entries)
    }

    /// Fetch both external sources and build the roster.
    pub async fn load_from(
        &self,
        book: &dyn AddressBook,
        history: &dyn MessageHistory,
        prefs: &PreferenceMap,
        now: DateTime<Utc>,
    ) -> Result<Roster, IntouchError> {
        let entries = Self::fetch_entries(book).await?;
        let messages = history.sent_messages().await?;
        Ok(self.load(&entries, &messages, prefs, now))
    }

    /// Reconcile the three inputs into a roster.
    pub fn load(
        &self,
        entries: &[AddressBookEntry],
        messages: &[SentMessage],
        prefs: &PreferenceMap,
        now: DateTime<Utc>,
    ) -> Roster {
        let mut contacts: Vec<Contact> = Vec::new();
        // Normalized number → roster index. A number shared by two entries
        // belongs to the later one.
        let mut by_number: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            let Some(name) = entry.display_name.as_deref() else {
                continue;
            };

            let mut contact = Contact::new(name, Vec::new(), self.default_interval);
            let mut inserted = Vec::new();
            for raw in entry.numbers.iter().flatten() {
                if normalize(raw).is_empty() {
                    debug!("repository: {name}: ignoring empty number {raw:?}");
                    continue;
                }
                if let Some(number) = contact.add_number(raw) {
                    inserted.push(number);
                }
            }

            if inserted.is_empty() {
                debug!("repository: dropping {name}: no resolvable numbers");
                continue;
            }

            let index = contacts.len();
            for number in inserted {
                by_number.insert(number, index);
            }
            contacts.push(contact);
        }

        apply_message_history(&mut contacts, &by_number, messages);

        for contact in &mut contacts {
            if let Some(saved) = prefs.get(&contact.name) {
                saved.apply(contact);
            }
        }

        let mut roster = Roster::new(contacts);
        roster.refresh(now);
        info!(
            "repository: loaded {} contacts ({} due)",
            roster.len(),
            roster.contacts().iter().filter(|c| c.due).count()
        );
        roster
    }
}

/// Set each contact's last-contact time from its latest outgoing message.
///
/// Rows are scanned oldest first so the final write for a contact holds the
/// newest timestamp. Rows with unreadable fields or unknown addresses are ignored.
fn apply_message_history(
    contacts: &mut [Contact],
    by_number: &HashMap<String, usize>,
    messages: &[SentMessage],
) {
    let mut rows: Vec<(DateTime<Utc>, &str)> = messages
        .iter()
        .filter_map(|m| {
            let address = m.address.as_deref()?;
            let at = DateTime::from_timestamp_millis(m.timestamp_millis?)?;
            Some((at, address))
        })
        .collect();
    rows.sort_by_key(|(at, _)| *at);

    let mut matched = 0usize;
    for (at, address) in rows {
        if let Some(&index) = by_number.get(&normalize(address)) {
            contacts[index].last_contacted_at = Some(at);
            matched += 1;
        }
    }
    debug!(
        "repository: {matched} of {} sent messages matched a contact",
        messages.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::ContactPreferences;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use intouch_core::traits::AddressBookRow;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn entry(id: &str, name: Option<&str>, numbers: &[Option<&str>]) -> AddressBookEntry {
        AddressBookEntry {
            id: id.to_string(),
            display_name: name.map(str::to_string),
            numbers: numbers.iter().map(|n| n.map(str::to_string)).collect(),
        }
    }

    fn sent(address: &str, at: DateTime<Utc>) -> SentMessage {
        SentMessage {
            address: Some(address.to_string()),
            timestamp_millis: Some(at.timestamp_millis()),
        }
    }

    fn repo() -> ContactRepository {
        ContactRepository::new(14).unwrap()
    }

    #[test]
    fn test_new_rejects_non_positive_default() {
        assert!(ContactRepository::new(0).is_err());
        assert!(ContactRepository::new(-1).is_err());
    }

    #[test]
    fn test_load_builds_contacts_and_drops_numberless() {
        let entries = vec![
            entry("1", Some("Ana"), &[Some("+1 (555) 123-4567"), Some("15551234567")]),
            entry("2", Some("Ben"), &[]),
            entry("3", None, &[Some("5550000")]),
            entry("4", Some("Cid"), &[None, Some("+"), Some("555-0100")]),
            entry("5", Some("Dee"), &[None, Some("()")]),
        ];
        let roster = repo().load(&entries, &[], &PreferenceMap::new(), now());
        let names: Vec<_> = roster.contacts().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Cid"]);
        assert_eq!(roster.contacts()[0].numbers, vec!["15551234567".to_string()]);
        assert_eq!(roster.contacts()[1].numbers, vec!["5550100".to_string()]);
        assert_eq!(roster.contacts()[0].interval, Duration::days(14));
        assert!(!roster.contacts()[0].notify_enabled);
        assert!(roster.contacts()[0].last_notified_at.is_none());
    }

    #[test]
    fn test_message_address_matches_after_normalization() {
        let entries = vec![entry("1", Some("Ana"), &[Some("+1 (555) 123-4567")])];
        let at = now() - Duration::days(2);
        let roster = repo().load(
            &entries,
            &[sent("15551234567", at)],
            &PreferenceMap::new(),
            now(),
        );
        assert_eq!(roster.contacts()[0].last_contacted_at, Some(at));
    }

    #[test]
    fn test_latest_message_wins_regardless_of_input_order() {
        let entries = vec![entry("1", Some("Ana"), &[Some("111"), Some("222")])];
        let newest = now() - Duration::days(1);
        let messages = vec![
            sent("222", newest),
            sent("111", now() - Duration::days(9)),
            sent("111", now() - Duration::days(5)),
        ];
        let roster = repo().load(&entries, &messages, &PreferenceMap::new(), now());
        assert_eq!(roster.contacts()[0].last_contacted_at, Some(newest));
    }

    #[test]
    fn test_unknown_and_unreadable_messages_ignored() {
        let entries = vec![entry("1", Some("Ana"), &[Some("111")])];
        let messages = vec![
            sent("999", now()),
            SentMessage {
                address: None,
                timestamp_millis: Some(now().timestamp_millis()),
            },
            SentMessage {
                address: Some("111".into()),
                timestamp_millis: None,
            },
        ];
        let roster = repo().load(&entries, &messages, &PreferenceMap::new(), now());
        assert_eq!(roster.len(), 1);
        assert!(roster.contacts()[0].last_contacted_at.is_none());
    }

    #[test]
    fn test_shared_number_belongs_to_later_entry() {
        let entries = vec![
            entry("1", Some("Ana"), &[Some("111")]),
            entry("2", Some("Ben"), &[Some("111")]),
        ];
        let at = now() - Duration::days(1);
        let roster = repo().load(&entries, &[sent("111", at)], &PreferenceMap::new(), now());
        assert!(roster.contacts()[0].last_contacted_at.is_none());
        assert_eq!(roster.contacts()[1].last_contacted_at, Some(at));
    }

    #[test]
    fn test_preferences_applied_by_name() {
        let entries = vec![
            entry("1", Some("Ana"), &[Some("111")]),
            entry("2", Some("Ben"), &[Some("222")]),
        ];
        let mut prefs = PreferenceMap::new();
        prefs.insert(
            "Ana".into(),
            ContactPreferences {
                notify: Some(true),
                interval_days: Some(3),
                last_notified: Some(now() - Duration::hours(2)),
            },
        );
        prefs.insert(
            "Ben".into(),
            ContactPreferences {
                notify: None,
                interval_days: Some(30),
                last_notified: None,
            },
        );
        prefs.insert("Ghost".into(), ContactPreferences::default());

        let roster = repo().load(&entries, &[], &prefs, now());
        let ana = roster.find("Ana").unwrap();
        assert!(ana.notify_enabled);
        assert_eq!(ana.interval, Duration::days(3));
        assert_eq!(ana.last_notified_at, Some(now() - Duration::hours(2)));
        let ben = roster.find("Ben").unwrap();
        assert!(!ben.notify_enabled);
        assert_eq!(ben.interval, Duration::days(30));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_initial_due_flag() {
        let entries = vec![
            entry("1", Some("Ana"), &[Some("111")]),
            entry("2", Some("Ben"), &[Some("222")]),
        ];
        let messages = vec![sent("111", now() - Duration::days(1))];
        let roster = repo().load(&entries, &messages, &PreferenceMap::new(), now());
        assert!(!roster.find("Ana").unwrap().due);
        // Never contacted.
        assert!(roster.find("Ben").unwrap().due);
    }

    struct Book;

    #[async_trait]
    impl AddressBook for Book {
        async fn contacts(&self) -> Result<Vec<AddressBookRow>, IntouchError> {
            Ok(vec![
                AddressBookRow {
                    id: "1".into(),
                    display_name: Some("Ana".into()),
                },
                AddressBookRow {
                    id: "2".into(),
                    display_name: None,
                },
            ])
        }

        async fn numbers(&self, contact_id: &str) -> Result<Vec<Option<String>>, IntouchError> {
            match contact_id {
                "1" => Ok(vec![Some("+1 (555) 123-4567".into())]),
                other => Err(IntouchError::Source(format!("unexpected lookup {other}"))),
            }
        }
    }

    struct History;

    #[async_trait]
    impl MessageHistory for History {
        async fn sent_messages(&self) -> Result<Vec<SentMessage>, IntouchError> {
            Ok(vec![sent("15551234567", now() - Duration::days(15))])
        }
    }

    #[tokio::test]
    async fn test_load_from_sources() {
        let roster = repo()
            .load_from(&Book, &History, &PreferenceMap::new(), now())
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        let ana = roster.find("Ana").unwrap();
        assert_eq!(ana.last_contacted_at, Some(now() - Duration::days(15)));
        assert!(ana.due);
    }
}

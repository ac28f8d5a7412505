//! Preference persistence — per-contact opt-in, interval and notification bookkeeping.
//!
//! The blob is a JSON object keyed by contact name:
//!
//! ```json
//! { "Ana": { "notify": true, "notifyDuration": 14, "lastNotified": "2026-03-01T12:00:00Z" },
//!   "Ben": { "notify": false, "notifyDuration": 30, "lastNotified": "-1000000000-01-01T00:00:00Z" } }
//! ```
//!
//! A contact that was never notified carries [`NEVER_NOTIFIED`]. Version 1
//! blobs have no `_schema` key; later versions must carry one.
//!
//! Decoding is tolerant per field: a malformed value is dropped and the
//! contact keeps its default for that field only. Intervals are stored in
//! whole days, so sub-day precision is truncated on save.

use chrono::{DateTime, SecondsFormat, Utc};
use intouch_core::{
    contact::Contact,
    error::IntouchError,
    reminder::interval_from_days,
    traits::{BlobGuard, BlobStore},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reserved top-level key carrying the schema version.
pub const SCHEMA_KEY: &str = "_schema";
/// Newest schema [`decode`] accepts. Blobs without a version are version 1.
pub const SCHEMA_VERSION: i64 = 1;
/// `lastNotified` of a contact that was never notified: the earliest
/// representable instant, as existing blobs spell it.
pub const NEVER_NOTIFIED: &str = "-1000000000-01-01T00:00:00Z";

const KEY_NOTIFY: &str = "notify";
const KEY_NOTIFY_DURATION: &str = "notifyDuration";
const KEY_LAST_NOTIFIED: &str = "lastNotified";

/// Persisted preferences of one contact. `None` fields were absent or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPreferences {
    pub notify: Option<bool>,
    pub interval_days: Option<i64>,
    pub last_notified: Option<DateTime<Utc>>,
}

/// Preferences keyed by contact name.
pub type PreferenceMap = HashMap<String, ContactPreferences>;

impl ContactPreferences {
    /// Overwrite the contact's fields that are present in this record.
    pub fn apply(&self, contact: &mut Contact) {
        if let Some(notify) = self.notify {
            contact.notify_enabled = notify;
        }
        if let Some(days) = self.interval_days {
            match interval_from_days(days) {
                Ok(interval) => contact.interval = interval,
                Err(e) => warn!("prefs: {}: ignoring stored interval: {e}", contact.name),
            }
        }
        if let Some(at) = self.last_notified {
            contact.last_notified_at = Some(at);
        }
    }
}

/// On-disk shape of one record.
#[derive(Serialize)]
struct StoredRecord {
    notify: bool,
    #[serde(rename = "notifyDuration")]
    notify_duration: i64,
    #[serde(rename = "lastNotified")]
    last_notified: String,
}

impl From<&Contact> for StoredRecord {
    fn from(contact: &Contact) -> Self {
        Self {
            notify: contact.notify_enabled,
            notify_duration: contact.interval.num_days(),
            last_notified: contact
                .last_notified_at
                .map_or_else(|| NEVER_NOTIFIED.to_string(), format_instant),
        }
    }
}

/// ISO-8601 UTC form used in the blob.
pub fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serialize one record per contact.
pub fn encode(contacts: &[Contact]) -> Result<Vec<u8>, IntouchError> {
    let mut root = Map::new();
    for contact in contacts {
        if contact.name == SCHEMA_KEY {
            warn!("prefs: contact named {SCHEMA_KEY} cannot be persisted");
            continue;
        }
        let record = serde_json::to_value(StoredRecord::from(contact))?;
        root.insert(contact.name.clone(), record);
    }
    Ok(serde_json::to_vec(&Value::Object(root))?)
}

/// Parse a blob into per-contact preferences.
///
/// Fails only when the blob as a whole is unusable: not JSON, not an
/// object, or written by a newer schema.
pub fn decode(bytes: &[u8]) -> Result<PreferenceMap, IntouchError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let Value::Object(root) = root else {
        return Err(IntouchError::Storage(
            "preference blob is not a JSON object".to_string(),
        ));
    };

    let version = match root.get(SCHEMA_KEY) {
        None => 1,
        Some(v) => v.as_i64().ok_or_else(|| {
            IntouchError::Storage(format!("unreadable schema version: {v}"))
        })?,
    };
    if version > SCHEMA_VERSION {
        return Err(IntouchError::Storage(format!(
            "preference blob has schema {version}, newest supported is {SCHEMA_VERSION}"
        )));
    }

    let mut prefs = PreferenceMap::with_capacity(root.len());
    for (name, value) in &root {
        if name == SCHEMA_KEY {
            continue;
        }
        match value {
            Value::Object(record) => {
                prefs.insert(name.clone(), decode_record(name, record));
            }
            other => warn!("prefs: skipping record for {name}: expected object, got {other}"),
        }
    }
    Ok(prefs)
}

fn decode_record(name: &str, record: &Map<String, Value>) -> ContactPreferences {
    let mut prefs = ContactPreferences::default();

    if let Some(v) = record.get(KEY_NOTIFY) {
        prefs.notify = v.as_bool();
        if prefs.notify.is_none() {
            warn!("prefs: {name}: malformed {KEY_NOTIFY}: {v}");
        }
    }

    if let Some(v) = record.get(KEY_NOTIFY_DURATION) {
        prefs.interval_days = v
            .as_i64()
            .filter(|days| interval_from_days(*days).is_ok());
        if prefs.interval_days.is_none() {
            warn!("prefs: {name}: malformed {KEY_NOTIFY_DURATION}: {v}");
        }
    }

    match record.get(KEY_LAST_NOTIFIED) {
        None => {}
        Some(Value::String(raw)) if raw == NEVER_NOTIFIED => {}
        Some(v) => {
            prefs.last_notified = v.as_str().and_then(parse_instant);
            if prefs.last_notified.is_none() {
                warn!("prefs: {name}: malformed {KEY_LAST_NOTIFIED}: {v}");
            }
        }
    }

    prefs
}

/// Preference persistence over a [`BlobStore`].
#[derive(Clone)]
pub struct PreferenceStore {
    blob: Arc<dyn BlobStore>,
}

impl PreferenceStore {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    /// Take the blob store's exclusive lock for one cycle.
    pub fn lock(&self) -> Result<BlobGuard, IntouchError> {
        self.blob.lock()
    }

    /// Read stored preferences. A store that was never written yields none.
    pub fn load(&self) -> Result<PreferenceMap, IntouchError> {
        match self.blob.read()? {
            Some(bytes) => {
                let prefs = decode(&bytes)?;
                debug!("prefs: loaded {} records", prefs.len());
                Ok(prefs)
            }
            None => {
                info!("prefs: no saved preferences, using defaults");
                Ok(PreferenceMap::new())
            }
        }
    }

    /// Persist the roster's preferences, replacing the stored blob.
    pub fn save(&self, contacts: &[Contact]) -> Result<(), IntouchError> {
        let bytes = encode(contacts)?;
        self.blob.write(&bytes)?;
        debug!("prefs: saved {} records", contacts.len());
        Ok(())
    }
}

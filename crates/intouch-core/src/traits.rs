use crate::error::IntouchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification id reserved for the group summary.
pub const SUMMARY_ID: i64 = -1;

/// One row of the address book: an entry id and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookRow {
    pub id: String,
    /// Entries without a display name never reach the roster.
    pub display_name: Option<String>,
}

/// A fully resolved address-book entry: the row plus its raw phone numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBookEntry {
    pub id: String,
    pub display_name: Option<String>,
    /// Raw numbers as stored by the provider. `None` marks an unreadable row.
    pub numbers: Vec<Option<String>>,
}

/// One outgoing message from the message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub address: Option<String>,
    pub timestamp_millis: Option<i64>,
}

/// A notification handed to the platform for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Roster index of the contact, or [`SUMMARY_ID`] for the group summary.
    pub id: i64,
    pub title: String,
    pub body: String,
    /// Action target, e.g. `sms:15551234567`. Empty for the summary.
    pub target_uri: String,
    pub group_id: String,
    pub is_summary: bool,
}

/// The address book, source of contact identity.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// All address-book rows.
    async fn contacts(&self) -> Result<Vec<AddressBookRow>, IntouchError>;

    /// Raw phone numbers associated with one address-book id.
    async fn numbers(&self, contact_id: &str) -> Result<Vec<Option<String>>, IntouchError>;
}

/// Outgoing message history, source of last-contact timestamps.
#[async_trait]
pub trait MessageHistory: Send + Sync {
    /// Sent messages, ascending by timestamp.
    async fn sent_messages(&self) -> Result<Vec<SentMessage>, IntouchError>;
}

/// Platform notification delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Human-readable sink name.
    fn name(&self) -> &str;

    /// Deliver one notification. An error means the user was not notified.
    async fn deliver(&self, notification: &Notification) -> Result<(), IntouchError>;
}

/// Exclusive hold on a blob store for one load → mutate → save cycle.
///
/// Released when dropped.
pub struct BlobGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl BlobGuard {
    /// A guard with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// A guard that runs `release` when dropped.
    pub fn on_release(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for BlobGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for BlobGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobGuard")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Durable get/set storage for the preference blob.
pub trait BlobStore: Send + Sync {
    /// Read the stored bytes. `Ok(None)` means nothing has been written yet.
    fn read(&self) -> Result<Option<Vec<u8>>, IntouchError>;

    /// Replace the stored bytes.
    fn write(&self, bytes: &[u8]) -> Result<(), IntouchError>;

    /// Take exclusive access across processes. Stores with a single owner
    /// need no lock.
    fn lock(&self) -> Result<BlobGuard, IntouchError> {
        Ok(BlobGuard::noop())
    }
}

/// Source of "now", injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

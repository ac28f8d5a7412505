//! # intouch-memory
//!
//! Everything InTouch reads and writes: the preference blob, the contact
//! repository that reconciles it with the address book and message history,
//! and the SQLite-backed sources and notification log.

pub mod audit;
pub mod blob;
pub mod prefs;
pub mod repository;
pub mod store;

pub use audit::NotificationLog;
pub use blob::{FileBlobStore, MemoryBlobStore};
pub use prefs::PreferenceStore;
pub use repository::ContactRepository;
pub use store::Store;

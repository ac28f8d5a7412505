//! # intouch-core
//!
//! Core types, the reminder engine, configuration, and error handling for InTouch.

pub mod config;
pub mod contact;
pub mod error;
pub mod phone;
pub mod reminder;
pub mod traits;

pub use config::shellexpand;

//! Core types shared across the lull workspace.

pub mod config;
pub mod entry;
pub mod error;
pub mod insight;
pub mod notification;
pub mod recurrence;
pub mod schedule;
pub mod traits;

pub use config::shellexpand;
pub use error::LullError;

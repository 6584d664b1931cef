//! SQLite persistence for lull.

pub mod store;

pub use store::{day_bounds, now_stamp, today_key, Store};

use serde::{Deserialize, Serialize};

/// A user's sleep log entry, as read by the core.
///
/// Created through the CRUD surface; the sweep and the insight cache only
/// read these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepEntry {
    /// Calendar date of the night, `%Y-%m-%d`.
    pub entry_date: String,
    pub duration_mins: i64,
    /// Subjective quality, 0-10.
    pub rating: i64,
    /// Local timestamp of the last modification, `%Y-%m-%d %H:%M:%S`.
    pub updated_at: String,
}

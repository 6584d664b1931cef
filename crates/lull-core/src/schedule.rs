use serde::{Deserialize, Serialize};

/// Schedule kind whose ticks produce a reminder notification.
pub const KIND_BEDTIME: &str = "bedtime";

/// A user-owned recurring job definition.
///
/// Created and edited through the CRUD surface; the job registry consumes
/// it and must be re-registered to pick up edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Type tag, e.g. `"bedtime"`.
    pub kind: String,
    /// Cron-style recurrence expression. Empty = not schedulable.
    pub recurrence: String,
    pub enabled: bool,
    /// Local timestamp of the last tick, `%Y-%m-%d %H:%M:%S`.
    pub last_run_at: Option<String>,
}

impl ScheduleDefinition {
    pub fn is_reminder(&self) -> bool {
        self.kind == KIND_BEDTIME
    }
}

use crate::{entry::SleepEntry, error::LullError, insight::InsightReport};
use async_trait::async_trait;

/// Insight generator trait — the external analysis collaborator.
///
/// Takes the user's goal, their recent sleep entries (newest first) and a
/// period label, and returns a structured report or a provider error.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Human-readable generator name.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        goal_mins: i64,
        entries: &[SleepEntry],
        period: &str,
    ) -> Result<InsightReport, LullError>;
}

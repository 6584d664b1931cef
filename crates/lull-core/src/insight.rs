use serde::{Deserialize, Serialize};

/// Structured output of the insight generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub score: i64,
    pub insight: String,
    pub analysis: String,
    pub recommendation: String,
}

/// A cached insight, one per (user, day-key, period type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightArtifact {
    pub user_id: String,
    /// Calendar date the artifact was computed on, `%Y-%m-%d`.
    pub day_key: String,
    /// Period label, e.g. `"weekly"`.
    pub period_type: String,
    /// Entry date of the oldest source record.
    pub start_date: String,
    /// Entry date of the newest source record.
    pub end_date: String,
    pub score: i64,
    pub insight: String,
    pub analysis: String,
    pub recommendation: String,
    /// Local timestamp the artifact was generated at, `%Y-%m-%d %H:%M:%S`.
    pub generated_at: String,
}

impl InsightArtifact {
    pub fn report(&self) -> InsightReport {
        InsightReport {
            score: self.score,
            insight: self.insight.clone(),
            analysis: self.analysis.clone(),
            recommendation: self.recommendation.clone(),
        }
    }
}

/// Render a goal in minutes the way the analysis narrative refers to it,
/// e.g. 480 -> "8h 0m". Used by the freshness check.
pub fn goal_text(goal_mins: i64) -> String {
    format!("{}h {}m", goal_mins / 60, goal_mins % 60)
}

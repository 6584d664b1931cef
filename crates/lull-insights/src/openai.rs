//! OpenAI-compatible insight generator.
//!
//! Works with OpenAI's API and any compatible endpoint. Requests JSON
//! output and parses it into the structured report.

use async_trait::async_trait;
use lull_core::{entry::SleepEntry, error::LullError, insight::InsightReport, traits::InsightGenerator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// OpenAI-compatible generator.
pub struct OpenAiInsights {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiInsights {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

const SYSTEM_PROMPT: &str =
    "You are the lull Sleep Health Scientist. You provide high-detail, encouraging JSON feedback.";

/// Build the analysis prompt from the user's goal and recent entries.
pub(crate) fn build_insight_prompt(
    goal_mins: i64,
    entries: &[SleepEntry],
    period: &str,
) -> String {
    let log_summary = entries
        .iter()
        .map(|e| {
            format!(
                "Date: {}, Duration: {}m, Rating: {}/10",
                e.entry_date, e.duration_mins, e.rating
            )
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let time_frame = if period == "weekly" { "7 days" } else { "30 days" };

    format!(
        "CONTEXT:\n\
         You are the lull Sleep Scientist, an expert in circadian rhythms and sleep hygiene. \
         lull is a wellness app helping people understand that quality sleep is the foundation \
         of a vibrant life. You are professional, encouraging, supportive, data-driven, and \
         highly specific.\n\n\
         USER DATA:\n\
         - Timeframe: Past {time_frame}\n\
         - Personal Goal: {goal_mins} minutes\n\
         - Sleep Logs: {log_summary}\n\n\
         INSTRUCTIONS FOR ANALYSIS:\n\
         - Be specific: mention days or trends by name.\n\
         - Start by acknowledging a positive trend.\n\
         - Clearly explain the distance between the current average and the {goal_mins}m goal, \
           and state the goal as hours and minutes (e.g. \"{goal_h}h {goal_m}m\").\n\n\
         INSTRUCTIONS FOR RECOMMENDATION:\n\
         - Give 1-2 key focus points the user can act on tonight.\n\n\
         TASK:\n\
         1. Calculate a sleep score (0-100): 50% goal achievement, 30% consistency across the \
            {period} period, 20% average of the ratings.\n\
         2. Respond strictly in this JSON format:\n\
         {{\n\
             \"score\": [number],\n\
             \"insight\": \"[short but meaningful headline]\",\n\
             \"analysis\": \"[2-3 sentences explaining {period} trends]\",\n\
             \"recommendation\": \"[1 actionable tip]\"\n\
         }}",
        goal_h = goal_mins / 60,
        goal_m = goal_mins % 60,
    )
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

/// Parse the JSON content of a completion into a report.
pub(crate) fn parse_report(content: &str) -> Result<InsightReport, LullError> {
    serde_json::from_str(content)
        .map_err(|e| LullError::Insight(format!("malformed generator output: {e}")))
}

#[async_trait]
impl InsightGenerator for OpenAiInsights {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        goal_mins: i64,
        entries: &[SleepEntry],
        period: &str,
    ) -> Result<InsightReport, LullError> {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return Err(LullError::Insight("no API key configured".to_string()));
        }

        let prompt = build_insight_prompt(goal_mins, entries, period);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "response_format": { "type": "json_object" },
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", self.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LullError::Insight(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LullError::Insight(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LullError::Insight(format!("openai: failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .ok_or_else(|| LullError::Insight("openai: empty response".to_string()))?;

        parse_report(&content)
    }
}

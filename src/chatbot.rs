//! Rule-based chat bot for the messages surface.
//!
//! A stateless keyword lookup producing a canned reply. Exists so the chat
//! flow exercises the full persist-then-push path in both directions.

const GREETING: &str = "Hi! I'm the lull support bot. You can ask me about schedules, \
     sleep tips, or logging your sleep.";
const SCHEDULES: &str = "You can manage schedules and bedtime reminders from your Dashboard. \
     Set a time and we'll notify you when it's time for bed.";
const SLEEP_TIPS: &str = "For better sleep: try a consistent bedtime, limit screens before bed, \
     and keep your room cool. Log your sleep on the dashboard to track trends.";
const LOGGING: &str = "Log your sleep from the Dashboard: choose a date, enter duration or \
     bed/wake times, and add an optional rating. Your history powers your insights.";
const SUPPORT: &str = "I'm here to help. Ask about schedules, sleep tips, or how to log sleep. \
     For account or technical issues, contact support@lull.app.";
const THANKS: &str = "You're welcome! Have a great rest.";
const FALLBACK: &str = "Thanks for your message. I can help with schedules, sleep tips, \
     and logging. Just ask in a sentence or two.";

/// Keyword rules, checked in order. First hit wins.
const RULES: &[(&[&str], &str)] = &[
    (&["hi", "hey", "hello"], GREETING),
    (
        &["schedule", "schedules", "reminder", "bedtime", "notification"],
        SCHEDULES,
    ),
    (
        &["sleep", "sleeping", "tips", "improve", "quality", "routine"],
        SLEEP_TIPS,
    ),
    (&["log", "logging", "track"], LOGGING),
    (&["help", "support", "stuck"], SUPPORT),
    (&["thank", "thanks", "thx"], THANKS),
];

/// Reply for a trimmed user message.
pub fn reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    for (keywords, response) in RULES {
        if keywords.iter().any(|k| words.contains(k)) {
            return response;
        }
    }
    FALLBACK
}

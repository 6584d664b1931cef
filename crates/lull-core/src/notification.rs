use serde::{Deserialize, Serialize};

/// Kind of a persisted notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BedtimeReminder,
    MissingLog,
    ChatMessage,
    ChatReply,
    Announcement,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BedtimeReminder => "bedtime_reminder",
            Self::MissingLog => "missing_log",
            Self::ChatMessage => "chat_message",
            Self::ChatReply => "chat_reply",
            Self::Announcement => "announcement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bedtime_reminder" => Some(Self::BedtimeReminder),
            "missing_log" => Some(Self::MissingLog),
            "chat_message" => Some(Self::ChatMessage),
            "chat_reply" => Some(Self::ChatReply),
            "announcement" => Some(Self::Announcement),
            _ => None,
        }
    }

    /// Push event name for this kind. The receiving UI distinguishes an
    /// echoed chat message from a bot reply from a system notification.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::BedtimeReminder | Self::MissingLog => "schedule:notification",
            Self::ChatMessage => "chat:message",
            Self::ChatReply => "chat:reply",
            Self::Announcement => "notification",
        }
    }
}

/// A persisted notification record.
///
/// Written by the delivery engine before any push attempt. Content is
/// never updated in place; only the read state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub content: String,
    pub read: bool,
    pub read_at: Option<String>,
    /// Local creation timestamp, `%Y-%m-%d %H:%M:%S`.
    pub created_at: String,
}

/// Payload pushed over a live connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    pub event: String,
    pub message_id: String,
    pub kind: NotificationKind,
    pub content: String,
    pub created_at: String,
}

impl PushEvent {
    pub fn for_message(message: &NotificationMessage) -> Self {
        Self {
            event: message.kind.event_name().to_string(),
            message_id: message.id.clone(),
            kind: message.kind,
            content: message.content.clone(),
            created_at: message.created_at.clone(),
        }
    }
}

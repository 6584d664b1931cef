//! SQLite-backed store for schedules, sleep entries, messages and insights.
//!
//! All timestamps are written from the server-local clock as
//! `%Y-%m-%d %H:%M:%S` TEXT, so day-bound queries and freshness
//! comparisons work lexicographically on one clock.

use chrono::Local;
use lull_core::{
    entry::SleepEntry,
    error::LullError,
    insight::InsightArtifact,
    notification::{NotificationKind, NotificationMessage},
    schedule::ScheduleDefinition,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Effective sleep goal when a user has none configured.
const DEFAULT_GOAL_MINS: i64 = 480;

/// Default and maximum page sizes for message listings.
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Current local timestamp in storage format.
pub fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Today's day-key (server-local calendar date).
pub fn today_key() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Inclusive bounds of a server-local calendar day, in storage format.
pub fn day_bounds(day_key: &str) -> (String, String) {
    (format!("{day_key} 00:00:00"), format!("{day_key} 23:59:59"))
}

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

type MessageRow = (String, String, String, String, bool, Option<String>, String);
type ScheduleRow = (String, String, String, String, String, bool, Option<String>);

impl Store {
    /// Open (or create) the database at `db_path` and run migrations.
    pub async fn new(db_path: &str) -> Result<Self, LullError> {
        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LullError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| LullError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| LullError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Open an isolated in-memory database (tests and tooling).
    pub async fn open_in_memory() -> Result<Self, LullError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| LullError::Store(format!("failed to open in-memory db: {e}")))?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), LullError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../migrations/001_init.sql")),
            ("002_messages", include_str!("../migrations/002_messages.sql")),
            ("003_insights", include_str!("../migrations/003_insights.sql")),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        LullError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| LullError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    LullError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }

    // --- Users ---

    /// Create a user. Goal of zero means "not configured".
    pub async fn create_user(&self, id: &str, name: &str, goal_mins: i64) -> Result<(), LullError> {
        sqlx::query("INSERT INTO users (id, name, goal_mins, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(goal_mins)
            .bind(now_stamp())
            .execute(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to create user: {e}")))?;
        Ok(())
    }

    /// All user ids, for the daily sweep.
    pub async fn list_user_ids(&self) -> Result<Vec<String>, LullError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to list users: {e}")))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The user's effective sleep goal in minutes (default when unset).
    pub async fn user_goal_mins(&self, user_id: &str) -> Result<i64, LullError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT goal_mins FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to read goal: {e}")))?;

        Ok(match row {
            Some((goal,)) if goal > 0 => goal,
            _ => DEFAULT_GOAL_MINS,
        })
    }

    // --- Sleep entries ---

    /// Insert a sleep entry with an explicit timestamp (entries arrive
    /// from the CRUD layer carrying their own modification times).
    pub async fn add_entry(
        &self,
        user_id: &str,
        entry_date: &str,
        duration_mins: i64,
        rating: i64,
        stamp: &str,
    ) -> Result<(), LullError> {
        sqlx::query(
            "INSERT INTO sleep_entries \
             (id, user_id, entry_date, duration_mins, rating, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id)
        .bind(entry_date)
        .bind(duration_mins)
        .bind(rating)
        .bind(stamp)
        .bind(stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to add entry: {e}")))?;
        Ok(())
    }

    /// Whether the user logged an entry within the given time bounds.
    pub async fn has_entry_between(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<bool, LullError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sleep_entries \
             WHERE user_id = ? AND created_at BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to check entries: {e}")))?;
        Ok(count.0 > 0)
    }

    /// Most recent entries for a user, newest first.
    pub async fn latest_entries(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<SleepEntry>, LullError> {
        let rows: Vec<(String, i64, i64, String)> = sqlx::query_as(
            "SELECT entry_date, duration_mins, rating, updated_at FROM sleep_entries \
             WHERE user_id = ? ORDER BY entry_date DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to fetch entries: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(entry_date, duration_mins, rating, updated_at)| SleepEntry {
                entry_date,
                duration_mins,
                rating,
                updated_at,
            })
            .collect())
    }

    // --- Schedules ---

    pub async fn create_schedule(&self, def: &ScheduleDefinition) -> Result<(), LullError> {
        sqlx::query(
            "INSERT INTO schedules \
             (id, user_id, name, kind, recurrence, enabled, last_run_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&def.id)
        .bind(&def.user_id)
        .bind(&def.name)
        .bind(&def.kind)
        .bind(&def.recurrence)
        .bind(def.enabled)
        .bind(&def.last_run_at)
        .bind(now_stamp())
        .execute(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to create schedule: {e}")))?;
        Ok(())
    }

    /// All enabled schedule definitions (registry startup).
    pub async fn enabled_schedules(&self) -> Result<Vec<ScheduleDefinition>, LullError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT id, user_id, name, kind, recurrence, enabled, last_run_at \
             FROM schedules WHERE enabled = 1 ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to list schedules: {e}")))?;

        Ok(rows.into_iter().map(schedule_from_row).collect())
    }

    pub async fn get_schedule(&self, id: &str) -> Result<Option<ScheduleDefinition>, LullError> {
        let row: Option<ScheduleRow> = sqlx::query_as(
            "SELECT id, user_id, name, kind, recurrence, enabled, last_run_at \
             FROM schedules WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to fetch schedule: {e}")))?;

        Ok(row.map(schedule_from_row))
    }

    /// Persist a schedule's last-run timestamp after a tick.
    pub async fn touch_schedule_last_run(&self, id: &str, stamp: &str) -> Result<(), LullError> {
        sqlx::query("UPDATE schedules SET last_run_at = ? WHERE id = ?")
            .bind(stamp)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to update last_run_at: {e}")))?;
        Ok(())
    }

    // --- Messages ---

    /// Persist a new notification message. Ids are uuid v7 so they are
    /// globally unique and time-ordered.
    pub async fn create_message(
        &self,
        user_id: &str,
        kind: NotificationKind,
        content: &str,
    ) -> Result<NotificationMessage, LullError> {
        let message = NotificationMessage {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            kind,
            content: content.to_string(),
            read: false,
            read_at: None,
            created_at: now_stamp(),
        };

        sqlx::query(
            "INSERT INTO messages (id, user_id, kind, content, is_read, read_at, created_at) \
             VALUES (?, ?, ?, ?, 0, NULL, ?)",
        )
        .bind(&message.id)
        .bind(&message.user_id)
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(&message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to create message: {e}")))?;

        Ok(message)
    }

    /// Paginated list of all of a user's messages, newest first.
    pub async fn list_messages(
        &self,
        user_id: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<NotificationMessage>, i64), LullError> {
        let (limit, offset) = page_window(page, page_size);

        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, user_id, kind, content, is_read, read_at, created_at \
             FROM messages WHERE user_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to list messages: {e}")))?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to count messages: {e}")))?;

        Ok((messages_from_rows(rows)?, total.0))
    }

    /// Paginated chat log (chat messages and replies only), oldest first.
    pub async fn chat_log(
        &self,
        user_id: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<NotificationMessage>, i64), LullError> {
        let (limit, offset) = page_window(page, page_size);

        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, user_id, kind, content, is_read, read_at, created_at \
             FROM messages WHERE user_id = ? AND kind IN ('chat_message', 'chat_reply') \
             ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to fetch chat log: {e}")))?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages \
             WHERE user_id = ? AND kind IN ('chat_message', 'chat_reply')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to count chat log: {e}")))?;

        Ok((messages_from_rows(rows)?, total.0))
    }

    /// Mark a message read if it belongs to the user. Returns the updated
    /// record, or `None` when not found or not owned.
    pub async fn mark_read(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> Result<Option<NotificationMessage>, LullError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1, read_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(now_stamp())
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to mark read: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT id, user_id, kind, content, is_read, read_at, created_at \
             FROM messages WHERE id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to fetch message: {e}")))?;

        row.map(message_from_row).transpose()
    }

    /// Delete a message if it belongs to the user. Returns whether a row
    /// was removed.
    pub async fn delete_message(&self, message_id: &str, user_id: &str) -> Result<bool, LullError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND user_id = ?")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to delete message: {e}")))?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, LullError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| LullError::Store(format!("failed to count unread: {e}")))?;
        Ok(count.0)
    }

    /// Whether a message of the given kind exists for the user within the
    /// time bounds. The daily sweep's idempotency guard.
    pub async fn has_message_between(
        &self,
        user_id: &str,
        kind: NotificationKind,
        start: &str,
        end: &str,
    ) -> Result<bool, LullError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages \
             WHERE user_id = ? AND kind = ? AND created_at BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to check messages: {e}")))?;
        Ok(count.0 > 0)
    }

    // --- Insights ---

    pub async fn get_insight(
        &self,
        user_id: &str,
        day_key: &str,
        period_type: &str,
    ) -> Result<Option<InsightArtifact>, LullError> {
        type Row = (String, String, i64, String, String, String, String);
        let row: Option<Row> = sqlx::query_as(
            "SELECT start_date, end_date, score, insight, analysis, recommendation, generated_at \
             FROM insights WHERE user_id = ? AND day_key = ? AND period_type = ?",
        )
        .bind(user_id)
        .bind(day_key)
        .bind(period_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to fetch insight: {e}")))?;

        Ok(row.map(
            |(start_date, end_date, score, insight, analysis, recommendation, generated_at)| {
                InsightArtifact {
                    user_id: user_id.to_string(),
                    day_key: day_key.to_string(),
                    period_type: period_type.to_string(),
                    start_date,
                    end_date,
                    score,
                    insight,
                    analysis,
                    recommendation,
                    generated_at,
                }
            },
        ))
    }

    /// Insert or replace the artifact for its (user, day-key, period) key.
    pub async fn upsert_insight(&self, artifact: &InsightArtifact) -> Result<(), LullError> {
        sqlx::query(
            "INSERT INTO insights \
             (user_id, day_key, period_type, start_date, end_date, score, \
              insight, analysis, recommendation, generated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, day_key, period_type) DO UPDATE SET \
                start_date = excluded.start_date, \
                end_date = excluded.end_date, \
                score = excluded.score, \
                insight = excluded.insight, \
                analysis = excluded.analysis, \
                recommendation = excluded.recommendation, \
                generated_at = excluded.generated_at",
        )
        .bind(&artifact.user_id)
        .bind(&artifact.day_key)
        .bind(&artifact.period_type)
        .bind(&artifact.start_date)
        .bind(&artifact.end_date)
        .bind(artifact.score)
        .bind(&artifact.insight)
        .bind(&artifact.analysis)
        .bind(&artifact.recommendation)
        .bind(&artifact.generated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LullError::Store(format!("failed to upsert insight: {e}")))?;
        Ok(())
    }

    /// Number of stored artifacts for a user (test assertions).
    pub async fn insight_count(&self, user_id: &str) -> Result<i64, LullError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM insights WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LullError::Store(format!("failed to count insights: {e}")))?;
        Ok(count.0)
    }
}

/// Clamp pagination inputs: page >= 1, size 1..=100 with a default of 20.
fn page_window(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let size = if page_size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    };
    (size, (page - 1) * size)
}

fn schedule_from_row(row: ScheduleRow) -> ScheduleDefinition {
    let (id, user_id, name, kind, recurrence, enabled, last_run_at) = row;
    ScheduleDefinition {
        id,
        user_id,
        name,
        kind,
        recurrence,
        enabled,
        last_run_at,
    }
}

fn message_from_row(row: MessageRow) -> Result<NotificationMessage, LullError> {
    let (id, user_id, kind, content, read, read_at, created_at) = row;
    let kind = NotificationKind::parse(&kind)
        .ok_or_else(|| LullError::Store(format!("unknown message kind '{kind}'")))?;
    Ok(NotificationMessage {
        id,
        user_id,
        kind,
        content,
        read,
        read_at,
        created_at,
    })
}

fn messages_from_rows(rows: Vec<MessageRow>) -> Result<Vec<NotificationMessage>, LullError> {
    rows.into_iter().map(message_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(1, 20), (20, 0));
        assert_eq!(page_window(3, 10), (10, 20));
        assert_eq!(page_window(0, 0), (20, 0));
        assert_eq!(page_window(-5, 500), (100, 0));
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds("2026-08-29");
        assert_eq!(start, "2026-08-29 00:00:00");
        assert_eq!(end, "2026-08-29 23:59:59");
    }

    #[tokio::test]
    async fn test_schedules_round_trip() {
        let store = Store::open_in_memory().await.unwrap();

        let def = ScheduleDefinition {
            id: "s1".into(),
            user_id: "u1".into(),
            name: "Wind down".into(),
            kind: "bedtime".into(),
            recurrence: "30 22 * * *".into(),
            enabled: true,
            last_run_at: None,
        };
        store.create_schedule(&def).await.unwrap();

        let disabled = ScheduleDefinition {
            id: "s2".into(),
            enabled: false,
            ..def.clone()
        };
        store.create_schedule(&disabled).await.unwrap();

        let enabled = store.enabled_schedules().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "s1");
        assert!(enabled[0].is_reminder());

        store
            .touch_schedule_last_run("s1", "2026-08-29 22:30:00")
            .await
            .unwrap();
        let got = store.get_schedule("s1").await.unwrap().unwrap();
        assert_eq!(got.last_run_at.as_deref(), Some("2026-08-29 22:30:00"));
    }

    #[tokio::test]
    async fn test_message_listing_and_read_state() {
        let store = Store::open_in_memory().await.unwrap();

        let m1 = store
            .create_message("u1", NotificationKind::ChatMessage, "hi")
            .await
            .unwrap();
        let m2 = store
            .create_message("u1", NotificationKind::ChatReply, "hello back")
            .await
            .unwrap();
        store
            .create_message("u1", NotificationKind::BedtimeReminder, "time for bed")
            .await
            .unwrap();
        store
            .create_message("u2", NotificationKind::ChatMessage, "other user")
            .await
            .unwrap();

        let (all, total) = store.list_messages("u1", 1, 20).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);
        // Newest first: insertion order breaks same-second ties.
        assert_eq!(all[2].id, m1.id);

        let (chat, chat_total) = store.chat_log("u1", 1, 20).await.unwrap();
        assert_eq!(chat_total, 2);
        // Oldest first.
        assert_eq!(chat[0].id, m1.id);
        assert_eq!(chat[1].id, m2.id);

        assert_eq!(store.unread_count("u1").await.unwrap(), 3);

        let updated = store.mark_read(&m1.id, "u1").await.unwrap().unwrap();
        assert!(updated.read);
        assert!(updated.read_at.is_some());
        assert_eq!(store.unread_count("u1").await.unwrap(), 2);

        // Not owned: no-op.
        assert!(store.mark_read(&m2.id, "u2").await.unwrap().is_none());
        assert!(!store.delete_message(&m2.id, "u2").await.unwrap());
        assert!(store.delete_message(&m2.id, "u1").await.unwrap());

        let (_, total) = store.list_messages("u1", 1, 20).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_message_pagination() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..5 {
            store
                .create_message("u1", NotificationKind::Announcement, &format!("n{i}"))
                .await
                .unwrap();
        }

        let (page1, total) = store.list_messages("u1", 1, 2).await.unwrap();
        let (page2, _) = store.list_messages("u1", 2, 2).await.unwrap();
        let (page3, _) = store.list_messages("u1", 3, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_eq!(page3.len(), 1);
        // Newest first across pages.
        assert_eq!(page1[0].content, "n4");
        assert_eq!(page3[0].content, "n0");
    }

    #[tokio::test]
    async fn test_entries_and_goal() {
        let store = Store::open_in_memory().await.unwrap();
        store.create_user("u1", "Ada", 0).await.unwrap();
        store.create_user("u2", "Grace", 420).await.unwrap();

        assert_eq!(store.user_goal_mins("u1").await.unwrap(), 480);
        assert_eq!(store.user_goal_mins("u2").await.unwrap(), 420);
        // Unknown users also get the default.
        assert_eq!(store.user_goal_mins("ghost").await.unwrap(), 480);

        store
            .add_entry("u1", "2026-08-28", 430, 7, "2026-08-29 07:10:00")
            .await
            .unwrap();
        store
            .add_entry("u1", "2026-08-27", 460, 8, "2026-08-28 07:05:00")
            .await
            .unwrap();

        assert!(store
            .has_entry_between("u1", "2026-08-29 00:00:00", "2026-08-29 23:59:59")
            .await
            .unwrap());
        assert!(!store
            .has_entry_between("u1", "2026-08-30 00:00:00", "2026-08-30 23:59:59")
            .await
            .unwrap());

        let entries = store.latest_entries("u1", 7).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_date, "2026-08-28");
    }

    #[tokio::test]
    async fn test_insight_upsert_replaces() {
        let store = Store::open_in_memory().await.unwrap();

        let mut artifact = InsightArtifact {
            user_id: "u1".into(),
            day_key: "2026-08-29".into(),
            period_type: "weekly".into(),
            start_date: "2026-08-22".into(),
            end_date: "2026-08-28".into(),
            score: 72,
            insight: "Solid week".into(),
            analysis: "On track for your 8h 0m goal".into(),
            recommendation: "Keep the routine".into(),
            generated_at: "2026-08-29 09:00:00".into(),
        };
        store.upsert_insight(&artifact).await.unwrap();

        artifact.score = 80;
        artifact.end_date = "2026-08-29".into();
        artifact.generated_at = "2026-08-29 21:00:00".into();
        store.upsert_insight(&artifact).await.unwrap();

        assert_eq!(store.insight_count("u1").await.unwrap(), 1);
        let got = store
            .get_insight("u1", "2026-08-29", "weekly")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.score, 80);
        assert_eq!(got.end_date, "2026-08-29");
    }
}

//! Daily sweep: remind every user who has not logged sleep today.
//!
//! A singleton background loop that fires once per day at a configured
//! hour, plus one catch-up pass at startup when the process comes up after
//! that hour. Day bounds are server-local for all users.

use crate::delivery::DeliveryEngine;
use chrono::{DateTime, Local, TimeZone, Timelike};
use lull_core::notification::NotificationKind;
use lull_core::LullError;
use lull_store::{day_bounds, today_key, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

const MISSING_LOG_TEXT: &str =
    "You haven't logged your sleep for today yet. A quick entry keeps your insights accurate.";

pub struct DailySweep {
    store: Store,
    delivery: Arc<DeliveryEngine>,
    hour: u32,
}

impl DailySweep {
    pub fn new(store: Store, delivery: Arc<DeliveryEngine>, hour: u32) -> Self {
        Self {
            store,
            delivery,
            hour: hour.min(23),
        }
    }

    /// Spawn the sweep loop. Runs a catch-up pass immediately when started
    /// at or past the configured hour.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if Local::now().hour() >= self.hour {
                match self.run_once().await {
                    Ok(n) => info!("sweep: catch-up pass created {n} notice(s)"),
                    Err(e) => error!("sweep: catch-up pass failed: {e}"),
                }
            }

            loop {
                let wait = until_next_run(self.hour, Local::now());
                tokio::time::sleep(wait).await;
                match self.run_once().await {
                    Ok(n) => info!("sweep: daily pass created {n} notice(s)"),
                    Err(e) => error!("sweep: daily pass failed: {e}"),
                }
            }
        })
    }

    /// One full scan over all users. Returns the number of notices created.
    ///
    /// Idempotent within a day: a user is skipped when they already have a
    /// sleep entry or a missing-log notice inside today's bounds.
    pub async fn run_once(&self) -> Result<usize, LullError> {
        let day = today_key();
        let (start, end) = day_bounds(&day);
        let users = self.store.list_user_ids().await?;

        let mut created = 0;
        for user_id in &users {
            match self.sweep_user(user_id, &start, &end).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                // One failing user never aborts the scan.
                Err(e) => error!("sweep: user {user_id} failed: {e}"),
            }
        }
        Ok(created)
    }

    async fn sweep_user(&self, user_id: &str, start: &str, end: &str) -> Result<bool, LullError> {
        if self.store.has_entry_between(user_id, start, end).await? {
            return Ok(false);
        }
        if self
            .store
            .has_message_between(user_id, NotificationKind::MissingLog, start, end)
            .await?
        {
            return Ok(false);
        }

        self.delivery
            .deliver(user_id, MISSING_LOG_TEXT, NotificationKind::MissingLog)
            .await?;
        Ok(true)
    }
}

/// Time until the next run at `hour:00` local, strictly in the future.
fn until_next_run(hour: u32, now: DateTime<Local>) -> Duration {
    let mut date = now.date_naive();
    if now.hour() >= hour {
        date = date.succ_opt().unwrap_or(date);
    }
    let target = date
        .and_hms_opt(hour, 0, 0)
        .and_then(|naive| Local.from_local_datetime(&naive).earliest());

    match target {
        Some(t) => (t - now).to_std().unwrap_or(Duration::from_secs(60)),
        // DST gap with no representable instant. Re-check in an hour.
        None => Duration::from_secs(3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceRegistry;
    use lull_store::now_stamp;

    async fn sweep() -> (DailySweep, Store) {
        let store = Store::open_in_memory().await.unwrap();
        let presence = Arc::new(PresenceRegistry::new());
        let delivery = Arc::new(DeliveryEngine::new(store.clone(), presence));
        (DailySweep::new(store.clone(), delivery, 8), store)
    }

    #[tokio::test]
    async fn test_user_with_entry_today_gets_no_notice() {
        let (sweep, store) = sweep().await;
        store.create_user("ada", "Ada", 480).await.unwrap();
        store
            .add_entry("ada", &today_key(), 460, 8, &now_stamp())
            .await
            .unwrap();

        assert_eq!(sweep.run_once().await.unwrap(), 0);
        let (_, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_backfilled_entry_logged_today_counts_as_logging() {
        let (sweep, store) = sweep().await;
        store.create_user("ada", "Ada", 480).await.unwrap();
        // An entry for an earlier date, created today, is logging activity.
        store
            .add_entry("ada", "2026-01-05", 440, 7, &now_stamp())
            .await
            .unwrap();

        assert_eq!(sweep.run_once().await.unwrap(), 0);
        let (_, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_user_without_entry_gets_one_notice() {
        let (sweep, store) = sweep().await;
        store.create_user("ada", "Ada", 480).await.unwrap();

        assert_eq!(sweep.run_once().await.unwrap(), 1);

        let (messages, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(messages[0].kind, NotificationKind::MissingLog);
    }

    #[tokio::test]
    async fn test_repeated_sweeps_are_idempotent() {
        let (sweep, store) = sweep().await;
        store.create_user("ada", "Ada", 480).await.unwrap();

        assert_eq!(sweep.run_once().await.unwrap(), 1);
        assert_eq!(sweep.run_once().await.unwrap(), 0);
        assert_eq!(sweep.run_once().await.unwrap(), 0);

        let (_, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_mixed_users() {
        let (sweep, store) = sweep().await;
        store.create_user("ada", "Ada", 480).await.unwrap();
        store.create_user("brin", "Brin", 450).await.unwrap();
        store
            .add_entry("brin", &today_key(), 430, 7, &now_stamp())
            .await
            .unwrap();

        assert_eq!(sweep.run_once().await.unwrap(), 1);
        let (_, ada_total) = store.list_messages("ada", 1, 20).await.unwrap();
        let (_, brin_total) = store.list_messages("brin", 1, 20).await.unwrap();
        assert_eq!(ada_total, 1);
        assert_eq!(brin_total, 0);
    }

    #[test]
    fn test_until_next_run_before_and_after_hour() {
        let before = Local.with_ymd_and_hms(2026, 3, 14, 6, 0, 0).unwrap();
        let wait = until_next_run(8, before);
        assert_eq!(wait, Duration::from_secs(2 * 3600));

        let after = Local.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let wait = until_next_run(8, after);
        assert_eq!(wait, Duration::from_secs(23 * 3600));
    }
}

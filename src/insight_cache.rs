//! Freshness-checked cache of generated sleep insights.
//!
//! One artifact per (user, day-key, period type). A stored artifact is
//! served only while nothing it was computed from has moved: same source
//! range end, generated after the newest entry update, and the analysis
//! still speaks to the user's current goal. Anything else regenerates and
//! upserts in place.

use crate::delivery::DeliveryEngine;
use lull_core::entry::SleepEntry;
use lull_core::insight::{goal_text, InsightArtifact, InsightReport};
use lull_core::notification::NotificationKind;
use lull_core::traits::InsightGenerator;
use lull_core::LullError;
use lull_store::{now_stamp, today_key, Store};
use std::sync::Arc;
use tracing::{info, warn};

pub const SOURCE_CACHE: &str = "cache";
pub const SOURCE_GENERATED: &str = "generated";

pub struct InsightCache {
    store: Store,
    generator: Arc<dyn InsightGenerator>,
    delivery: Arc<DeliveryEngine>,
}

impl InsightCache {
    pub fn new(
        store: Store,
        generator: Arc<dyn InsightGenerator>,
        delivery: Arc<DeliveryEngine>,
    ) -> Self {
        Self {
            store,
            generator,
            delivery,
        }
    }

    /// Serve the cached artifact when it is still fresh, otherwise call the
    /// generator and upsert. Returns the report plus where it came from.
    ///
    /// A generation failure propagates to the caller; nothing is cached for
    /// a failed attempt.
    pub async fn get_or_compute(
        &self,
        user_id: &str,
        period: &str,
        entries: &[SleepEntry],
        goal_mins: i64,
    ) -> Result<(&'static str, InsightReport), LullError> {
        if entries.is_empty() {
            return Err(LullError::Insight("no entries to analyze".to_string()));
        }

        let day_key = today_key();
        let latest_range_end = entries
            .iter()
            .map(|e| e.entry_date.as_str())
            .max()
            .unwrap_or_default()
            .to_string();
        let latest_source_ts = entries
            .iter()
            .map(|e| e.updated_at.as_str())
            .max()
            .unwrap_or_default()
            .to_string();
        let goal = goal_text(goal_mins);

        if let Some(existing) = self.store.get_insight(user_id, &day_key, period).await? {
            let fresh = existing.end_date == latest_range_end
                && existing.generated_at > latest_source_ts
                && existing.analysis.contains(&goal);
            if fresh {
                info!("insight: cache hit for {user_id} ({period} {day_key})");
                return Ok((SOURCE_CACHE, existing.report()));
            }
        }

        let report = self
            .generator
            .generate(goal_mins, entries, period)
            .await?;

        let start_date = entries
            .iter()
            .map(|e| e.entry_date.as_str())
            .min()
            .unwrap_or_default()
            .to_string();
        let artifact = InsightArtifact {
            user_id: user_id.to_string(),
            day_key,
            period_type: period.to_string(),
            start_date,
            end_date: latest_range_end,
            score: report.score,
            insight: report.insight.clone(),
            analysis: report.analysis.clone(),
            recommendation: report.recommendation.clone(),
            generated_at: now_stamp(),
        };
        self.store.upsert_insight(&artifact).await?;
        info!("insight: generated for {user_id} ({period})");

        // Announce the fresh insight. Best effort only.
        let announcement = format!("Your {period} sleep insight is ready.");
        if let Err(e) = self
            .delivery
            .deliver(user_id, &announcement, NotificationKind::Announcement)
            .await
        {
            warn!("insight: announcement for {user_id} failed: {e}");
        }

        Ok((SOURCE_GENERATED, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Generator that records calls and answers with an analysis naming the
    /// requested goal, the way the live prompt instructs the model to.
    struct MockGenerator {
        calls: Mutex<u32>,
    }

    impl MockGenerator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl InsightGenerator for MockGenerator {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(
            &self,
            goal_mins: i64,
            _entries: &[SleepEntry],
            period: &str,
        ) -> Result<InsightReport, LullError> {
            *self.calls.lock().unwrap() += 1;
            Ok(InsightReport {
                score: 72,
                insight: "Solid week".to_string(),
                analysis: format!("You are closing in on your {} goal.", goal_text(goal_mins)),
                recommendation: format!("Keep the {period} rhythm going."),
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl InsightGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _goal_mins: i64,
            _entries: &[SleepEntry],
            _period: &str,
        ) -> Result<InsightReport, LullError> {
            Err(LullError::Insight("model unavailable".to_string()))
        }
    }

    fn entries(updated_at: &str) -> Vec<SleepEntry> {
        vec![
            SleepEntry {
                entry_date: "2026-08-28".to_string(),
                duration_mins: 450,
                rating: 8,
                updated_at: updated_at.to_string(),
            },
            SleepEntry {
                entry_date: "2026-08-27".to_string(),
                duration_mins: 420,
                rating: 6,
                updated_at: "2020-01-02 07:00:00".to_string(),
            },
        ]
    }

    async fn cache(generator: Arc<dyn InsightGenerator>) -> (InsightCache, Store) {
        let store = Store::open_in_memory().await.unwrap();
        let presence = Arc::new(PresenceRegistry::new());
        let delivery = Arc::new(DeliveryEngine::new(store.clone(), presence));
        (
            InsightCache::new(store.clone(), generator, delivery),
            store,
        )
    }

    #[tokio::test]
    async fn test_second_identical_call_hits_cache() {
        let generator = Arc::new(MockGenerator::new());
        let (cache, _store) = cache(generator.clone()).await;
        let entries = entries("2020-01-03 07:00:00");

        let (source1, report1) = cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap();
        let (source2, report2) = cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap();

        assert_eq!(source1, SOURCE_GENERATED);
        assert_eq!(source2, SOURCE_CACHE);
        assert_eq!(generator.calls(), 1);
        assert_eq!(report1, report2);
    }

    #[tokio::test]
    async fn test_newer_entry_forces_regeneration_and_replaces_artifact() {
        let generator = Arc::new(MockGenerator::new());
        let (cache, store) = cache(generator.clone()).await;

        cache
            .get_or_compute("ada", "weekly", &entries("2020-01-03 07:00:00"), 480)
            .await
            .unwrap();

        // An entry touched after the artifact was generated invalidates it.
        let (source, _) = cache
            .get_or_compute("ada", "weekly", &entries("2999-01-01 00:00:00"), 480)
            .await
            .unwrap();

        assert_eq!(source, SOURCE_GENERATED);
        assert_eq!(generator.calls(), 2);
        // Upsert, not a second row.
        assert_eq!(store.insight_count("ada").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_goal_change_invalidates_cache() {
        let generator = Arc::new(MockGenerator::new());
        let (cache, _store) = cache(generator.clone()).await;
        let entries = entries("2020-01-03 07:00:00");

        cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap();
        let (source, report) = cache
            .get_or_compute("ada", "weekly", &entries, 450)
            .await
            .unwrap();

        assert_eq!(source, SOURCE_GENERATED);
        assert_eq!(generator.calls(), 2);
        assert!(report.analysis.contains("7h 30m"));
    }

    #[tokio::test]
    async fn test_generation_announces_and_cache_hit_does_not() {
        let generator = Arc::new(MockGenerator::new());
        let (cache, store) = cache(generator).await;
        let entries = entries("2020-01-03 07:00:00");

        cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap();
        let (messages, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(messages[0].kind, NotificationKind::Announcement);

        cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap();
        let (_, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_generation_failure_caches_nothing() {
        let (cache, store) = cache(Arc::new(FailingGenerator)).await;
        let entries = entries("2020-01-03 07:00:00");

        let err = cache
            .get_or_compute("ada", "weekly", &entries, 480)
            .await
            .unwrap_err();
        assert!(matches!(err, LullError::Insight(_)));
        assert_eq!(store.insight_count("ada").await.unwrap(), 0);
        let (_, total) = store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_empty_entries_rejected() {
        let (cache, _store) = cache(Arc::new(MockGenerator::new())).await;
        let err = cache
            .get_or_compute("ada", "weekly", &[], 480)
            .await
            .unwrap_err();
        assert!(matches!(err, LullError::Insight(_)));
    }
}

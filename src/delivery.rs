//! Persist-then-push notification delivery.

use crate::presence::PresenceRegistry;
use lull_core::notification::{NotificationKind, NotificationMessage, PushEvent};
use lull_core::LullError;
use lull_store::Store;
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes every notification to the store first, then pushes it to the
/// user's live connection when one exists. A failed or impossible push is
/// never an error: the record stays available for pull retrieval.
#[derive(Clone)]
pub struct DeliveryEngine {
    store: Store,
    presence: Arc<PresenceRegistry>,
}

impl DeliveryEngine {
    pub fn new(store: Store, presence: Arc<PresenceRegistry>) -> Self {
        Self { store, presence }
    }

    /// Persist a notification and attempt realtime push.
    pub async fn deliver(
        &self,
        user_id: &str,
        content: &str,
        kind: NotificationKind,
    ) -> Result<NotificationMessage, LullError> {
        // Persistence always precedes the push attempt.
        let message = self.store.create_message(user_id, kind, content).await?;

        match self.presence.lookup(user_id) {
            Some(handle) => {
                let event = PushEvent::for_message(&message);
                if let Err(e) = handle.sender.try_send(event) {
                    warn!(
                        "delivery: push to {user_id} (conn {}) failed, stored only: {e}",
                        handle.conn_id
                    );
                }
            }
            None => {
                debug!("delivery: {user_id} offline, {} stored only", kind.as_str());
            }
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::ConnectionHandle;
    use tokio::sync::mpsc;

    async fn engine() -> (DeliveryEngine, Arc<PresenceRegistry>) {
        let store = Store::open_in_memory().await.unwrap();
        let presence = Arc::new(PresenceRegistry::new());
        (DeliveryEngine::new(store.clone(), presence.clone()), presence)
    }

    #[tokio::test]
    async fn test_deliver_pushes_to_present_user() {
        let (engine, presence) = engine().await;
        let (tx, mut rx) = mpsc::channel(8);
        presence.put(
            "ada",
            ConnectionHandle {
                conn_id: presence.next_conn_id(),
                sender: tx,
            },
        );

        let message = engine
            .deliver("ada", "hello there", NotificationKind::ChatMessage)
            .await
            .unwrap();

        let event = rx.try_recv().expect("one push event");
        assert_eq!(event.event, "chat:message");
        assert_eq!(event.message_id, message.id);
        assert_eq!(event.content, "hello there");
        // Exactly one push.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_persists_when_offline() {
        let (engine, _presence) = engine().await;

        let message = engine
            .deliver("ada", "time to sleep", NotificationKind::BedtimeReminder)
            .await
            .unwrap();
        assert_eq!(message.kind, NotificationKind::BedtimeReminder);
        assert!(!message.read);

        let (stored, total) = engine.store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(stored[0].id, message.id);
    }

    #[tokio::test]
    async fn test_full_push_buffer_is_not_an_error() {
        let (engine, presence) = engine().await;
        let (tx, _rx) = mpsc::channel(1);
        presence.put(
            "ada",
            ConnectionHandle {
                conn_id: presence.next_conn_id(),
                sender: tx,
            },
        );

        // Second try_send hits a full buffer; delivery still succeeds.
        engine
            .deliver("ada", "one", NotificationKind::Announcement)
            .await
            .unwrap();
        engine
            .deliver("ada", "two", NotificationKind::Announcement)
            .await
            .unwrap();

        let (_, total) = engine.store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_no_push_after_disconnect() {
        let (engine, presence) = engine().await;
        let (tx, mut rx) = mpsc::channel(8);
        let conn_id = presence.next_conn_id();
        presence.put("ada", ConnectionHandle { conn_id, sender: tx });
        presence.remove(conn_id);

        engine
            .deliver("ada", "anyone home?", NotificationKind::ChatReply)
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
        let (_, total) = engine.store.list_messages("ada", 1, 20).await.unwrap();
        assert_eq!(total, 1);
    }
}

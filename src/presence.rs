//! In-memory map of which users hold a live WebSocket connection.
//!
//! One connection per user: a new registration replaces the previous one.
//! Disconnect cleanup goes through the reverse map so a stale disconnect
//! cannot evict a newer connection for the same user.

use lull_core::notification::PushEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Handle to one live connection's writer task.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub conn_id: u64,
    pub sender: mpsc::Sender<PushEvent>,
}

#[derive(Default)]
struct Maps {
    by_user: HashMap<String, ConnectionHandle>,
    by_conn: HashMap<u64, String>,
}

/// user_id ↔ connection registry. Both maps live behind one mutex so
/// insert/remove stay atomic pairs.
pub struct PresenceRegistry {
    conn_counter: AtomicU64,
    maps: Mutex<Maps>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            conn_counter: AtomicU64::new(0),
            maps: Mutex::new(Maps::default()),
        }
    }

    /// Allocate a connection id. Monotonic within the process lifetime.
    pub fn next_conn_id(&self) -> u64 {
        self.conn_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Register a connection for a user. Last registration wins; any
    /// previous handle for the user is dropped along with its reverse entry.
    pub fn put(&self, user_id: &str, handle: ConnectionHandle) {
        let mut maps = self.maps.lock().unwrap();
        if let Some(old) = maps.by_user.insert(user_id.to_string(), handle.clone()) {
            maps.by_conn.remove(&old.conn_id);
        }
        maps.by_conn.insert(handle.conn_id, user_id.to_string());
    }

    /// Remove a connection by id, returning the user it belonged to.
    ///
    /// The forward entry is only removed while it still points at this
    /// conn_id. No-op for unknown handles.
    pub fn remove(&self, conn_id: u64) -> Option<String> {
        let mut maps = self.maps.lock().unwrap();
        let user_id = maps.by_conn.remove(&conn_id)?;
        if maps
            .by_user
            .get(&user_id)
            .is_some_and(|h| h.conn_id == conn_id)
        {
            maps.by_user.remove(&user_id);
        }
        Some(user_id)
    }

    /// Current handle for a user, if connected.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.maps.lock().unwrap().by_user.get(user_id).cloned()
    }

    pub fn online_count(&self) -> usize {
        self.maps.lock().unwrap().by_user.len()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Job registry: one timer task per active schedule.
//!
//! Definitions are owned by an external CRUD surface; the registry only
//! re-derives its timer set when told to. Each timer holds the definition
//! snapshot captured at registration, so an edited schedule takes effect
//! only after a re-register.

use crate::delivery::DeliveryEngine;
use chrono::Local;
use lull_core::notification::NotificationKind;
use lull_core::recurrence::{NextFire, Recurrence};
use lull_core::schedule::ScheduleDefinition;
use lull_core::LullError;
use lull_store::{now_stamp, Store};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct JobRegistry {
    store: Store,
    delivery: Arc<DeliveryEngine>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl JobRegistry {
    pub fn new(store: Store, delivery: Arc<DeliveryEngine>) -> Self {
        Self {
            store,
            delivery,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a schedule, replacing any existing timer for the same id.
    ///
    /// An empty or unparseable recurrence is a silent no-op: the schedule
    /// simply has no timer until a valid expression is registered.
    pub fn register(&self, def: ScheduleDefinition) {
        self.unregister(&def.id);

        if def.recurrence.trim().is_empty() {
            debug!("registry: schedule {} has no recurrence, skipping", def.id);
            return;
        }
        let recurrence = match Recurrence::parse(&def.recurrence) {
            Ok(r) => r,
            Err(e) => {
                debug!("registry: schedule {} not schedulable: {e}", def.id);
                return;
            }
        };
        // An expression with no future fire time (e.g. Feb 30) gets no
        // timer; a finished task must never linger in the map.
        if recurrence.next_after(Local::now()).is_none() {
            debug!("registry: schedule {} never fires, skipping", def.id);
            return;
        }

        let id = def.id.clone();
        let store = self.store.clone();
        let delivery = self.delivery.clone();

        let handle = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let Some(next) = recurrence.next_after(now) else {
                    info!("registry: schedule {} has no future fire time", def.id);
                    return;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                // A failed tick never kills the timer.
                if let Err(e) = run_tick(&store, &delivery, &def).await {
                    error!("registry: schedule {} tick failed: {e}", def.id);
                }
            }
        });

        // A displaced handle is aborted in the same lock section that
        // inserts; one id never has two live timers even when registers
        // race past the unregister above.
        if let Some(old) = self.timers.lock().unwrap().insert(id, handle) {
            old.abort();
        }
    }

    /// Abort and remove the timer for a schedule id, if any.
    pub fn unregister(&self, id: &str) {
        if let Some(handle) = self.timers.lock().unwrap().remove(id) {
            handle.abort();
            debug!("registry: schedule {id} unregistered");
        }
    }

    /// Register every enabled schedule from the store. Returns the number
    /// of timers actually started.
    pub async fn load_all(&self) -> Result<usize, LullError> {
        let schedules = self.store.enabled_schedules().await?;
        for def in schedules {
            self.register(def);
        }
        let count = self.active_count();
        info!("registry: {count} schedule timer(s) active");
        Ok(count)
    }

    pub fn active_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    /// Abort all timers.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}

/// One firing of a schedule: advance `last_run_at`, then act on the kind.
pub(crate) async fn run_tick(
    store: &Store,
    delivery: &DeliveryEngine,
    def: &ScheduleDefinition,
) -> Result<(), LullError> {
    store.touch_schedule_last_run(&def.id, &now_stamp()).await?;

    if def.is_reminder() {
        let content = format!("It's time for bed! {}", def.name);
        delivery
            .deliver(&def.user_id, &content, NotificationKind::BedtimeReminder)
            .await?;
        info!("registry: bedtime reminder sent for schedule {}", def.id);
    }

    Ok(())
}

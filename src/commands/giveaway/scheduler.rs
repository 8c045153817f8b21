use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::GiveawayId;

// Registry of one cancellable expiry timer per active giveaway.
//
// The durable store stays the sole source of truth: a timer lost to a
// shutdown or a crash is re-derived from the persisted end times by the
// recovery scan on the next startup.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: DashMap<GiveawayId, JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            timers: DashMap::new(),
        }
    }

    // Spawns a task that sleeps until the end time and settles the
    // giveaway. An end time in the past fires immediately.
    pub fn arm(
        &self,
        manager: Arc<GiveawayManager>,
        guild_id: u64,
        giveaway_id: GiveawayId,
        end_time: DateTime<Utc>,
    ) {
        let delay = (end_time - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = manager.settle(guild_id, giveaway_id).await {
                error!("Can't settle giveaway {giveaway_id} on expiry: {err}");
            }
        });

        if let Some(replaced) = self.timers.insert(giveaway_id, handle) {
            replaced.abort();
        }
    }

    // Drops the registry entry once the settlement has claimed the
    // record. Called from inside the timer task itself, so it must not
    // abort the handle.
    pub fn clear(&self, giveaway_id: GiveawayId) {
        self.timers.remove(&giveaway_id);
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    // The startup recovery scan: settles everything that expired while
    // the process was down and re-arms timers for the rest. A failure
    // for one giveaway never aborts the scan for the remaining ones.
    pub async fn restore(&self, manager: &Arc<GiveawayManager>) {
        let now = Utc::now();
        for guild_id in manager.store().guild_ids() {
            for record in manager.store().active_giveaways(guild_id) {
                if !record.is_active() {
                    // A crash between the status transition and the
                    // archival leaves an ended record in the active
                    // index. Finish the bookkeeping without re-running
                    // the draw.
                    warn!("Found the settled giveaway {} in the active index", record.id);
                    if let Err(err) = manager.store().archive_giveaway(guild_id, record) {
                        error!("Can't archive a settled giveaway: {err}");
                    }
                    continue;
                }

                if record.is_expired(now) {
                    info!(
                        "Giveaway {} expired while the bot was offline, settling it now",
                        record.id
                    );
                    if let Err(err) = manager.settle(guild_id, record.id).await {
                        error!("Can't settle the expired giveaway {}: {err}", record.id);
                    }
                } else {
                    self.arm(manager.clone(), guild_id, record.id, record.end_time);
                }
            }
        }
    }

    // Cancels all pending timers without settling anything.
    pub fn shutdown(&self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
        self.timers.clear();
        info!("All giveaway expiry timers have been cancelled");
    }
}

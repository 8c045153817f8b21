use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::commands::giveaway::collaborators::{Directory, Ledger, Presenter, Progression};
use crate::commands::giveaway::draw;
use crate::commands::giveaway::models::{
    GiveawayId, GiveawayRecord, PrizeItem, PrizePool,
};
use crate::commands::giveaway::scheduler::Scheduler;
use crate::commands::giveaway::store::GiveawayStore;
use crate::error::{Error, Result};

// The verdict of the guarded re-check that closes the entry pipeline.
enum EntryVerdict {
    Entered,
    Duplicate,
    Rejected(Error),
}

// Owns the giveaway state and the pipelines mutating it: pool
// administration, the entry gate, withdrawals and the settlement.
//
// All mutations of a single giveaway record are serialized through a
// per-record lock; collaborator calls (ledger, progression, directory,
// presenter) are potentially blocking I/O and never happen while such
// a lock is held.
pub struct GiveawayManager {
    store: GiveawayStore,
    scheduler: Scheduler,
    directory: Arc<dyn Directory>,
    presenter: Arc<dyn Presenter>,
    ledger: Option<Arc<dyn Ledger>>,
    progression: Option<Arc<dyn Progression>>,
    // Whether a withdrawal returns the entry fee. Off by default.
    refund_on_withdraw: bool,
    record_locks: DashMap<GiveawayId, Arc<Mutex<()>>>,
}

impl GiveawayManager {
    pub fn new(
        store: GiveawayStore,
        directory: Arc<dyn Directory>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        GiveawayManager {
            store,
            scheduler: Scheduler::new(),
            directory,
            presenter,
            ledger: None,
            progression: None,
            refund_on_withdraw: false,
            record_locks: DashMap::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_progression(mut self, progression: Arc<dyn Progression>) -> Self {
        self.progression = Some(progression);
        self
    }

    pub fn with_refund_on_withdraw(mut self, refund_on_withdraw: bool) -> Self {
        self.refund_on_withdraw = refund_on_withdraw;
        self
    }

    pub fn store(&self) -> &GiveawayStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // ---- Pool administration ----

    pub fn create_pool(
        &self,
        guild_id: u64,
        name: &str,
        cost_per_entry: u64,
        required_role_id: Option<u64>,
    ) -> Result<()> {
        if self.store.pool(guild_id, name).is_some() {
            let message = format!("The prize pool `{name}` already exists, please use another name.");
            return Err(Error::Configuration(message));
        }

        self.store
            .put_pool(guild_id, name, PrizePool::new(cost_per_entry, required_role_id))
    }

    pub fn delete_pool(&self, guild_id: u64, name: &str) -> Result<()> {
        match self.store.delete_pool(guild_id, name)? {
            true => Ok(()),
            false => {
                let message = format!("The prize pool `{name}` doesn't exist.");
                Err(Error::Configuration(message))
            }
        }
    }

    pub fn pool(&self, guild_id: u64, name: &str) -> Option<PrizePool> {
        self.store.pool(guild_id, name)
    }

    pub fn pools(&self, guild_id: u64) -> HashMap<String, PrizePool> {
        self.store.pools(guild_id)
    }

    pub fn add_pool_item(&self, guild_id: u64, pool_name: &str, item: PrizeItem) -> Result<()> {
        let mut pool = self.store.pool(guild_id, pool_name).ok_or_else(|| {
            Error::Configuration(format!("The prize pool `{pool_name}` doesn't exist."))
        })?;

        pool.add_item(item)?;
        self.store.put_pool(guild_id, pool_name, pool)
    }

    pub fn remove_pool_item(&self, guild_id: u64, pool_name: &str, item_name: &str) -> Result<()> {
        let mut pool = self.store.pool(guild_id, pool_name).ok_or_else(|| {
            Error::Configuration(format!("The prize pool `{pool_name}` doesn't exist."))
        })?;

        pool.remove_item(item_name)?;
        self.store.put_pool(guild_id, pool_name, pool)
    }

    // ---- Giveaway lifecycle ----

    // Creates the record, announces it and arms the expiry timer.
    pub async fn start_giveaway(
        self: &Arc<Self>,
        guild_id: u64,
        pool_name: &str,
        channel_id: u64,
        duration: Duration,
        entry_emoji: &str,
        required_level: u32,
        max_participants: u32,
    ) -> Result<GiveawayRecord> {
        let pool = self.store.pool(guild_id, pool_name).ok_or_else(|| {
            Error::Configuration(format!("The prize pool `{pool_name}` doesn't exist."))
        })?;
        if pool.items.is_empty() {
            let message = format!("The prize pool `{pool_name}` doesn't have any items to draw.");
            return Err(Error::Configuration(message));
        }

        let end_time = Utc::now() + duration;
        let mut record = GiveawayRecord::new(
            pool_name,
            channel_id,
            end_time,
            entry_emoji,
            required_level,
            max_participants,
        );

        match self.presenter.announce_created(guild_id, &record, &pool).await? {
            Some(message_id) => record.message_id = Some(message_id),
            None => warn!(
                "The announcement of giveaway {} produced no message, reaction entries are unavailable",
                record.id
            ),
        }

        self.store.put_giveaway(guild_id, record.clone())?;
        self.scheduler
            .arm(self.clone(), guild_id, record.id, record.end_time);

        info!(
            "Giveaway {} for the pool `{pool_name}` runs until {end_time}",
            record.id
        );
        Ok(record)
    }

    // The entry gate. A rejection after the entry reaction already
    // landed retracts the reaction and explains the reason to the user
    // in private; the giveaway state stays untouched.
    pub async fn try_enter(&self, guild_id: u64, giveaway_id: GiveawayId, user_id: u64) -> Result<()> {
        let result = self.enter_pipeline(guild_id, giveaway_id, user_id).await;

        if let Err(ref err) = result {
            if err.is_user_facing() {
                if let Some(record) = self.store.giveaway(guild_id, giveaway_id) {
                    if let Err(retract_err) =
                        self.presenter.retract_entry_marker(&record, user_id).await
                    {
                        warn!("Can't retract the entry reaction of user {user_id}: {retract_err}");
                    }
                }
                if let Err(notify_err) = self.presenter.notify_user(user_id, &err.to_string()).await
                {
                    warn!("Can't notify user {user_id} about the rejection: {notify_err}");
                }
            }
        }

        result
    }

    async fn enter_pipeline(
        &self,
        guild_id: u64,
        giveaway_id: GiveawayId,
        user_id: u64,
    ) -> Result<()> {
        let snapshot = self.store.giveaway(guild_id, giveaway_id).ok_or_else(|| {
            Error::Configuration("This giveaway is no longer running.".to_string())
        })?;

        if !snapshot.is_active() {
            return Err(Error::Eligibility("This giveaway has already ended.".to_string()));
        }
        // Re-adding the same reaction is a no-op, never a second debit.
        if snapshot.has_participant(user_id) {
            return Ok(());
        }

        let pool = self.store.pool(guild_id, &snapshot.pool_name).ok_or_else(|| {
            Error::Configuration(format!(
                "The prize pool `{}` is misconfigured, please contact an administrator.",
                snapshot.pool_name
            ))
        })?;

        if let Some(role_id) = pool.required_role_id {
            if !self.directory.has_role(guild_id, user_id, role_id).await? {
                return Err(Error::Eligibility(
                    "You don't have the role required for entering this giveaway.".to_string(),
                ));
            }
        }

        if snapshot.required_level > 0 {
            let progression = self.progression.as_ref().ok_or_else(|| {
                Error::Configuration(
                    "This giveaway requires a level, but no leveling system is configured."
                        .to_string(),
                )
            })?;

            let level = progression.level(user_id).await?;
            if level < snapshot.required_level {
                return Err(Error::Eligibility(format!(
                    "Your current level is `{level}`, while the giveaway requires at least `{}`.",
                    snapshot.required_level
                )));
            }
        }

        if snapshot.is_full() {
            return Err(Error::Capacity(format!(
                "The giveaway has reached its participant cap of `{}`.",
                snapshot.max_participants
            )));
        }

        // Entries are paid at submission time. The debit runs before
        // the record lock is taken: the ledger call is blocking I/O
        // and must not stall unrelated entries.
        let mut debited = 0;
        if pool.cost_per_entry > 0 {
            let ledger = self.ledger.as_ref().ok_or_else(|| {
                Error::Configuration(
                    "This giveaway costs tokens to enter, but no currency system is configured."
                        .to_string(),
                )
            })?;

            let balance = ledger.balance(user_id).await?;
            if balance < pool.cost_per_entry {
                return Err(Error::Eligibility(format!(
                    "Entering requires `{}` token(s), you only have `{balance}`.",
                    pool.cost_per_entry
                )));
            }
            if !ledger.debit(user_id, pool.cost_per_entry).await? {
                return Err(Error::Eligibility(format!(
                    "Entering requires `{}` token(s) and your balance doesn't cover it.",
                    pool.cost_per_entry
                )));
            }
            debited = pool.cost_per_entry;
        }

        // The final check-and-insert runs under the per-record lock:
        // the world may have moved while the collaborators were busy.
        let lock = self.record_lock(giveaway_id);
        let verdict = {
            let _guard = lock.lock().await;
            match self.store.giveaway(guild_id, giveaway_id) {
                None => EntryVerdict::Rejected(Error::Configuration(
                    "This giveaway is no longer running.".to_string(),
                )),
                Some(record) if !record.is_active() => EntryVerdict::Rejected(Error::Eligibility(
                    "This giveaway has already ended.".to_string(),
                )),
                Some(record) if record.has_participant(user_id) => EntryVerdict::Duplicate,
                Some(record) if record.is_full() => EntryVerdict::Rejected(Error::Capacity(format!(
                    "The giveaway has reached its participant cap of `{}`.",
                    record.max_participants
                ))),
                Some(mut record) => {
                    record.add_participant(user_id);
                    match self.store.put_giveaway(guild_id, record) {
                        Ok(()) => EntryVerdict::Entered,
                        Err(err) => EntryVerdict::Rejected(err),
                    }
                }
            }
        };

        match verdict {
            EntryVerdict::Entered => {
                info!("User {user_id} entered giveaway {giveaway_id}");
                Ok(())
            }
            EntryVerdict::Duplicate => {
                // Lost the race against an identical entry; the debit
                // is compensated so the user pays once.
                self.refund(user_id, debited).await;
                Ok(())
            }
            EntryVerdict::Rejected(err) => {
                self.refund(user_id, debited).await;
                Err(err)
            }
        }
    }

    // Removes the user from the participant set. The entry fee is only
    // returned when the manager was configured to do so.
    pub async fn withdraw(&self, guild_id: u64, giveaway_id: GiveawayId, user_id: u64) -> Result<()> {
        let lock = self.record_lock(giveaway_id);
        let withdrawn_from = {
            let _guard = lock.lock().await;
            match self.store.giveaway(guild_id, giveaway_id) {
                Some(mut record) if record.is_active() => {
                    match record.remove_participant(user_id) {
                        true => {
                            let pool_name = record.pool_name.clone();
                            self.store.put_giveaway(guild_id, record)?;
                            Some(pool_name)
                        }
                        false => None,
                    }
                }
                _ => None,
            }
        };

        if let Some(pool_name) = withdrawn_from {
            info!("User {user_id} withdrew from giveaway {giveaway_id}");
            if self.refund_on_withdraw {
                if let Some(pool) = self.store.pool(guild_id, &pool_name) {
                    self.refund(user_id, pool.cost_per_entry).await;
                }
            }
        }
        Ok(())
    }

    // The terminal transition: claims the record, draws the winners
    // and archives the result. Safe to call concurrently and after the
    // fact — whoever loses the status transition backs off without
    // re-running the draw.
    pub async fn settle(&self, guild_id: u64, giveaway_id: GiveawayId) -> Result<()> {
        let lock = self.record_lock(giveaway_id);
        let mut record = {
            let _guard = lock.lock().await;
            let mut record = match self.store.giveaway(guild_id, giveaway_id) {
                Some(record) => record,
                None => {
                    // Already archived or explicitly removed.
                    self.scheduler.clear(giveaway_id);
                    return Ok(());
                }
            };

            if !record.finish() {
                self.scheduler.clear(giveaway_id);
                return Ok(());
            }
            // The claim is durable before the draw starts, so a crash
            // below never re-runs the draw on the next recovery scan.
            self.store.put_giveaway(guild_id, record.clone())?;
            record
        };

        self.scheduler.clear(giveaway_id);
        self.record_locks.remove(&giveaway_id);

        let pool = match self.store.pool(guild_id, &record.pool_name) {
            Some(pool) => pool,
            None => {
                warn!(
                    "The prize pool `{}` is gone, giveaway {giveaway_id} settles with no winners",
                    record.pool_name
                );
                let reason = format!(
                    "The prize pool `{}` no longer exists. No prizes were drawn.",
                    record.pool_name
                );
                if let Err(err) = self
                    .presenter
                    .announce_failure(guild_id, record.channel_id, &reason)
                    .await
                {
                    warn!("Can't announce the failed settlement of giveaway {giveaway_id}: {err}");
                }
                return self.store.archive_giveaway(guild_id, record);
            }
        };

        let eligible = self.final_eligible_set(guild_id, &record, &pool).await;
        record.winners = draw::draw(&eligible, &pool.items, record.max_participants);
        info!(
            "Giveaway {giveaway_id} settled with {} winner(s) out of {} eligible participant(s)",
            record.winners.len(),
            eligible.len()
        );

        self.store.archive_giveaway(guild_id, record.clone())?;

        // A missing channel or guild is non-fatal: the record is
        // already ended and archived.
        if let Err(err) = self
            .presenter
            .announce_results(guild_id, &record, &record.winners)
            .await
        {
            warn!("Can't announce the results of giveaway {giveaway_id}: {err}");
        }
        Ok(())
    }

    // Delegates the startup recovery scan to the scheduler.
    pub async fn restore(self: &Arc<Self>) {
        self.scheduler.restore(self).await;
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    // Participants that still pass the role / level checks at the
    // settlement time. Balances are not re-checked: the entry was paid
    // at submission.
    async fn final_eligible_set(
        &self,
        guild_id: u64,
        record: &GiveawayRecord,
        pool: &PrizePool,
    ) -> HashSet<u64> {
        let mut eligible = HashSet::new();
        for &user_id in &record.participants {
            match self.is_still_eligible(guild_id, record, pool, user_id).await {
                Ok(true) => {
                    eligible.insert(user_id);
                }
                Ok(false) => info!(
                    "User {user_id} lost eligibility before the draw of giveaway {}",
                    record.id
                ),
                Err(err) => warn!(
                    "Can't re-validate user {user_id} for giveaway {}: {err}",
                    record.id
                ),
            }
        }
        eligible
    }

    async fn is_still_eligible(
        &self,
        guild_id: u64,
        record: &GiveawayRecord,
        pool: &PrizePool,
        user_id: u64,
    ) -> Result<bool> {
        if !self.directory.is_member(guild_id, user_id).await? {
            return Ok(false);
        }

        if let Some(role_id) = pool.required_role_id {
            if !self.directory.has_role(guild_id, user_id, role_id).await? {
                return Ok(false);
            }
        }

        if record.required_level > 0 {
            match &self.progression {
                Some(progression) => {
                    if progression.level(user_id).await? < record.required_level {
                        return Ok(false);
                    }
                }
                // The gate rejected level-bound entries while the
                // system was absent, so anyone in the set passed the
                // check at entry time.
                None => warn!("No leveling system to re-validate user {user_id} with"),
            }
        }

        Ok(true)
    }

    async fn refund(&self, user_id: u64, amount: u64) {
        if amount == 0 {
            return;
        }
        if let Some(ledger) = &self.ledger {
            if let Err(err) = ledger.credit(user_id, amount).await {
                error!("Can't return {amount} token(s) to user {user_id}: {err}");
            }
        }
    }

    fn record_lock(&self, giveaway_id: GiveawayId) -> Arc<Mutex<()>> {
        self.record_locks
            .entry(giveaway_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

// Interfaces of the external systems the giveaway core talks to.
//
// The core never reaches for a concrete currency or leveling
// implementation: everything is injected at construction time, and a
// missing implementation behind a configured gate is reported as a
// configuration absence instead of a silent pass.
use serenity::async_trait;

use crate::commands::giveaway::models::{GiveawayRecord, PrizePool, Winner};
use crate::error::Result;

// The currency ledger. Entries are paid at submission time, so the
// gate needs both the balance check and the immediate debit.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balance(&self, user_id: u64) -> Result<u64>;

    // Returns false when the balance doesn't cover the amount.
    async fn debit(&self, user_id: u64, amount: u64) -> Result<bool>;

    async fn credit(&self, user_id: u64, amount: u64) -> Result<()>;
}

// The leveling / progression system.
#[async_trait]
pub trait Progression: Send + Sync {
    async fn level(&self, user_id: u64) -> Result<u32>;
}

// Guild membership and role lookups, re-checked at settlement time
// because an entrant might have lost a role after entering.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn is_member(&self, guild_id: u64, user_id: u64) -> Result<bool>;

    async fn has_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<bool>;
}

// Everything user-visible: announcements, rejection DMs and the
// retraction of an entry reaction that didn't make it through the gate.
#[async_trait]
pub trait Presenter: Send + Sync {
    // Posts the giveaway announcement with the entry reaction attached
    // and returns the id of the posted message when there is one.
    async fn announce_created(
        &self,
        guild_id: u64,
        record: &GiveawayRecord,
        pool: &PrizePool,
    ) -> Result<Option<u64>>;

    async fn announce_results(
        &self,
        guild_id: u64,
        record: &GiveawayRecord,
        winners: &[Winner],
    ) -> Result<()>;

    // A settlement that can't run (e.g. the pool is gone) still gets
    // announced so the channel isn't left hanging.
    async fn announce_failure(&self, guild_id: u64, channel_id: u64, reason: &str) -> Result<()>;

    async fn retract_entry_marker(&self, record: &GiveawayRecord, user_id: u64) -> Result<()>;

    async fn notify_user(&self, user_id: u64, reason: &str) -> Result<()>;
}

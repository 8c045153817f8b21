// Shared fakes for exercising the giveaway core without Discord.
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use serenity::async_trait;
use uuid::Uuid;

use crate::commands::giveaway::collaborators::{Directory, Ledger, Presenter, Progression};
use crate::commands::giveaway::models::{GiveawayId, GiveawayRecord, PrizePool, Winner};
use crate::error::Result;

pub fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("tombola-test-{}", Uuid::new_v4()))
}

#[derive(Default)]
pub struct FakeLedger {
    balances: Mutex<HashMap<u64, u64>>,
    pub debits: Mutex<Vec<(u64, u64)>>,
    pub credits: Mutex<Vec<(u64, u64)>>,
}

impl FakeLedger {
    pub fn with_balances(balances: &[(u64, u64)]) -> Self {
        FakeLedger {
            balances: Mutex::new(balances.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn balance_of(&self, user_id: u64) -> u64 {
        *self.balances.lock().unwrap().get(&user_id).unwrap_or(&0)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn balance(&self, user_id: u64) -> Result<u64> {
        Ok(self.balance_of(user_id))
    }

    async fn debit(&self, user_id: u64, amount: u64) -> Result<bool> {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(user_id).or_insert(0);
        if *balance < amount {
            return Ok(false);
        }

        *balance -= amount;
        self.debits.lock().unwrap().push((user_id, amount));
        Ok(true)
    }

    async fn credit(&self, user_id: u64, amount: u64) -> Result<()> {
        *self.balances.lock().unwrap().entry(user_id).or_insert(0) += amount;
        self.credits.lock().unwrap().push((user_id, amount));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProgression {
    levels: HashMap<u64, u32>,
}

impl FakeProgression {
    pub fn with_levels(levels: &[(u64, u32)]) -> Self {
        FakeProgression {
            levels: levels.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Progression for FakeProgression {
    async fn level(&self, user_id: u64) -> Result<u32> {
        Ok(*self.levels.get(&user_id).unwrap_or(&0))
    }
}

pub struct FakeDirectory {
    // When true, any user counts as a guild member.
    open_guild: bool,
    members: HashSet<u64>,
    roles: Mutex<HashSet<(u64, u64)>>,
}

impl FakeDirectory {
    pub fn open() -> Self {
        FakeDirectory {
            open_guild: true,
            members: HashSet::new(),
            roles: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_members(members: &[u64]) -> Self {
        FakeDirectory {
            open_guild: false,
            members: members.iter().copied().collect(),
            roles: Mutex::new(HashSet::new()),
        }
    }

    pub fn grant_role(&self, user_id: u64, role_id: u64) {
        self.roles.lock().unwrap().insert((user_id, role_id));
    }

    pub fn revoke_role(&self, user_id: u64, role_id: u64) {
        self.roles.lock().unwrap().remove(&(user_id, role_id));
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn is_member(&self, _guild_id: u64, user_id: u64) -> Result<bool> {
        Ok(self.open_guild || self.members.contains(&user_id))
    }

    async fn has_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> Result<bool> {
        Ok(self.roles.lock().unwrap().contains(&(user_id, role_id)))
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub created: Mutex<Vec<GiveawayId>>,
    pub results: Mutex<Vec<Vec<Winner>>>,
    pub failures: Mutex<Vec<String>>,
    pub retractions: Mutex<Vec<u64>>,
    pub notices: Mutex<Vec<(u64, String)>>,
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn announce_created(
        &self,
        _guild_id: u64,
        record: &GiveawayRecord,
        _pool: &PrizePool,
    ) -> Result<Option<u64>> {
        let mut created = self.created.lock().unwrap();
        created.push(record.id);
        Ok(Some(1000 + created.len() as u64))
    }

    async fn announce_results(
        &self,
        _guild_id: u64,
        _record: &GiveawayRecord,
        winners: &[Winner],
    ) -> Result<()> {
        self.results.lock().unwrap().push(winners.to_vec());
        Ok(())
    }

    async fn announce_failure(&self, _guild_id: u64, _channel_id: u64, reason: &str) -> Result<()> {
        self.failures.lock().unwrap().push(reason.to_string());
        Ok(())
    }

    async fn retract_entry_marker(&self, _record: &GiveawayRecord, user_id: u64) -> Result<()> {
        self.retractions.lock().unwrap().push(user_id);
        Ok(())
    }

    async fn notify_user(&self, user_id: u64, reason: &str) -> Result<()> {
        self.notices.lock().unwrap().push((user_id, reason.to_string()));
        Ok(())
    }
}

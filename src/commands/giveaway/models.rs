use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub type GiveawayId = Uuid;

// A single prize inside a pool. The weight defines the relative
// probability of the item being picked while it still has stock.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrizeItem {
    pub name: String,
    pub quantity: u32,
    pub weight: u32,
}

impl PrizeItem {
    pub fn new(name: &str, quantity: u32, weight: u32) -> Self {
        PrizeItem {
            name: name.to_string(),
            quantity,
            weight,
        }
    }
}

// A named collection of weighted prizes plus the entry cost and an
// optional role gate, configured per guild by administrators.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrizePool {
    pub cost_per_entry: u64,
    pub required_role_id: Option<u64>,
    pub items: Vec<PrizeItem>,
}

impl PrizePool {
    pub fn new(cost_per_entry: u64, required_role_id: Option<u64>) -> Self {
        PrizePool {
            cost_per_entry,
            required_role_id,
            items: Vec::new(),
        }
    }

    pub fn item(&self, name: &str) -> Option<&PrizeItem> {
        self.items.iter().find(|item| item.name == name)
    }

    // Item names are unique within a pool.
    pub fn add_item(&mut self, item: PrizeItem) -> Result<()> {
        if self.item(&item.name).is_some() {
            let message = format!("The pool already contains an item named `{}`.", item.name);
            return Err(Error::Configuration(message));
        }

        self.items.push(item);
        Ok(())
    }

    pub fn remove_item(&mut self, name: &str) -> Result<()> {
        let count_before = self.items.len();
        self.items.retain(|item| item.name != name);

        match self.items.len() < count_before {
            true => Ok(()),
            false => {
                let message = format!("The pool doesn't contain an item named `{name}`.");
                Err(Error::Configuration(message))
            }
        }
    }

    // Returns the overall amount of prize units left in the pool.
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| item.quantity as u64).sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    Active,
    Ended,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub user_id: u64,
    pub item_name: String,
}

// One time-boxed giveaway run against a prize pool. The end time is
// fixed at creation; participants are mutated by the entry gate and
// the status / winners fields only by the settlement.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GiveawayRecord {
    pub id: GiveawayId,
    pub pool_name: String,
    pub channel_id: u64,
    // The announcement message carrying the entry reaction. Filled in
    // once the message has been posted.
    pub message_id: Option<u64>,
    pub end_time: DateTime<Utc>,
    pub entry_emoji: String,
    pub required_level: u32,
    // 0 means an unlimited amount of participants.
    pub max_participants: u32,
    pub participants: HashSet<u64>,
    pub status: GiveawayStatus,
    pub winners: Vec<Winner>,
}

impl GiveawayRecord {
    pub fn new(
        pool_name: &str,
        channel_id: u64,
        end_time: DateTime<Utc>,
        entry_emoji: &str,
        required_level: u32,
        max_participants: u32,
    ) -> Self {
        GiveawayRecord {
            id: Uuid::new_v4(),
            pool_name: pool_name.to_string(),
            channel_id,
            message_id: None,
            end_time,
            entry_emoji: entry_emoji.to_string(),
            required_level,
            max_participants,
            participants: HashSet::new(),
            status: GiveawayStatus::Active,
            winners: Vec::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == GiveawayStatus::Active
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    pub fn is_full(&self) -> bool {
        self.max_participants > 0 && self.participants.len() >= self.max_participants as usize
    }

    pub fn has_participant(&self, user_id: u64) -> bool {
        self.participants.contains(&user_id)
    }

    // Returns false when the user was already in the participant set.
    pub fn add_participant(&mut self, user_id: u64) -> bool {
        self.participants.insert(user_id)
    }

    pub fn remove_participant(&mut self, user_id: u64) -> bool {
        self.participants.remove(&user_id)
    }

    // The one-way `active -> ended` transition. Returns false when the
    // record was settled before, which makes racing settlements safe.
    pub fn finish(&mut self) -> bool {
        match self.status {
            GiveawayStatus::Active => {
                self.status = GiveawayStatus::Ended;
                true
            }
            GiveawayStatus::Ended => false,
        }
    }
}

// Everything persisted for a single guild: the configured prize pools
// and the giveaways in flight. Settled records move into the archive
// map so their winners stay on disk.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GuildGiveaways {
    pub prize_pools: HashMap<String, PrizePool>,
    pub active_giveaways: HashMap<GiveawayId, GiveawayRecord>,
    #[serde(default)]
    pub ended_giveaways: HashMap<GiveawayId, GiveawayRecord>,
}

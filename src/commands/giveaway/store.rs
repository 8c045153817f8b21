use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::commands::giveaway::models::{GiveawayId, GiveawayRecord, GuildGiveaways, PrizePool};
use crate::error::Result;

// Durable per-guild repository of prize pools and giveaway records.
//
// Each guild is persisted as a single JSON snapshot under the data
// directory and loaded wholesale at startup. Every mutating call
// rewrites the owning guild's file before returning, which is what
// makes the startup recovery scan correct. Guilds live in separate
// dashmap entries, so a write for one guild never blocks reads for
// another.
#[derive(Debug)]
pub struct GiveawayStore {
    data_dir: PathBuf,
    guilds: DashMap<u64, GuildGiveaways>,
}

impl GiveawayStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let guilds = DashMap::new();
        for entry in fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
                continue;
            }

            let guild_id = match path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                Some(guild_id) => guild_id,
                None => {
                    warn!("Skipping an unrecognized file in the data directory: {path:?}");
                    continue;
                }
            };

            // A snapshot that can't be read or parsed is treated as
            // empty state for that guild only, never as a fatal error.
            let snapshot = match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<GuildGiveaways>(&content) {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!("The snapshot for guild {guild_id} is corrupt: {err}");
                        GuildGiveaways::default()
                    }
                },
                Err(err) => {
                    warn!("Can't read the snapshot for guild {guild_id}: {err}");
                    GuildGiveaways::default()
                }
            };

            guilds.insert(guild_id, snapshot);
        }

        info!("Loaded giveaway state for {} guild(s)", guilds.len());
        Ok(GiveawayStore { data_dir, guilds })
    }

    pub fn guild_ids(&self) -> Vec<u64> {
        self.guilds.iter().map(|entry| *entry.key()).collect()
    }

    // ---- Prize pools ----

    pub fn pool(&self, guild_id: u64, name: &str) -> Option<PrizePool> {
        self.guilds
            .get(&guild_id)
            .and_then(|guild| guild.prize_pools.get(name).cloned())
    }

    pub fn pools(&self, guild_id: u64) -> HashMap<String, PrizePool> {
        self.guilds
            .get(&guild_id)
            .map(|guild| guild.prize_pools.clone())
            .unwrap_or_default()
    }

    pub fn put_pool(&self, guild_id: u64, name: &str, pool: PrizePool) -> Result<()> {
        let mut guild = self.guilds.entry(guild_id).or_default();
        guild.prize_pools.insert(name.to_string(), pool);
        self.flush(guild_id, &guild)
    }

    // Returns false when there was no pool with such a name. Deleting
    // a pool referenced by an active giveaway is allowed; the giveaway
    // settles with zero winners later.
    pub fn delete_pool(&self, guild_id: u64, name: &str) -> Result<bool> {
        let mut guild = self.guilds.entry(guild_id).or_default();
        let removed = guild.prize_pools.remove(name).is_some();
        if removed {
            self.flush(guild_id, &guild)?;
        }
        Ok(removed)
    }

    // ---- Giveaway records ----

    pub fn giveaway(&self, guild_id: u64, giveaway_id: GiveawayId) -> Option<GiveawayRecord> {
        self.guilds
            .get(&guild_id)
            .and_then(|guild| guild.active_giveaways.get(&giveaway_id).cloned())
    }

    pub fn active_giveaways(&self, guild_id: u64) -> Vec<GiveawayRecord> {
        self.guilds
            .get(&guild_id)
            .map(|guild| guild.active_giveaways.values().cloned().collect())
            .unwrap_or_default()
    }

    // Reactions arrive keyed by message, not by giveaway id.
    pub fn find_by_message(&self, guild_id: u64, message_id: u64) -> Option<GiveawayRecord> {
        self.guilds.get(&guild_id).and_then(|guild| {
            guild
                .active_giveaways
                .values()
                .find(|record| record.message_id == Some(message_id))
                .cloned()
        })
    }

    pub fn put_giveaway(&self, guild_id: u64, record: GiveawayRecord) -> Result<()> {
        let mut guild = self.guilds.entry(guild_id).or_default();
        guild.active_giveaways.insert(record.id, record);
        self.flush(guild_id, &guild)
    }

    pub fn delete_giveaway(&self, guild_id: u64, giveaway_id: GiveawayId) -> Result<bool> {
        let mut guild = self.guilds.entry(guild_id).or_default();
        let removed = guild.active_giveaways.remove(&giveaway_id).is_some();
        if removed {
            self.flush(guild_id, &guild)?;
        }
        Ok(removed)
    }

    // Moves a settled record out of the active index so the recovery
    // scan never picks it up again, keeping its winners on disk.
    pub fn archive_giveaway(&self, guild_id: u64, record: GiveawayRecord) -> Result<()> {
        let mut guild = self.guilds.entry(guild_id).or_default();
        guild.active_giveaways.remove(&record.id);
        guild.ended_giveaways.insert(record.id, record);
        self.flush(guild_id, &guild)
    }

    pub fn ended_giveaway(&self, guild_id: u64, giveaway_id: GiveawayId) -> Option<GiveawayRecord> {
        self.guilds
            .get(&guild_id)
            .and_then(|guild| guild.ended_giveaways.get(&giveaway_id).cloned())
    }

    // Rewrites the guild snapshot while the caller still holds the
    // guild's map entry: a write to disk is never reordered with a
    // concurrent mutation of the same guild. The temp file + rename
    // dance keeps the previous snapshot intact on a partial write.
    fn flush(&self, guild_id: u64, snapshot: &GuildGiveaways) -> Result<()> {
        let content = serde_json::to_vec_pretty(snapshot)?;
        let path = self.data_dir.join(format!("{guild_id}.json"));
        let temp_path = self.data_dir.join(format!("{guild_id}.json.tmp"));

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::commands::giveaway::models::{GiveawayRecord, PrizeItem, PrizePool};
    use crate::commands::giveaway::store::GiveawayStore;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tombola-store-{}", Uuid::new_v4()))
    }

    fn get_record() -> GiveawayRecord {
        GiveawayRecord::new(
            "spring-drop",
            100,
            Utc::now() + Duration::minutes(10),
            "🎉",
            0,
            0,
        )
        .with_message_id(555)
    }

    #[test]
    fn test_read_an_empty_store() {
        let store = GiveawayStore::open(temp_dir()).unwrap();

        assert_eq!(store.guild_ids().is_empty(), true);
        assert_eq!(store.pool(1, "spring-drop"), None);
        assert_eq!(store.active_giveaways(1).is_empty(), true);
    }

    #[test]
    fn test_put_and_get_pool() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        let mut pool = PrizePool::new(10, None);
        pool.add_item(PrizeItem::new("Game key", 1, 50)).unwrap();

        store.put_pool(1, "spring-drop", pool.clone()).unwrap();
        assert_eq!(store.pool(1, "spring-drop"), Some(pool));
        assert_eq!(store.pools(1).len(), 1);
    }

    #[test]
    fn test_pools_are_isolated_per_guild() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        store
            .put_pool(1, "spring-drop", PrizePool::new(0, None))
            .unwrap();

        assert_eq!(store.pool(2, "spring-drop"), None);
    }

    #[test]
    fn test_delete_pool() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        store
            .put_pool(1, "spring-drop", PrizePool::new(0, None))
            .unwrap();

        assert_eq!(store.delete_pool(1, "spring-drop").unwrap(), true);
        assert_eq!(store.delete_pool(1, "spring-drop").unwrap(), false);
        assert_eq!(store.pool(1, "spring-drop"), None);
    }

    #[test]
    fn test_state_survives_a_reopen() {
        let data_dir = temp_dir();
        let record = get_record();

        {
            let store = GiveawayStore::open(&data_dir).unwrap();
            store
                .put_pool(1, "spring-drop", PrizePool::new(10, Some(42)))
                .unwrap();
            store.put_giveaway(1, record.clone()).unwrap();
        }

        let reopened = GiveawayStore::open(&data_dir).unwrap();
        assert_eq!(reopened.guild_ids(), vec![1]);
        assert_eq!(reopened.pool(1, "spring-drop").unwrap().cost_per_entry, 10);
        assert_eq!(reopened.giveaway(1, record.id), Some(record));
    }

    #[test]
    fn test_corrupt_snapshot_is_treated_as_empty_state() {
        let data_dir = temp_dir();
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("1.json"), "{not json at all").unwrap();

        let store = GiveawayStore::open(&data_dir).unwrap();
        assert_eq!(store.active_giveaways(1).is_empty(), true);
        assert_eq!(store.pools(1).is_empty(), true);
    }

    #[test]
    fn test_corrupt_snapshot_only_affects_its_own_guild() {
        let data_dir = temp_dir();
        {
            let store = GiveawayStore::open(&data_dir).unwrap();
            store
                .put_pool(2, "spring-drop", PrizePool::new(0, None))
                .unwrap();
        }
        fs::write(data_dir.join("1.json"), "???").unwrap();

        let store = GiveawayStore::open(&data_dir).unwrap();
        assert_eq!(store.pools(1).is_empty(), true);
        assert_eq!(store.pool(2, "spring-drop").is_some(), true);
    }

    #[test]
    fn test_find_giveaway_by_message() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        let record = get_record();
        store.put_giveaway(1, record.clone()).unwrap();

        assert_eq!(store.find_by_message(1, 555), Some(record));
        assert_eq!(store.find_by_message(1, 556), None);
    }

    #[test]
    fn test_archive_removes_the_record_from_the_active_index() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        let mut record = get_record();
        store.put_giveaway(1, record.clone()).unwrap();

        record.finish();
        store.archive_giveaway(1, record.clone()).unwrap();

        assert_eq!(store.giveaway(1, record.id), None);
        assert_eq!(store.active_giveaways(1).is_empty(), true);
        assert_eq!(store.ended_giveaway(1, record.id), Some(record));
    }

    #[test]
    fn test_delete_giveaway() {
        let store = GiveawayStore::open(temp_dir()).unwrap();
        let record = get_record();
        store.put_giveaway(1, record.clone()).unwrap();

        assert_eq!(store.delete_giveaway(1, record.id).unwrap(), true);
        assert_eq!(store.delete_giveaway(1, record.id).unwrap(), false);
    }
}

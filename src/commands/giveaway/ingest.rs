use std::sync::Arc;

use tracing::{info, warn};

use crate::commands::giveaway::manager::GiveawayManager;

// The transport-independent shape of an entry signal. A reaction
// add/remove is adapted into this before it touches the entry gate.
#[readonly::make]
#[derive(Clone, Debug)]
pub struct EntrySignal {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub emoji: String,
}

impl EntrySignal {
    pub fn new(guild_id: u64, channel_id: u64, message_id: u64, user_id: u64, emoji: &str) -> Self {
        EntrySignal {
            guild_id,
            channel_id,
            message_id,
            user_id,
            emoji: emoji.to_string(),
        }
    }
}

// Feeds a reaction-add into the entry gate. Signals for unknown
// messages or foreign emojis are ignored; a rejection was already
// explained to the user by the gate itself, so here it is only logged.
pub async fn on_entry_signal(manager: &Arc<GiveawayManager>, signal: EntrySignal) {
    let record = match manager.store().find_by_message(signal.guild_id, signal.message_id) {
        Some(record) => record,
        None => return,
    };
    if record.entry_emoji != signal.emoji {
        return;
    }

    if let Err(err) = manager.try_enter(signal.guild_id, record.id, signal.user_id).await {
        info!(
            "Rejected the entry of user {} into giveaway {}: {err}",
            signal.user_id, record.id
        );
    }
}

// Feeds a reaction-remove into the withdrawal path.
pub async fn on_entry_withdrawn(manager: &Arc<GiveawayManager>, signal: EntrySignal) {
    let record = match manager.store().find_by_message(signal.guild_id, signal.message_id) {
        Some(record) => record,
        None => return,
    };
    if record.entry_emoji != signal.emoji {
        return;
    }

    if let Err(err) = manager.withdraw(signal.guild_id, record.id, signal.user_id).await {
        warn!(
            "Can't withdraw user {} from giveaway {}: {err}",
            signal.user_id, record.id
        );
    }
}

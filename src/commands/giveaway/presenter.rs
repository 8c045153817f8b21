// Discord-backed implementations of the collaborator interfaces.
use std::sync::Arc;

use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::commands::giveaway::collaborators::{Directory, Presenter};
use crate::commands::giveaway::formatters::announcement;
use crate::commands::giveaway::models::{GiveawayRecord, PrizePool, Winner};
use crate::error::Result;

fn entry_reaction(emoji: &str) -> ReactionType {
    ReactionType::try_from(emoji).unwrap_or_else(|_| ReactionType::Unicode(emoji.to_string()))
}

pub struct DiscordPresenter {
    http: Arc<Http>,
}

impl DiscordPresenter {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordPresenter { http }
    }
}

#[async_trait]
impl Presenter for DiscordPresenter {
    async fn announce_created(
        &self,
        _guild_id: u64,
        record: &GiveawayRecord,
        pool: &PrizePool,
    ) -> Result<Option<u64>> {
        let channel = ChannelId::new(record.channel_id);
        let content = announcement::giveaway_created(record, pool);
        let message = channel.say(&self.http, content).await?;

        // The bot seeds the entry reaction so users only have to click.
        let reaction = entry_reaction(&record.entry_emoji);
        self.http
            .create_reaction(channel, message.id, &reaction)
            .await?;
        Ok(Some(message.id.get()))
    }

    async fn announce_results(
        &self,
        _guild_id: u64,
        record: &GiveawayRecord,
        winners: &[Winner],
    ) -> Result<()> {
        let content = announcement::giveaway_results(record, winners);
        ChannelId::new(record.channel_id).say(&self.http, content).await?;
        Ok(())
    }

    async fn announce_failure(&self, _guild_id: u64, channel_id: u64, reason: &str) -> Result<()> {
        ChannelId::new(channel_id).say(&self.http, reason).await?;
        Ok(())
    }

    async fn retract_entry_marker(&self, record: &GiveawayRecord, user_id: u64) -> Result<()> {
        let message_id = match record.message_id {
            Some(message_id) => message_id,
            None => return Ok(()),
        };

        let reaction = entry_reaction(&record.entry_emoji);
        self.http
            .delete_reaction(
                ChannelId::new(record.channel_id),
                MessageId::new(message_id),
                UserId::new(user_id),
                &reaction,
            )
            .await?;
        Ok(())
    }

    async fn notify_user(&self, user_id: u64, reason: &str) -> Result<()> {
        let channel = UserId::new(user_id).create_dm_channel(&self.http).await?;
        channel.id.say(&self.http, reason).await?;
        Ok(())
    }
}

pub struct DiscordDirectory {
    http: Arc<Http>,
}

impl DiscordDirectory {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordDirectory { http }
    }
}

#[async_trait]
impl Directory for DiscordDirectory {
    async fn is_member(&self, guild_id: u64, user_id: u64) -> Result<bool> {
        // A member that can't be fetched has left the guild.
        match self
            .http
            .get_member(GuildId::new(guild_id), UserId::new(user_id))
            .await
        {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    async fn has_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<bool> {
        match self
            .http
            .get_member(GuildId::new(guild_id), UserId::new(user_id))
            .await
        {
            Ok(member) => Ok(member.roles.contains(&RoleId::new(role_id))),
            Err(_) => Ok(false),
        }
    }
}

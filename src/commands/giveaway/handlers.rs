use std::sync::Arc;

use poise::serenity_prelude::Role;

use crate::commands::context::Context;
use crate::commands::giveaway::formatters::announcement;
use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::PrizeItem;
use crate::commands::giveaway::utils::parse_duration;
use crate::error::{Error, Result};
use crate::storage::GiveawayStorage;

async fn get_giveaway_manager(ctx: &Context<'_>) -> Arc<GiveawayManager> {
    ctx.serenity_context()
        .data
        .read()
        .await
        .get::<GiveawayStorage>()
        .cloned()
        .expect("Expected GiveawayManager in ShareMap.")
}

fn get_guild_id(ctx: &Context<'_>) -> Result<u64> {
    ctx.guild_id()
        .map(|guild_id| guild_id.get())
        .ok_or_else(|| Error::Configuration("This command is only available in a guild.".to_string()))
}

/// Create a new prize pool
#[poise::command(
    slash_command,
    guild_only,
    rename = "create-pool",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn create_pool(
    ctx: Context<'_>,
    #[description = "The name of the pool"] name: String,
    #[description = "Tokens charged per entry"] cost_per_entry: u64,
    #[description = "The role required for entering"] required_role: Option<Role>,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let required_role_id = required_role.map(|role| role.id.get());
    let content = match giveaway_manager.create_pool(guild_id, &name, cost_per_entry, required_role_id)
    {
        Ok(()) => format!("The prize pool `{name}` has been created."),
        Err(err) => err.to_string(),
    };
    ctx.say(content).await?;
    Ok(())
}

/// Get a list of the prize pools of this guild
#[poise::command(slash_command, guild_only, rename = "list-pools")]
pub async fn list_pools(ctx: Context<'_>) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let pools = giveaway_manager.pools(guild_id);
    let content = match pools.is_empty() {
        true => "There are no prize pools in this guild.".to_string(),
        false => {
            let mut lines = pools
                .iter()
                .map(|(name, pool)| announcement::pool_overview(name, pool))
                .collect::<Vec<String>>();
            lines.sort();
            lines.join("\n")
        }
    };
    ctx.say(content).await?;
    Ok(())
}

/// Delete a prize pool
#[poise::command(
    slash_command,
    guild_only,
    rename = "delete-pool",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn delete_pool(
    ctx: Context<'_>,
    #[description = "The name of the pool"] name: String,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let content = match giveaway_manager.delete_pool(guild_id, &name) {
        Ok(()) => format!("The prize pool `{name}` has been deleted."),
        Err(err) => err.to_string(),
    };
    ctx.say(content).await?;
    Ok(())
}

/// Add an item to a prize pool
#[poise::command(
    slash_command,
    guild_only,
    rename = "add-pool-item",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn add_pool_item(
    ctx: Context<'_>,
    #[description = "The name of the pool"] pool: String,
    #[description = "The name of the item"] item: String,
    #[description = "How many units can be won"]
    #[min = 1]
    quantity: u32,
    #[description = "The relative draw weight"]
    #[min = 1]
    weight: u32,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let new_item = PrizeItem::new(&item, quantity, weight);
    let content = match giveaway_manager.add_pool_item(guild_id, &pool, new_item) {
        Ok(()) => format!("The item `{item}` has been added to the `{pool}` pool."),
        Err(err) => err.to_string(),
    };
    ctx.say(content).await?;
    Ok(())
}

/// Remove an item from a prize pool
#[poise::command(
    slash_command,
    guild_only,
    rename = "remove-pool-item",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn remove_pool_item(
    ctx: Context<'_>,
    #[description = "The name of the pool"] pool: String,
    #[description = "The name of the item"] item: String,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let content = match giveaway_manager.remove_pool_item(guild_id, &pool, &item) {
        Ok(()) => format!("The item `{item}` has been removed from the `{pool}` pool."),
        Err(err) => err.to_string(),
    };
    ctx.say(content).await?;
    Ok(())
}

/// Get a list of the items in a prize pool
#[poise::command(slash_command, guild_only, rename = "list-pool-items")]
pub async fn list_pool_items(
    ctx: Context<'_>,
    #[description = "The name of the pool"] pool: String,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let content = match giveaway_manager.pool(guild_id, &pool) {
        Some(found) => announcement::pool_items(&pool, &found),
        None => format!("The prize pool `{pool}` doesn't exist."),
    };
    ctx.say(content).await?;
    Ok(())
}

/// Start a giveaway against an existing prize pool
#[poise::command(
    slash_command,
    guild_only,
    rename = "start-giveaway",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn start_giveaway(
    ctx: Context<'_>,
    #[description = "The pool to draw prizes from"] pool: String,
    #[description = "Duration in the 10s / 10m / 1h / 1d format"] duration: String,
    #[description = "The reaction used for entering"] entry_emoji: Option<String>,
    #[description = "The minimal level required for entering"] required_level: Option<u32>,
    #[description = "The participant cap, 0 for unlimited"] max_participants: Option<u32>,
) -> Result<()> {
    let guild_id = get_guild_id(&ctx)?;
    let giveaway_manager = get_giveaway_manager(&ctx).await;

    let duration = match parse_duration(&duration) {
        Some(duration) => duration,
        None => {
            ctx.say("Invalid duration. Please use the `10s` / `10m` / `1h` / `1d` format.")
                .await?;
            return Ok(());
        }
    };

    let entry_emoji = entry_emoji.unwrap_or_else(|| "🎉".to_string());
    let result = giveaway_manager
        .start_giveaway(
            guild_id,
            &pool,
            ctx.channel_id().get(),
            duration,
            &entry_emoji,
            required_level.unwrap_or(0),
            max_participants.unwrap_or(100),
        )
        .await;

    let content = match result {
        Ok(record) => format!(
            "The giveaway has been started and ends <t:{}:R>.",
            record.end_time.timestamp()
        ),
        Err(err) => err.to_string(),
    };
    ctx.say(content).await?;
    Ok(())
}

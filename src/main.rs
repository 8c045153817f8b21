pub mod commands;
pub mod error;
pub mod storage;

use std::env;
use std::sync::Arc;

use poise::serenity_prelude::GatewayIntents;
use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::model::channel::Reaction;
use serenity::model::gateway::Ready;
use tracing::{error, info};

use crate::commands::giveaway::ingest::{self, EntrySignal};
use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::presenter::{DiscordDirectory, DiscordPresenter};
use crate::commands::giveaway::store::GiveawayStore;
use crate::commands::UserData;
use crate::error::Error;
use crate::storage::{BotIdStorage, GiveawayStorage};

pub struct Handler;

impl Handler {
    // Reactions outside of a guild (or without a known user) are not
    // entry signals.
    fn get_signal(reaction: &Reaction) -> Option<EntrySignal> {
        let guild_id = reaction.guild_id?.get();
        let user_id = reaction.user_id?.get();
        Some(EntrySignal::new(
            guild_id,
            reaction.channel_id.get(),
            reaction.message_id.get(),
            user_id,
            &reaction.emoji.to_string(),
        ))
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let bot_id = ctx
            .data
            .read()
            .await
            .get::<BotIdStorage>()
            .cloned()
            .expect("Expected BotId in ShareMap.");

        let signal = match Handler::get_signal(&reaction) {
            Some(signal) => signal,
            None => return,
        };
        // The reaction seeded by the bot itself is not an entry.
        if signal.user_id == bot_id.get() {
            return;
        }

        let giveaway_manager = ctx
            .data
            .read()
            .await
            .get::<GiveawayStorage>()
            .cloned()
            .expect("Expected GiveawayManager in ShareMap.");

        ingest::on_entry_signal(&giveaway_manager, signal).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        let bot_id = ctx
            .data
            .read()
            .await
            .get::<BotIdStorage>()
            .cloned()
            .expect("Expected BotId in ShareMap.");

        let signal = match Handler::get_signal(&reaction) {
            Some(signal) => signal,
            None => return,
        };
        if signal.user_id == bot_id.get() {
            return;
        }

        let giveaway_manager = ctx
            .data
            .read()
            .await
            .get::<GiveawayStorage>()
            .cloned()
            .expect("Expected GiveawayManager in ShareMap.");

        ingest::on_entry_withdrawn(&giveaway_manager, signal).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let giveaway_manager = ctx
            .data
            .read()
            .await
            .get::<GiveawayStorage>()
            .cloned()
            .expect("Expected GiveawayManager in ShareMap.");

        // Settle everything that expired while the bot was offline and
        // re-arm the timers for the rest.
        giveaway_manager.restore().await;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let framework = poise::Framework::<UserData, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::help::help(),
                commands::giveaway::create_pool(),
                commands::giveaway::list_pools(),
                commands::giveaway::delete_pool(),
                commands::giveaway::add_pool_item(),
                commands::giveaway::remove_pool_item(),
                commands::giveaway::list_pool_items(),
                commands::giveaway::start_giveaway(),
            ],
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(UserData {})
            })
        })
        .build();

    let token = env::var("DISCORD_TOKEN").expect("Expected a DISCORD_TOKEN in the environment");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_MESSAGE_REACTIONS;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await
        .expect("Cannot create a Discord client");

    let bot_id = match client.http.get_current_application_info().await {
        Ok(info) => info.id,
        Err(why) => panic!("Could not access application info: {:?}", why),
    };

    let data_dir = env::var("GIVEAWAY_DATA_DIR").unwrap_or_else(|_| "giveaway_data".to_string());
    let store = match GiveawayStore::open(&data_dir) {
        Ok(store) => store,
        Err(why) => panic!("Cannot open the giveaway store at {data_dir}: {why:?}"),
    };

    let refund_on_withdraw = env::var("GIVEAWAY_REFUND_ON_WITHDRAW")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let giveaway_manager = GiveawayManager::new(
        store,
        Arc::new(DiscordDirectory::new(client.http.clone())),
        Arc::new(DiscordPresenter::new(client.http.clone())),
    )
    .with_refund_on_withdraw(refund_on_withdraw);

    {
        let mut data = client.data.write().await;
        data.insert::<GiveawayStorage>(Arc::new(giveaway_manager));
        data.insert::<BotIdStorage>(Arc::new(bot_id));
    }

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}

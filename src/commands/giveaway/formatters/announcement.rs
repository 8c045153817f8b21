// Message templates posted by the bot into Discord channels.
use crate::commands::giveaway::models::{GiveawayRecord, PrizePool, Winner};

pub fn giveaway_created(record: &GiveawayRecord, pool: &PrizePool) -> String {
    let mut lines = vec![
        format!("🎁 Giveaway: **{}** 🎁", record.pool_name),
        format!("Ends: <t:{}:R>", record.end_time.timestamp()),
        format!("React with {} to enter!", record.entry_emoji),
    ];

    match record.max_participants > 0 {
        true => lines.push(format!("Participant cap: `{}`", record.max_participants)),
        false => lines.push("Participants: `unlimited`".to_string()),
    }
    if pool.cost_per_entry > 0 {
        lines.push(format!("Entry cost: `{}` token(s)", pool.cost_per_entry));
    }
    if let Some(role_id) = pool.required_role_id {
        lines.push(format!("Required role: <@&{role_id}>"));
    }
    if record.required_level > 0 {
        lines.push(format!("Required level: `{}`", record.required_level));
    }

    lines.push(String::new());
    lines.push("Prizes:".to_string());
    for item in &pool.items {
        lines.push(format!("- {} x{} (weight: {})", item.name, item.quantity, item.weight));
    }
    lines.join("\n")
}

pub fn giveaway_results(record: &GiveawayRecord, winners: &[Winner]) -> String {
    if winners.is_empty() {
        return format!(
            "The `{}` giveaway ended without any eligible winners.",
            record.pool_name
        );
    }

    let mut lines = vec!["🎉 Giveaway results! 🎉".to_string()];
    for winner in winners {
        lines.push(format!(
            "Congratulations <@{}>, you won **{}**!",
            winner.user_id, winner.item_name
        ));
    }
    lines.push(format!("_Drawn from the `{}` prize pool._", record.pool_name));
    lines.join("\n")
}

pub fn pool_overview(name: &str, pool: &PrizePool) -> String {
    let role_part = match pool.required_role_id {
        Some(role_id) => format!(", role: <@&{role_id}>"),
        None => String::new(),
    };
    format!(
        "- `{name}` ({} item(s), entry cost: {}{role_part})",
        pool.items.len(),
        pool.cost_per_entry
    )
}

pub fn pool_items(name: &str, pool: &PrizePool) -> String {
    if pool.items.is_empty() {
        return format!("The `{name}` pool doesn't have any items yet.");
    }

    let mut lines = vec![format!("🏆 Items of the `{name}` pool 🏆")];
    for item in &pool.items {
        lines.push(format!("- {} x{} (weight: {})", item.name, item.quantity, item.weight));
    }
    lines.join("\n")
}

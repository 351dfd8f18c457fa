// Discord commands for the leveling system.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::imagegen::{display_name, humanize_number};
use crate::core::leveling::{ExperienceCurve, LedgerStore, LevelingService};
use crate::core::weather::WeatherService;
use crate::discord::pagination::paginate;
use crate::infra::imagegen::ImageCache;
use crate::infra::weather::{ForecastApiClient, JsonUnitStore, NominatimGeocoder};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const LEADERBOARD_LIMIT: usize = 1000;
const PER_PAGE: usize = 10;
const NAME_WIDTH: usize = 48;

/// Show a member's level and experience in this server.
#[poise::command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target_user = user.as_ref().unwrap_or_else(|| ctx.author());
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    if target_user.bot {
        ctx.say("Bots don't earn experience! 🤖").await?;
        return Ok(());
    }

    let leveling = &ctx.data().leveling;
    let Some(record) = leveling.get_user(target_user.id.get()).await? else {
        ctx.say(format!("{} hasn't earned any experience yet.", target_user.name))
            .await?;
        return Ok(());
    };

    let standing = record.standing(guild_id);
    let progress = leveling.progress(standing);
    let position = leveling
        .leaderboard(guild_id, LEADERBOARD_LIMIT)
        .await?
        .iter()
        .position(|r| r.user_id == record.user_id)
        .map(|i| format!("#{}", i + 1))
        .unwrap_or_else(|| "Unranked".to_string());

    let mut embed = serenity::CreateEmbed::new()
        .title(format!(
            "Rank of {}",
            display_name(
                &target_user.name,
                &resolve_display_name_cached(&ctx, guild_id, target_user.id.get()),
                NAME_WIDTH
            )
        ))
        .color(0x00ff00)
        .thumbnail(target_user.face())
        .field("Level", format!("**{}**", progress.level), true)
        .field("Server rank", position, true)
        .field(
            "Global level",
            leveling.curve().find_level(record.total_exp).to_string(),
            true,
        )
        .field(
            "Total XP",
            humanize_number(i64::try_from(record.total_exp).unwrap_or(i64::MAX)),
            true,
        )
        .field(
            "Progress",
            format!(
                "{}/{} XP\n{}",
                progress.current_exp,
                progress.required_exp,
                build_progress_bar(progress.ratio(), 15)
            ),
            false,
        );

    if let Some(until) = record.chat_block.filter(|until| *until > chrono::Utc::now()) {
        embed = embed.field(
            "XP ban",
            format!("Can't earn experience until <t:{}:f>", until.timestamp()),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the server leaderboard.
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "Page number (default: 1)"]
    #[min = 1]
    page: Option<usize>,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();

    ctx.defer().await?;

    let records: Vec<_> = ctx
        .data()
        .leveling
        .leaderboard(guild_id, LEADERBOARD_LIMIT)
        .await?
        .into_iter()
        .filter(|record| !is_bot_cached(&ctx, guild_id, record.user_id))
        .collect();

    if records.is_empty() {
        ctx.say("No one has earned XP yet! Start chatting to get on the leaderboard! 💬")
            .await?;
        return Ok(());
    }

    let author_id = ctx.author().id.get();
    let your_rank = records
        .iter()
        .position(|r| r.user_id == author_id)
        .map(|i| format!("Your rank: **#{}**", i + 1))
        .unwrap_or_else(|| "You are not ranked yet.".to_string());

    let total_pages = records.len().div_ceil(PER_PAGE);
    let mut pages = Vec::with_capacity(total_pages);
    let mut titles = Vec::with_capacity(total_pages);

    for (page_index, chunk) in records.chunks(PER_PAGE).enumerate() {
        let offset = page_index * PER_PAGE;
        let mut description = format!("{}\n\n", your_rank);

        for (index, record) in chunk.iter().enumerate() {
            let position = offset + index + 1;
            let medal = match position {
                1 => "🥇",
                2 => "🥈",
                3 => "🥉",
                _ => "  ",
            };
            let name = resolve_display_name_cached(&ctx, guild_id, record.user_id);
            let name = if record.user_id == author_id {
                format!("**{}** (You)", name)
            } else {
                name
            };
            let progress = ctx.data().leveling.progress(record.standing(guild_id));

            description.push_str(&format!(
                "{} **#{}** {}\nLevel {} | {}/{} XP\n{}\n\n",
                medal,
                position,
                name,
                progress.level,
                progress.current_exp,
                progress.required_exp,
                build_progress_bar(progress.ratio(), 10)
            ));
        }

        pages.push(
            serenity::CreateEmbed::new()
                .title("📊 Leaderboard")
                .description(description)
                .color(0xffd700)
                .footer(serenity::CreateEmbedFooter::new(format!(
                    "Page {}/{}",
                    page_index + 1,
                    total_pages
                ))),
        );
        titles.push(format!("#{}-#{}", offset + 1, offset + chunk.len()));
    }

    let start = page.unwrap_or(1).clamp(1, total_pages) - 1;
    paginate(ctx, pages, titles, start).await
}

/// Resolve a name from the cache only; leaderboards can't afford HTTP calls.
fn resolve_display_name_cached(ctx: &Context<'_>, guild_id: u64, user_id: u64) -> String {
    let guild_id_s = serenity::GuildId::from(guild_id);
    let user_id_s = serenity::UserId::from(user_id);

    if let Some(guild) = ctx.serenity_context().cache.guild(guild_id_s) {
        if let Some(member) = guild.members.get(&user_id_s) {
            return member.display_name().to_string();
        }
    }

    if let Some(user) = ctx.serenity_context().cache.user(user_id_s) {
        return user.name.clone();
    }

    format!("<@{}>", user_id)
}

/// Unknown users are assumed human.
fn is_bot_cached(ctx: &Context<'_>, guild_id: u64, user_id: u64) -> bool {
    let user_id_s = serenity::UserId::from(user_id);

    if let Some(user) = ctx.serenity_context().cache.user(user_id_s) {
        return user.bot;
    }

    ctx.serenity_context()
        .cache
        .guild(serenity::GuildId::from(guild_id))
        .and_then(|guild| guild.members.get(&user_id_s).map(|m| m.user.bot))
        .unwrap_or(false)
}

pub fn build_progress_bar(progress: f64, length: usize) -> String {
    let clamped = progress.clamp(0.0, 1.0);
    let mut filled = (clamped * length as f64).round() as usize;
    if clamped > 0.0 && filled == 0 {
        filled = 1;
    }
    filled = filled.min(length);
    let bar = "▰".repeat(filled) + &"▱".repeat(length - filled);
    format!("{} ({}%)", bar, (clamped * 100.0).round() as u32)
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Ledger backend picked at startup.
pub type LedgerBackend = Box<dyn LedgerStore>;
pub type Weather = WeatherService<NominatimGeocoder, ForecastApiClient, JsonUnitStore>;

/// Data that's shared across all commands.
pub struct Data {
    pub leveling: Arc<LevelingService<LedgerBackend>>,
    pub weather: Arc<Weather>,
    pub images: Arc<ImageCache>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(build_progress_bar(0.0, 4), "▱▱▱▱ (0%)");
        assert_eq!(build_progress_bar(0.5, 4), "▰▰▱▱ (50%)");
        assert_eq!(build_progress_bar(2.0, 4), "▰▰▰▰ (100%)");
    }

    #[test]
    fn any_progress_shows_at_least_one_block() {
        assert_eq!(build_progress_bar(0.01, 10), "▰▱▱▱▱▱▱▱▱▱ (1%)");
    }
}

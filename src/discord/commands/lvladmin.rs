// Administrative leveling commands: force levels, wipe a server, ban from XP.

use crate::core::leveling::{parse_duration, GuildMember, LevelingError, ResetProgress};
use crate::discord::{Context, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const MEMBER_PAGE: u64 = 1000;

/// Leveling administration.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("xpban", "resetranks", "setlevel")
)]
pub async fn lvladmin(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Ban a user from getting experience.
#[poise::command(slash_command, guild_only, owners_only)]
pub async fn xpban(
    ctx: Context<'_>,
    #[description = "How long, e.g. `90`, `30m`, `2h 30m`, `1 day`"] bantime: String,
    #[description = "Member to ban"] user: Option<serenity::User>,
    #[description = "Raw user ID, for people no longer in the server"] user_id: Option<String>,
) -> Result<(), Error> {
    let duration = match parse_duration(&bantime) {
        Ok(duration) => duration,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let target = match (user, user_id) {
        (Some(user), _) => user.id.get(),
        (None, Some(raw)) => match raw.trim().parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                ctx.say(format!("❌ `{}` is not a valid user ID.", raw)).await?;
                return Ok(());
            }
        },
        (None, None) => {
            ctx.say("❌ Tell me who to ban: pick a member or paste their ID.")
                .await?;
            return Ok(());
        }
    };

    match ctx.data().leveling.xp_ban(target, duration).await {
        Ok(until) => {
            ctx.say(format!(
                "✅ <@{}> can't earn experience until <t:{}:f>.",
                target,
                until.timestamp()
            ))
            .await?;
        }
        Err(e @ LevelingError::RecordNotFound(_)) => {
            ctx.say(e.to_string()).await?;
        }
        Err(e) => {
            tracing::error!(user_id = target, "xpban failed: {}", e);
            ctx.say(format!("Unable to add chat block: {}", e)).await?;
        }
    }

    Ok(())
}

/// Reset everyone's xp and level in this server to zero.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn resetranks(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    ctx.defer().await?;
    let members = fetch_members(&ctx, guild_id).await?;

    let reply = ctx
        .say(format!("Fixing members 0/{}", members.len()))
        .await?;
    let message = reply.message().await?;
    let progress = MessageProgress {
        http: ctx.serenity_context().http.clone(),
        channel_id: message.channel_id,
        message_id: message.id,
    };

    let summary = ctx
        .data()
        .leveling
        .reset_guild(guild_id.get(), &members, &progress)
        .await?;

    progress.report(summary.visited, members.len()).await;
    ctx.say(format!(
        "Finished resetting everyone's experience and levels ({} members reset).",
        summary.reset
    ))
    .await?;
    Ok(())
}

/// Set a user's level manually.
#[poise::command(slash_command, guild_only, owners_only)]
pub async fn setlevel(
    ctx: Context<'_>,
    #[description = "Member whose level to set"] user: serenity::User,
    #[description = "New level"] level: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    if user.bot {
        ctx.say("❌ Bots don't have levels.").await?;
        return Ok(());
    }

    match ctx
        .data()
        .leveling
        .set_level(
            user.id.get(),
            guild_id.get(),
            level,
            Some(ctx.channel_id().get()),
        )
        .await
    {
        Ok(_) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("<@{}>'s Level has been set to `{}`.", user.id, level))
                    .allowed_mentions(serenity::CreateAllowedMentions::new()),
            )
            .await?;
        }
        Err(LevelingError::InvalidLevel(_)) => {
            ctx.say("Please enter a positive number.").await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Every member of the guild, fetched page by page over HTTP.
async fn fetch_members(
    ctx: &Context<'_>,
    guild_id: serenity::GuildId,
) -> Result<Vec<GuildMember>, Error> {
    let http = &ctx.serenity_context().http;
    let mut members = Vec::new();
    let mut after = None;

    loop {
        let page = http
            .get_guild_members(guild_id, Some(MEMBER_PAGE), after)
            .await?;
        let Some(last) = page.last() else {
            break;
        };
        after = Some(last.user.id.get());
        let full_page = page.len() as u64 == MEMBER_PAGE;

        members.extend(page.iter().map(|m| GuildMember {
            user_id: m.user.id.get(),
            bot: m.user.bot,
        }));

        if !full_page {
            break;
        }
    }

    Ok(members)
}

/// Edits the "Fixing members" message as the reset walks the guild.
struct MessageProgress {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
}

#[async_trait]
impl ResetProgress for MessageProgress {
    async fn report(&self, processed: usize, total: usize) {
        let edit =
            serenity::EditMessage::new().content(format!("Fixing members {}/{}", processed, total));
        if let Err(e) = self
            .channel_id
            .edit_message(self.http.as_ref(), self.message_id, edit)
            .await
        {
            tracing::warn!("Failed to update reset progress: {}", e);
        }
    }
}

use crate::core::imagegen::humanize_number;
use crate::core::leveling::{LevelUpEvent, LevelUpHandler, LevelUpReason};
use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Posts a level-up embed in the channel the level change came from.
pub struct AnnouncementHandler {
    http: Arc<serenity::Http>,
}

impl AnnouncementHandler {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LevelUpHandler for AnnouncementHandler {
    async fn handle_levelup(&self, event: &LevelUpEvent) -> anyhow::Result<()> {
        let Some(channel_id) = event.channel_id else {
            tracing::debug!(user_id = event.user_id, "No channel for level-up announcement");
            return Ok(());
        };

        serenity::ChannelId::new(channel_id)
            .send_message(
                self.http.as_ref(),
                CreateMessage::new()
                    .embed(level_up_embed(event))
                    .allowed_mentions(serenity::CreateAllowedMentions::new()),
            )
            .await?;
        Ok(())
    }
}

fn level_up_embed(event: &LevelUpEvent) -> serenity::CreateEmbed {
    let (title, description) = match event.reason {
        LevelUpReason::Message => (
            "Level Up!",
            format!("<@{}> reached level {}!", event.user_id, event.new_level),
        ),
        LevelUpReason::Manual => (
            "Level Changed",
            format!(
                "<@{}> went from level {} to level {}.",
                event.user_id, event.old_level, event.new_level
            ),
        ),
    };

    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(level_color(event.new_level))
        .field(
            "Total XP",
            humanize_number(i64::try_from(event.total_exp).unwrap_or(i64::MAX)),
            true,
        )
        .footer(serenity::CreateEmbedFooter::new(random_flavor_line()))
}

fn level_color(level: u32) -> serenity::Colour {
    if level >= 50 {
        serenity::Colour::DARK_PURPLE
    } else if level >= 25 {
        serenity::Colour::ORANGE
    } else if level >= 10 {
        serenity::Colour::GOLD
    } else if level >= 5 {
        serenity::Colour::BLURPLE
    } else {
        serenity::Colour::LIGHT_GREY
    }
}

fn random_flavor_line() -> &'static str {
    const FLAVOR_LINES: [&str; 4] = [
        "Keep chatting!",
        "Your grind is paying off.",
        "Another level, another flex.",
        "That XP bar never stood a chance.",
    ];

    FLAVOR_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FLAVOR_LINES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_step_up_with_level() {
        assert_eq!(level_color(0), serenity::Colour::LIGHT_GREY);
        assert_eq!(level_color(5), serenity::Colour::BLURPLE);
        assert_eq!(level_color(12), serenity::Colour::GOLD);
        assert_eq!(level_color(60), serenity::Colour::DARK_PURPLE);
    }
}

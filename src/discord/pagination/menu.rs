// Button + select-menu paginator for lists of embeds.
//
// Page arithmetic lives in `core::pagination`; this file only turns it into
// components and reacts to clicks.

use crate::core::pagination::PageNavigator;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

pub const MENU_TIMEOUT: Duration = Duration::from_secs(60);

const FIRST: &str = "first";
const BACK: &str = "back";
const STOP: &str = "stop";
const FORWARD: &str = "forward";
const LAST: &str = "last";
const SELECT: &str = "select";

const OPTION_TITLE_LEN: usize = 90;

fn components(
    prefix: &str,
    navigator: &PageNavigator,
    page_titles: &[String],
) -> Vec<serenity::CreateActionRow> {
    let id = |name: &str| format!("{}_{}", prefix, name);
    let locked = !navigator.navigation_enabled();

    let buttons = vec![
        serenity::CreateButton::new(id(FIRST))
            .emoji('⏮')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(locked),
        serenity::CreateButton::new(id(BACK))
            .emoji('◀')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(locked),
        serenity::CreateButton::new(id(STOP))
            .emoji('⏹')
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(id(FORWARD))
            .emoji('▶')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(locked),
        serenity::CreateButton::new(id(LAST))
            .emoji('⏭')
            .style(serenity::ButtonStyle::Secondary)
            .disabled(locked),
    ];

    let mut rows = vec![serenity::CreateActionRow::Buttons(buttons)];

    if page_titles.len() > 1 {
        let options = navigator
            .select_window(page_titles.len())
            .map(|index| {
                let title: String = page_titles[index].chars().take(OPTION_TITLE_LEN).collect();
                serenity::CreateSelectMenuOption::new(
                    format!("{}. {}", index + 1, title),
                    index.to_string(),
                )
                .default_selection(index == navigator.current())
            })
            .collect();

        rows.push(serenity::CreateActionRow::SelectMenu(
            serenity::CreateSelectMenu::new(
                id(SELECT),
                serenity::CreateSelectMenuKind::String { options },
            )
            .placeholder(format!(
                "Page {}/{}",
                navigator.current() + 1,
                page_titles.len()
            )),
        ));
    }

    rows
}

/// Show `pages` one at a time. `page_titles` label the select-menu options
/// and must line up with `pages`.
///
/// Only the invoker and the bot owners can flip pages. Stopping deletes the
/// menu; when it times out the controls are removed and the page stays.
pub async fn paginate(
    ctx: Context<'_>,
    pages: Vec<serenity::CreateEmbed>,
    page_titles: Vec<String>,
    start: usize,
) -> Result<(), Error> {
    if pages.is_empty() {
        return Ok(());
    }

    let mut navigator = PageNavigator::new(Some(pages.len()), start);
    let prefix = ctx.id().to_string();

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(pages[navigator.current()].clone())
                .components(components(&prefix, &navigator, &page_titles)),
        )
        .await?;
    let message_id = reply.message().await?.id;

    while let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
        .channel_id(ctx.channel_id())
        .timeout(MENU_TIMEOUT)
        .filter({
            let prefix = prefix.clone();
            move |press| {
                press.message.id == message_id && press.data.custom_id.starts_with(&prefix)
            }
        })
        .await
    {
        let allowed = press.user.id == ctx.author().id
            || ctx.framework().options().owners.contains(&press.user.id);
        if !allowed {
            if let Err(e) = press
                .create_response(
                    ctx,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content("You are not allowed to interact with this menu.")
                            .ephemeral(true),
                    ),
                )
                .await
            {
                tracing::warn!("Failed to reject menu interaction: {}", e);
            }
            continue;
        }

        let action = press
            .data
            .custom_id
            .strip_prefix(&prefix)
            .unwrap_or_default()
            .trim_start_matches('_');
        match action {
            FIRST => {
                navigator.first();
            }
            BACK => {
                navigator.back();
            }
            FORWARD => {
                navigator.forward();
            }
            LAST => {
                navigator.last();
            }
            SELECT => {
                if let serenity::ComponentInteractionDataKind::StringSelect { values } =
                    &press.data.kind
                {
                    if let Some(index) = values.first().and_then(|v| v.parse::<isize>().ok()) {
                        navigator.jump(index);
                    }
                }
            }
            STOP => {
                press.defer(ctx.http()).await?;
                reply.delete(ctx).await?;
                return Ok(());
            }
            _ => continue,
        }

        press
            .create_response(
                ctx,
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(pages[navigator.current()].clone())
                        .components(components(&prefix, &navigator, &page_titles)),
                ),
            )
            .await?;
    }

    if let Err(e) = reply
        .edit(ctx, poise::CreateReply::default().components(vec![]))
        .await
    {
        tracing::debug!("Failed to remove menu controls: {}", e);
    }

    Ok(())
}

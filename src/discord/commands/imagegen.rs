use crate::core::imagegen::{auto_color, contrast, render_palette, ImageError, ImageScope};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

/// Find the dominant colours of an image, most common first.
#[poise::command(slash_command)]
pub async fn autocolor(
    ctx: Context<'_>,
    #[description = "Image URL"] url: Option<String>,
    #[description = "Image upload"] image: Option<serenity::Attachment>,
    #[description = "How many colours to list (1-6, default 3)"]
    #[min = 1]
    #[max = 6]
    count: Option<u8>,
) -> Result<(), Error> {
    let Some(url) = url.or_else(|| image.map(|a| a.url)) else {
        ctx.say("❌ Give me an image URL or upload one.").await?;
        return Ok(());
    };

    ctx.say("Calculating colors...").await?;

    let scope = ctx
        .guild_id()
        .map_or(ImageScope::Global, |g| ImageScope::Guild(g.get()));
    let images = &ctx.data().images;
    if !images.valid_image_url(&url, scope).await? {
        ctx.say("❌ The url provided is not a valid image").await?;
        return Ok(());
    }
    // Validation left a cached copy behind.
    let bytes = images.download_image(&url, scope).await?;

    let ranks: Vec<usize> = (0..usize::from(count.unwrap_or(3).clamp(1, 6))).collect();
    let (colors, palette) = tokio::task::spawn_blocking(move || {
        let colors = auto_color(&bytes, &ranks, &mut rand::thread_rng())?;
        let swatches: Vec<[u8; 3]> = colors.iter().filter_map(|hex| hex_to_rgb(hex)).collect();
        let palette = render_palette(&swatches)?;
        Ok::<_, ImageError>((colors, palette))
    })
    .await??;

    let mut description = String::new();
    for (rank, hex) in colors.iter().enumerate() {
        let text_on_it = hex_to_rgb(hex).map(|rgb| {
            if contrast(rgb, WHITE, BLACK) == WHITE {
                "white"
            } else {
                "black"
            }
        });
        description.push_str(&format!(
            "**{}.** `#{}` (use {} text)\n",
            rank + 1,
            hex,
            text_on_it.unwrap_or("any")
        ));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Dominant colours")
        .description(description)
        .thumbnail(url)
        .image("attachment://palette.png");
    if let Some(color) = colors.first().and_then(|hex| u32::from_str_radix(hex, 16).ok()) {
        embed = embed.color(color);
    }

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .attachment(serenity::CreateAttachment::bytes(palette, "palette.png")),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(hex_to_rgb("ff8000"), Some([255, 128, 0]));
        assert_eq!(hex_to_rgb("zzzzzz"), None);
    }
}

// Weather commands: current conditions, weekly forecast and unit preferences.

use crate::core::weather::weather_format::{
    moon_phase_emoji, percent, precip_type_label, reading, shorten, weather_state_emoji,
    wind_bearing_direction,
};
use crate::core::weather::{
    DailyConditions, Location, UnitLabels, UnitScope, Units, WeatherError,
};
use crate::discord::pagination::paginate;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const ADDRESS_WIDTH: usize = 244;
const EMBED_COLOR: u32 = 0x3498db;

/// How to get an API key for the forecast service.
#[poise::command(slash_command, owners_only)]
pub async fn forecastapi(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Forecast API key")
        .color(EMBED_COLOR)
        .description(
            "To get a forecast API key:\n\
             1. Register at [Pirate Weather](https://pirate-weather.apiable.io/)\n\
             2. Subscribe to the free plan and copy your API key\n\
             3. Put it in the bot's `.env` as `FORECAST_API_KEY=<your_apikey>` and restart\n\n\
             Any Dark Sky compatible service works: point `FORECAST_API_URL` at it.",
        );
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Measurement units used by the weather commands.
#[poise::command(slash_command, subcommands("user", "guild"))]
pub async fn forecastunits(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set forecast units for yourself: si, us, uk2, ca, or reset.
#[poise::command(slash_command)]
pub async fn user(
    ctx: Context<'_>,
    #[description = "si, us, uk2, ca or reset (leave empty to see current)"] units: Option<String>,
) -> Result<(), Error> {
    let weather = &ctx.data().weather;
    let user_id = ctx.author().id.get();

    let Some(units) = units else {
        let message = match weather.user_units(user_id).await? {
            Some(units) => format!("Your current units are: {}", units),
            None => match ctx.guild_id() {
                Some(guild_id) => format!(
                    "Not set, using server's default {}",
                    weather.guild_units(guild_id.get()).await?
                ),
                None => format!("Not set, using default {}", Units::default()),
            },
        };
        ctx.say(message).await?;
        return Ok(());
    };

    if units.trim().eq_ignore_ascii_case("reset") {
        weather.clear_user_units(user_id).await?;
        ctx.say("✅ Your unit preference was reset.").await?;
        return Ok(());
    }

    match weather.set_user_units(user_id, &units).await {
        Ok(units) => ctx.say(format!("✅ Your units are now {}.", units)).await?,
        Err(e @ WeatherError::UnsupportedUnits(_)) => ctx.say(format!("❌ {}", e)).await?,
        Err(e) => return Err(e.into()),
    };
    Ok(())
}

/// Set forecast units for this server: si, us, uk2 or ca.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn guild(
    ctx: Context<'_>,
    #[description = "si, us, uk2 or ca (leave empty to see current)"] units: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let weather = &ctx.data().weather;

    let Some(units) = units else {
        ctx.say(format!(
            "Current units are: {}",
            weather.guild_units(guild_id).await?
        ))
        .await?;
        return Ok(());
    };

    match weather.set_guild_units(guild_id, &units).await {
        Ok(units) => {
            ctx.say(format!("✅ Server units are now {}.", units))
                .await?
        }
        Err(e @ WeatherError::UnsupportedUnits(_)) => ctx.say(format!("❌ {}", e)).await?,
        Err(e) => return Err(e.into()),
    };
    Ok(())
}

/// Shows weather in provided place.
#[poise::command(slash_command)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "Place to look up"] place: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let report = match ctx.data().weather.current(&place, scope(&ctx)).await {
        Ok(report) => report,
        Err(e) => return report_error(ctx, e).await,
    };
    let labels = report.units.labels();
    let now = &report.conditions;

    let mut embed = base_embed(&report.location, None)
        .field(
            "Summary",
            format!(
                "{} {}",
                weather_state_emoji(now.icon.as_deref()),
                now.summary.as_deref().unwrap_or("N/A")
            ),
            true,
        )
        .field(
            "Temperature",
            format!(
                "{} {} ({} {})",
                reading(now.temperature),
                labels.temp,
                reading(now.apparent_temperature),
                labels.temp
            ),
            true,
        )
        .field(
            "Air pressure",
            format!("{} {}", reading(now.pressure), labels.pressure),
            true,
        )
        .field("Humidity", percentage(now.humidity), true)
        .field(
            "Visibility",
            format!("{} {}", reading(now.visibility), labels.distance),
            true,
        )
        .field(
            "Wind speed",
            wind(now.wind_bearing, now.wind_speed, &labels),
            true,
        )
        .field("Cloud cover", percentage(now.cloud_cover), true)
        .field(
            "Ozone density",
            format!(
                "{} [DU](https://en.wikipedia.org/wiki/Dobson_unit)",
                reading(now.ozone)
            ),
            true,
        )
        .field("UV index", reading(now.uv_index), true)
        .field(
            "Precipitation",
            precipitation(
                now.precip_probability,
                now.precip_intensity,
                now.precip_type.as_deref(),
                None,
                &labels,
            ),
            true,
        );
    if let Some(time) = now.time {
        embed = embed.timestamp(time);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shows 7 days forecast for provided place.
#[poise::command(slash_command)]
pub async fn forecast(
    ctx: Context<'_>,
    #[description = "Place to look up"] place: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let report = match ctx.data().weather.week(&place, scope(&ctx)).await {
        Ok(report) => report,
        Err(e) => return report_error(ctx, e).await,
    };
    if report.days.is_empty() {
        ctx.say("The forecast service returned no days for this place.")
            .await?;
        return Ok(());
    }

    let labels = report.units.labels();
    let total = report.days.len();
    let mut pages = Vec::with_capacity(total);
    let mut titles = Vec::with_capacity(total);

    for (index, day) in report.days.iter().enumerate() {
        let embed = day_embed(&report.location, report.summary.as_deref(), day, &labels)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {}/{}",
                index + 1,
                total
            )));
        pages.push(embed);
        titles.push(
            day.time
                .map(|t| t.format("%A, %d %B").to_string())
                .unwrap_or_else(|| format!("Day {}", index + 1)),
        );
    }

    paginate(ctx, pages, titles, 0).await
}

fn scope(ctx: &Context<'_>) -> UnitScope {
    UnitScope {
        user_id: ctx.author().id.get(),
        guild_id: ctx.guild_id().map(|g| g.get()),
    }
}

async fn report_error(ctx: Context<'_>, err: WeatherError) -> Result<(), Error> {
    let message = match &err {
        WeatherError::PlaceNotFound(place) => format!("❌ Cannot find a place `{}`", place),
        WeatherError::MissingApiKey => {
            "❌ This command requires an API key. Use `/forecastapi` to get more information."
                .to_string()
        }
        WeatherError::Unavailable(reason) => {
            tracing::warn!("Forecast lookup failed: {}", reason);
            "❌ Unable to get data from the forecast service.".to_string()
        }
        _ => return Err(err.into()),
    };
    ctx.say(message).await?;
    Ok(())
}

fn base_embed(location: &Location, summary: Option<&str>) -> serenity::CreateEmbed {
    let maps = format!("[View on Google Maps]({})", location.maps_url());
    let description = match summary {
        Some(summary) => format!("{}\n{}", summary, maps),
        None => maps,
    };

    serenity::CreateEmbed::new()
        .title(format!(
            "Weather in {}",
            shorten(&location.address, ADDRESS_WIDTH)
        ))
        .description(description)
        .color(EMBED_COLOR)
        .author(serenity::CreateEmbedAuthor::new("Powered by Dark Sky compatible forecasts"))
}

fn day_embed(
    location: &Location,
    week_summary: Option<&str>,
    day: &DailyConditions,
    labels: &UnitLabels,
) -> serenity::CreateEmbed {
    let mut embed = base_embed(location, week_summary)
        .field(
            "Summary",
            format!(
                "{} {}",
                weather_state_emoji(day.icon.as_deref()),
                day.summary.as_deref().unwrap_or("No summary for this day")
            ),
            true,
        )
        .field(
            "Temperature",
            format!(
                "{} — {} {}\n({} — {} {})",
                reading(day.temperature_min),
                reading(day.temperature_max),
                labels.temp,
                reading(day.apparent_temperature_min),
                reading(day.apparent_temperature_max),
                labels.temp
            ),
            true,
        )
        .field(
            "Air pressure",
            format!("{} {}", reading(day.pressure), labels.pressure),
            true,
        )
        .field("Humidity", percentage(day.humidity), true)
        .field(
            "Visibility",
            format!("{} {}", reading(day.visibility), labels.distance),
            true,
        )
        .field(
            "Wind speed",
            wind(day.wind_bearing, day.wind_speed, labels),
            true,
        )
        .field("Cloud cover", percentage(day.cloud_cover), true)
        .field(
            "Ozone density",
            format!(
                "{} [DU](https://en.wikipedia.org/wiki/Dobson_unit)",
                reading(day.ozone)
            ),
            true,
        )
        .field("UV index", reading(day.uv_index), true)
        .field(
            "Precipitation",
            precipitation(
                day.precip_probability,
                day.precip_intensity,
                day.precip_type.as_deref(),
                day.precip_accumulation,
                labels,
            ),
            true,
        )
        .field(
            "Moon phase",
            day.moon_phase
                .map(moon_phase_emoji)
                .unwrap_or_else(|| "N/A".to_string()),
            true,
        );
    if let Some(time) = day.time {
        embed = embed.timestamp(time);
    }
    embed
}

fn percentage(fraction: Option<f64>) -> String {
    fraction.map_or_else(|| "N/A".to_string(), |f| format!("{}%", percent(f)))
}

fn wind(bearing: Option<f64>, speed: Option<f64>, labels: &UnitLabels) -> String {
    let direction = bearing.map(wind_bearing_direction).unwrap_or("");
    format!("{} {} {}", direction, reading(speed), labels.speed)
        .trim()
        .to_string()
}

fn precipitation(
    probability: Option<f64>,
    intensity: Option<f64>,
    precip_type: Option<&str>,
    accumulation: Option<f64>,
    labels: &UnitLabels,
) -> String {
    let mut text = format!(
        "Probability: {}\nIntensity: {} {}",
        percentage(probability),
        intensity.map_or_else(|| "N/A".to_string(), |i| percent(i).to_string()),
        labels.intensity
    );
    if let Some(kind) = precip_type {
        text.push_str(&format!("\nType: {}", precip_type_label(kind)));
    }
    if let Some(amount) = accumulation.filter(|a| *a > 0.0) {
        text.push_str(&format!(
            "\nSnowfall accumulation: {} {}",
            amount, labels.accumulation
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precipitation_lists_only_known_parts() {
        let labels = Units::Si.labels();

        assert_eq!(
            precipitation(Some(0.3), Some(0.012), None, None, &labels),
            "Probability: 30%\nIntensity: 1 mm/h"
        );
        assert_eq!(
            precipitation(Some(0.5), None, Some("snow"), Some(2.5), &labels),
            "Probability: 50%\nIntensity: N/A mm/h\nType: Snow\nSnowfall accumulation: 2.5 cm"
        );
    }

    #[test]
    fn wind_reads_direction_then_speed() {
        let labels = Units::Us.labels();
        assert_eq!(wind(Some(90.0), Some(4.5), &labels), "E 4.5 mph");
        assert_eq!(wind(None, Some(4.5), &labels), "4.5 mph");
    }
}

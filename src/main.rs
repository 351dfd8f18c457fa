// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::leveling::{LevelingConfig, LevelingError, LevelingService, LinearCurve};
use crate::core::weather::{WeatherConfig, WeatherService};
use crate::discord::commands::leveling::LedgerBackend;
use crate::discord::leveling_announcements::AnnouncementHandler;
use crate::discord::{Data, Error};
use crate::infra::imagegen::ImageCache;
use crate::infra::leveling::{InMemoryLedgerStore, SqliteLedgerStore};
use crate::infra::weather::{ForecastApiClient, JsonUnitStore, NominatimGeocoder};
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Read an env var and parse it, falling back to `default` when it is unset
/// or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring malformed {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn leveling_config() -> LevelingConfig {
    let defaults = LevelingConfig::default();
    let min = env_or("LEVELER_XP_MIN", *defaults.xp_range.start());
    let max = env_or("LEVELER_XP_MAX", *defaults.xp_range.end());

    LevelingConfig {
        xp_range: min.min(max)..=min.max(max),
        cooldown: Duration::from_secs(env_or(
            "LEVELER_COOLDOWN_SECS",
            defaults.cooldown.as_secs(),
        )),
        reset_batch: env_or("LEVELER_RESET_BATCH", defaults.reset_batch),
        reset_pause: Duration::from_secs(env_or(
            "LEVELER_RESET_PAUSE_SECS",
            defaults.reset_pause.as_secs(),
        )),
    }
}

fn weather_config() -> WeatherConfig {
    let defaults = WeatherConfig::default();
    WeatherConfig {
        api_url: std::env::var("FORECAST_API_URL").unwrap_or(defaults.api_url),
        api_key: std::env::var("FORECAST_API_KEY").ok(),
        locale: std::env::var("BOT_LOCALE").unwrap_or(defaults.locale),
    }
}

/// Event handler for non-command Discord events.
/// This is where we'll handle messages for XP gain.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        // Ignore bot messages (including our own)
        if new_message.author.bot {
            return Ok(());
        }

        // Only process guild messages (not DMs)
        let Some(guild_id) = new_message.guild_id else {
            return Ok(());
        };

        // Announcements are sent by the level-up handler.
        match data
            .leveling
            .process_message(
                new_message.author.id.get(),
                guild_id.get(),
                Some(new_message.channel_id.get()),
            )
            .await
        {
            Ok(Some(level_up)) => {
                tracing::info!(
                    user_id = level_up.user_id,
                    guild_id = level_up.guild_id,
                    old_level = level_up.old_level,
                    new_level = level_up.new_level,
                    total_exp = level_up.total_exp,
                    "User leveled up"
                );
            }
            Ok(None) | Err(LevelingError::OnCooldown(_)) | Err(LevelingError::ChatBlocked) => {}
            Err(e) => {
                tracing::error!("Error processing XP for message: {}", e);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime files in a dedicated folder so the repo root stays tidy.
    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Stores and clients are built here; the services that need the Discord
    // HTTP client are finished in `setup`.

    let ledger: LedgerBackend = match std::env::var("LEVELER_STORE").as_deref() {
        Ok("memory") => {
            tracing::warn!("Using the in-memory ledger; experience is lost on restart");
            Box::new(InMemoryLedgerStore::new())
        }
        _ => {
            let db_path = data_dir.join("leveling.db");
            Box::new(
                SqliteLedgerStore::new(&db_path.to_string_lossy())
                    .await
                    .expect("Failed to initialize SQLite ledger"),
            )
        }
    };
    let leveling_config = leveling_config();

    let weather_config = weather_config();
    if weather_config.api_key.is_none() {
        tracing::warn!("FORECAST_API_KEY is not set; weather commands will explain how to get one");
    }
    let weather_service = Arc::new(WeatherService::new(
        NominatimGeocoder::new().expect("Failed to create geocoder client"),
        ForecastApiClient::new(&weather_config).expect("Failed to create forecast client"),
        JsonUnitStore::new(data_dir.join("weather_units.json"))
            .expect("Failed to open weather unit preferences"),
        &weather_config.locale,
    ));

    let image_cache = Arc::new(
        ImageCache::new(data_dir.join("images")).expect("Failed to create image cache"),
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::leveling::rank(),
                discord::commands::leveling::leaderboard(),
                discord::commands::lvladmin::lvladmin(),
                discord::commands::weather::forecastapi(),
                discord::commands::weather::forecastunits(),
                discord::commands::weather::weather(),
                discord::commands::weather::forecast(),
                discord::commands::imagegen::autocolor(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    if let poise::FrameworkError::Command { error, ctx, .. } = &error {
                        tracing::error!(command = %ctx.command().name, "Command failed: {}", error);
                    }
                    if let Err(e) = poise::builtins::on_error(error).await {
                        tracing::error!("Error while handling error: {}", e);
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                let announcements = Arc::new(AnnouncementHandler::new(ctx.http.clone()));
                let leveling = LevelingService::with_curve(
                    ledger,
                    LinearCurve::default(),
                    leveling_config,
                )
                .with_levelup_handler(announcements);

                Ok(Data {
                    leveling: Arc::new(leveling),
                    weather: weather_service,
                    images: image_cache,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}

use cron::Schedule;
use sqlx::postgres::PgPoolOptions;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod context;
mod db;
mod errors;
mod handlers;
mod helpers;
mod services;

use config::AppConfig;
use context::BotContext;
use services::conversation::ConversationState;
use services::ingest::IngestCache;
use services::telegram::TelegramClient;
use services::water::WaterLevelClient;
use services::weather::WeatherClient;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "river_report_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Fail fast on a bad reminder schedule
    let reminder_schedule = Schedule::from_str(&config.reminder_cron)
        .expect("REMINDER_CRON must be a valid cron expression");

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let telegram = TelegramClient::new(&config.telegram_api_url, &config.bot_token);
    let weather = WeatherClient::new(
        &config.weather_api_url,
        &config.weather_api_key,
        &config.weather_city,
    );
    let water = WaterLevelClient::new(&config.water_level_url);

    // Register the static command menu once at startup
    if let Err(e) = telegram.set_my_commands(&handlers::commands::command_menu()).await {
        tracing::error!("Failed to register command menu: {}", e);
    }

    let ctx = Arc::new(BotContext {
        pool: pool.clone(),
        telegram: telegram.clone(),
        weather: weather.clone(),
        water: water.clone(),
        ingest_cache: Arc::new(Mutex::new(IngestCache::default())),
        conversation: Arc::new(Mutex::new(ConversationState::default())),
        retention_rows: config.snapshot_retention_rows,
        bot_name: config.bot_name.clone(),
    });

    // Spawn the scheduled ingestion and the reminder broadcast
    tokio::spawn(services::ingest::run_ingest_poller(
        pool.clone(),
        weather,
        water,
        ctx.ingest_cache.clone(),
        config.snapshot_retention_rows,
        config.ingest_interval_secs,
    ));
    tokio::spawn(services::reminder::run_reminder(
        pool,
        telegram,
        reminder_schedule,
    ));

    tracing::info!(bot_name = %config.bot_name, "Bot started, entering long-poll loop");
    run_update_loop(ctx).await;
}

/// Drive the Telegram long poll, dispatching one update to completion at a
/// time. A failed poll is logged and retried after a short pause.
async fn run_update_loop(ctx: Arc<BotContext>) {
    let mut offset: Option<i64> = None;

    loop {
        let updates = match ctx.telegram.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!("getUpdates failed: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            // Advance past this update regardless of handler outcome
            offset = Some(update.update_id + 1);
            handlers::dispatch_update(&ctx, update).await;
        }
    }
}

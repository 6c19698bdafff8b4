use anyhow::Result;
use campusbot::config::Config;
use campusbot::session::SessionStore;
use campusbot::{api, db, handlers, scheduler, server, AppState};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "campusbot.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool, &config.database_url).await?;

    info!(
        latitude = config.campus.latitude,
        longitude = config.campus.longitude,
        radius_m = config.campus.proximity_radius_m,
        "Campus configured"
    );

    let state = Arc::new(AppState {
        db: pool,
        telegram: api::TelegramApi::new(config.bot_token.clone()),
        bot_username: config.bot_username.clone(),
        campus: config.campus.clone(),
        sessions: SessionStore::new(),
    });

    tokio::spawn(scheduler::run(
        state.clone(),
        Duration::from_secs(config.scheduler_interval_secs.max(1)),
    ));

    if let Some(webhook) = config.webhook {
        return server::start_webhook_server(state, webhook).await;
    }

    // A leftover webhook would make getUpdates fail.
    if let Err(err) = state.telegram.delete_webhook().await {
        error!("Failed to delete webhook before polling: {err:?}");
    }
    info!("Bot started. Waiting for updates...");

    let mut offset: Option<i64> = None;
    loop {
        match state.telegram.get_updates(offset, 30).await {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);

                    if let Err(err) = handlers::process_update(state.clone(), update).await {
                        error!("Failed to process update: {err:?}");
                    }
                }
            }
            Err(err) => {
                error!("Error getting updates: {err:?}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

// Questline bot process: one long-lived binary hosting the update dispatch
// loop and the notification scheduler over the same store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use questline_bot::{BotApp, TelegramClient};
use questline_catalog::CatalogClient;
use questline_core::transport::{ChatTransport, CommandSpec};
use questline_core::Config;
use questline_gigachat::GigaChatClient;
use questline_storage::Database;
use questline_worker::NotificationScheduler;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "start",
        description: "Browse events",
    },
    CommandSpec {
        command: "register",
        description: "Register",
    },
    CommandSpec {
        command: "me",
        description: "Show your profile",
    },
    CommandSpec {
        command: "checkpoints",
        description: "Walk an event's checkpoints",
    },
    CommandSpec {
        command: "quiz",
        description: "Answer an event's quiz",
    },
    CommandSpec {
        command: "cancel",
        description: "Cancel the current action",
    },
];

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "questline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("questline-bot starting...");

    let db = Database::from_url(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Connected to database");

    let telegram = Arc::new(TelegramClient::new(&config.bot_token));
    telegram
        .set_commands(COMMANDS)
        .await
        .context("Failed to publish command menu")?;

    let catalog = CatalogClient::new(&config.catalog_base_url);
    let generator = config
        .gigachat_token
        .as_deref()
        .map(|token| GigaChatClient::with_base_url(token, &config.gigachat_base_url));
    if generator.is_none() {
        tracing::warn!("GIGACHAT_TOKEN not set; draft generation disabled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let transport: Arc<dyn ChatTransport> = telegram.clone();
    let scheduler =
        NotificationScheduler::new(db.clone(), transport.clone(), &config, shutdown_rx);
    let scheduler_handle = tokio::spawn(scheduler.run());

    let app = BotApp::new(db, transport, catalog, generator, config);

    tracing::info!("polling for updates");
    let mut offset = 0i64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            batch = telegram.poll_updates(offset) => match batch {
                Ok(updates) => {
                    for (update_id, incoming) in updates {
                        offset = offset.max(update_id + 1);
                        if let Some(incoming) = incoming {
                            let app = app.clone();
                            tokio::spawn(async move { app.dispatch(incoming).await });
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "update poll failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            },
        }
    }

    // Drain: the scheduler finishes any in-flight tick before we exit.
    shutdown_tx.send(true).ok();
    if let Err(error) = scheduler_handle.await {
        tracing::warn!(%error, "scheduler task ended abnormally");
    }
    tracing::info!("questline-bot stopped");
    Ok(())
}

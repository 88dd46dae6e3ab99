// Runtime configuration, environment-driven with spec defaults.

use anyhow::{Context, Result};
use chrono::Duration;

fn default_scheduler_cadence_secs() -> u64 {
    60
}

fn default_pre_start_lead_mins() -> i64 {
    60
}

fn default_eligibility_window_days() -> i64 {
    10
}

/// Configuration for the questline process
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,
    /// Chat transport bot token
    pub bot_token: String,
    /// Base URL of the external event catalog
    pub catalog_base_url: String,
    /// Base URL of the content generator API
    pub gigachat_base_url: String,
    /// Content generator credentials, if generation is enabled
    pub gigachat_token: Option<String>,
    /// Seconds between notification scheduler ticks
    pub scheduler_cadence_secs: u64,
    /// Minutes before event start at which the pre-start notification fires
    pub pre_start_lead_mins: i64,
    /// Days after event end during which mini-games stay eligible
    pub eligibility_window_days: i64,
}

impl Config {
    /// Load configuration from the environment. `DATABASE_URL` and
    /// `BOT_TOKEN` are required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
        let bot_token =
            std::env::var("BOT_TOKEN").context("BOT_TOKEN environment variable required")?;

        Ok(Self {
            database_url,
            bot_token,
            catalog_base_url: std::env::var("CATALOG_BASE_URL")
                .unwrap_or_else(|_| "https://extra.hse.ru".to_string()),
            gigachat_base_url: std::env::var("GIGACHAT_BASE_URL").unwrap_or_else(|_| {
                "https://gigachat.devices.sberbank.ru/api/v1".to_string()
            }),
            gigachat_token: std::env::var("GIGACHAT_TOKEN").ok(),
            scheduler_cadence_secs: parse_env(
                "SCHEDULER_CADENCE_SECS",
                default_scheduler_cadence_secs(),
            )?,
            pre_start_lead_mins: parse_env(
                "PRE_START_LEAD_MINS",
                default_pre_start_lead_mins(),
            )?,
            eligibility_window_days: parse_env(
                "ELIGIBILITY_WINDOW_DAYS",
                default_eligibility_window_days(),
            )?,
        })
    }

    /// Lead time before event start for the pre-start trigger
    pub fn pre_start_lead(&self) -> Duration {
        Duration::minutes(self.pre_start_lead_mins)
    }

    /// Post-event window during which mini-games stay eligible
    pub fn eligibility_window(&self) -> Duration {
        Duration::days(self.eligibility_window_days)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}")),
        Err(_) => Ok(default),
    }
}

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::env;

pub const DEFAULT_PROXIMITY_RADIUS_M: f64 = 300.0;
pub const DEFAULT_NEAR_CAMPUS_RADIUS_M: f64 = 1000.0;
pub const DEFAULT_TIMEZONE_OFFSET_HOURS: i32 = 5;

#[derive(Debug, Clone)]
pub struct CampusConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Check-ins farther than this are refused.
    pub proximity_radius_m: f64,
    /// Location updates within this radius mark the user as "near".
    pub near_radius_m: f64,
    pub timezone: FixedOffset,
    pub admin_ids: Vec<i64>,
}

impl CampusConfig {
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    pub fn is_configured_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            latitude: 43.2220,
            longitude: 76.8512,
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_M,
            near_radius_m: DEFAULT_NEAR_CAMPUS_RADIUS_M,
            timezone: timezone_from_offset(DEFAULT_TIMEZONE_OFFSET_HOURS)
                .unwrap_or_else(|_| Utc.fix()),
            admin_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub port: u16,
    pub path: String,
    pub secret_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub bot_username: String,
    pub database_url: String,
    pub log_dir: String,
    pub scheduler_interval_secs: u64,
    pub webhook: Option<WebhookSettings>,
    pub campus: CampusConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN environment variable is required"))?;
        let bot_username = env::var("TELEGRAM_BOT_USERNAME")
            .map_err(|_| anyhow!("TELEGRAM_BOT_USERNAME environment variable is required"))?
            .trim_start_matches('@')
            .to_string();
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://campusbot.db?mode=rwc".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let scheduler_interval_secs = parse_or("SCHEDULER_INTERVAL_SECS", 60u64)?;

        let webhook = match env::var("WEBHOOK_URL") {
            Ok(url) if !url.trim().is_empty() => Some(WebhookSettings {
                url,
                port: parse_or("WEBHOOK_PORT", 8080u16)?,
                path: env::var("WEBHOOK_PATH").unwrap_or_else(|_| "/webhook".to_string()),
                secret_token: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            }),
            _ => None,
        };

        let offset_hours = parse_or("TIMEZONE_OFFSET", DEFAULT_TIMEZONE_OFFSET_HOURS)?;
        let campus = CampusConfig {
            latitude: parse_or("CAMPUS_LATITUDE", 43.2220f64)?,
            longitude: parse_or("CAMPUS_LONGITUDE", 76.8512f64)?,
            proximity_radius_m: parse_or("PROXIMITY_RADIUS", DEFAULT_PROXIMITY_RADIUS_M)?,
            near_radius_m: parse_or("NEAR_CAMPUS_RADIUS", DEFAULT_NEAR_CAMPUS_RADIUS_M)?,
            timezone: timezone_from_offset(offset_hours)?,
            admin_ids: parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default()),
        };

        Ok(Self {
            bot_token,
            bot_username,
            database_url,
            log_dir,
            scheduler_interval_secs,
            webhook,
            campus,
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

pub fn timezone_from_offset(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| anyhow!("TIMEZONE_OFFSET out of range: {hours}"))
}

pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .collect()
}

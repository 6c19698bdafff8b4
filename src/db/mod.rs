mod contest;
mod events;
mod knowledge_base;
mod posts;
mod presence;
mod ranks;
mod users;

pub use contest::*;
pub use events::*;
pub use knowledge_base::*;
pub use posts::*;
pub use presence::*;
pub use ranks::*;
pub use users::*;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, Pool};

pub async fn connect(database_url: &str) -> Result<Pool<Any>> {
    sqlx::any::install_default_drivers();
    let mut options = AnyPoolOptions::new().max_connections(5);
    if database_url.contains(":memory:") {
        // Every in-memory connection is a separate database.
        options = options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    Ok(options.connect(database_url).await?)
}

pub async fn run_migrations(pool: &Pool<Any>, database_url: &str) -> Result<()> {
    if database_url.starts_with("postgres") {
        sqlx::raw_sql(include_str!("../../migrations/postgres/001_init.sql"))
            .execute(pool)
            .await?;
    } else {
        sqlx::raw_sql(include_str!("../../migrations/sqlite/001_init.sql"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Timestamps are stored as RFC 3339 UTC text, so string order is time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp {raw:?}: {e}"))
}

pub fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| anyhow!("Invalid date {raw:?}: {e}"))
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

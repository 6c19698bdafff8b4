use super::{parse_timestamp, timestamp};
use crate::models::{Event, EventParticipant};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Pool, Row};

const EVENT_COLUMNS: &str = "id, name, start_time, end_time, description, created_by";

fn event_from_row(row: &AnyRow) -> Result<Event> {
    let start: String = row.try_get("start_time")?;
    let end: String = row.try_get("end_time")?;
    Ok(Event {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_time: parse_timestamp(&start)?,
        end_time: parse_timestamp(&end)?,
        description: row.try_get("description")?,
        created_by: row.try_get("created_by")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: i64,
}

pub async fn create_event(pool: &Pool<Any>, event: &NewEvent, now: DateTime<Utc>) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO events (name, start_time, end_time, description, created_by, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(&event.name)
    .bind(timestamp(event.start_time))
    .bind(timestamp(event.end_time))
    .bind(&event.description)
    .bind(event.created_by)
    .bind(timestamp(now))
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub async fn get_event(pool: &Pool<Any>, event_id: i64) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
    let row = sqlx::query(&sql).bind(event_id).fetch_optional(pool).await?;
    row.as_ref().map(event_from_row).transpose()
}

/// The event running at `now`, latest start first when several overlap.
pub async fn active_event(conn: &mut AnyConnection, now: DateTime<Utc>) -> Result<Option<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE start_time <= $1 AND end_time >= $1
         ORDER BY start_time DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(timestamp(now))
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(event_from_row).transpose()
}

pub async fn event_at(pool: &Pool<Any>, at: DateTime<Utc>) -> Result<Option<Event>> {
    let mut conn = pool.acquire().await?;
    active_event(&mut *conn, at).await
}

/// Most recently started events, finished or not.
pub async fn recent_events(pool: &Pool<Any>, limit: i64) -> Result<Vec<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY start_time DESC LIMIT $1");
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    rows.iter().map(event_from_row).collect()
}

pub async fn finished_events(pool: &Pool<Any>, now: DateTime<Utc>, limit: i64) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE end_time < $1
         ORDER BY start_time DESC
         LIMIT $2"
    );
    let rows = sqlx::query(&sql)
        .bind(timestamp(now))
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(event_from_row).collect()
}

pub async fn upcoming_events(pool: &Pool<Any>, now: DateTime<Utc>) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE end_time >= $1
         ORDER BY start_time ASC"
    );
    let rows = sqlx::query(&sql).bind(timestamp(now)).fetch_all(pool).await?;
    rows.iter().map(event_from_row).collect()
}

pub async fn event_participants(pool: &Pool<Any>, event_id: i64) -> Result<Vec<EventParticipant>> {
    let rows = sqlx::query(
        "SELECT u.first_name, u.last_name, u.team_role, p.check_in_time, p.check_out_time
         FROM presence p
         JOIN users u ON p.user_id = u.user_id
         WHERE p.event_id = $1
         ORDER BY p.check_in_time",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let check_in: String = row.try_get("check_in_time")?;
            Ok(EventParticipant {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                team_role: row.try_get("team_role")?,
                check_in_time: parse_timestamp(&check_in)?,
                check_out_time: super::parse_optional_timestamp(row.try_get("check_out_time")?)?,
            })
        })
        .collect()
}

/// Presence rows and posts keep their data; their `event_id` is cleared.
pub async fn delete_event(pool: &Pool<Any>, event_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE presence SET event_id = NULL WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE posts SET event_id = NULL WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

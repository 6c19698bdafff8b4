use super::{
    date_key, events, flag, parse_date, parse_optional_timestamp, parse_timestamp, ranks,
    timestamp, users::user_from_row, users::USER_COLUMNS,
};
use crate::models::{
    Event, ExportRow, GeoSample, ParticipantStatus, PresenceRecord, PresenceStats, PresenceStatus,
    PresentUser, Rank,
};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

const PRESENCE_COLUMNS: &str =
    "id, user_id, event_id, check_in_time, check_out_time, date, status, latitude, longitude";

const LATEST_SAMPLE_ID: &str = "(SELECT g.id FROM geolocation g
      WHERE g.user_id = u.user_id
      ORDER BY g.recorded_at DESC, g.id DESC
      LIMIT 1)";

fn presence_from_row(row: &AnyRow) -> Result<PresenceRecord> {
    let check_in: String = row.try_get("check_in_time")?;
    let date: String = row.try_get("date")?;
    let status: String = row.try_get("status")?;
    Ok(PresenceRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        event_id: row.try_get("event_id")?,
        check_in_time: parse_timestamp(&check_in)?,
        check_out_time: parse_optional_timestamp(row.try_get("check_out_time")?)?,
        date: parse_date(&date)?,
        status: PresenceStatus::parse(&status),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
    })
}

fn sample_from_row(row: &AnyRow) -> Result<GeoSample> {
    let recorded_at: String = row.try_get("recorded_at")?;
    Ok(GeoSample {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        distance_m: row.try_get("distance_m")?,
        recorded_at: parse_timestamp(&recorded_at)?,
        is_near_campus: row.try_get::<i64, _>("is_near_campus")? != 0,
    })
}

/// Geo sample columns joined under a `g_` prefix.
fn joined_sample(row: &AnyRow) -> Result<Option<GeoSample>> {
    let Some(id) = row.try_get::<Option<i64>, _>("g_id")? else {
        return Ok(None);
    };
    let recorded_at: String = row.try_get("g_recorded_at")?;
    Ok(Some(GeoSample {
        id,
        user_id: row.try_get("user_id")?,
        latitude: row.try_get("g_latitude")?,
        longitude: row.try_get("g_longitude")?,
        distance_m: row.try_get("g_distance_m")?,
        recorded_at: parse_timestamp(&recorded_at)?,
        is_near_campus: row.try_get::<i64, _>("g_is_near_campus")? != 0,
    }))
}

#[derive(Debug, Clone)]
pub struct NewGeoSample {
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
    pub is_near_campus: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum CheckInWrite {
    Recorded {
        presence_id: i64,
        event: Option<Event>,
        total_checkins: i64,
        new_rank: Option<Rank>,
    },
    AlreadyCheckedIn,
}

/// Writes a check-in atomically: presence record, geo sample, counter bump
/// and rank update either all land or none do.
pub async fn record_check_in(
    pool: &Pool<Any>,
    sample: &NewGeoSample,
    local_date: NaiveDate,
) -> Result<CheckInWrite> {
    let mut tx = pool.begin().await?;
    let now = timestamp(sample.recorded_at);
    let date = date_key(local_date);

    let existing = sqlx::query(
        "SELECT id FROM presence WHERE user_id = $1 AND date = $2 AND status = 'in_campus' LIMIT 1",
    )
    .bind(sample.user_id)
    .bind(&date)
    .fetch_optional(&mut *tx)
    .await?;
    if existing.is_some() {
        return Ok(CheckInWrite::AlreadyCheckedIn);
    }

    let event = events::active_event(&mut *tx, sample.recorded_at).await?;

    let presence_row = sqlx::query(
        "INSERT INTO presence (user_id, event_id, check_in_time, date, status, latitude, longitude)
         VALUES ($1, $2, $3, $4, 'in_campus', $5, $6)
         RETURNING id",
    )
    .bind(sample.user_id)
    .bind(event.as_ref().map(|e| e.id))
    .bind(&now)
    .bind(&date)
    .bind(sample.latitude)
    .bind(sample.longitude)
    .fetch_one(&mut *tx)
    .await?;
    let presence_id: i64 = presence_row.get("id");

    insert_sample(&mut *tx, sample).await?;

    sqlx::query("UPDATE users SET total_checkins = total_checkins + 1, updated_at = $1 WHERE user_id = $2")
        .bind(&now)
        .bind(sample.user_id)
        .execute(&mut *tx)
        .await?;

    let user_row = sqlx::query("SELECT total_checkins, current_rank FROM users WHERE user_id = $1")
        .bind(sample.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow!("User {} not found", sample.user_id))?;
    let total_checkins: i64 = user_row.try_get("total_checkins")?;
    let current_rank: String = user_row.try_get("current_rank")?;

    let table = ranks::load_ranks_with(&mut *tx).await?;
    let new_rank = match crate::ranks::rank_for(total_checkins, &table) {
        Some(rank) if rank.name != current_rank => {
            sqlx::query("UPDATE users SET current_rank = $1 WHERE user_id = $2")
                .bind(&rank.name)
                .bind(sample.user_id)
                .execute(&mut *tx)
                .await?;
            Some(rank.clone())
        }
        _ => None,
    };

    tx.commit().await?;

    Ok(CheckInWrite::Recorded {
        presence_id,
        event,
        total_checkins,
        new_rank,
    })
}

async fn insert_sample(conn: &mut sqlx::AnyConnection, sample: &NewGeoSample) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO geolocation (user_id, latitude, longitude, distance_m, recorded_at, is_near_campus)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(sample.user_id)
    .bind(sample.latitude)
    .bind(sample.longitude)
    .bind(sample.distance_m)
    .bind(timestamp(sample.recorded_at))
    .bind(flag(sample.is_near_campus))
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("id"))
}

pub async fn record_geo_sample(pool: &Pool<Any>, sample: &NewGeoSample) -> Result<i64> {
    let mut conn = pool.acquire().await?;
    insert_sample(&mut *conn, sample).await
}

/// Closes the latest open record of the day. Returns it as it was before closing.
pub async fn check_out(
    pool: &Pool<Any>,
    user_id: i64,
    local_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<PresenceRecord>> {
    let Some(record) = open_presence(pool, user_id, local_date).await? else {
        return Ok(None);
    };

    sqlx::query("UPDATE presence SET check_out_time = $1, status = 'left' WHERE id = $2")
        .bind(timestamp(now))
        .bind(record.id)
        .execute(pool)
        .await?;

    Ok(Some(record))
}

pub async fn open_presence(
    pool: &Pool<Any>,
    user_id: i64,
    local_date: NaiveDate,
) -> Result<Option<PresenceRecord>> {
    let sql = format!(
        "SELECT {PRESENCE_COLUMNS} FROM presence
         WHERE user_id = $1 AND date = $2 AND status = 'in_campus'
         ORDER BY check_in_time DESC, id DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(date_key(local_date))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(presence_from_row).transpose()
}

/// Latest record of the day regardless of status.
pub async fn today_presence(
    pool: &Pool<Any>,
    user_id: i64,
    local_date: NaiveDate,
) -> Result<Option<PresenceRecord>> {
    let sql = format!(
        "SELECT {PRESENCE_COLUMNS} FROM presence
         WHERE user_id = $1 AND date = $2
         ORDER BY check_in_time DESC, id DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(date_key(local_date))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(presence_from_row).transpose()
}

pub async fn last_presence(pool: &Pool<Any>, user_id: i64) -> Result<Option<PresenceRecord>> {
    let sql = format!(
        "SELECT {PRESENCE_COLUMNS} FROM presence
         WHERE user_id = $1
         ORDER BY check_in_time DESC, id DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
    row.as_ref().map(presence_from_row).transpose()
}

pub async fn latest_geo_sample(pool: &Pool<Any>, user_id: i64) -> Result<Option<GeoSample>> {
    let row = sqlx::query(
        "SELECT id, user_id, latitude, longitude, distance_m, recorded_at, is_near_campus
         FROM geolocation
         WHERE user_id = $1
         ORDER BY recorded_at DESC, id DESC
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(sample_from_row).transpose()
}

/// Everyone with an open record today, earliest arrival first.
pub async fn present_users(pool: &Pool<Any>, local_date: NaiveDate) -> Result<Vec<PresentUser>> {
    let sql = format!(
        "SELECT {USER_COLUMNS},
                p.check_in_time, p.latitude AS p_latitude, p.longitude AS p_longitude,
                g.id AS g_id, g.latitude AS g_latitude, g.longitude AS g_longitude,
                g.distance_m AS g_distance_m, g.recorded_at AS g_recorded_at,
                g.is_near_campus AS g_is_near_campus
         FROM presence p
         JOIN users u ON p.user_id = u.user_id
         LEFT JOIN geolocation g ON g.id = {LATEST_SAMPLE_ID}
         WHERE p.date = $1 AND p.status = 'in_campus'
         ORDER BY p.check_in_time ASC, p.id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(date_key(local_date))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let check_in: String = row.try_get("check_in_time")?;
            Ok(PresentUser {
                user: user_from_row(row)?,
                check_in_time: parse_timestamp(&check_in)?,
                latitude: row.try_get("p_latitude")?,
                longitude: row.try_get("p_longitude")?,
                last_sample: joined_sample(row)?,
            })
        })
        .collect()
}

/// All registered users with what is needed to derive a status indicator.
pub async fn participants_status(
    pool: &Pool<Any>,
    local_date: NaiveDate,
) -> Result<Vec<ParticipantStatus>> {
    let sql = format!(
        "SELECT {USER_COLUMNS},
                (SELECT COUNT(*) FROM presence p
                  WHERE p.user_id = u.user_id AND p.date = $1 AND p.status = 'in_campus') AS open_today,
                g.id AS g_id, g.latitude AS g_latitude, g.longitude AS g_longitude,
                g.distance_m AS g_distance_m, g.recorded_at AS g_recorded_at,
                g.is_near_campus AS g_is_near_campus
         FROM users u
         LEFT JOIN geolocation g ON g.id = {LATEST_SAMPLE_ID}
         WHERE u.is_registered = 1
         ORDER BY u.first_name, u.last_name"
    );
    let rows = sqlx::query(&sql)
        .bind(date_key(local_date))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ParticipantStatus {
                user: user_from_row(row)?,
                checked_in_today: row.try_get::<i64, _>("open_today")? > 0,
                last_sample: joined_sample(row)?,
            })
        })
        .collect()
}

/// Distinct days on campus and the average length of closed visits.
pub async fn presence_stats(pool: &Pool<Any>, user_id: i64) -> Result<PresenceStats> {
    let days_row = sqlx::query(
        "SELECT COUNT(DISTINCT date) AS total_days FROM presence WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    let total_days: i64 = days_row.try_get("total_days")?;

    let visits = sqlx::query(
        "SELECT check_in_time, check_out_time FROM presence
         WHERE user_id = $1 AND check_out_time IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut total_hours = 0.0;
    for row in &visits {
        let check_in: String = row.try_get("check_in_time")?;
        let check_out: String = row.try_get("check_out_time")?;
        let stay = parse_timestamp(&check_out)? - parse_timestamp(&check_in)?;
        total_hours += stay.num_seconds() as f64 / 3600.0;
    }
    let average_hours = if visits.is_empty() {
        0.0
    } else {
        total_hours / visits.len() as f64
    };

    Ok(PresenceStats {
        total_days,
        average_hours,
    })
}

#[derive(Debug, Clone, Copy)]
pub enum ExportScope {
    Dates { from: NaiveDate, to: NaiveDate },
    Event(i64),
}

pub async fn export_rows(pool: &Pool<Any>, scope: ExportScope) -> Result<Vec<ExportRow>> {
    const COLUMNS: &str = "u.first_name, u.last_name, u.username, u.team_role, u.phone_number,
         u.birth_date, p.check_in_time, p.check_out_time, p.date";

    let rows = match scope {
        ExportScope::Dates { from, to } => {
            let sql = format!(
                "SELECT {COLUMNS}
                 FROM presence p
                 JOIN users u ON p.user_id = u.user_id
                 WHERE p.date >= $1 AND p.date <= $2
                 ORDER BY p.check_in_time DESC"
            );
            sqlx::query(&sql)
                .bind(date_key(from))
                .bind(date_key(to))
                .fetch_all(pool)
                .await?
        }
        ExportScope::Event(event_id) => {
            let sql = format!(
                "SELECT {COLUMNS}
                 FROM presence p
                 JOIN users u ON p.user_id = u.user_id
                 WHERE p.event_id = $1
                 ORDER BY p.check_in_time"
            );
            sqlx::query(&sql).bind(event_id).fetch_all(pool).await?
        }
    };

    rows.iter()
        .map(|row| {
            let check_in: String = row.try_get("check_in_time")?;
            let date: String = row.try_get("date")?;
            let birth_date: Option<String> = row.try_get("birth_date")?;
            Ok(ExportRow {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                username: row.try_get("username")?,
                team_role: row.try_get("team_role")?,
                phone_number: row.try_get("phone_number")?,
                birth_date: birth_date.as_deref().map(parse_date).transpose()?,
                date: parse_date(&date)?,
                check_in_time: parse_timestamp(&check_in)?,
                check_out_time: parse_optional_timestamp(row.try_get("check_out_time")?)?,
            })
        })
        .collect()
}

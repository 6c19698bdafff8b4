use super::{flag, parse_date, parse_timestamp, timestamp};
use crate::models::{DbUser, User};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

pub(crate) const USER_COLUMNS: &str = "u.user_id, u.username, u.first_name, u.last_name, u.birth_date,
     u.team_role, u.phone_number, u.is_registered, u.is_admin, u.total_checkins,
     u.current_rank, u.geo_consent, u.registered_at";

pub(crate) fn user_from_row(row: &AnyRow) -> Result<DbUser> {
    let birth_date: Option<String> = row.try_get("birth_date")?;
    let registered_at: String = row.try_get("registered_at")?;
    Ok(DbUser {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        birth_date: birth_date.as_deref().map(parse_date).transpose()?,
        team_role: row.try_get("team_role")?,
        phone_number: row.try_get("phone_number")?,
        is_registered: row.try_get::<i64, _>("is_registered")? != 0,
        is_admin: row.try_get::<i64, _>("is_admin")? != 0,
        total_checkins: row.try_get("total_checkins")?,
        current_rank: row.try_get("current_rank")?,
        geo_consent: row.try_get::<i64, _>("geo_consent")? != 0,
        registered_at: parse_timestamp(&registered_at)?,
    })
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub team_role: String,
    pub phone_number: String,
}

/// Creates the user on first contact. Only the username is refreshed later;
/// names belong to the registration form.
pub async fn upsert_user(
    pool: &Pool<Any>,
    user: &User,
    is_admin: bool,
    now: DateTime<Utc>,
) -> Result<DbUser> {
    let now = timestamp(now);
    sqlx::query(
        "INSERT INTO users (user_id, username, first_name, last_name, is_admin, registered_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT(user_id) DO UPDATE SET
            username = excluded.username,
            is_admin = CASE WHEN excluded.is_admin = 1 THEN 1 ELSE users.is_admin END",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(flag(is_admin))
    .bind(now)
    .execute(pool)
    .await?;

    get_user(pool, user.id)
        .await?
        .ok_or_else(|| anyhow!("User {} vanished after upsert", user.id))
}

pub async fn get_user(pool: &Pool<Any>, user_id: i64) -> Result<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = $1");
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn complete_registration(
    pool: &Pool<Any>,
    user_id: i64,
    form: &Registration,
    now: DateTime<Utc>,
) -> Result<DbUser> {
    sqlx::query(
        "UPDATE users
         SET first_name = $1, last_name = $2, birth_date = $3, team_role = $4,
             phone_number = $5, is_registered = 1, geo_consent = 1, updated_at = $6
         WHERE user_id = $7",
    )
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(super::date_key(form.birth_date))
    .bind(&form.team_role)
    .bind(&form.phone_number)
    .bind(timestamp(now))
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user(pool, user_id)
        .await?
        .ok_or_else(|| anyhow!("User {} not found", user_id))
}

pub async fn set_geo_consent(pool: &Pool<Any>, user_id: i64, consent: bool) -> Result<()> {
    sqlx::query("UPDATE users SET geo_consent = $1 WHERE user_id = $2")
        .bind(flag(consent))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns false when no such user exists.
pub async fn set_admin(pool: &Pool<Any>, user_id: i64, is_admin: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_admin = $1 WHERE user_id = $2")
        .bind(flag(is_admin))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn registered_users(pool: &Pool<Any>) -> Result<Vec<DbUser>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE u.is_registered = 1
         ORDER BY u.first_name, u.last_name"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(user_from_row).collect()
}

pub async fn registered_user_ids(pool: &Pool<Any>) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT user_id FROM users WHERE is_registered = 1 ORDER BY user_id")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get("user_id")).collect())
}

pub async fn leaderboard(pool: &Pool<Any>, limit: i64) -> Result<Vec<DbUser>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE u.is_registered = 1
         ORDER BY u.total_checkins DESC, u.registered_at ASC
         LIMIT $1"
    );
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    rows.iter().map(user_from_row).collect()
}

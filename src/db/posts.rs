use super::{parse_optional_timestamp, parse_timestamp, timestamp};
use crate::models::{PostStatus, ScheduledPost};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

const POST_COLUMNS: &str =
    "id, event_id, text, media_id, scheduled_time, status, created_by, sent_at";

fn post_from_row(row: &AnyRow) -> Result<ScheduledPost> {
    let scheduled: String = row.try_get("scheduled_time")?;
    let status: String = row.try_get("status")?;
    Ok(ScheduledPost {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        text: row.try_get("text")?,
        media_id: row.try_get("media_id")?,
        scheduled_time: parse_timestamp(&scheduled)?,
        status: PostStatus::parse(&status),
        created_by: row.try_get("created_by")?,
        sent_at: parse_optional_timestamp(row.try_get("sent_at")?)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub event_id: Option<i64>,
    pub text: String,
    pub media_id: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub created_by: i64,
}

pub async fn create_post(pool: &Pool<Any>, post: &NewPost, now: DateTime<Utc>) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO posts (event_id, text, media_id, scheduled_time, status, created_by, created_at)
         VALUES ($1, $2, $3, $4, 'pending', $5, $6)
         RETURNING id",
    )
    .bind(post.event_id)
    .bind(&post.text)
    .bind(&post.media_id)
    .bind(timestamp(post.scheduled_time))
    .bind(post.created_by)
    .bind(timestamp(now))
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub async fn get_post(pool: &Pool<Any>, post_id: i64) -> Result<Option<ScheduledPost>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
    let row = sqlx::query(&sql).bind(post_id).fetch_optional(pool).await?;
    row.as_ref().map(post_from_row).transpose()
}

/// Pending posts in the order they will go out.
pub async fn pending_posts(pool: &Pool<Any>) -> Result<Vec<ScheduledPost>> {
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE status = 'pending'
         ORDER BY scheduled_time ASC, id ASC"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(post_from_row).collect()
}

pub async fn due_posts(pool: &Pool<Any>, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE status = 'pending' AND scheduled_time <= $1
         ORDER BY scheduled_time ASC, id ASC"
    );
    let rows = sqlx::query(&sql).bind(timestamp(now)).fetch_all(pool).await?;
    rows.iter().map(post_from_row).collect()
}

/// Only a pending post can be marked sent, so a post never goes out twice.
pub async fn mark_post_sent(pool: &Pool<Any>, post_id: i64, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE posts SET status = 'sent', sent_at = $1 WHERE id = $2 AND status = 'pending'",
    )
    .bind(timestamp(now))
    .bind(post_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cancel_post(pool: &Pool<Any>, post_id: i64) -> Result<bool> {
    let result =
        sqlx::query("UPDATE posts SET status = 'cancelled' WHERE id = $1 AND status = 'pending'")
            .bind(post_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

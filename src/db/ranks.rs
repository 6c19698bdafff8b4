use crate::models::Rank;
use anyhow::Result;
use sqlx::{Any, AnyConnection, Pool, Row};

pub async fn load_ranks(pool: &Pool<Any>) -> Result<Vec<Rank>> {
    let mut conn = pool.acquire().await?;
    load_ranks_with(&mut *conn).await
}

pub(crate) async fn load_ranks_with(conn: &mut AnyConnection) -> Result<Vec<Rank>> {
    let rows = sqlx::query("SELECT name, min_checkins, emoji FROM ranks ORDER BY min_checkins ASC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .iter()
        .map(|row| Rank {
            name: row.get("name"),
            min_checkins: row.get("min_checkins"),
            emoji: row.get("emoji"),
        })
        .collect())
}

pub async fn rank_by_name(pool: &Pool<Any>, name: &str) -> Result<Option<Rank>> {
    let row = sqlx::query("SELECT name, min_checkins, emoji FROM ranks WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| Rank {
        name: row.get("name"),
        min_checkins: row.get("min_checkins"),
        emoji: row.get("emoji"),
    }))
}

/// Recomputes the stored rank from the check-in counter. Returns the rank when
/// it changed.
pub async fn refresh_rank(pool: &Pool<Any>, user_id: i64) -> Result<Option<Rank>> {
    let mut conn = pool.acquire().await?;
    let Some(row) = sqlx::query("SELECT total_checkins, current_rank FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let total_checkins: i64 = row.try_get("total_checkins")?;
    let current_rank: String = row.try_get("current_rank")?;

    let table = load_ranks_with(&mut *conn).await?;
    match crate::ranks::rank_for(total_checkins, &table) {
        Some(rank) if rank.name != current_rank => {
            sqlx::query("UPDATE users SET current_rank = $1 WHERE user_id = $2")
                .bind(&rank.name)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
            Ok(Some(rank.clone()))
        }
        _ => Ok(None),
    }
}

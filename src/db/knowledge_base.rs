use super::{parse_timestamp, timestamp};
use crate::models::KnowledgeBaseFile;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, Pool, Row};

const FILE_COLUMNS: &str = "id, title, file_id, file_type, uploaded_by, uploaded_at";

fn file_from_row(row: &AnyRow) -> Result<KnowledgeBaseFile> {
    let uploaded_at: String = row.try_get("uploaded_at")?;
    Ok(KnowledgeBaseFile {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        file_id: row.try_get("file_id")?,
        file_type: row.try_get("file_type")?,
        uploaded_by: row.try_get("uploaded_by")?,
        uploaded_at: parse_timestamp(&uploaded_at)?,
    })
}

pub async fn add_file(
    pool: &Pool<Any>,
    title: &str,
    file_id: &str,
    file_type: &str,
    uploaded_by: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO knowledge_base (title, file_id, file_type, uploaded_by, uploaded_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(title)
    .bind(file_id)
    .bind(file_type)
    .bind(uploaded_by)
    .bind(timestamp(now))
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

/// Newest uploads first.
pub async fn list_files(pool: &Pool<Any>) -> Result<Vec<KnowledgeBaseFile>> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM knowledge_base ORDER BY uploaded_at DESC, id DESC");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(file_from_row).collect()
}

pub async fn get_file(pool: &Pool<Any>, id: i64) -> Result<Option<KnowledgeBaseFile>> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM knowledge_base WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(file_from_row).transpose()
}

pub async fn delete_file(pool: &Pool<Any>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM knowledge_base WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

use super::{date_key, flag, parse_date, parse_timestamp, timestamp};
use crate::models::{ContestEntry, ContestSchedule};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Pool, Row};

const ENTRY_COLUMNS: &str = "c.id, c.user_id, c.photo_file_id, c.description, c.votes,
     c.submitted_at, c.is_winner, c.contest_date, u.first_name, u.last_name";

fn entry_from_row(row: &AnyRow) -> Result<ContestEntry> {
    let submitted_at: String = row.try_get("submitted_at")?;
    let contest_date: String = row.try_get("contest_date")?;
    Ok(ContestEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        photo_file_id: row.try_get("photo_file_id")?,
        description: row.try_get("description")?,
        votes: row.try_get("votes")?,
        submitted_at: parse_timestamp(&submitted_at)?,
        is_winner: row.try_get::<i64, _>("is_winner")? != 0,
        contest_date: parse_date(&contest_date)?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn schedule_from_row(row: &AnyRow) -> Result<ContestSchedule> {
    let contest_date: String = row.try_get("contest_date")?;
    let end_time: String = row.try_get("end_time")?;
    Ok(ContestSchedule {
        contest_date: parse_date(&contest_date)?,
        end_time: parse_timestamp(&end_time)?,
        is_closed: row.try_get::<i64, _>("is_closed")? != 0,
    })
}

/// Opens (or re-opens) the contest of `date` until `end_time`.
pub async fn upsert_schedule(
    pool: &Pool<Any>,
    date: NaiveDate,
    end_time: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO photo_contest_schedule (contest_date, end_time, is_closed)
         VALUES ($1, $2, 0)
         ON CONFLICT(contest_date) DO UPDATE SET
            end_time = excluded.end_time,
            is_closed = 0",
    )
    .bind(date_key(date))
    .bind(timestamp(end_time))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_schedule(pool: &Pool<Any>, date: NaiveDate) -> Result<Option<ContestSchedule>> {
    let mut conn = pool.acquire().await?;
    schedule_with(&mut *conn, date).await
}

async fn schedule_with(conn: &mut AnyConnection, date: NaiveDate) -> Result<Option<ContestSchedule>> {
    let row = sqlx::query(
        "SELECT contest_date, end_time, is_closed FROM photo_contest_schedule WHERE contest_date = $1",
    )
    .bind(date_key(date))
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(schedule_from_row).transpose()
}

/// Open contests whose end time has passed.
pub async fn due_open_contests(pool: &Pool<Any>, now: DateTime<Utc>) -> Result<Vec<ContestSchedule>> {
    let rows = sqlx::query(
        "SELECT contest_date, end_time, is_closed FROM photo_contest_schedule
         WHERE is_closed = 0 AND end_time <= $1
         ORDER BY contest_date ASC",
    )
    .bind(timestamp(now))
    .fetch_all(pool)
    .await?;
    rows.iter().map(schedule_from_row).collect()
}

/// Inserts the user's entry for the day. Returns `None` when one already exists.
pub async fn submit_photo(
    pool: &Pool<Any>,
    user_id: i64,
    date: NaiveDate,
    photo_file_id: &str,
    description: &str,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        "INSERT INTO photo_contest (user_id, photo_file_id, description, submitted_at, contest_date)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT(user_id, contest_date) DO NOTHING
         RETURNING id",
    )
    .bind(user_id)
    .bind(photo_file_id)
    .bind(description)
    .bind(timestamp(now))
    .bind(date_key(date))
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| row.get("id")))
}

/// Swaps photo and caption of an existing entry; votes are kept.
pub async fn replace_photo(
    pool: &Pool<Any>,
    user_id: i64,
    date: NaiveDate,
    photo_file_id: &str,
    description: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE photo_contest SET photo_file_id = $1, description = $2
         WHERE user_id = $3 AND contest_date = $4",
    )
    .bind(photo_file_id)
    .bind(description)
    .bind(user_id)
    .bind(date_key(date))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn withdraw_photo(pool: &Pool<Any>, user_id: i64, date: NaiveDate) -> Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "DELETE FROM photo_votes WHERE photo_id IN
            (SELECT id FROM photo_contest WHERE user_id = $1 AND contest_date = $2)",
    )
    .bind(user_id)
    .bind(date_key(date))
    .execute(&mut *tx)
    .await?;
    let result = sqlx::query("DELETE FROM photo_contest WHERE user_id = $1 AND contest_date = $2")
        .bind(user_id)
        .bind(date_key(date))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn entry_for(pool: &Pool<Any>, user_id: i64, date: NaiveDate) -> Result<Option<ContestEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM photo_contest c
         JOIN users u ON c.user_id = u.user_id
         WHERE c.user_id = $1 AND c.contest_date = $2"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(date_key(date))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(entry_from_row).transpose()
}

/// Entries of the day, leader first. Ties go to the earlier submission.
pub async fn entries_for(pool: &Pool<Any>, date: NaiveDate) -> Result<Vec<ContestEntry>> {
    let mut conn = pool.acquire().await?;
    entries_with(&mut *conn, date).await
}

async fn entries_with(conn: &mut AnyConnection, date: NaiveDate) -> Result<Vec<ContestEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM photo_contest c
         JOIN users u ON c.user_id = u.user_id
         WHERE c.contest_date = $1
         ORDER BY c.votes DESC, c.submitted_at ASC, c.id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(date_key(date))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(entry_from_row).collect()
}

pub async fn get_photo(pool: &Pool<Any>, photo_id: i64) -> Result<Option<ContestEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM photo_contest c
         JOIN users u ON c.user_id = u.user_id
         WHERE c.id = $1"
    );
    let row = sqlx::query(&sql).bind(photo_id).fetch_optional(pool).await?;
    row.as_ref().map(entry_from_row).transpose()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted { votes: i64 },
    AlreadyVoted,
    OwnPhoto,
    NotFound,
    Closed,
}

/// Records the vote and bumps the counter in one transaction.
pub async fn cast_vote(
    pool: &Pool<Any>,
    photo_id: i64,
    voter_id: i64,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let mut tx = pool.begin().await?;

    let Some(photo) = sqlx::query("SELECT user_id, contest_date FROM photo_contest WHERE id = $1")
        .bind(photo_id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(VoteOutcome::NotFound);
    };
    let author: i64 = photo.try_get("user_id")?;
    let contest_date: String = photo.try_get("contest_date")?;

    if author == voter_id {
        return Ok(VoteOutcome::OwnPhoto);
    }
    if let Some(schedule) = schedule_with(&mut *tx, parse_date(&contest_date)?).await? {
        if schedule.is_closed {
            return Ok(VoteOutcome::Closed);
        }
    }

    let inserted = sqlx::query(
        "INSERT INTO photo_votes (photo_id, voter_id, voted_at)
         VALUES ($1, $2, $3)
         ON CONFLICT(photo_id, voter_id) DO NOTHING",
    )
    .bind(photo_id)
    .bind(voter_id)
    .bind(timestamp(now))
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Ok(VoteOutcome::AlreadyVoted);
    }

    let row = sqlx::query("UPDATE photo_contest SET votes = votes + 1 WHERE id = $1 RETURNING votes")
        .bind(photo_id)
        .fetch_one(&mut *tx)
        .await?;
    let votes: i64 = row.try_get("votes")?;

    tx.commit().await?;
    Ok(VoteOutcome::Accepted { votes })
}

#[derive(Debug, Clone)]
pub enum CloseOutcome {
    AlreadyClosed,
    NoEntries,
    Winner(ContestEntry),
}

/// Picks the winner and closes the day's contest. Closing again changes nothing.
pub async fn close_contest(
    pool: &Pool<Any>,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<CloseOutcome> {
    let mut tx = pool.begin().await?;

    if let Some(schedule) = schedule_with(&mut *tx, date).await? {
        if schedule.is_closed {
            return Ok(CloseOutcome::AlreadyClosed);
        }
    }

    sqlx::query(
        "INSERT INTO photo_contest_schedule (contest_date, end_time, is_closed)
         VALUES ($1, $2, 1)
         ON CONFLICT(contest_date) DO UPDATE SET is_closed = 1",
    )
    .bind(date_key(date))
    .bind(timestamp(now))
    .execute(&mut *tx)
    .await?;

    let entries = entries_with(&mut *tx, date).await?;
    let outcome = match entries.into_iter().next() {
        Some(mut winner) => {
            sqlx::query("UPDATE photo_contest SET is_winner = $1 WHERE id = $2")
                .bind(flag(true))
                .bind(winner.id)
                .execute(&mut *tx)
                .await?;
            winner.is_winner = true;
            CloseOutcome::Winner(winner)
        }
        None => CloseOutcome::NoEntries,
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Removes every entry, vote and the schedule of the day. Returns the number of
/// entries removed.
pub async fn delete_contest(pool: &Pool<Any>, date: NaiveDate) -> Result<u64> {
    let key = date_key(date);
    let mut tx = pool.begin().await?;
    sqlx::query(
        "DELETE FROM photo_votes WHERE photo_id IN
            (SELECT id FROM photo_contest WHERE contest_date = $1)",
    )
    .bind(&key)
    .execute(&mut *tx)
    .await?;
    let result = sqlx::query("DELETE FROM photo_contest WHERE contest_date = $1")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM photo_contest_schedule WHERE contest_date = $1")
        .bind(&key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected())
}

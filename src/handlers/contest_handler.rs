use super::is_admin;
use crate::broadcast::{self, Delivery};
use crate::db::{self, CloseOutcome, VoteOutcome};
use crate::models::{DbUser, Message};
use crate::parsing;
use crate::session::Session;
use crate::utils::{escape_html, format_local_datetime};
use crate::{keyboards, AppState};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

/// Today's contest accepts photos and votes.
async fn contest_is_open(state: &AppState, today: NaiveDate) -> Result<bool> {
    Ok(db::get_schedule(&state.db, today)
        .await?
        .is_some_and(|schedule| !schedule.is_closed))
}

pub async fn handle_admin_menu(state: &AppState, chat_id: i64) -> Result<()> {
    let now = Utc::now();
    let today = state.campus.local_date(now);
    let status = match db::get_schedule(&state.db, today).await? {
        Some(schedule) if schedule.is_closed => "🏁 Today's contest is closed.".to_string(),
        Some(schedule) => format!(
            "🟢 Running until {}.",
            format_local_datetime(schedule.end_time, &state.campus.timezone)
        ),
        None => "⚪ No contest today.".to_string(),
    };
    let entries = db::entries_for(&state.db, today).await?.len();
    let text = format!("📸 <b>Photo contest</b>\n\n{status}\nEntries: {entries}");
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::contest_admin()))
        .await?;
    Ok(())
}

pub async fn handle_admin_start(state: &AppState, chat_id: i64, admin: &DbUser) -> Result<()> {
    state.sessions.set(admin.user_id, Session::ContestEndTime);
    state
        .telegram
        .send_message(
            chat_id,
            "⏱ When should the contest end?\n\nSend a time as HH:MM, DD.MM HH:MM or DD.MM.YYYY HH:MM (or /cancel).",
            Some(keyboards::remove()),
        )
        .await?;
    Ok(())
}

pub async fn handle_end_time(state: &AppState, message: &Message, admin: &DbUser) -> Result<()> {
    let chat_id = message.chat.id;
    let now = Utc::now();
    let text = message.text.as_deref().unwrap_or("");

    let Some(end_time) = parsing::parse_local_datetime(text, &state.campus.timezone, now) else {
        state
            .telegram
            .send_message(chat_id, "❌ Couldn't read that time. Try again:", None)
            .await?;
        return Ok(());
    };
    if end_time <= now {
        state
            .telegram
            .send_message(chat_id, "❌ The end time must be in the future. Try again:", None)
            .await?;
        return Ok(());
    }

    let today = state.campus.local_date(now);
    db::upsert_schedule(&state.db, today, end_time).await?;
    state.sessions.clear(admin.user_id);
    info!(contest_date = %today, end_time = %end_time, "Photo contest opened");

    let invite = format!(
        "📸 <b>Best photo of the day</b>\n\n\
         Send one photo with a caption describing it.\n\
         • One photo per participant\n\
         • Everyone votes with /vote\n\
         • The winner is announced to all 🏆\n\n\
         ⏱ Photos accepted until {}",
        format_local_datetime(end_time, &state.campus.timezone)
    );
    let recipients = db::registered_user_ids(&state.db).await?;
    let report = broadcast::broadcast(
        &state.telegram,
        &recipients,
        &Delivery::Text {
            text: invite,
            markup: Some(keyboards::contest_invite()),
        },
    )
    .await;

    state
        .telegram
        .send_message(
            chat_id,
            &format!(
                "✅ Contest started!\n📢 Invited: {} (failed: {})",
                report.sent, report.failed
            ),
            Some(keyboards::main_menu(true)),
        )
        .await?;
    Ok(())
}

pub async fn handle_join(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let now = Utc::now();
    let today = state.campus.local_date(now);
    if !contest_is_open(state, today).await? {
        state
            .telegram
            .send_message(chat_id, "⚪ There's no open contest right now.", None)
            .await?;
        return Ok(());
    }
    if db::entry_for(&state.db, user.user_id, today).await?.is_some() {
        state
            .telegram
            .send_message(
                chat_id,
                "📸 You already have a photo in today's contest.",
                Some(keyboards::contest_entry()),
            )
            .await?;
        return Ok(());
    }

    state
        .sessions
        .set(user.user_id, Session::ContestPhoto { editing: false });
    state
        .telegram
        .send_message(
            chat_id,
            "📸 Send your photo. Its caption becomes the description.",
            None,
        )
        .await?;
    Ok(())
}

pub async fn handle_decline(state: &AppState, chat_id: i64) -> Result<()> {
    state
        .telegram
        .send_message(chat_id, "👌 Maybe next time. You can still /vote.", None)
        .await?;
    Ok(())
}

pub async fn handle_edit(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let today = state.campus.local_date(Utc::now());
    if !contest_is_open(state, today).await? {
        state
            .telegram
            .send_message(chat_id, "🏁 The contest is closed, entries can't change.", None)
            .await?;
        return Ok(());
    }
    if db::entry_for(&state.db, user.user_id, today).await?.is_none() {
        state
            .telegram
            .send_message(chat_id, "You have no entry today.", None)
            .await?;
        return Ok(());
    }
    state
        .sessions
        .set(user.user_id, Session::ContestPhoto { editing: true });
    state
        .telegram
        .send_message(chat_id, "✏️ Send the new photo with its caption.", None)
        .await?;
    Ok(())
}

pub async fn handle_withdraw(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let today = state.campus.local_date(Utc::now());
    if !contest_is_open(state, today).await? {
        state
            .telegram
            .send_message(chat_id, "🏁 The contest is closed, entries can't change.", None)
            .await?;
        return Ok(());
    }
    let removed = db::withdraw_photo(&state.db, user.user_id, today).await?;
    let text = if removed {
        info!(user_id = user.user_id, "Contest entry withdrawn");
        "🗑 Your entry was withdrawn."
    } else {
        "You have no entry today."
    };
    state.telegram.send_message(chat_id, text, None).await?;
    Ok(())
}

pub async fn handle_photo(
    state: &AppState,
    message: &Message,
    user: &DbUser,
    editing: bool,
) -> Result<()> {
    let chat_id = message.chat.id;
    let Some(photo) = message.largest_photo() else {
        state
            .telegram
            .send_message(chat_id, "❌ Please send a photo (the caption is its description).", None)
            .await?;
        return Ok(());
    };

    let now = Utc::now();
    let today = state.campus.local_date(now);
    state.sessions.clear(user.user_id);
    if !contest_is_open(state, today).await? {
        state
            .telegram
            .send_message(chat_id, "🏁 The contest is closed.", None)
            .await?;
        return Ok(());
    }

    let caption = message.caption.as_deref().unwrap_or("").trim();
    let text = if editing {
        if db::replace_photo(&state.db, user.user_id, today, &photo.file_id, caption).await? {
            "✅ Your photo was updated."
        } else {
            "You have no entry today."
        }
    } else {
        match db::submit_photo(&state.db, user.user_id, today, &photo.file_id, caption, now).await? {
            Some(id) => {
                info!(user_id = user.user_id, entry = id, "Contest photo submitted");
                "✅ Your photo is in the contest! Good luck 🍀"
            }
            None => "📸 You already have a photo in today's contest.",
        }
    };

    state
        .telegram
        .send_message(chat_id, text, Some(keyboards::contest_entry()))
        .await?;
    Ok(())
}

pub async fn handle_vote_list(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let today = state.campus.local_date(Utc::now());
    let menu = keyboards::main_menu(is_admin(state, user));
    if !contest_is_open(state, today).await? {
        state
            .telegram
            .send_message(chat_id, "⚪ There's no open contest right now.", Some(menu))
            .await?;
        return Ok(());
    }

    let entries: Vec<_> = db::entries_for(&state.db, today)
        .await?
        .into_iter()
        .filter(|entry| entry.user_id != user.user_id)
        .collect();
    if entries.is_empty() {
        state
            .telegram
            .send_message(chat_id, "📸 No photos to vote for yet.", Some(menu))
            .await?;
        return Ok(());
    }

    for entry in &entries {
        let caption = format!(
            "📸 {}\n{}",
            escape_html(&entry.author()),
            escape_html(&entry.description)
        );
        state
            .telegram
            .send_photo(chat_id, &entry.photo_file_id, &caption, Some(keyboards::vote(entry)))
            .await?;
    }
    Ok(())
}

pub async fn handle_vote(
    state: &AppState,
    callback_query_id: &str,
    voter: &DbUser,
    photo_id: i64,
) -> Result<()> {
    let outcome = db::cast_vote(&state.db, photo_id, voter.user_id, Utc::now()).await?;
    let text = match outcome {
        VoteOutcome::Accepted { votes } => {
            info!(photo_id, voter = voter.user_id, votes, "Vote accepted");
            "✅ Your vote counts!"
        }
        VoteOutcome::AlreadyVoted => "❌ You already voted for this photo.",
        VoteOutcome::OwnPhoto => "❌ You can't vote for your own photo.",
        VoteOutcome::NotFound => "❌ This photo is no longer in the contest.",
        VoteOutcome::Closed => "🏁 Voting is closed.",
    };
    state
        .telegram
        .answer_callback_query(callback_query_id, Some(text), true)
        .await?;
    Ok(())
}

pub async fn handle_admin_entries(state: &AppState, chat_id: i64) -> Result<()> {
    let today = state.campus.local_date(Utc::now());
    let entries = db::entries_for(&state.db, today).await?;
    if entries.is_empty() {
        state
            .telegram
            .send_message(chat_id, "📸 No entries today.", Some(keyboards::contest_admin()))
            .await?;
        return Ok(());
    }
    for entry in &entries {
        let caption = format!(
            "📸 {}\n{}\n🗳 Votes: {}",
            escape_html(&entry.author()),
            escape_html(&entry.description),
            entry.votes
        );
        state
            .telegram
            .send_photo(chat_id, &entry.photo_file_id, &caption, None)
            .await?;
    }
    Ok(())
}

pub async fn handle_admin_close(state: &AppState, chat_id: i64) -> Result<()> {
    let now = Utc::now();
    let text = match finish_contest(state, state.campus.local_date(now), now).await? {
        CloseOutcome::AlreadyClosed => "🏁 Today's contest was already closed.".to_string(),
        CloseOutcome::NoEntries => "🏁 Contest closed. There were no entries.".to_string(),
        CloseOutcome::Winner(winner) => format!(
            "🏆 Contest closed. Winner: {} with {} votes.",
            escape_html(&winner.author()),
            winner.votes
        ),
    };
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::contest_admin()))
        .await?;
    Ok(())
}

pub async fn handle_admin_delete(state: &AppState, chat_id: i64) -> Result<()> {
    let today = state.campus.local_date(Utc::now());
    let removed = db::delete_contest(&state.db, today).await?;
    info!(contest_date = %today, removed, "Photo contest deleted");
    state
        .telegram
        .send_message(
            chat_id,
            &format!("🗑 Today's contest deleted ({removed} entries)."),
            Some(keyboards::contest_admin()),
        )
        .await?;
    Ok(())
}

/// Closes the contest of `date` and announces the winner to everyone.
pub async fn finish_contest(
    state: &AppState,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<CloseOutcome> {
    let outcome = db::close_contest(&state.db, date, now).await?;
    match &outcome {
        CloseOutcome::AlreadyClosed => {
            info!(contest_date = %date, "Photo contest already closed");
        }
        CloseOutcome::NoEntries => {
            info!(contest_date = %date, "Photo contest closed without entries");
        }
        CloseOutcome::Winner(winner) => {
            info!(
                contest_date = %date,
                winner = winner.user_id,
                votes = winner.votes,
                "Photo contest closed"
            );
            let caption = format!(
                "🏆 <b>Best photo of the day</b>\n\n\
                 Winner: {}\n🗳 Votes: {}\n\nCongratulations! 🎉",
                escape_html(&winner.author()),
                winner.votes
            );
            let recipients = db::registered_user_ids(&state.db).await?;
            broadcast::broadcast(
                &state.telegram,
                &recipients,
                &Delivery::Photo {
                    file_id: winner.photo_file_id.clone(),
                    caption,
                    markup: None,
                },
            )
            .await;
        }
    }
    Ok(outcome)
}

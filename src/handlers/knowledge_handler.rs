use super::is_admin;
use crate::models::{DbUser, Message};
use crate::session::Session;
use crate::utils::escape_html;
use crate::{db, keyboards, AppState};
use anyhow::Result;
use chrono::Utc;
use tracing::info;

pub async fn handle_list(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let files = db::list_files(&state.db).await?;
    if files.is_empty() {
        state
            .telegram
            .send_message(
                chat_id,
                "📚 The knowledge base is empty for now.",
                Some(keyboards::main_menu(is_admin(state, user))),
            )
            .await?;
        return Ok(());
    }
    state
        .telegram
        .send_message(
            chat_id,
            "📚 <b>Knowledge base</b>\n\nPick a file:",
            Some(keyboards::knowledge_base(&files)),
        )
        .await?;
    Ok(())
}

pub async fn handle_send_file(state: &AppState, chat_id: i64, id: i64) -> Result<()> {
    match db::get_file(&state.db, id).await? {
        Some(file) => {
            state
                .telegram
                .send_document(chat_id, &file.file_id, &format!("📚 {}", escape_html(&file.title)))
                .await?;
        }
        None => {
            state
                .telegram
                .send_message(chat_id, "❌ That file is no longer available.", None)
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_begin_upload(state: &AppState, chat_id: i64, admin: &DbUser) -> Result<()> {
    state.sessions.set(admin.user_id, Session::KbTitle);
    state
        .telegram
        .send_message(
            chat_id,
            "📚 <b>New knowledge base file</b>\n\nEnter a title (or /cancel):",
            Some(keyboards::remove()),
        )
        .await?;
    Ok(())
}

pub async fn handle_title(state: &AppState, message: &Message, admin: &DbUser) -> Result<()> {
    let title = message.text.as_deref().unwrap_or("").trim().to_string();
    if title.chars().count() < 2 {
        state
            .telegram
            .send_message(message.chat.id, "❌ The title is too short. Try again:", None)
            .await?;
        return Ok(());
    }
    state
        .sessions
        .set(admin.user_id, Session::KbFile { title: title.clone() });
    state
        .telegram
        .send_message(
            message.chat.id,
            &format!("✅ Title: {}\n\nNow send the file as a document:", escape_html(&title)),
            None,
        )
        .await?;
    Ok(())
}

pub async fn handle_file(
    state: &AppState,
    message: &Message,
    admin: &DbUser,
    title: &str,
) -> Result<()> {
    let Some(document) = &message.document else {
        state
            .telegram
            .send_message(message.chat.id, "❌ Please send a document (or /cancel).", None)
            .await?;
        return Ok(());
    };

    let id = db::add_file(
        &state.db,
        title,
        &document.file_id,
        "document",
        admin.user_id,
        Utc::now(),
    )
    .await?;
    state.sessions.clear(admin.user_id);
    info!(file = id, admin = admin.user_id, "Knowledge base file added");

    state
        .telegram
        .send_message(
            message.chat.id,
            &format!("✅ \"{}\" added to the knowledge base.", escape_html(title)),
            Some(keyboards::main_menu(true)),
        )
        .await?;
    Ok(())
}

pub async fn handle_manage(state: &AppState, chat_id: i64) -> Result<()> {
    let files = db::list_files(&state.db).await?;
    let text = if files.is_empty() {
        "📚 The knowledge base is empty."
    } else {
        "🗑 Tap a file to delete it:"
    };
    state
        .telegram
        .send_message(chat_id, text, Some(keyboards::knowledge_base_admin(&files)))
        .await?;
    Ok(())
}

pub async fn handle_delete(state: &AppState, chat_id: i64, id: i64) -> Result<()> {
    let deleted = db::delete_file(&state.db, id).await?;
    if deleted {
        info!(file = id, "Knowledge base file deleted");
    }
    let text = if deleted {
        "🗑 File deleted."
    } else {
        "❌ File not found."
    };
    state.telegram.send_message(chat_id, text, None).await?;
    handle_manage(state, chat_id).await
}

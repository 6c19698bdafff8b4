use super::{
    admin_handler, admin_only, callback_router, checkin_handler, contest_handler, help_handler,
    is_admin, knowledge_handler, registered_only, registration_handler, status_handler,
};
use crate::models::{DbUser, Message, Update, User};
use crate::session::Session;
use crate::{db, keyboards, parsing, AppState};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

const MENU_BUTTONS: [&str; 10] = [
    keyboards::BTN_CHECK_IN,
    keyboards::BTN_CHECK_OUT,
    keyboards::BTN_WHO_INSIDE,
    keyboards::BTN_PARTICIPANTS,
    keyboards::BTN_MY_STATUS,
    keyboards::BTN_KNOWLEDGE,
    keyboards::BTN_SETTINGS,
    keyboards::BTN_HELP,
    keyboards::BTN_ADMIN,
    keyboards::BTN_CANCEL,
];

fn is_menu_button(text: Option<&str>) -> bool {
    text.map(str::trim)
        .is_some_and(|text| MENU_BUTTONS.contains(&text))
}

pub async fn process_update(state: Arc<AppState>, update: Update) -> Result<()> {
    if let Some(query) = update.callback_query {
        if query.from.is_bot {
            return Ok(());
        }
        return callback_router::handle_callback(&state, &query).await;
    }

    let Some(message) = update.message else {
        return Ok(());
    };
    let Some(from) = message.from.clone() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }

    let user = db::upsert_user(
        &state.db,
        &from,
        state.campus.is_configured_admin(from.id),
        Utc::now(),
    )
    .await?;

    if let Some(text) = message.text.as_deref() {
        if text.trim_start().starts_with('/') {
            // Commands addressed to another bot are not ours.
            let Some((command, args)) = parsing::split_command(text, &state.bot_username) else {
                return Ok(());
            };
            return handle_command(&state, &message, &from, &user, &command, args).await;
        }
    }

    if let Some(session) = state.sessions.get(from.id) {
        if handle_session(&state, &message, &from, &user, session).await? {
            return Ok(());
        }
    }

    if let Some(text) = message.text.as_deref() {
        if is_menu_button(Some(text)) {
            return handle_menu_button(&state, &message, &from, &user, text.trim()).await;
        }
    }

    if let Some(location) = message.location {
        if user.is_registered {
            return checkin_handler::handle_location_update(&state, message.chat.id, &user, location)
                .await;
        }
    }

    Ok(())
}

async fn handle_command(
    state: &AppState,
    message: &Message,
    from: &User,
    user: &DbUser,
    command: &str,
    args: &str,
) -> Result<()> {
    let chat_id = message.chat.id;
    debug!(user_id = from.id, command, "Command received");

    match command {
        "/start" => return registration_handler::handle_start(state, chat_id, from).await,
        "/cancel" => return registration_handler::handle_cancel(state, chat_id, from).await,
        "/help" => return help_handler::handle_help(state, chat_id, is_admin(state, user)).await,
        _ => {}
    }

    if !user.is_registered {
        registered_only(state, chat_id, from.id).await?;
        return Ok(());
    }
    // A new command abandons whatever dialog was in progress.
    state.sessions.clear(from.id);

    match command {
        "/checkin" => checkin_handler::handle_check_in(state, chat_id, user).await,
        "/checkout" => checkin_handler::handle_check_out(state, chat_id, user).await,
        "/status" => status_handler::handle_my_status(state, chat_id, user).await,
        "/who" => status_handler::handle_who_inside(state, chat_id, user).await,
        "/participants" => status_handler::handle_participants(state, chat_id, user).await,
        "/ranks" | "/top" => status_handler::handle_ranks(state, chat_id, user).await,
        "/stats" => status_handler::handle_stats(state, chat_id, user).await,
        "/settings" => status_handler::handle_settings(state, chat_id, user).await,
        "/kb" => knowledge_handler::handle_list(state, chat_id, user).await,
        "/vote" => contest_handler::handle_vote_list(state, chat_id, user).await,
        "/admin" | "/makeadmin" | "/contest" => {
            if admin_only(state, chat_id, from.id).await?.is_none() {
                return Ok(());
            }
            match command {
                "/admin" => admin_handler::handle_panel(state, chat_id).await,
                "/makeadmin" => admin_handler::handle_make_admin(state, chat_id, args).await,
                _ => contest_handler::handle_admin_menu(state, chat_id).await,
            }
        }
        _ => {
            state
                .telegram
                .send_message(chat_id, "Unknown command. See /help.", None)
                .await?;
            Ok(())
        }
    }
}

/// Feeds the message to the dialog in progress. Returns false when the
/// message left the dialog and should be routed as usual.
async fn handle_session(
    state: &AppState,
    message: &Message,
    from: &User,
    user: &DbUser,
    session: Session,
) -> Result<bool> {
    // Menu buttons always win over a pending admin or check-in dialog.
    let registering = matches!(session, Session::Registration { .. });
    if !registering && is_menu_button(message.text.as_deref()) {
        if message.text.as_deref().map(str::trim) != Some(keyboards::BTN_CANCEL) {
            state.sessions.clear(from.id);
        }
        return Ok(false);
    }

    match session {
        Session::Registration { step, draft } => {
            registration_handler::handle_step(state, message, from, step, draft).await?
        }
        Session::AwaitingCheckinLocation => match message.location {
            Some(location) => {
                checkin_handler::handle_check_in_location(state, message.chat.id, user, location)
                    .await?
            }
            None => {
                state
                    .telegram
                    .send_message(
                        message.chat.id,
                        "📍 Please use the button to send your location, or press Cancel.",
                        Some(keyboards::location_request()),
                    )
                    .await?;
            }
        },
        Session::ContestPhoto { editing } => {
            contest_handler::handle_photo(state, message, user, editing).await?
        }
        Session::NewEvent(draft) => {
            admin_handler::handle_event_step(state, message, user, draft).await?
        }
        Session::NewPost(draft) => admin_handler::handle_post_step(state, message, user, draft).await?,
        Session::KbTitle => knowledge_handler::handle_title(state, message, user).await?,
        Session::KbFile { title } => {
            knowledge_handler::handle_file(state, message, user, &title).await?
        }
        Session::ContestEndTime => contest_handler::handle_end_time(state, message, user).await?,
    }
    Ok(true)
}

async fn handle_menu_button(
    state: &AppState,
    message: &Message,
    from: &User,
    user: &DbUser,
    button: &str,
) -> Result<()> {
    let chat_id = message.chat.id;
    if button == keyboards::BTN_CANCEL {
        return registration_handler::handle_cancel(state, chat_id, from).await;
    }
    if button == keyboards::BTN_HELP {
        return help_handler::handle_help(state, chat_id, is_admin(state, user)).await;
    }
    if !user.is_registered {
        registered_only(state, chat_id, from.id).await?;
        return Ok(());
    }

    match button {
        keyboards::BTN_CHECK_IN => checkin_handler::handle_check_in(state, chat_id, user).await,
        keyboards::BTN_CHECK_OUT => checkin_handler::handle_check_out(state, chat_id, user).await,
        keyboards::BTN_WHO_INSIDE => status_handler::handle_who_inside(state, chat_id, user).await,
        keyboards::BTN_PARTICIPANTS => {
            status_handler::handle_participants(state, chat_id, user).await
        }
        keyboards::BTN_MY_STATUS => status_handler::handle_my_status(state, chat_id, user).await,
        keyboards::BTN_KNOWLEDGE => knowledge_handler::handle_list(state, chat_id, user).await,
        keyboards::BTN_SETTINGS => status_handler::handle_settings(state, chat_id, user).await,
        keyboards::BTN_ADMIN => {
            if admin_only(state, chat_id, from.id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_panel(state, chat_id).await
        }
        _ => Ok(()),
    }
}

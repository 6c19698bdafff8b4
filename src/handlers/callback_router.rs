use super::{
    admin_handler, admin_only, contest_handler, knowledge_handler,
    registered_only, status_handler,
};
use crate::models::CallbackQuery;
use crate::parsing::{AdminAction, CallbackAction, ContestAction, ContestAdminAction, SettingsAction};
use crate::AppState;
use anyhow::Result;
use tracing::{debug, warn};

/// Dispatches an inline-button press. Every query is answered so the client
/// stops its spinner; votes answer with their own alert.
pub async fn handle_callback(state: &AppState, query: &CallbackQuery) -> Result<()> {
    let Some(action) = query.data.as_deref().and_then(CallbackAction::parse) else {
        warn!(data = ?query.data, "Unknown callback payload");
        state
            .telegram
            .answer_callback_query(&query.id, Some("This button is no longer supported."), false)
            .await?;
        return Ok(());
    };

    let chat_id = query
        .message
        .as_ref()
        .map(|message| message.chat.id)
        .unwrap_or(query.from.id);
    let user_id = query.from.id;
    debug!(user_id, ?action, "Callback received");

    if let CallbackAction::Vote(photo_id) = action {
        let Some(voter) = registered_only(state, chat_id, user_id).await? else {
            state
                .telegram
                .answer_callback_query(&query.id, None, false)
                .await?;
            return Ok(());
        };
        return contest_handler::handle_vote(state, &query.id, &voter, photo_id).await;
    }

    state
        .telegram
        .answer_callback_query(&query.id, None, false)
        .await?;

    match action {
        CallbackAction::Admin(AdminAction::Close)
        | CallbackAction::KbClose
        | CallbackAction::Settings(SettingsAction::Close) => close_menu(state, query).await,
        CallbackAction::Admin(admin_action) => {
            let Some(admin) = admin_only(state, chat_id, user_id).await? else {
                return Ok(());
            };
            match admin_action {
                AdminAction::Panel => admin_handler::handle_panel(state, chat_id).await,
                AdminAction::Monitoring => admin_handler::handle_monitoring(state, chat_id).await,
                AdminAction::Users => admin_handler::handle_users(state, chat_id).await,
                AdminAction::Archive => admin_handler::handle_archive(state, chat_id).await,
                AdminAction::NewEvent => {
                    admin_handler::handle_begin_event(state, chat_id, &admin).await
                }
                AdminAction::NewPost => admin_handler::handle_begin_post(state, chat_id, &admin).await,
                AdminAction::Posts => admin_handler::handle_posts(state, chat_id).await,
                AdminAction::KbUpload => {
                    knowledge_handler::handle_begin_upload(state, chat_id, &admin).await
                }
                AdminAction::KbManage => knowledge_handler::handle_manage(state, chat_id).await,
                AdminAction::Export => admin_handler::handle_export_menu(state, chat_id).await,
                AdminAction::Contest => contest_handler::handle_admin_menu(state, chat_id).await,
                AdminAction::Close => close_menu(state, query).await,
            }
        }
        CallbackAction::Profile(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_profile(state, chat_id, id).await
        }
        CallbackAction::Event(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_event_details(state, chat_id, id).await
        }
        CallbackAction::DeleteEvent(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_delete_event(state, chat_id, id).await
        }
        CallbackAction::CancelPost(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_cancel_post(state, chat_id, id).await
        }
        CallbackAction::Export(period) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_export(state, chat_id, period).await
        }
        CallbackAction::ExportEvent(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            admin_handler::handle_export_event(state, chat_id, id).await
        }
        CallbackAction::KbDelete(id) => {
            if admin_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            knowledge_handler::handle_delete(state, chat_id, id).await
        }
        CallbackAction::ContestAdmin(admin_action) => {
            let Some(admin) = admin_only(state, chat_id, user_id).await? else {
                return Ok(());
            };
            match admin_action {
                ContestAdminAction::Start => {
                    contest_handler::handle_admin_start(state, chat_id, &admin).await
                }
                ContestAdminAction::Entries => {
                    contest_handler::handle_admin_entries(state, chat_id).await
                }
                ContestAdminAction::Close => contest_handler::handle_admin_close(state, chat_id).await,
                ContestAdminAction::Delete => {
                    contest_handler::handle_admin_delete(state, chat_id).await
                }
            }
        }
        CallbackAction::KbFile(id) => {
            if registered_only(state, chat_id, user_id).await?.is_none() {
                return Ok(());
            }
            knowledge_handler::handle_send_file(state, chat_id, id).await
        }
        CallbackAction::Contest(contest_action) => {
            let Some(user) = registered_only(state, chat_id, user_id).await? else {
                return Ok(());
            };
            match contest_action {
                ContestAction::Join => contest_handler::handle_join(state, chat_id, &user).await,
                ContestAction::Decline => contest_handler::handle_decline(state, chat_id).await,
                ContestAction::Edit => contest_handler::handle_edit(state, chat_id, &user).await,
                ContestAction::Withdraw => {
                    contest_handler::handle_withdraw(state, chat_id, &user).await
                }
            }
        }
        CallbackAction::Settings(settings_action) => {
            let Some(user) = registered_only(state, chat_id, user_id).await? else {
                return Ok(());
            };
            match settings_action {
                SettingsAction::ToggleGeo => {
                    status_handler::handle_toggle_geo(state, chat_id, &user).await
                }
                SettingsAction::Stats => status_handler::handle_stats(state, chat_id, &user).await,
                SettingsAction::Close => close_menu(state, query).await,
            }
        }
        CallbackAction::Vote(_) => Ok(()),
    }
}

/// Removes the message that carried the pressed inline keyboard.
async fn close_menu(state: &AppState, query: &CallbackQuery) -> Result<()> {
    if let Some(message) = &query.message {
        state
            .telegram
            .delete_message(message.chat.id, message.message_id)
            .await?;
    }
    Ok(())
}

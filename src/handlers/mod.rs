pub mod admin_handler;
pub mod callback_router;
pub mod checkin_handler;
pub mod contest_handler;
pub mod help_handler;
pub mod knowledge_handler;
pub mod registration_handler;
pub mod status_handler;
pub mod update_router;

pub use update_router::process_update;

use crate::models::DbUser;
use crate::{db, keyboards, AppState};
use anyhow::Result;

pub(crate) fn is_admin(state: &AppState, user: &DbUser) -> bool {
    user.is_admin || state.campus.is_configured_admin(user.user_id)
}

/// The registered user behind `user_id`, or a nudge to register.
pub(crate) async fn registered_only(
    state: &AppState,
    chat_id: i64,
    user_id: i64,
) -> Result<Option<DbUser>> {
    match db::get_user(&state.db, user_id).await? {
        Some(user) if user.is_registered => Ok(Some(user)),
        _ => {
            state
                .telegram
                .send_message(
                    chat_id,
                    "❌ You need to register first.\n\nSend /start to begin.",
                    None,
                )
                .await?;
            Ok(None)
        }
    }
}

pub(crate) async fn admin_only(
    state: &AppState,
    chat_id: i64,
    user_id: i64,
) -> Result<Option<DbUser>> {
    let Some(user) = registered_only(state, chat_id, user_id).await? else {
        return Ok(None);
    };
    if !is_admin(state, &user) {
        state
            .telegram
            .send_message(
                chat_id,
                "❌ You don't have admin rights.",
                Some(keyboards::main_menu(false)),
            )
            .await?;
        return Ok(None);
    }
    Ok(Some(user))
}

use super::is_admin;
use crate::db::{self, Registration};
use crate::models::{Message, User};
use crate::parsing::{self, InputError};
use crate::session::{RegistrationDraft, RegistrationStep, Session};
use crate::utils::escape_html;
use crate::{keyboards, AppState};
use anyhow::Result;
use chrono::Utc;
use tracing::info;

pub async fn handle_start(state: &AppState, chat_id: i64, from: &User) -> Result<()> {
    let now = Utc::now();
    let user = db::upsert_user(
        &state.db,
        from,
        state.campus.is_configured_admin(from.id),
        now,
    )
    .await?;

    if user.is_registered {
        state.sessions.clear(from.id);
        let text = format!(
            "👋 Welcome back, {}!\n\nUse the menu below.",
            escape_html(user.first_name.as_deref().unwrap_or("friend"))
        );
        state
            .telegram
            .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, &user))))
            .await?;
        return Ok(());
    }

    state.sessions.set(from.id, Session::registration());
    state
        .telegram
        .send_message(
            chat_id,
            "👋 Welcome to the campus bot!\n\n\
             Let's get you registered. It takes a minute.\n\
             Send /cancel at any time to stop.\n\n\
             Enter your <b>first name</b>:",
            Some(keyboards::remove()),
        )
        .await?;
    Ok(())
}

pub async fn handle_step(
    state: &AppState,
    message: &Message,
    from: &User,
    step: RegistrationStep,
    mut draft: RegistrationDraft,
) -> Result<()> {
    let chat_id = message.chat.id;
    let text = message.text.as_deref().unwrap_or("");

    let reply: Result<(RegistrationStep, String), InputError> = match step {
        RegistrationStep::FirstName => parsing::validate_name(text).map(|name| {
            let prompt = format!(
                "✅ First name: {}\n\nNow enter your <b>last name</b>:",
                escape_html(&name)
            );
            draft.first_name = Some(name);
            (RegistrationStep::LastName, prompt)
        }),
        RegistrationStep::LastName => parsing::validate_name(text).map(|name| {
            let prompt = format!(
                "✅ Last name: {}\n\nEnter your <b>birth date</b> as DD.MM.YYYY:",
                escape_html(&name)
            );
            draft.last_name = Some(name);
            (RegistrationStep::BirthDate, prompt)
        }),
        RegistrationStep::BirthDate => {
            let today = state.campus.local_date(Utc::now());
            parsing::parse_birth_date(text, today).map(|date| {
                draft.birth_date = Some(date);
                (
                    RegistrationStep::TeamRole,
                    "✅ Got it.\n\nWhich <b>team or role</b> are you in?".to_string(),
                )
            })
        }
        RegistrationStep::TeamRole => parsing::validate_name(text).map(|role| {
            draft.team_role = Some(role);
            (
                RegistrationStep::Phone,
                "✅ Almost done.\n\nShare your <b>phone number</b> with the button below or type it:"
                    .to_string(),
            )
        }),
        RegistrationStep::Phone => {
            return finish(state, message, from, draft).await;
        }
    };

    match reply {
        Ok((next, prompt)) => {
            let markup = if next == RegistrationStep::Phone {
                keyboards::contact_request()
            } else {
                keyboards::remove()
            };
            state.sessions.set(from.id, Session::Registration { step: next, draft });
            state
                .telegram
                .send_message(chat_id, &prompt, Some(markup))
                .await?;
        }
        Err(err) => {
            state.telegram.send_message(chat_id, err.message(), None).await?;
        }
    }
    Ok(())
}

async fn finish(
    state: &AppState,
    message: &Message,
    from: &User,
    draft: RegistrationDraft,
) -> Result<()> {
    let chat_id = message.chat.id;

    let phone = match (&message.contact, message.text.as_deref()) {
        (Some(contact), _) => {
            if contact.user_id.is_some_and(|id| id != from.id) {
                state
                    .telegram
                    .send_message(chat_id, "❌ Please share your own contact.", None)
                    .await?;
                return Ok(());
            }
            Ok(contact.phone_number.clone())
        }
        (None, Some(text)) => parsing::validate_phone(text),
        (None, None) => Err(InputError::PhoneFormat),
    };
    let phone_number = match phone {
        Ok(phone) => phone,
        Err(err) => {
            state
                .telegram
                .send_message(chat_id, err.message(), Some(keyboards::contact_request()))
                .await?;
            return Ok(());
        }
    };

    let (Some(first_name), Some(last_name), Some(birth_date), Some(team_role)) = (
        draft.first_name,
        draft.last_name,
        draft.birth_date,
        draft.team_role,
    ) else {
        // Session lost a field; start over.
        state.sessions.set(from.id, Session::registration());
        state
            .telegram
            .send_message(chat_id, "Something went wrong. Enter your <b>first name</b>:", None)
            .await?;
        return Ok(());
    };

    let registration = Registration {
        first_name,
        last_name,
        birth_date,
        team_role,
        phone_number,
    };
    let user = db::complete_registration(&state.db, from.id, &registration, Utc::now()).await?;
    state.sessions.clear(from.id);
    info!(user_id = from.id, "Registration completed");

    let text = format!(
        "🎉 <b>Registration complete!</b>\n\n\
         👤 {} {}\n\
         👥 {}\n\n\
         Location tracking is on. You can switch it off in ⚙️ Settings.\n\
         Press 📍 I'm on campus when you arrive.",
        escape_html(&registration.first_name),
        escape_html(&registration.last_name),
        escape_html(&registration.team_role),
    );
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, &user))))
        .await?;
    Ok(())
}

pub async fn handle_cancel(state: &AppState, chat_id: i64, from: &User) -> Result<()> {
    let cancelled = state.sessions.clear(from.id);
    let text = match cancelled {
        Some(Session::Registration { .. }) => "Registration cancelled. Send /start to try again.",
        Some(_) => "Cancelled.",
        None => "Nothing to cancel.",
    };
    let markup = match db::get_user(&state.db, from.id).await? {
        Some(user) if user.is_registered => keyboards::main_menu(is_admin(state, &user)),
        _ => keyboards::remove(),
    };
    state.telegram.send_message(chat_id, text, Some(markup)).await?;
    Ok(())
}

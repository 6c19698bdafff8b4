use crate::db::{self, ExportScope, NewEvent, NewPost};
use crate::export::{self, ExportPeriod};
use crate::geo::Coordinates;
use crate::models::{DbUser, Message};
use crate::parsing;
use crate::session::{EventDraft, EventStep, PostDraft, PostStep, Session};
use crate::utils::{escape_html, format_local_datetime, format_local_time, format_username};
use crate::{keyboards, AppState};
use anyhow::Result;
use chrono::Utc;
use tracing::info;

const ARCHIVE_SIZE: i64 = 20;
const MAX_USER_BUTTONS: usize = 50;

pub async fn handle_panel(state: &AppState, chat_id: i64) -> Result<()> {
    state
        .telegram
        .send_message(
            chat_id,
            "🔧 <b>Admin panel</b>\n\nChoose an action:",
            Some(keyboards::admin_panel()),
        )
        .await?;
    Ok(())
}

pub async fn handle_monitoring(state: &AppState, chat_id: i64) -> Result<()> {
    let now = Utc::now();
    let tz = &state.campus.timezone;
    let people = db::present_users(&state.db, state.campus.local_date(now)).await?;

    if people.is_empty() {
        state
            .telegram
            .send_message(
                chat_id,
                "👥 <b>Presence monitoring</b>\n\nNobody is on campus right now.",
                Some(keyboards::back_to_panel()),
            )
            .await?;
        return Ok(());
    }

    let mut text = format!(
        "👥 <b>Presence monitoring</b>\n\nOn campus: {}\n\n",
        people.len()
    );
    for person in &people {
        text.push_str(&format!(
            "🟢 {} ({}) since {}\n",
            escape_html(&person.user.full_name()),
            escape_html(person.user.team_role.as_deref().unwrap_or("-")),
            format_local_time(person.check_in_time, tz)
        ));
    }
    text.push_str("\nTap a name to open the profile.");

    let buttons = people
        .iter()
        .map(|person| (person.user.user_id, person.user.full_name()));
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::profiles(buttons)))
        .await?;
    Ok(())
}

pub async fn handle_users(state: &AppState, chat_id: i64) -> Result<()> {
    let users = db::registered_users(&state.db).await?;
    if users.is_empty() {
        state
            .telegram
            .send_message(
                chat_id,
                "👤 No registered users yet.",
                Some(keyboards::back_to_panel()),
            )
            .await?;
        return Ok(());
    }

    let mut text = format!("👤 <b>Registered users ({}):</b>\n\n", users.len());
    for user in &users {
        text.push_str(&format!(
            "• {} {} • {} • id <code>{}</code>\n",
            escape_html(&user.full_name()),
            format_username(&user.username),
            escape_html(user.team_role.as_deref().unwrap_or("-")),
            user.user_id
        ));
    }

    let buttons = users
        .iter()
        .take(MAX_USER_BUTTONS)
        .map(|user| (user.user_id, user.full_name()));
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::profiles(buttons)))
        .await?;
    Ok(())
}

pub async fn handle_profile(state: &AppState, chat_id: i64, user_id: i64) -> Result<()> {
    let Some(user) = db::get_user(&state.db, user_id).await? else {
        state
            .telegram
            .send_message(chat_id, "❌ User not found.", Some(keyboards::back_to_panel()))
            .await?;
        return Ok(());
    };

    let mut text = format!(
        "👤 <b>Participant profile</b>\n\n\
         • Name: {}\n\
         • Username: {}\n\
         • Phone: {}\n\
         • Birth date: {}\n\
         • Team/Role: {}\n\n\
         • Rank: {}\n\
         • Check-ins: {}\n\
         • Location tracking: {}\n",
        user.mention_html(),
        format_username(&user.username),
        escape_html(user.phone_number.as_deref().unwrap_or("-")),
        user.birth_date
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        escape_html(user.team_role.as_deref().unwrap_or("-")),
        escape_html(&user.current_rank),
        user.total_checkins,
        if user.geo_consent { "✅ on" } else { "❌ off" }
    );

    let mut map_url = None;
    if let Some(last) = db::last_presence(&state.db, user_id).await? {
        text.push_str(&format!(
            "\n<b>Last check-in:</b> {}\n",
            format_local_datetime(last.check_in_time, &state.campus.timezone)
        ));
        if let (Some(lat), Some(lon)) = (last.latitude, last.longitude) {
            map_url = Some(Coordinates::new(lat, lon).maps_url());
        }
    }

    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::profile(map_url)))
        .await?;
    Ok(())
}

pub async fn handle_archive(state: &AppState, chat_id: i64) -> Result<()> {
    let now = Utc::now();
    let tz = &state.campus.timezone;
    let events = db::finished_events(&state.db, now, ARCHIVE_SIZE).await?;
    let upcoming = db::upcoming_events(&state.db, now).await?;

    let mut text = String::new();
    if !upcoming.is_empty() {
        text.push_str("🗓 <b>Current and upcoming</b>\n");
        for event in &upcoming {
            text.push_str(&format!(
                "• {} ({} - {})\n",
                escape_html(&event.name),
                format_local_datetime(event.start_time, tz),
                format_local_datetime(event.end_time, tz)
            ));
        }
        text.push('\n');
    }
    if events.is_empty() {
        text.push_str("📋 No finished events yet.");
    } else {
        text.push_str("📋 <b>Events archive</b>\n\nPick an event:");
    }
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::events_archive(&events)))
        .await?;
    Ok(())
}

pub async fn handle_event_details(state: &AppState, chat_id: i64, event_id: i64) -> Result<()> {
    let tz = &state.campus.timezone;
    let Some(event) = db::get_event(&state.db, event_id).await? else {
        state
            .telegram
            .send_message(chat_id, "❌ Event not found.", Some(keyboards::back_to_panel()))
            .await?;
        return Ok(());
    };
    let participants = db::event_participants(&state.db, event_id).await?;

    let mut text = format!(
        "🎯 <b>{}</b>\n\n📅 {} - {}\n",
        escape_html(&event.name),
        format_local_datetime(event.start_time, tz),
        format_local_datetime(event.end_time, tz)
    );
    if let Some(description) = &event.description {
        text.push_str(&format!("📝 {}\n", escape_html(description)));
    }
    text.push_str(&format!("\n👥 <b>Participants ({}):</b>\n", participants.len()));
    for (index, participant) in participants.iter().enumerate() {
        let name = [participant.first_name.as_deref(), participant.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let left = participant
            .check_out_time
            .map(|out| format_local_time(out, tz))
            .unwrap_or_else(|| "not left".to_string());
        text.push_str(&format!(
            "{}. {} ({}) {} - {}\n",
            index + 1,
            escape_html(&name),
            escape_html(participant.team_role.as_deref().unwrap_or("-")),
            format_local_time(participant.check_in_time, tz),
            left
        ));
    }

    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::event_details(event_id)))
        .await?;
    Ok(())
}

pub async fn handle_delete_event(state: &AppState, chat_id: i64, event_id: i64) -> Result<()> {
    let text = if db::delete_event(&state.db, event_id).await? {
        info!(event_id, "Event deleted");
        "🗑 Event deleted. Check-ins keep their data."
    } else {
        "❌ Event not found."
    };
    state
        .telegram
        .send_message(chat_id, text, Some(keyboards::back_to_panel()))
        .await?;
    Ok(())
}

pub async fn handle_begin_event(state: &AppState, chat_id: i64, admin: &DbUser) -> Result<()> {
    state.sessions.set(admin.user_id, Session::new_event());
    state
        .telegram
        .send_message(
            chat_id,
            "🎯 <b>New event</b>\n\nEnter the event name (or /cancel):",
            Some(keyboards::remove()),
        )
        .await?;
    Ok(())
}

const TIME_FORMATS: &str = "HH:MM, DD.MM HH:MM or DD.MM.YYYY HH:MM";

pub async fn handle_event_step(
    state: &AppState,
    message: &Message,
    admin: &DbUser,
    mut draft: EventDraft,
) -> Result<()> {
    let chat_id = message.chat.id;
    let text = message.text.as_deref().unwrap_or("").trim();
    let now = Utc::now();
    let tz = &state.campus.timezone;

    let prompt = match draft.step {
        EventStep::Name => {
            if text.chars().count() < 2 {
                state
                    .telegram
                    .send_message(chat_id, "❌ The name is too short. Try again:", None)
                    .await?;
                return Ok(());
            }
            draft.name = text.to_string();
            draft.step = EventStep::Start;
            format!("🕐 Start time ({TIME_FORMATS}):")
        }
        EventStep::Start => {
            let Some(start) = parsing::parse_local_datetime(text, tz, now) else {
                state
                    .telegram
                    .send_message(chat_id, &format!("❌ Use {TIME_FORMATS}. Try again:"), None)
                    .await?;
                return Ok(());
            };
            draft.start_time = Some(start);
            draft.step = EventStep::End;
            format!("🕕 End time ({TIME_FORMATS}):")
        }
        EventStep::End => {
            let parsed = parsing::parse_local_datetime(text, tz, now);
            let end = match (parsed, draft.start_time) {
                (Some(end), Some(start)) if end > start => end,
                (Some(_), Some(_)) => {
                    state
                        .telegram
                        .send_message(chat_id, "❌ The end must be after the start. Try again:", None)
                        .await?;
                    return Ok(());
                }
                _ => {
                    state
                        .telegram
                        .send_message(chat_id, &format!("❌ Use {TIME_FORMATS}. Try again:"), None)
                        .await?;
                    return Ok(());
                }
            };
            draft.end_time = Some(end);
            draft.step = EventStep::Description;
            state.sessions.set(admin.user_id, Session::NewEvent(draft));
            state
                .telegram
                .send_message(chat_id, "📝 Description (or Skip):", Some(keyboards::skip()))
                .await?;
            return Ok(());
        }
        EventStep::Description => {
            let description = (text != keyboards::BTN_SKIP && !text.is_empty()).then(|| text.to_string());
            return finish_event(state, chat_id, admin, draft, description).await;
        }
    };

    state.sessions.set(admin.user_id, Session::NewEvent(draft));
    state.telegram.send_message(chat_id, &prompt, None).await?;
    Ok(())
}

async fn finish_event(
    state: &AppState,
    chat_id: i64,
    admin: &DbUser,
    draft: EventDraft,
    description: Option<String>,
) -> Result<()> {
    state.sessions.clear(admin.user_id);
    let (Some(start_time), Some(end_time)) = (draft.start_time, draft.end_time) else {
        state
            .telegram
            .send_message(chat_id, "Something went wrong, start again.", Some(keyboards::main_menu(true)))
            .await?;
        return Ok(());
    };

    let event = NewEvent {
        name: draft.name,
        start_time,
        end_time,
        description,
        created_by: admin.user_id,
    };
    let id = db::create_event(&state.db, &event, Utc::now()).await?;
    info!(event_id = id, name = %event.name, "Event created");

    let tz = &state.campus.timezone;
    let text = format!(
        "✅ Event <b>{}</b> created.\n📅 {} - {}",
        escape_html(&event.name),
        format_local_datetime(start_time, tz),
        format_local_datetime(end_time, tz)
    );
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(true)))
        .await?;
    Ok(())
}

pub async fn handle_begin_post(state: &AppState, chat_id: i64, admin: &DbUser) -> Result<()> {
    state.sessions.set(admin.user_id, Session::new_post());
    state
        .telegram
        .send_message(
            chat_id,
            "📢 <b>New post</b>\n\nSend the post text (or /cancel):",
            Some(keyboards::remove()),
        )
        .await?;
    Ok(())
}

pub async fn handle_post_step(
    state: &AppState,
    message: &Message,
    admin: &DbUser,
    mut draft: PostDraft,
) -> Result<()> {
    let chat_id = message.chat.id;
    let now = Utc::now();

    match draft.step {
        PostStep::Text => {
            let text = message.text.as_deref().unwrap_or("").trim();
            if text.is_empty() {
                state
                    .telegram
                    .send_message(chat_id, "❌ Send the text of the post:", None)
                    .await?;
                return Ok(());
            }
            draft.text = text.to_string();
            draft.step = PostStep::Media;
            state.sessions.set(admin.user_id, Session::NewPost(draft));
            state
                .telegram
                .send_message(chat_id, "🖼 Send a photo for the post (or Skip):", Some(keyboards::skip()))
                .await?;
        }
        PostStep::Media => {
            if let Some(photo) = message.largest_photo() {
                draft.media_id = Some(photo.file_id.clone());
            } else if message.text.as_deref().map(str::trim) != Some(keyboards::BTN_SKIP) {
                state
                    .telegram
                    .send_message(chat_id, "❌ Send a photo or press Skip:", Some(keyboards::skip()))
                    .await?;
                return Ok(());
            }
            draft.step = PostStep::Time;
            state.sessions.set(admin.user_id, Session::NewPost(draft));
            state
                .telegram
                .send_message(
                    chat_id,
                    &format!("🕐 When should it go out? ({TIME_FORMATS})"),
                    Some(keyboards::remove()),
                )
                .await?;
        }
        PostStep::Time => {
            let text = message.text.as_deref().unwrap_or("");
            let scheduled = parsing::parse_local_datetime(text, &state.campus.timezone, now);
            let scheduled_time = match scheduled {
                Some(at) if at > now => at,
                Some(_) => {
                    state
                        .telegram
                        .send_message(chat_id, "❌ The time must be in the future. Try again:", None)
                        .await?;
                    return Ok(());
                }
                None => {
                    state
                        .telegram
                        .send_message(chat_id, &format!("❌ Use {TIME_FORMATS}. Try again:"), None)
                        .await?;
                    return Ok(());
                }
            };

            let event = db::event_at(&state.db, scheduled_time).await?;
            let post = NewPost {
                event_id: event.as_ref().map(|e| e.id),
                text: draft.text,
                media_id: draft.media_id,
                scheduled_time,
                created_by: admin.user_id,
            };
            let id = db::create_post(&state.db, &post, now).await?;
            state.sessions.clear(admin.user_id);
            info!(post_id = id, scheduled_time = %scheduled_time, "Post scheduled");

            state
                .telegram
                .send_message(
                    chat_id,
                    &format!(
                        "✅ Post #{} scheduled for {}.",
                        id,
                        format_local_datetime(scheduled_time, &state.campus.timezone)
                    ),
                    Some(keyboards::main_menu(true)),
                )
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_posts(state: &AppState, chat_id: i64) -> Result<()> {
    let posts = db::pending_posts(&state.db).await?;
    if posts.is_empty() {
        state
            .telegram
            .send_message(chat_id, "🗓 No scheduled posts.", Some(keyboards::back_to_panel()))
            .await?;
        return Ok(());
    }

    let mut text = String::from("🗓 <b>Scheduled posts</b>\n\n");
    for post in &posts {
        let preview: String = post.text.chars().take(60).collect();
        text.push_str(&format!(
            "#{} • {}{}\n{}\n\n",
            post.id,
            format_local_datetime(post.scheduled_time, &state.campus.timezone),
            if post.media_id.is_some() { " • 🖼" } else { "" },
            escape_html(&preview)
        ));
    }
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::pending_posts(&posts)))
        .await?;
    Ok(())
}

pub async fn handle_cancel_post(state: &AppState, chat_id: i64, post_id: i64) -> Result<()> {
    let text = if db::cancel_post(&state.db, post_id).await? {
        info!(post_id, "Post cancelled");
        format!("🗑 Post #{post_id} cancelled.")
    } else {
        format!("❌ Post #{post_id} is no longer pending.")
    };
    state.telegram.send_message(chat_id, &text, None).await?;
    handle_posts(state, chat_id).await
}

pub async fn handle_export_menu(state: &AppState, chat_id: i64) -> Result<()> {
    state
        .telegram
        .send_message(
            chat_id,
            "📊 <b>Export data</b>\n\nPick a period:",
            Some(keyboards::export_menu()),
        )
        .await?;
    Ok(())
}

pub async fn handle_export(state: &AppState, chat_id: i64, period: ExportPeriod) -> Result<()> {
    let now = Utc::now();
    let Some((from, to)) = period.date_range(state.campus.local_date(now)) else {
        let events = db::recent_events(&state.db, ARCHIVE_SIZE).await?;
        let text = if events.is_empty() {
            "🎯 There are no events yet."
        } else {
            "🎯 Pick an event:"
        };
        state
            .telegram
            .send_message(chat_id, text, Some(keyboards::export_events(&events)))
            .await?;
        return Ok(());
    };

    let rows = db::export_rows(&state.db, ExportScope::Dates { from, to }).await?;
    send_export(state, chat_id, period, period.title(), rows).await
}

pub async fn handle_export_event(state: &AppState, chat_id: i64, event_id: i64) -> Result<()> {
    let Some(event) = db::get_event(&state.db, event_id).await? else {
        state
            .telegram
            .send_message(chat_id, "❌ Event not found.", Some(keyboards::export_menu()))
            .await?;
        return Ok(());
    };
    let rows = db::export_rows(&state.db, ExportScope::Event(event_id)).await?;
    send_export(state, chat_id, ExportPeriod::Event, &event.name, rows).await
}

async fn send_export(
    state: &AppState,
    chat_id: i64,
    period: ExportPeriod,
    title: &str,
    rows: Vec<crate::models::ExportRow>,
) -> Result<()> {
    if rows.is_empty() {
        state
            .telegram
            .send_message(
                chat_id,
                &format!("📊 No data for: {}", escape_html(title)),
                Some(keyboards::export_menu()),
            )
            .await?;
        return Ok(());
    }

    let tz = &state.campus.timezone;
    let bytes = export::build_workbook(&rows, tz)?;
    let file_name = export::file_name(period, Utc::now(), tz);
    let caption = format!(
        "📊 Export: {}\nRecords: {}",
        escape_html(title),
        rows.len()
    );
    state
        .telegram
        .upload_document(chat_id, &file_name, bytes, &caption)
        .await?;
    info!(period = period.as_str(), rows = rows.len(), "Presence exported");
    Ok(())
}

pub async fn handle_make_admin(state: &AppState, chat_id: i64, args: &str) -> Result<()> {
    let Some(user_id) = parsing::parse_user_id(args) else {
        state
            .telegram
            .send_message(chat_id, "Usage: /makeadmin &lt;user id&gt;", None)
            .await?;
        return Ok(());
    };

    let text = if db::set_admin(&state.db, user_id, true).await? {
        info!(user_id, "Admin rights granted");
        format!("✅ User <code>{user_id}</code> is now an admin.")
    } else {
        format!("❌ No user with id <code>{user_id}</code>. They need to /start the bot first.")
    };
    state.telegram.send_message(chat_id, &text, None).await?;
    Ok(())
}

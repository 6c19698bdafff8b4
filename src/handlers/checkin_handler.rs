use super::is_admin;
use crate::checkin::{self, BeginOutcome, CheckInOutcome, CheckOutOutcome, LocationOutcome};
use crate::geo::{format_distance, Coordinates, Proximity};
use crate::models::{DbUser, Location};
use crate::session::Session;
use crate::utils::{escape_html, format_local_time, format_stay};
use crate::{keyboards, AppState};
use anyhow::Result;
use chrono::Utc;

pub async fn handle_check_in(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let menu = keyboards::main_menu(is_admin(state, user));
    match checkin::begin_check_in(&state.db, &state.campus, user, Utc::now()).await? {
        BeginOutcome::NeedsConsent => {
            state
                .telegram
                .send_message(
                    chat_id,
                    "📍 Location tracking is off.\n\nTurn it on in ⚙️ Settings to check in.",
                    Some(menu),
                )
                .await?;
        }
        BeginOutcome::AlreadyCheckedIn => {
            state
                .telegram
                .send_message(chat_id, "✅ You're already checked in today.", Some(menu))
                .await?;
        }
        BeginOutcome::AwaitLocation => {
            state
                .sessions
                .set(user.user_id, Session::AwaitingCheckinLocation);
            state
                .telegram
                .send_message(
                    chat_id,
                    "📍 Send your location with the button below to confirm you're on campus.",
                    Some(keyboards::location_request()),
                )
                .await?;
        }
    }
    Ok(())
}

/// A location that answers a pending check-in request.
pub async fn handle_check_in_location(
    state: &AppState,
    chat_id: i64,
    user: &DbUser,
    location: Location,
) -> Result<()> {
    state.sessions.clear(user.user_id);
    let menu = keyboards::main_menu(is_admin(state, user));
    let point = Coordinates::new(location.latitude, location.longitude);
    let now = Utc::now();

    let text = match checkin::check_in(&state.db, &state.campus, user.user_id, point, now).await? {
        CheckInOutcome::InvalidLocation => "❌ That location doesn't look right. Try again.".to_string(),
        CheckInOutcome::TooFar { distance_m } => format!(
            "❌ You're too far from campus ({}).\n\nCheck-in works within {} of campus.",
            format_distance(distance_m),
            format_distance(state.campus.proximity_radius_m)
        ),
        CheckInOutcome::AlreadyCheckedIn => "✅ You're already checked in today.".to_string(),
        CheckInOutcome::CheckedIn {
            distance_m,
            event,
            total_checkins,
            rank_up,
        } => {
            let mut text = format!(
                "✅ <b>Checked in at {}</b>\n📏 {} from campus\n📈 Total check-ins: {}",
                format_local_time(now, &state.campus.timezone),
                format_distance(distance_m),
                total_checkins
            );
            if let Some(event) = event {
                text.push_str(&format!("\n🎯 Event: {}", escape_html(&event.name)));
            }
            if let Some(rank) = rank_up {
                text.push_str(&format!(
                    "\n\n🎉 New rank: {} <b>{}</b>!",
                    rank.emoji,
                    escape_html(&rank.name)
                ));
            }
            text
        }
    };

    state.telegram.send_message(chat_id, &text, Some(menu)).await?;
    Ok(())
}

pub async fn handle_check_out(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let menu = keyboards::main_menu(is_admin(state, user));
    let text = match checkin::check_out(&state.db, &state.campus, user.user_id, Utc::now()).await? {
        CheckOutOutcome::NotCheckedIn => "You haven't checked in today.".to_string(),
        CheckOutOutcome::CheckedOut {
            check_in_time,
            stay,
        } => format!(
            "👋 See you!\n\nArrived at {}, stayed {}.",
            format_local_time(check_in_time, &state.campus.timezone),
            format_stay(stay)
        ),
    };
    state.telegram.send_message(chat_id, &text, Some(menu)).await?;
    Ok(())
}

/// A location shared on its own, outside a check-in request.
pub async fn handle_location_update(
    state: &AppState,
    chat_id: i64,
    user: &DbUser,
    location: Location,
) -> Result<()> {
    let point = Coordinates::new(location.latitude, location.longitude);
    let text = match checkin::record_location(&state.db, &state.campus, user, point, Utc::now())
        .await?
    {
        LocationOutcome::NoConsent => {
            "📍 Location tracking is off, so this location was not stored.".to_string()
        }
        LocationOutcome::InvalidLocation => "❌ That location doesn't look right.".to_string(),
        LocationOutcome::Recorded {
            distance_m,
            proximity,
        } => match proximity {
            Proximity::WithinRadius => format!(
                "📍 You're on campus ({}). Press 📍 I'm on campus to check in.",
                format_distance(distance_m)
            ),
            Proximity::Near => format!("🟡 You're near campus ({}).", format_distance(distance_m)),
            Proximity::Far => format!("📍 {} from campus.", format_distance(distance_m)),
        },
    };
    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, user))))
        .await?;
    Ok(())
}

use super::is_admin;
use crate::geo::{format_distance, status_indicator, StatusIndicator};
use crate::models::{DbUser, GeoSample, PresenceStatus};
use crate::ranks::{format_rank_table, next_rank};
use crate::utils::{escape_html, format_local_time, format_username};
use crate::{db, keyboards, AppState};
use anyhow::Result;
use chrono::Utc;
use tracing::info;

const LEADERBOARD_SIZE: i64 = 10;

fn sample_marker(sample: &Option<GeoSample>) -> Option<(bool, chrono::DateTime<Utc>)> {
    sample.as_ref().map(|s| (s.is_near_campus, s.recorded_at))
}

pub async fn handle_my_status(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let now = Utc::now();
    let tz = &state.campus.timezone;

    // The rank table may have changed since the last check-in.
    db::refresh_rank(&state.db, user.user_id).await?;
    let user = db::get_user(&state.db, user.user_id)
        .await?
        .unwrap_or_else(|| user.clone());

    let rank_emoji = db::rank_by_name(&state.db, &user.current_rank)
        .await?
        .map(|rank| rank.emoji)
        .unwrap_or_else(|| "⭐".to_string());

    let mut text = format!(
        "📊 <b>Your profile</b>\n\n\
         👤 {}\n\
         👥 {}\n\
         {} Rank: <b>{}</b>\n\
         📈 Check-ins: {}\n\n\
         <b>Today:</b>\n",
        escape_html(&user.full_name()),
        escape_html(user.team_role.as_deref().unwrap_or("-")),
        rank_emoji,
        escape_html(&user.current_rank),
        user.total_checkins
    );

    match db::today_presence(&state.db, user.user_id, state.campus.local_date(now)).await? {
        Some(record) if record.status == PresenceStatus::InCampus => text.push_str(&format!(
            "🟢 On campus since {}\n",
            format_local_time(record.check_in_time, tz)
        )),
        Some(record) => text.push_str(&format!(
            "⚪ Left campus{}\n",
            record
                .check_out_time
                .map(|out| format!(" at {}", format_local_time(out, tz)))
                .unwrap_or_default()
        )),
        None => text.push_str("⚪ No check-in today\n"),
    }

    text.push_str(&format!(
        "\n📍 Location tracking: {}\n",
        if user.geo_consent { "✅ on" } else { "❌ off" }
    ));

    if user.geo_consent {
        if let Some(sample) = db::latest_geo_sample(&state.db, user.user_id).await? {
            if sample.is_near_campus {
                text.push_str(&format!(
                    "🟡 Near campus ({})\n",
                    format_distance(sample.distance_m)
                ));
            } else {
                text.push_str(&format!("📍 Distance: {}\n", format_distance(sample.distance_m)));
            }
            text.push_str(&format!(
                "🕐 Updated at {}\n",
                format_local_time(sample.recorded_at, tz)
            ));
        }
    }

    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, &user))))
        .await?;
    Ok(())
}

pub async fn handle_who_inside(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let now = Utc::now();
    let tz = &state.campus.timezone;
    let menu = keyboards::main_menu(is_admin(state, user));
    let people = db::present_users(&state.db, state.campus.local_date(now)).await?;

    if people.is_empty() {
        state
            .telegram
            .send_message(chat_id, "😔 Nobody is on campus right now.", Some(menu))
            .await?;
        return Ok(());
    }

    let mut text = format!("👥 <b>On campus now: {}</b>\n\n", people.len());
    for person in &people {
        let near = person
            .last_sample
            .as_ref()
            .filter(|sample| sample.is_near_campus && sample.recorded_at > person.check_in_time);
        let (icon, note) = match near {
            Some(sample) => ("🟡", format!(" - nearby ({})", format_distance(sample.distance_m))),
            None => ("🟢", String::new()),
        };
        let team = person
            .user
            .team_role
            .as_deref()
            .map(|t| format!(" ({})", escape_html(t)))
            .unwrap_or_default();

        text.push_str(&format!(
            "{} {}{}{}\n   └ {} • since {}\n\n",
            icon,
            escape_html(&person.user.full_name()),
            team,
            note,
            format_username(&person.user.username),
            format_local_time(person.check_in_time, tz)
        ));
    }

    state.telegram.send_message(chat_id, &text, Some(menu)).await?;
    Ok(())
}

pub async fn handle_participants(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let now = Utc::now();
    let menu = keyboards::main_menu(is_admin(state, user));
    let participants = db::participants_status(&state.db, state.campus.local_date(now)).await?;

    if participants.is_empty() {
        state
            .telegram
            .send_message(chat_id, "📝 No registered participants yet.", Some(menu))
            .await?;
        return Ok(());
    }

    let mut text = format!("👤 <b>All participants ({}):</b>\n\n", participants.len());
    let mut counts = [0usize; 3];
    for participant in &participants {
        let indicator = status_indicator(
            participant.checked_in_today,
            sample_marker(&participant.last_sample),
            now,
        );
        counts[match indicator {
            StatusIndicator::OnCampus => 0,
            StatusIndicator::Near => 1,
            StatusIndicator::Away => 2,
        }] += 1;

        text.push_str(&format!(
            "{} {}\n   └ {} • {}\n\n",
            indicator.emoji(),
            escape_html(&participant.user.full_name()),
            escape_html(participant.user.team_role.as_deref().unwrap_or("-")),
            format_username(&participant.user.username)
        ));
    }
    text.push_str(&format!(
        "🟢 {} • 🟡 {} • 🔴 {}",
        counts[0], counts[1], counts[2]
    ));

    state.telegram.send_message(chat_id, &text, Some(menu)).await?;
    Ok(())
}

fn settings_text(user: &DbUser) -> String {
    format!(
        "⚙️ <b>Settings</b>\n\n\
         👤 <b>Profile</b>\n\
         • Name: {}\n\
         • Team/Role: {}\n\
         • Phone: {}\n\
         • Birth date: {}\n\n\
         📊 Rank: {} • Check-ins: {}\n\n\
         📍 <b>Location tracking:</b> {}\n\n\
         To change profile data, contact an admin.",
        escape_html(&user.full_name()),
        escape_html(user.team_role.as_deref().unwrap_or("-")),
        escape_html(user.phone_number.as_deref().unwrap_or("-")),
        user.birth_date
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        escape_html(&user.current_rank),
        user.total_checkins,
        if user.geo_consent { "✅ on" } else { "❌ off" }
    )
}

pub async fn handle_settings(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    state
        .telegram
        .send_message(
            chat_id,
            &settings_text(user),
            Some(keyboards::settings(user.geo_consent)),
        )
        .await?;
    Ok(())
}

pub async fn handle_toggle_geo(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let consent = !user.geo_consent;
    db::set_geo_consent(&state.db, user.user_id, consent).await?;
    info!(user_id = user.user_id, consent, "Location consent changed");

    let mut updated = user.clone();
    updated.geo_consent = consent;
    let status = if consent {
        "📍 Location tracking turned on ✅"
    } else {
        "📍 Location tracking turned off ❌"
    };
    state.telegram.send_message(chat_id, status, None).await?;
    handle_settings(state, chat_id, &updated).await
}

pub async fn handle_stats(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let stats = db::presence_stats(&state.db, user.user_id).await?;
    let table = db::load_ranks(&state.db).await?;

    let mut text = format!(
        "📊 <b>Extended statistics</b>\n\n\
         📈 Check-ins: {}\n\
         📅 Days on campus: {}\n\
         ⏱ Average stay: {:.1} h\n",
        user.total_checkins, stats.total_days, stats.average_hours
    );
    match next_rank(user.total_checkins, &table) {
        Some(next) => text.push_str(&format!(
            "\n🎯 {} more check-ins to {} {}",
            next.remaining,
            next.rank.emoji,
            escape_html(&next.rank.name)
        )),
        None => text.push_str("\n🏆 You've reached the top rank!"),
    }

    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, user))))
        .await?;
    Ok(())
}

pub async fn handle_ranks(state: &AppState, chat_id: i64, user: &DbUser) -> Result<()> {
    let table = db::load_ranks(&state.db).await?;
    let leaders = db::leaderboard(&state.db, LEADERBOARD_SIZE).await?;

    let mut text = format!("🏅 <b>Ranks</b>\n\n{}\n\n", format_rank_table(&table));
    text.push_str("🏆 <b>Leaderboard</b>\n");
    if leaders.is_empty() {
        text.push_str("No one yet.");
    }
    for (place, leader) in leaders.iter().enumerate() {
        let emoji = table
            .iter()
            .find(|rank| rank.name == leader.current_rank)
            .map(|rank| rank.emoji.as_str())
            .unwrap_or("⭐");
        text.push_str(&format!(
            "{}. {} {} - {}\n",
            place + 1,
            emoji,
            escape_html(&leader.full_name()),
            leader.total_checkins
        ));
    }

    state
        .telegram
        .send_message(chat_id, &text, Some(keyboards::main_menu(is_admin(state, user))))
        .await?;
    Ok(())
}

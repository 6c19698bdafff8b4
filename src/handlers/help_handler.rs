use crate::{keyboards, AppState};
use anyhow::Result;

pub async fn handle_help(state: &AppState, chat_id: i64, is_admin: bool) -> Result<()> {
    let mut help_text = String::from(
        r#"<b>Campus Bot</b>

<b>📍 I'm on campus</b>
Check in. The bot asks for your location and accepts it within the campus radius.

<b>🚪 I'm leaving</b>
Check out and see how long you stayed.

<b>👥 Who's on campus</b> / <b>👤 All participants</b>
🟢 on campus • 🟡 nearby • 🔴 away

<b>📊 My status</b>
Profile, rank, today's presence.

<b>Commands:</b>
/start - register or show the menu
/checkin - check in (same as 📍)
/checkout - check out
/status - your status
/who - who is on campus now
/participants - everyone with their status
/stats - extended statistics
/ranks - rank table and leaderboard
/vote - vote in today's photo contest
/kb - knowledge base
/settings - location tracking on or off
/cancel - abort the current dialog
/help - this message

Any location you share outside a check-in updates your 🟡 nearby status."#,
    );

    if is_admin {
        help_text.push_str(
            r#"

<b>Admin:</b>
/admin - admin panel
/contest - photo contest controls
/makeadmin &lt;user id&gt; - grant admin rights"#,
        );
    }

    state
        .telegram
        .send_message(chat_id, &help_text, Some(keyboards::main_menu(is_admin)))
        .await?;

    Ok(())
}

use crate::export::ExportPeriod;
use crate::models::{
    ContestEntry, Event, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KnowledgeBaseFile, ReplyKeyboardMarkup, ReplyKeyboardRemove, ReplyMarkup, ScheduledPost,
};
use crate::parsing::{
    AdminAction, CallbackAction, ContestAction, ContestAdminAction, SettingsAction,
};

pub const BTN_CHECK_IN: &str = "📍 I'm on campus";
pub const BTN_CHECK_OUT: &str = "🚪 I'm leaving";
pub const BTN_WHO_INSIDE: &str = "👥 Who's on campus";
pub const BTN_PARTICIPANTS: &str = "👤 All participants";
pub const BTN_MY_STATUS: &str = "📊 My status";
pub const BTN_KNOWLEDGE: &str = "📚 Knowledge base";
pub const BTN_SETTINGS: &str = "⚙️ Settings";
pub const BTN_HELP: &str = "❓ Help";
pub const BTN_ADMIN: &str = "🔧 Admin panel";
pub const BTN_SEND_LOCATION: &str = "📍 Send location";
pub const BTN_SHARE_CONTACT: &str = "📱 Share phone number";
pub const BTN_SKIP: &str = "Skip";
pub const BTN_CANCEL: &str = "❌ Cancel";

fn button(action: CallbackAction, text: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.encode())
}

fn column(buttons: Vec<InlineKeyboardButton>) -> ReplyMarkup {
    ReplyMarkup::Inline(InlineKeyboardMarkup {
        inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
    })
}

fn reply_keyboard(rows: Vec<Vec<KeyboardButton>>, one_time: bool) -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: rows,
        resize_keyboard: true,
        one_time_keyboard: one_time,
    })
}

pub fn main_menu(is_admin: bool) -> ReplyMarkup {
    let last = if is_admin { BTN_ADMIN } else { BTN_HELP };
    reply_keyboard(
        vec![
            vec![KeyboardButton::text(BTN_CHECK_IN), KeyboardButton::text(BTN_CHECK_OUT)],
            vec![
                KeyboardButton::text(BTN_WHO_INSIDE),
                KeyboardButton::text(BTN_PARTICIPANTS),
            ],
            vec![KeyboardButton::text(BTN_MY_STATUS), KeyboardButton::text(BTN_KNOWLEDGE)],
            vec![KeyboardButton::text(BTN_SETTINGS), KeyboardButton::text(last)],
        ],
        false,
    )
}

pub fn location_request() -> ReplyMarkup {
    reply_keyboard(
        vec![
            vec![KeyboardButton {
                text: BTN_SEND_LOCATION.to_string(),
                request_location: true,
                request_contact: false,
            }],
            vec![KeyboardButton::text(BTN_CANCEL)],
        ],
        true,
    )
}

pub fn contact_request() -> ReplyMarkup {
    reply_keyboard(
        vec![vec![KeyboardButton {
            text: BTN_SHARE_CONTACT.to_string(),
            request_location: false,
            request_contact: true,
        }]],
        true,
    )
}

pub fn skip() -> ReplyMarkup {
    reply_keyboard(vec![vec![KeyboardButton::text(BTN_SKIP)]], true)
}

pub fn remove() -> ReplyMarkup {
    ReplyMarkup::Remove(ReplyKeyboardRemove {
        remove_keyboard: true,
    })
}

pub fn admin_panel() -> ReplyMarkup {
    column(vec![
        button(CallbackAction::Admin(AdminAction::Monitoring), "👥 Presence monitoring"),
        button(CallbackAction::Admin(AdminAction::Users), "👤 Registered users"),
        button(CallbackAction::Admin(AdminAction::Archive), "📋 Events archive"),
        button(CallbackAction::Admin(AdminAction::NewEvent), "🎯 Create event"),
        button(CallbackAction::Admin(AdminAction::NewPost), "📢 Create post"),
        button(CallbackAction::Admin(AdminAction::Posts), "🗓 Scheduled posts"),
        button(CallbackAction::Admin(AdminAction::KbUpload), "📚 Upload to knowledge base"),
        button(CallbackAction::Admin(AdminAction::KbManage), "🗑 Manage knowledge base"),
        button(CallbackAction::Admin(AdminAction::Export), "📊 Export data"),
        button(CallbackAction::Admin(AdminAction::Contest), "📸 Photo contest"),
        button(CallbackAction::Admin(AdminAction::Close), "◀️ Close"),
    ])
}

pub fn back_to_panel() -> ReplyMarkup {
    column(vec![button(
        CallbackAction::Admin(AdminAction::Panel),
        "◀️ Back",
    )])
}

pub fn settings(geo_consent: bool) -> ReplyMarkup {
    let geo = if geo_consent { "✅ on" } else { "❌ off" };
    column(vec![
        button(
            CallbackAction::Settings(SettingsAction::ToggleGeo),
            format!("📍 Location tracking: {geo}"),
        ),
        button(CallbackAction::Settings(SettingsAction::Stats), "📊 My statistics"),
        button(CallbackAction::Settings(SettingsAction::Close), "◀️ Close"),
    ])
}

pub fn export_menu() -> ReplyMarkup {
    column(vec![
        button(CallbackAction::Export(ExportPeriod::Today), "📅 Today"),
        button(CallbackAction::Export(ExportPeriod::Week), "📅 Last 7 days"),
        button(CallbackAction::Export(ExportPeriod::Month), "📅 Last 30 days"),
        button(CallbackAction::Export(ExportPeriod::Event), "🎯 By event"),
        button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"),
    ])
}

pub fn export_events(events: &[Event]) -> ReplyMarkup {
    let mut buttons: Vec<_> = events
        .iter()
        .map(|event| button(CallbackAction::ExportEvent(event.id), event.name.clone()))
        .collect();
    buttons.push(button(CallbackAction::Admin(AdminAction::Export), "◀️ Back"));
    column(buttons)
}

/// One button per present user, opening their profile.
pub fn profiles(users: impl IntoIterator<Item = (i64, String)>) -> ReplyMarkup {
    let mut buttons: Vec<_> = users
        .into_iter()
        .map(|(id, name)| button(CallbackAction::Profile(id), name))
        .collect();
    buttons.push(button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"));
    column(buttons)
}

pub fn profile(map_url: Option<String>) -> ReplyMarkup {
    let mut buttons = Vec::new();
    if let Some(url) = map_url {
        buttons.push(InlineKeyboardButton::url("🗺 Show on map", url));
    }
    buttons.push(button(
        CallbackAction::Admin(AdminAction::Monitoring),
        "◀️ Back to monitoring",
    ));
    column(buttons)
}

pub fn events_archive(events: &[Event]) -> ReplyMarkup {
    let mut buttons: Vec<_> = events
        .iter()
        .map(|event| button(CallbackAction::Event(event.id), event.name.clone()))
        .collect();
    buttons.push(button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"));
    column(buttons)
}

pub fn event_details(event_id: i64) -> ReplyMarkup {
    column(vec![
        button(CallbackAction::ExportEvent(event_id), "📊 Export"),
        button(CallbackAction::DeleteEvent(event_id), "🗑 Delete event"),
        button(CallbackAction::Admin(AdminAction::Archive), "◀️ Back"),
    ])
}

pub fn pending_posts(posts: &[ScheduledPost]) -> ReplyMarkup {
    let mut buttons: Vec<_> = posts
        .iter()
        .map(|post| button(CallbackAction::CancelPost(post.id), format!("❌ Cancel #{}", post.id)))
        .collect();
    buttons.push(button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"));
    column(buttons)
}

pub fn knowledge_base(files: &[KnowledgeBaseFile]) -> ReplyMarkup {
    let mut buttons: Vec<_> = files
        .iter()
        .map(|file| button(CallbackAction::KbFile(file.id), format!("📄 {}", file.title)))
        .collect();
    buttons.push(button(CallbackAction::KbClose, "◀️ Close"));
    column(buttons)
}

pub fn knowledge_base_admin(files: &[KnowledgeBaseFile]) -> ReplyMarkup {
    let mut buttons: Vec<_> = files
        .iter()
        .map(|file| button(CallbackAction::KbDelete(file.id), format!("🗑 {}", file.title)))
        .collect();
    buttons.push(button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"));
    column(buttons)
}

pub fn contest_invite() -> ReplyMarkup {
    ReplyMarkup::Inline(InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            button(CallbackAction::Contest(ContestAction::Join), "📸 Join"),
            button(CallbackAction::Contest(ContestAction::Decline), "🙅 Not today"),
        ]],
    })
}

pub fn contest_entry() -> ReplyMarkup {
    ReplyMarkup::Inline(InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            button(CallbackAction::Contest(ContestAction::Edit), "✏️ Replace photo"),
            button(CallbackAction::Contest(ContestAction::Withdraw), "🗑 Withdraw"),
        ]],
    })
}

pub fn contest_admin() -> ReplyMarkup {
    column(vec![
        button(CallbackAction::ContestAdmin(ContestAdminAction::Start), "🚀 Start today's contest"),
        button(CallbackAction::ContestAdmin(ContestAdminAction::Entries), "🖼 Today's entries"),
        button(CallbackAction::ContestAdmin(ContestAdminAction::Close), "🏁 Close and pick winner"),
        button(CallbackAction::ContestAdmin(ContestAdminAction::Delete), "🗑 Delete today's contest"),
        button(CallbackAction::Admin(AdminAction::Panel), "◀️ Back"),
    ])
}

pub fn vote(entry: &ContestEntry) -> ReplyMarkup {
    column(vec![button(
        CallbackAction::Vote(entry.id),
        format!("❤️ Vote ({})", entry.votes),
    )])
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Bot API wire types.

#[derive(Debug, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub from: Option<User>,
    pub reply_to_message: Option<ReplyMessage>,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub photo: Option<Vec<PhotoSize>>,
    pub caption: Option<String>,
    pub document: Option<Document>,
}

impl Message {
    /// Largest size of an attached photo, which Telegram lists last.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.as_ref().and_then(|sizes| sizes.last())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplyMessage {
    pub message_id: i64,
    pub from: Option<User>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Contact {
    pub phone_number: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_location: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

impl KeyboardButton {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: false,
            request_contact: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

#[derive(Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[allow(dead_code)]
    pub error_code: Option<i32>,
    pub description: Option<String>,
}

// Database rows.

#[derive(Debug, Clone)]
pub struct DbUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub team_role: Option<String>,
    pub phone_number: Option<String>,
    pub is_registered: bool,
    pub is_admin: bool,
    pub total_checkins: i64,
    pub current_rank: String,
    pub geo_consent: bool,
    pub registered_at: DateTime<Utc>,
}

impl DbUser {
    pub fn full_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.display_name()
        } else {
            name
        }
    }

    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            format!("@{}", username)
        } else if let Some(first) = &self.first_name {
            first.clone()
        } else {
            format!("user{}", self.user_id)
        }
    }

    pub fn mention_html(&self) -> String {
        format!(
            "<a href=\"tg://user?id={}\">{}</a>",
            self.user_id,
            crate::utils::escape_html(&self.full_name())
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rank {
    pub name: String,
    pub min_checkins: i64,
    pub emoji: String,
}

impl Rank {
    pub fn new(name: &str, min_checkins: i64, emoji: &str) -> Self {
        Self {
            name: name.to_string(),
            min_checkins,
            emoji: emoji.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    InCampus,
    Left,
}

impl PresenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceStatus::InCampus => "in_campus",
            PresenceStatus::Left => "left",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw == "in_campus" {
            PresenceStatus::InCampus
        } else {
            PresenceStatus::Left
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub id: i64,
    pub user_id: i64,
    pub event_id: Option<i64>,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub date: NaiveDate,
    pub status: PresenceStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GeoSample {
    pub id: i64,
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
    pub recorded_at: DateTime<Utc>,
    pub is_near_campus: bool,
}

/// Someone with an open `in_campus` record today.
#[derive(Debug, Clone)]
pub struct PresentUser {
    pub user: DbUser,
    pub check_in_time: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_sample: Option<GeoSample>,
}

#[derive(Debug, Clone)]
pub struct ParticipantStatus {
    pub user: DbUser,
    pub checked_in_today: bool,
    pub last_sample: Option<GeoSample>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceStats {
    pub total_days: i64,
    pub average_hours: f64,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct EventParticipant {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub team_role: Option<String>,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Pending,
    Sent,
    Cancelled,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Sent => "sent",
            PostStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "sent" => PostStatus::Sent,
            "cancelled" => PostStatus::Cancelled,
            _ => PostStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledPost {
    pub id: i64,
    pub event_id: Option<i64>,
    pub text: String,
    pub media_id: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub status: PostStatus,
    pub created_by: Option<i64>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ContestEntry {
    pub id: i64,
    pub user_id: i64,
    pub photo_file_id: String,
    pub description: String,
    pub votes: i64,
    pub submitted_at: DateTime<Utc>,
    pub is_winner: bool,
    pub contest_date: NaiveDate,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ContestEntry {
    pub fn author(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct ContestSchedule {
    pub contest_date: NaiveDate,
    pub end_time: DateTime<Utc>,
    pub is_closed: bool,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBaseFile {
    pub id: i64,
    pub title: String,
    pub file_id: String,
    pub file_type: String,
    pub uploaded_by: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExportRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub team_role: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
}

use crate::export::ExportPeriod;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

pub const MIN_AGE: i32 = 14;
pub const MAX_AGE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    TooShort,
    DateFormat,
    AgeOutOfRange,
    PhoneFormat,
}

impl InputError {
    pub fn message(self) -> &'static str {
        match self {
            InputError::TooShort => "❌ At least 2 characters, please. Try again:",
            InputError::DateFormat => "❌ Use the DD.MM.YYYY format, e.g. 15.03.2005. Try again:",
            InputError::AgeOutOfRange => "❌ Please enter a real birth date. Try again:",
            InputError::PhoneFormat => {
                "❌ That does not look like a phone number. Example: +7 701 234 56 78. Try again:"
            }
        }
    }
}

/// Splits `/cmd@bot args` into the lowercased command and the rest.
pub fn split_command<'a>(text: &'a str, bot_username: &str) -> Option<(String, &'a str)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let (head, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim()),
        None => (trimmed, ""),
    };
    let command = match head.split_once('@') {
        Some((cmd, bot)) if bot.eq_ignore_ascii_case(bot_username) => cmd,
        Some(_) => return None,
        None => head,
    };
    Some((command.to_ascii_lowercase(), rest))
}

pub fn validate_name(text: &str) -> Result<String, InputError> {
    let name = text.trim();
    if name.chars().count() < 2 {
        return Err(InputError::TooShort);
    }
    Ok(name.to_string())
}

pub fn parse_birth_date(text: &str, today: NaiveDate) -> Result<NaiveDate, InputError> {
    let raw = text.trim();
    let parts: Vec<&str> = raw.split('.').collect();
    let well_formed = parts.len() == 3
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[2].len() == 4
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()));
    if !well_formed {
        return Err(InputError::DateFormat);
    }
    let date = NaiveDate::parse_from_str(raw, "%d.%m.%Y").map_err(|_| InputError::DateFormat)?;

    let age = age_on(date, today);
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(InputError::AgeOutOfRange);
    }
    Ok(date)
}

/// Full years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Optional leading `+`, then 10 to 20 digits, spaces, dashes or parentheses.
pub fn validate_phone(text: &str) -> Result<String, InputError> {
    let phone = text.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let len = body.chars().count();
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    if !(10..=20).contains(&len) || !allowed || !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(InputError::PhoneFormat);
    }
    Ok(phone.to_string())
}

/// Accepts `HH:MM` (today), `DD.MM HH:MM` (this year) and `DD.MM.YYYY HH:MM`,
/// all in campus local time.
pub fn parse_local_datetime(
    text: &str,
    tz: &FixedOffset,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let local_today = now.with_timezone(tz).date_naive();

    let naive = if let Ok(time) = NaiveTime::parse_from_str(&raw, "%H:%M") {
        local_today.and_time(time)
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(&raw, "%d.%m.%Y %H:%M") {
        dt
    } else {
        let with_year = match raw.split_once(' ') {
            Some((day_month, time)) => {
                format!("{}.{} {}", day_month, local_today.year(), time)
            }
            None => return None,
        };
        NaiveDateTime::parse_from_str(&with_year, "%d.%m.%Y %H:%M").ok()?
    };

    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn parse_user_id(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Panel,
    Monitoring,
    Users,
    Archive,
    NewEvent,
    NewPost,
    Posts,
    KbUpload,
    KbManage,
    Export,
    Contest,
    Close,
}

impl AdminAction {
    const ALL: [(AdminAction, &'static str); 12] = [
        (AdminAction::Panel, "panel"),
        (AdminAction::Monitoring, "monitoring"),
        (AdminAction::Users, "users"),
        (AdminAction::Archive, "archive"),
        (AdminAction::NewEvent, "new_event"),
        (AdminAction::NewPost, "new_post"),
        (AdminAction::Posts, "posts"),
        (AdminAction::KbUpload, "kb_upload"),
        (AdminAction::KbManage, "kb_manage"),
        (AdminAction::Export, "export"),
        (AdminAction::Contest, "contest"),
        (AdminAction::Close, "close"),
    ];

    fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(action, _)| *action == self)
            .map(|(_, key)| *key)
            .unwrap_or("panel")
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(_, key)| *key == raw)
            .map(|(action, _)| *action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestAction {
    Join,
    Decline,
    Edit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestAdminAction {
    Start,
    Entries,
    Close,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    ToggleGeo,
    Stats,
    Close,
}

/// Payload of an inline button. Encoded as `prefix:argument`, always well
/// under the 64-byte limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Admin(AdminAction),
    Profile(i64),
    Event(i64),
    DeleteEvent(i64),
    CancelPost(i64),
    Export(ExportPeriod),
    ExportEvent(i64),
    KbFile(i64),
    KbDelete(i64),
    KbClose,
    Vote(i64),
    Contest(ContestAction),
    ContestAdmin(ContestAdminAction),
    Settings(SettingsAction),
}

impl CallbackAction {
    pub fn encode(self) -> String {
        match self {
            CallbackAction::Admin(action) => format!("admin:{}", action.as_str()),
            CallbackAction::Profile(id) => format!("profile:{id}"),
            CallbackAction::Event(id) => format!("event:{id}"),
            CallbackAction::DeleteEvent(id) => format!("event_del:{id}"),
            CallbackAction::CancelPost(id) => format!("post_cancel:{id}"),
            CallbackAction::Export(period) => format!("export:{}", period.as_str()),
            CallbackAction::ExportEvent(id) => format!("export_event:{id}"),
            CallbackAction::KbFile(id) => format!("kb:{id}"),
            CallbackAction::KbDelete(id) => format!("kb_del:{id}"),
            CallbackAction::KbClose => "kb_close".to_string(),
            CallbackAction::Vote(id) => format!("vote:{id}"),
            CallbackAction::Contest(action) => format!(
                "contest:{}",
                match action {
                    ContestAction::Join => "join",
                    ContestAction::Decline => "decline",
                    ContestAction::Edit => "edit",
                    ContestAction::Withdraw => "withdraw",
                }
            ),
            CallbackAction::ContestAdmin(action) => format!(
                "contest_admin:{}",
                match action {
                    ContestAdminAction::Start => "start",
                    ContestAdminAction::Entries => "entries",
                    ContestAdminAction::Close => "close",
                    ContestAdminAction::Delete => "delete",
                }
            ),
            CallbackAction::Settings(action) => format!(
                "settings:{}",
                match action {
                    SettingsAction::ToggleGeo => "geo",
                    SettingsAction::Stats => "stats",
                    SettingsAction::Close => "close",
                }
            ),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        if data == "kb_close" {
            return Some(CallbackAction::KbClose);
        }
        let (prefix, arg) = data.split_once(':')?;
        let id = || arg.parse::<i64>().ok();
        match prefix {
            "admin" => AdminAction::parse(arg).map(CallbackAction::Admin),
            "profile" => id().map(CallbackAction::Profile),
            "event" => id().map(CallbackAction::Event),
            "event_del" => id().map(CallbackAction::DeleteEvent),
            "post_cancel" => id().map(CallbackAction::CancelPost),
            "export" => ExportPeriod::parse(arg).map(CallbackAction::Export),
            "export_event" => id().map(CallbackAction::ExportEvent),
            "kb" => id().map(CallbackAction::KbFile),
            "kb_del" => id().map(CallbackAction::KbDelete),
            "vote" => id().map(CallbackAction::Vote),
            "contest" => match arg {
                "join" => Some(ContestAction::Join),
                "decline" => Some(ContestAction::Decline),
                "edit" => Some(ContestAction::Edit),
                "withdraw" => Some(ContestAction::Withdraw),
                _ => None,
            }
            .map(CallbackAction::Contest),
            "contest_admin" => match arg {
                "start" => Some(ContestAdminAction::Start),
                "entries" => Some(ContestAdminAction::Entries),
                "close" => Some(ContestAdminAction::Close),
                "delete" => Some(ContestAdminAction::Delete),
                _ => None,
            }
            .map(CallbackAction::ContestAdmin),
            "settings" => match arg {
                "geo" => Some(SettingsAction::ToggleGeo),
                "stats" => Some(SettingsAction::Stats),
                "close" => Some(SettingsAction::Close),
                _ => None,
            }
            .map(CallbackAction::Settings),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("/start", "campusbot"),
            Some(("/start".to_string(), ""))
        );
        assert_eq!(
            split_command("/MakeAdmin@CampusBot  42 ", "campusbot"),
            Some(("/makeadmin".to_string(), "42"))
        );
        assert_eq!(split_command("/start@otherbot", "campusbot"), None);
        assert_eq!(split_command("hello", "campusbot"), None);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Aigerim "), Ok("Aigerim".to_string()));
        assert_eq!(validate_name("Ли"), Ok("Ли".to_string()));
        assert_eq!(validate_name("A"), Err(InputError::TooShort));
        assert_eq!(validate_name("   "), Err(InputError::TooShort));
    }

    #[test]
    fn test_parse_birth_date() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(
            parse_birth_date("15.03.2005", today),
            Ok(NaiveDate::from_ymd_opt(2005, 3, 15).unwrap())
        );
        assert_eq!(parse_birth_date("15/03/2005", today), Err(InputError::DateFormat));
        assert_eq!(parse_birth_date("5.3.2005", today), Err(InputError::DateFormat));
        assert_eq!(parse_birth_date("31.02.2005", today), Err(InputError::DateFormat));
        assert_eq!(parse_birth_date("01.01.2020", today), Err(InputError::AgeOutOfRange));
        assert_eq!(parse_birth_date("01.01.1900", today), Err(InputError::AgeOutOfRange));
    }

    #[test]
    fn test_age_boundaries() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2012, 10, 18).unwrap(), today), 14);
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2012, 10, 19).unwrap(), today), 13);
        assert!(parse_birth_date("18.10.2012", today).is_ok());
        assert!(parse_birth_date("19.10.2012", today).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+7 701 234 56 78").is_ok());
        assert!(validate_phone("8(701)234-56-78").is_ok());
        assert!(validate_phone("87012345678").is_ok());
        assert_eq!(validate_phone("12345"), Err(InputError::PhoneFormat));
        assert_eq!(validate_phone("+7 701 abc 56 78"), Err(InputError::PhoneFormat));
        assert_eq!(
            validate_phone("+7 701 234 56 78 90 12 34"),
            Err(InputError::PhoneFormat)
        );
    }

    #[test]
    fn test_parse_local_datetime_formats() {
        // 10:00 local on 18.10.2026
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 5, 0, 0).unwrap();

        let today = parse_local_datetime("18:30", &tz(), now).unwrap();
        assert_eq!(today, Utc.with_ymd_and_hms(2026, 10, 18, 13, 30, 0).unwrap());

        let this_year = parse_local_datetime("25.12 09:00", &tz(), now).unwrap();
        assert_eq!(this_year, Utc.with_ymd_and_hms(2026, 12, 25, 4, 0, 0).unwrap());

        let full = parse_local_datetime("01.02.2027  00:15", &tz(), now).unwrap();
        assert_eq!(full.with_timezone(&tz()).hour(), 0);
        assert_eq!(full, Utc.with_ymd_and_hms(2027, 1, 31, 19, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_local_datetime_rejects_garbage() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 5, 0, 0).unwrap();
        assert!(parse_local_datetime("tomorrow", &tz(), now).is_none());
        assert!(parse_local_datetime("25:00", &tz(), now).is_none());
        assert!(parse_local_datetime("32.01 10:00", &tz(), now).is_none());
        assert!(parse_local_datetime("", &tz(), now).is_none());
    }

    #[test]
    fn test_callback_actions_parse() {
        assert_eq!(
            CallbackAction::parse("admin:monitoring"),
            Some(CallbackAction::Admin(AdminAction::Monitoring))
        );
        assert_eq!(CallbackAction::parse("profile:42"), Some(CallbackAction::Profile(42)));
        assert_eq!(
            CallbackAction::parse("export:week"),
            Some(CallbackAction::Export(ExportPeriod::Week))
        );
        assert_eq!(CallbackAction::parse("kb_close"), Some(CallbackAction::KbClose));
        assert_eq!(CallbackAction::parse("vote:abc"), None);
        assert_eq!(CallbackAction::parse("admin:unknown"), None);
        assert_eq!(CallbackAction::parse("garbage"), None);
    }

    #[test]
    fn test_callback_actions_encode() {
        let actions = [
            CallbackAction::Admin(AdminAction::NewEvent),
            CallbackAction::DeleteEvent(7),
            CallbackAction::ExportEvent(3),
            CallbackAction::Contest(ContestAction::Withdraw),
            CallbackAction::ContestAdmin(ContestAdminAction::Entries),
            CallbackAction::Settings(SettingsAction::ToggleGeo),
            CallbackAction::Vote(9_000_000_000),
        ];
        for action in actions {
            let encoded = action.encode();
            assert!(encoded.len() <= 64, "{encoded}");
            assert_eq!(CallbackAction::parse(&encoded), Some(action));
        }
    }
}

use chrono::{DateTime, Duration, FixedOffset, Utc};

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn format_username(username: &Option<String>) -> String {
    match username {
        Some(name) => format!("@{}", escape_html(name)),
        None => "no username".to_string(),
    }
}

pub fn format_local_time(at: DateTime<Utc>, tz: &FixedOffset) -> String {
    at.with_timezone(tz).format("%H:%M").to_string()
}

pub fn format_local_datetime(at: DateTime<Utc>, tz: &FixedOffset) -> String {
    at.with_timezone(tz).format("%d.%m.%Y %H:%M").to_string()
}

/// `2h 05m`, or `45m` under an hour.
pub fn format_stay(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
    }

    #[test]
    fn test_format_username() {
        assert_eq!(format_username(&Some("kate".to_string())), "@kate");
        assert_eq!(format_username(&None), "no username");
    }

    #[test]
    fn test_local_formatting() {
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 20, 30, 0).unwrap();
        assert_eq!(format_local_time(at, &tz), "01:30");
        assert_eq!(format_local_datetime(at, &tz), "19.10.2026 01:30");
    }

    #[test]
    fn test_format_stay() {
        assert_eq!(format_stay(Duration::minutes(45)), "45m");
        assert_eq!(format_stay(Duration::minutes(125)), "2h 05m");
        assert_eq!(format_stay(Duration::minutes(-3)), "0m");
    }
}

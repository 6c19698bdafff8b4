use crate::models::ExportRow;
use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

pub const HEADERS: [&str; 10] = [
    "First name",
    "Last name",
    "Username",
    "Team/Role",
    "Phone",
    "Birth date",
    "Date",
    "Arrival",
    "Departure",
    "Duration (h)",
];

const MAX_COLUMN_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPeriod {
    Today,
    Week,
    Month,
    /// Pick an event first.
    Event,
}

impl ExportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportPeriod::Today => "today",
            ExportPeriod::Week => "week",
            ExportPeriod::Month => "month",
            ExportPeriod::Event => "event",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "today" => Some(ExportPeriod::Today),
            "week" => Some(ExportPeriod::Week),
            "month" => Some(ExportPeriod::Month),
            "event" => Some(ExportPeriod::Event),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ExportPeriod::Today => "Today",
            ExportPeriod::Week => "Last 7 days",
            ExportPeriod::Month => "Last 30 days",
            ExportPeriod::Event => "Event",
        }
    }

    /// Inclusive local date range, `None` for event exports.
    pub fn date_range(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            ExportPeriod::Today => Some((today, today)),
            ExportPeriod::Week => Some((today - Duration::days(7), today)),
            ExportPeriod::Month => Some((today - Duration::days(30), today)),
            ExportPeriod::Event => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn width(&self) -> usize {
        match self {
            Cell::Text(text) => text.chars().count(),
            Cell::Number(value) => format!("{value:.2}").len(),
        }
    }
}

pub fn stay_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let hours = (check_out - check_in).num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

/// One spreadsheet row per presence record, times in campus local time.
pub fn table_rows(rows: &[ExportRow], tz: &FixedOffset) -> Vec<Vec<Cell>> {
    let text = |value: &Option<String>| Cell::Text(value.clone().unwrap_or_default());
    rows.iter()
        .map(|row| {
            let (departure, duration) = match row.check_out_time {
                Some(out) => (
                    Cell::Text(crate::utils::format_local_time(out, tz)),
                    Cell::Number(stay_hours(row.check_in_time, out)),
                ),
                None => (Cell::Text("not left".to_string()), Cell::Text(String::new())),
            };
            vec![
                text(&row.first_name),
                text(&row.last_name),
                text(&row.username),
                text(&row.team_role),
                text(&row.phone_number),
                Cell::Text(
                    row.birth_date
                        .map(|d| d.format("%d.%m.%Y").to_string())
                        .unwrap_or_default(),
                ),
                Cell::Text(row.date.format("%d.%m.%Y").to_string()),
                Cell::Text(crate::utils::format_local_time(row.check_in_time, tz)),
                departure,
                duration,
            ]
        })
        .collect()
}

pub fn column_widths(rows: &[Vec<Cell>]) -> Vec<usize> {
    HEADERS
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let longest = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(Cell::width)
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Renders the presence sheet into an in-memory `.xlsx` file.
pub fn build_workbook(rows: &[ExportRow], tz: &FixedOffset) -> Result<Vec<u8>> {
    let cells = table_rows(rows, tz);
    let widths = column_widths(&cells);

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Presence")?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, row) in cells.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) if text.is_empty() => {}
                Cell::Text(text) => {
                    worksheet.write_string(row_num, col as u16, text)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row_num, col as u16, *value)?;
                }
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn file_name(period: ExportPeriod, now: DateTime<Utc>, tz: &FixedOffset) -> String {
    format!(
        "presence_{}_{}.xlsx",
        period.as_str(),
        now.with_timezone(tz).format("%Y%m%d_%H%M")
    )
}

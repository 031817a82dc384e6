//! Report windows: which inclusive timestamp range a report covers, and the
//! comparable range immediately before it.

use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::error::ReportError;

/// Time granularity of a report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimension {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Custom,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "custom" => Ok(Self::Custom),
            _ => Err(ReportError::InvalidDimension(s.to_string())),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inclusive timestamp range plus the label shown in report headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: String,
}

impl ReportWindow {
    /// Whole days from `first` 00:00:00 through `last` 23:59:59.999999.
    fn days(first: NaiveDate, last: NaiveDate, label: String) -> Self {
        Self {
            start: start_of_day(first),
            end: end_of_day(last),
            label,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Number of calendar days covered.
    pub fn num_days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days() + 1
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Resolve the window for a request, relative to the local current date.
pub fn resolve_window(
    dimension: Dimension,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<ReportWindow, ReportError> {
    resolve_window_on(Local::now().date_naive(), dimension, start, end)
}

/// Resolve the window for a request, relative to `today`.
///
/// An explicit `start`/`end` pair wins over the dimension. A lone `start`
/// only matters for monthly reports, where it selects the month containing it.
pub fn resolve_window_on(
    today: NaiveDate,
    dimension: Dimension,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<ReportWindow, ReportError> {
    let start = start.map(parse_date).transpose()?;
    let end = end.map(parse_date).transpose()?;

    let window = match (start, end) {
        (Some(first), Some(last)) => {
            if last < first {
                return Err(ReportError::InvalidRange {
                    start: date_label(first),
                    end: date_label(last),
                });
            }
            ReportWindow::days(first, last, range_label(first, last))
        }
        (Some(first), None) if dimension == Dimension::Monthly => month_window(first),
        (first, last) => {
            if dimension == Dimension::Custom {
                return Err(ReportError::MissingDateRange);
            }
            if first.is_some() || last.is_some() {
                warn!(%dimension, "lone date bound ignored");
            }
            match dimension {
                Dimension::Daily => day_window(today),
                Dimension::Weekly => week_window(today),
                Dimension::Quarterly => quarter_window(today),
                Dimension::Monthly | Dimension::Custom => month_window(today),
            }
        }
    };

    debug!(
        %dimension,
        label = %window.label,
        start = %window.start,
        end = %window.end,
        "resolved report window"
    );
    Ok(window)
}

/// The comparable period immediately before `window`. Never fails.
pub fn baseline_window(dimension: Dimension, window: &ReportWindow) -> ReportWindow {
    let first = window.start_date();
    match dimension {
        Dimension::Daily => day_window(first - Duration::days(1)),
        Dimension::Weekly => {
            let first = first - Duration::days(7);
            let last = window.end_date() - Duration::days(7);
            ReportWindow::days(first, last, range_label(first, last))
        }
        Dimension::Quarterly => quarter_window(quarter_start(first) - Duration::days(1)),
        Dimension::Custom => {
            let last = first - Duration::days(1);
            let first = first - Duration::days(window.num_days());
            ReportWindow::days(first, last, range_label(first, last))
        }
        Dimension::Monthly => month_window(first_of_month(first) - Duration::days(1)),
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDateFormat(s.to_string()))
}

/// Parse a `YYYY-MM` month into its first day.
pub fn parse_month(s: &str) -> Result<NaiveDate, ReportError> {
    let trimmed = s.trim();
    if trimmed.len() != 7 || trimmed.as_bytes().get(4) != Some(&b'-') {
        return Err(ReportError::InvalidMonthFormat(s.to_string()));
    }
    NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidMonthFormat(s.to_string()))
}

/// Inclusive timestamp bounds of a `YYYY-MM` month.
pub fn month_bounds(s: &str) -> Result<(NaiveDateTime, NaiveDateTime), ReportError> {
    let window = month_window(parse_month(s)?);
    Ok((window.start, window.end))
}

// ── Calendar helpers ──────────────────────────────────────────

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::microseconds(1)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

fn quarter_start(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    first
        .checked_sub_months(Months::new(date.month0() % 3))
        .unwrap_or(first)
}

fn quarter_end(date: NaiveDate) -> NaiveDate {
    let start = quarter_start(date);
    last_of_month(start.checked_add_months(Months::new(2)).unwrap_or(start))
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

// ── Window builders ───────────────────────────────────────────

fn day_window(date: NaiveDate) -> ReportWindow {
    ReportWindow::days(date, date, date_label(date))
}

fn week_window(date: NaiveDate) -> ReportWindow {
    let monday = monday_of(date);
    let sunday = monday + Duration::days(6);
    ReportWindow::days(monday, sunday, range_label(monday, sunday))
}

fn month_window(date: NaiveDate) -> ReportWindow {
    ReportWindow::days(
        first_of_month(date),
        last_of_month(date),
        date.format("%Y-%m").to_string(),
    )
}

fn quarter_window(date: NaiveDate) -> ReportWindow {
    ReportWindow::days(
        quarter_start(date),
        quarter_end(date),
        format!("Q{} {}", quarter_of(date), date.year()),
    )
}

fn date_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn range_label(first: NaiveDate, last: NaiveDate) -> String {
    format!("{} 至 {}", date_label(first), date_label(last))
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod window_tests;

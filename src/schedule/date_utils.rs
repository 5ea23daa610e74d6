use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{Result, SchedulerError};

/// Most dates a single batch may expand to
pub const MAX_BATCH_DATES: usize = 366;

/// Parses an ISO date (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulerError::config(format!("invalid date: {:?}", date_str.trim())))
}

/// Parses a weekday name, accepting full names and three-letter abbreviations
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let lower = value.trim().to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    let day = match lower.get(..3)? {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    // Reject things like "sunny" while allowing "sun" and "sunday"
    if lower.len() == 3 || full_name(day) == lower {
        Some(day)
    } else {
        None
    }
}

fn full_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Every date in [from, to] falling on one of `weekdays`, ascending.
/// An empty weekday list means every day.
pub fn expand_date_range(
    from: NaiveDate,
    to: NaiveDate,
    weekdays: &[Weekday],
) -> Result<Vec<NaiveDate>> {
    if to < from {
        return Err(SchedulerError::config(format!(
            "date range ends ({to}) before it starts ({from})"
        )));
    }

    let mut dates = Vec::new();
    for date in from.iter_days().take_while(|d| *d <= to) {
        if weekdays.is_empty() || weekdays.contains(&date.weekday()) {
            if dates.len() == MAX_BATCH_DATES {
                return Err(SchedulerError::config(format!(
                    "date range expands to more than {MAX_BATCH_DATES} dates"
                )));
            }
            dates.push(date);
        }
    }
    Ok(dates)
}

/// Formats a date for terminal output, e.g. "Sun 2024-03-10"
pub fn display_date(date: NaiveDate) -> String {
    format!("{} {}", date.weekday(), date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date(" 2024-03-10 ").unwrap(), d(2024, 3, 10));
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("10/03/2024").is_err());
    }

    #[test]
    fn parses_weekday_names() {
        assert_eq!(parse_weekday("Sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("wednesday"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("sunny"), None);
        assert_eq!(parse_weekday("x"), None);
    }

    #[test]
    fn expands_sundays_and_wednesdays() {
        // 2024-03-03 is a Sunday
        let dates =
            expand_date_range(d(2024, 3, 3), d(2024, 3, 13), &[Weekday::Sun, Weekday::Wed])
                .unwrap();
        assert_eq!(
            dates,
            vec![d(2024, 3, 3), d(2024, 3, 6), d(2024, 3, 10), d(2024, 3, 13)]
        );
    }

    #[test]
    fn reversed_range_rejected() {
        assert!(expand_date_range(d(2024, 3, 10), d(2024, 3, 1), &[]).is_err());
    }

    #[test]
    fn oversized_range_rejected() {
        assert!(expand_date_range(d(2024, 1, 1), d(2025, 12, 31), &[]).is_err());
        assert_eq!(
            expand_date_range(d(2024, 1, 1), d(2024, 12, 31), &[])
                .unwrap()
                .len(),
            366
        );
    }

    #[test]
    fn display_includes_weekday() {
        assert_eq!(display_date(d(2024, 3, 10)), "Sun 2024-03-10");
    }
}

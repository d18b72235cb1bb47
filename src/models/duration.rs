use chrono::{Datelike, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Last year a stored timestamp can carry
pub const MAX_YEAR: i32 = 9999;

/// Length of the analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duration {
    Hourly,
    Daily,
}

impl Duration {
    /// Window length in minutes
    pub const fn minutes(self) -> i64 {
        match self {
            Duration::Hourly => 60,
            Duration::Daily => 60 * 24,
        }
    }

    /// Lowercase variant name, as used on the command line and in block reasons
    pub const fn name(self) -> &'static str {
        match self {
            Duration::Hourly => "hourly",
            Duration::Daily => "daily",
        }
    }

    /// Exclusive end of a window opened at `start`
    ///
    /// Returns `None` when the end falls past year 9999, where timestamps
    /// stop being four-digit years and no longer sort as text.
    pub fn window_end(self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        start
            .checked_add_signed(chrono::Duration::minutes(self.minutes()))
            .filter(|end| end.year() <= MAX_YEAR)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Duration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Duration::Hourly),
            "daily" => Ok(Duration::Daily),
            other => Err(format!(
                "unknown duration '{}', expected 'hourly' or 'daily'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::TIMESTAMP_FORMAT;

    #[test]
    fn test_minutes() {
        assert_eq!(Duration::Hourly.minutes(), 60);
        assert_eq!(Duration::Daily.minutes(), 1440);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("hourly".parse::<Duration>().unwrap(), Duration::Hourly);
        assert_eq!("DAILY".parse::<Duration>().unwrap(), Duration::Daily);
        assert_eq!("Hourly".parse::<Duration>().unwrap(), Duration::Hourly);
        assert!("weekly".parse::<Duration>().is_err());
        assert!("".parse::<Duration>().is_err());
    }

    #[test]
    fn test_window_end() {
        let start =
            NaiveDateTime::parse_from_str("2017-01-01 23:30:00.164", TIMESTAMP_FORMAT).unwrap();

        let hourly = Duration::Hourly.window_end(start).unwrap();
        assert_eq!(hourly.format(TIMESTAMP_FORMAT).to_string(), "2017-01-02 00:30:00.164");

        let daily = Duration::Daily.window_end(start).unwrap();
        assert_eq!(daily.format(TIMESTAMP_FORMAT).to_string(), "2017-01-02 23:30:00.164");
    }

    #[test]
    fn test_window_end_overflow() {
        assert!(Duration::Daily.window_end(NaiveDateTime::MAX).is_none());
    }

    #[test]
    fn test_window_end_stays_in_four_digit_years() {
        let late =
            NaiveDateTime::parse_from_str("9999-12-31 23:30:00.000", TIMESTAMP_FORMAT).unwrap();
        assert!(Duration::Hourly.window_end(late).is_none());
        assert!(Duration::Daily.window_end(late).is_none());

        let last_hour =
            NaiveDateTime::parse_from_str("9999-12-31 22:59:59.999", TIMESTAMP_FORMAT).unwrap();
        let end = Duration::Hourly.window_end(last_hour).unwrap();
        assert_eq!(end.format(TIMESTAMP_FORMAT).to_string(), "9999-12-31 23:59:59.999");
    }
}

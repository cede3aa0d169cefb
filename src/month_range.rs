//! Resolves a year and month into the interval of instants used to filter sales.
//!
//! Every query in the dashboard is restricted to a single calendar month. The
//! month is given by the client as separate `year` and `month` query
//! parameters and is resolved here into a half-open interval `[start, end)`
//! where `start` is local midnight on the first day of the month and `end` is
//! local midnight on the first day of the following month.

use serde::Deserialize;
use time::{Date, Month, OffsetDateTime};

use crate::{Error, timezone::get_offset_at};

const MISSING_YEAR_OR_MONTH: &str = "Year and month query parameters are required";

/// The half-open interval `[start, end)` covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    /// The first instant of the month.
    pub start: OffsetDateTime,
    /// The first instant of the following month (exclusive).
    pub end: OffsetDateTime,
}

impl MonthRange {
    /// Whether `instant` falls within the month.
    #[cfg(test)]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// The query parameters for endpoints that only filter by month.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// The year, e.g. "2022".
    pub year: Option<String>,
    /// The month number, "1" for January through "12" for December.
    pub month: Option<String>,
}

impl MonthQuery {
    /// Parse the query parameters and resolve them into a [MonthRange] in `timezone`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidArgument] if the year or month is missing or invalid.
    pub fn resolve(&self, timezone: &str) -> Result<MonthRange, Error> {
        resolve_query(self.year.as_deref(), self.month.as_deref(), timezone)
    }
}

/// Parse raw `year` and `month` query values and resolve them into a [MonthRange].
///
/// # Errors
/// Returns an [Error::InvalidArgument] if either value is missing, is not an
/// integer, or does not name a representable month.
pub fn resolve_query(
    year: Option<&str>,
    month: Option<&str>,
    timezone: &str,
) -> Result<MonthRange, Error> {
    let (year, month) = parse_year_month(year, month)?;
    resolve_month_range(year, month, timezone)
}

fn parse_year_month(year: Option<&str>, month: Option<&str>) -> Result<(i32, u8), Error> {
    let missing = || Error::InvalidArgument(MISSING_YEAR_OR_MONTH.to_owned());
    let year = non_empty(year).ok_or_else(missing)?;
    let month = non_empty(month).ok_or_else(missing)?;

    let year = year
        .parse::<i32>()
        .map_err(|_| Error::InvalidArgument(format!("Invalid year parameter \"{year}\"")))?;
    let month = month
        .parse::<i64>()
        .map_err(|_| Error::InvalidArgument(format!("Invalid month parameter \"{month}\"")))?;

    match u8::try_from(month) {
        Ok(month @ 1..=12) => Ok((year, month)),
        _ => Err(Error::InvalidArgument(format!(
            "Invalid month parameter \"{month}\", month must be between 1 and 12"
        ))),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Resolve `year` and `month` (1-12) into the [MonthRange] for that month in `timezone`.
///
/// # Errors
/// Returns an:
/// - [Error::InvalidArgument] if `month` is not in 1-12 or the month is outside
///   the supported calendar,
/// - or [Error::InvalidTimezoneError] if `timezone` is not a canonical timezone name.
pub fn resolve_month_range(year: i32, month: u8, timezone: &str) -> Result<MonthRange, Error> {
    let month = Month::try_from(month).map_err(|_| {
        Error::InvalidArgument(format!(
            "Invalid month parameter \"{month}\", month must be between 1 and 12"
        ))
    })?;
    let out_of_range = |_| Error::InvalidArgument(format!("The year {year} is not supported"));

    let first_day = Date::from_calendar_date(year, month, 1).map_err(out_of_range)?;
    let first_day_of_next_month = match month {
        Month::December => Date::from_calendar_date(year + 1, Month::January, 1),
        month => Date::from_calendar_date(year, month.next(), 1),
    }
    .map_err(out_of_range)?;

    Ok(MonthRange {
        start: local_midnight(first_day, timezone)?,
        end: local_midnight(first_day_of_next_month, timezone)?,
    })
}

/// The instant of midnight at the start of `date` in `timezone`.
fn local_midnight(date: Date, timezone: &str) -> Result<OffsetDateTime, Error> {
    let midnight = date.midnight();
    let offset_at = |instant| {
        get_offset_at(timezone, instant)
            .ok_or_else(|| Error::InvalidTimezoneError(timezone.to_owned()))
    };

    // The offset depends on the instant, which depends on the offset. Starting
    // from UTC, a second lookup lands on the right side of any DST change.
    let guess = offset_at(midnight.assume_utc())?;
    let offset = offset_at(midnight.assume_offset(guess))?;

    Ok(midnight.assume_offset(offset))
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::datetime};

    use crate::Error;

    use super::{MonthQuery, resolve_month_range, resolve_query};

    #[test]
    fn resolves_month_in_utc() {
        let got = resolve_month_range(2022, 3, "Etc/UTC").unwrap();

        assert_eq!(got.start, datetime!(2022-03-01 0:00 UTC));
        assert_eq!(got.end, datetime!(2022-04-01 0:00 UTC));
    }

    #[test]
    fn december_rolls_over_into_next_year() {
        let got = resolve_month_range(2021, 12, "Etc/UTC").unwrap();

        assert_eq!(got.start, datetime!(2021-12-01 0:00 UTC));
        assert_eq!(got.end, datetime!(2022-01-01 0:00 UTC));
    }

    #[test]
    fn end_is_one_calendar_month_after_start() {
        for year in [1999, 2020, 2022] {
            for month in 1..=12u8 {
                let range = resolve_month_range(year, month, "Etc/UTC").unwrap();
                let next_month = Month::try_from(month).unwrap().next();

                assert_eq!(range.start.day(), 1);
                assert_eq!(range.end.day(), 1);
                assert_eq!(range.end.month(), next_month);
                assert!(range.start < range.end);
                assert_eq!(
                    range.end.year(),
                    if month == 12 { year + 1 } else { year },
                );
            }
        }
    }

    #[test]
    fn uses_local_midnight_of_timezone() {
        let got = resolve_month_range(2022, 3, "Asia/Kolkata").unwrap();

        assert_eq!(got.start, datetime!(2022-03-01 0:00 +5:30));
        assert_eq!(got.end, datetime!(2022-04-01 0:00 +5:30));
        assert_eq!(got.start, datetime!(2022-02-28 18:30 UTC));
    }

    #[test]
    fn bounds_use_offset_in_effect_on_each_day() {
        // New Zealand daylight saving ends on 3 April 2022.
        let got = resolve_month_range(2022, 4, "Pacific/Auckland").unwrap();

        assert_eq!(got.start, datetime!(2022-04-01 0:00 +13:00));
        assert_eq!(got.end, datetime!(2022-05-01 0:00 +12:00));
    }

    #[test]
    fn contains_is_half_open() {
        let range = resolve_month_range(2022, 3, "Etc/UTC").unwrap();

        assert!(range.contains(datetime!(2022-03-01 0:00 UTC)));
        assert!(range.contains(datetime!(2022-03-31 23:59:59 UTC)));
        assert!(!range.contains(datetime!(2022-04-01 0:00 UTC)));
        assert!(!range.contains(datetime!(2022-02-28 23:59:59 UTC)));
    }

    #[test]
    fn rejects_month_outside_calendar() {
        for month in [0, 13] {
            let got = resolve_month_range(2022, month, "Etc/UTC");

            assert!(
                matches!(got, Err(Error::InvalidArgument(_))),
                "month {month} should be rejected, got {got:?}"
            );
        }
    }

    #[test]
    fn rejects_unrepresentable_year() {
        assert!(matches!(
            resolve_month_range(9999, 12, "Etc/UTC"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_month_range(100_000, 1, "Etc/UTC"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert_eq!(
            resolve_month_range(2022, 3, "Middle/Earth"),
            Err(Error::InvalidTimezoneError("Middle/Earth".to_owned()))
        );
    }

    #[test]
    fn query_requires_year_and_month() {
        let cases = [(None, Some("3")), (Some("2022"), None), (Some(""), Some("3")), (None, None)];

        for (year, month) in cases {
            let got = resolve_query(year, month, "Etc/UTC");

            assert_eq!(
                got,
                Err(Error::InvalidArgument(
                    "Year and month query parameters are required".to_owned()
                ))
            );
        }
    }

    #[test]
    fn query_rejects_non_integer_values() {
        let cases = [("twenty", "3"), ("2022", "March"), ("2022", "3.5"), ("2022", "-1")];

        for (year, month) in cases {
            let got = resolve_query(Some(year), Some(month), "Etc/UTC");

            assert!(
                matches!(got, Err(Error::InvalidArgument(_))),
                "({year}, {month}) should be rejected, got {got:?}"
            );
        }
    }

    #[test]
    fn month_query_resolves() {
        let query = MonthQuery {
            year: Some("2022".to_owned()),
            month: Some(" 03 ".to_owned()),
        };

        let got = query.resolve("Etc/UTC").unwrap();

        assert_eq!(got.start, datetime!(2022-03-01 0:00 UTC));
    }
}

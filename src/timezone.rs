//! Lookup of UTC offsets for canonical timezone names.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the UTC offset that `canonical_timezone` (e.g. "Pacific/Auckland")
/// observes at `instant`.
///
/// Returns `None` if the name is not a known canonical timezone.
pub fn get_offset_at(canonical_timezone: &str, instant: OffsetDateTime) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&instant).to_utc())
}

/// Whether `canonical_timezone` names a known timezone.
pub fn is_valid_timezone(canonical_timezone: &str) -> bool {
    time_tz::timezones::get_by_name(canonical_timezone).is_some()
}

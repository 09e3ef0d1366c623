//! Conversion of stored UTC timestamps to the server's configured timezone.

use time::{OffsetDateTime, UtcOffset, macros::format_description};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset for a canonical timezone name, e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone name is not known.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Format `date_time` as "YYYY-MM-DD HH:MM" in the given `offset`.
pub fn format_local_date_time(date_time: OffsetDateTime, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");

    date_time
        .to_offset(offset)
        .format(format)
        .unwrap_or_else(|error| {
            tracing::error!("could not format date time {date_time}: {error}");
            date_time.to_string()
        })
}

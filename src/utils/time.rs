use chrono::{DateTime, Duration, NaiveTime, TimeZone};

/// Returns start of the next day. The daily reset is scheduled against the
/// UTC variant of this.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Millis to whole minutes, rounded half-up. Matches what users see in
/// notifications and reports.
pub fn ms_to_minutes(ms: u64) -> u64 {
    (ms + 30_000) / 60_000
}

pub fn format_millis(ms: u64) -> String {
    let seconds = ms / 1000;
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

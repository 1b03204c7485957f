use chrono::NaiveDate;

/// Fast parse of `"YYYYMMDD"` or `"YYYY-MM-DD"` → `NaiveDate`.
/// A trailing time component (`"YYYY-MM-DDTHH:MM:SS"`) is ignored.
pub fn parse_obs_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if !s.is_ascii() {
        return None;
    }
    let b = s.as_bytes();
    let (y, m, d) = if b.len() == 8 && b.iter().all(u8::is_ascii_digit) {
        (&s[0..4], &s[4..6], &s[6..8])
    } else if b.len() >= 10 && b[4] == b'-' && b[7] == b'-' {
        (&s[0..4], &s[5..7], &s[8..10])
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

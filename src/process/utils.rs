use std::path::Path;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Round half away from zero to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Pulls the value of a hive `KEY=value` segment out of a path, e.g.
/// `ELEMENT` from `.../YEAR=2020/ELEMENT=SNOW/part-0.parquet`.
pub fn hive_segment<'a>(path: &'a Path, key: &str) -> Option<&'a str> {
    path.components().rev().find_map(|c| {
        let seg = c.as_os_str().to_str()?;
        let (k, v) = seg.split_once('=')?;
        (k.eq_ignore_ascii_case(key)).then_some(v)
    })
}

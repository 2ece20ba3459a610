use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::model::{Priority, Status};

pub mod export;
pub mod import;

/// One validated-or-defaulted task row out of an import file. Ids, positions
/// and `updated_at` are the store's business; `created_at` is kept only when
/// the file carried a parsable timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub status: Status,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Tolerant timestamp parse: RFC 3339 first, then the common bare shapes.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::parse_timestamp;

    #[test]
    fn parses_rfc3339_and_bare_shapes() {
        for raw in [
            "2026-08-23T10:15:30Z",
            "2026-08-23T10:15:30+02:00",
            "2026-08-23T10:15:30.250",
            "2026-08-23 10:15:30",
            "2026-08-23",
        ] {
            assert!(parse_timestamp(raw).is_some(), "should parse: {raw}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "  ", "yesterday", "23/08/2026", "not a date"] {
            assert!(parse_timestamp(raw).is_none(), "should reject: {raw}");
        }
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};

pub fn utcnow() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an ISO-8601 timestamp as emitted by identity services.
///
/// Accepts RFC 3339 (offset or `Z`) and the offset-less form some older
/// services emit, which is taken to be UTC.
pub fn parse_isotime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

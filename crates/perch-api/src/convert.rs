//! Row → API model conversion. The password hash stays behind in the row
//! type; nothing here puts it on the wire.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use perch_db::{MessageRow, UserRow};
use perch_types::models::{Message, User};

/// Parse a stored timestamp. SQLite's `datetime('now')` writes
/// "YYYY-MM-DD HH:MM:SS" without a timezone, so fall back to parsing as
/// naive UTC when the RFC 3339 parse misses.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        email: row.email,
        image_url: row.image_url,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn message(row: MessageRow) -> Message {
    Message {
        id: row.id,
        text: row.text,
        user_id: row.user_id,
        created_at: parse_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_naive_timestamps_as_utc() {
        let ts = parse_timestamp("2024-06-01 12:30:00");
        assert_eq!(ts.to_rfc3339(), "2024-06-01T12:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let ts = parse_timestamp("2024-06-01T12:30:00Z");
        assert_eq!(ts.to_rfc3339(), "2024-06-01T12:30:00+00:00");
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_default() {
        assert_eq!(parse_timestamp("not a date"), DateTime::<Utc>::default());
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use quill_db::models::{PostRow, PostWithVotes, UserRow};
use quill_types::api::{PostOut, PostResponse, UserOut};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC when the value is not RFC 3339.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn user_out(row: UserRow) -> UserOut {
    UserOut {
        id: row.id,
        email: row.email,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn post_response(row: PostRow) -> PostResponse {
    PostResponse {
        title: row.title,
        content: row.content,
        published: row.published,
        id: row.id,
        created_at: parse_timestamp(&row.created_at),
        owner_id: row.owner_id,
        owner: UserOut {
            id: row.owner_id,
            email: row.owner_email,
            created_at: parse_timestamp(&row.owner_created_at),
        },
    }
}

pub(crate) fn post_out(row: PostWithVotes) -> PostOut {
    PostOut {
        post: post_response(row.post),
        votes: row.votes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sqlite_timestamp_is_read_as_utc() {
        let ts = parse_timestamp("2024-07-11 13:14:48");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 7, 11));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (13, 14, 48));
    }

    #[test]
    fn rfc3339_timestamp_is_accepted() {
        let ts = parse_timestamp("2024-07-11T13:14:48Z");
        assert_eq!(ts.hour(), 13);
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }
}

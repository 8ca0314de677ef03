//! Order code and BEO file code sequences.
//!
//! Both generators read existing state and pick the next value, so callers
//! must hold the matching [`KeyedLocks`](crate::locks::KeyedLocks) key
//! (`code_key(prefix)` / `file_key(period)`) for the whole transaction that
//! inserts the generated code.

use crate::entities::{beo_file, beo_file_sequence, event, order};
use crate::errors::ServiceError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

pub const DEFAULT_EVENT_CODE: &str = "EVT";

static EVENT_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("conference", "CNF"),
        ("wedding", "WED"),
        ("exhibition", "EXH"),
        ("seminar", "SMN"),
        ("meeting", "MTG"),
        ("concert", "CON"),
        ("gala dinner", "GLD"),
        ("workshop", "WKS"),
        ("banquet", "BQT"),
        ("festival", "FST"),
        ("sport event", "SPT"),
        ("product launch", "PLC"),
    ])
});

/// Fixed code for an event type. Unknown types get `EVT`.
pub fn event_code_for(event_type: &str) -> &'static str {
    let key = event_type.trim().to_lowercase();
    EVENT_CODES
        .get(key.as_str())
        .copied()
        .unwrap_or(DEFAULT_EVENT_CODE)
}

/// Sequence number of `code` when it is `prefix` followed by a positive decimal number
pub fn parse_sequence(code: &str, prefix: &str) -> Option<u32> {
    let digits = code.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// First positive integer not present in `taken`
pub fn next_sequence(taken: impl IntoIterator<Item = u32>) -> u32 {
    let mut taken: Vec<u32> = taken.into_iter().collect();
    taken.sort_unstable();
    taken.dedup();

    let mut candidate = 1;
    for n in taken {
        if n == candidate {
            candidate += 1;
        } else if n > candidate {
            break;
        }
    }
    candidate
}

pub fn format_custom_code(prefix: &str, sequence: u32) -> String {
    format!("{}{:05}", prefix, sequence)
}

/// Generates the next free `custom_code` for orders of `event_id`.
///
/// Every live order carrying the event's prefix is considered and the lowest
/// free number is used, so the code of a soft-deleted order is handed out again.
#[instrument(skip(db))]
pub async fn generate_custom_code<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
) -> Result<String, ServiceError> {
    let event = event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))?;

    let prefix = event.code.as_str();
    let existing: Vec<String> = order::Entity::find()
        .select_only()
        .column(order::Column::CustomCode)
        .filter(order::Column::CustomCode.starts_with(prefix))
        .filter(order::Column::DeletedAt.is_null())
        .into_tuple()
        .all(db)
        .await?;

    let mut malformed = 0usize;
    let taken: Vec<u32> = existing
        .iter()
        .filter_map(|code| {
            let parsed = parse_sequence(code, prefix);
            if parsed.is_none() {
                malformed += 1;
            }
            parsed
        })
        .collect();
    if malformed > 0 {
        warn!(prefix, malformed, "Ignoring custom codes that do not parse");
    }

    let code = format_custom_code(prefix, next_sequence(taken));
    debug!(event_id, code = %code, "Generated custom code");
    Ok(code)
}

/// `YYYY-MM` key of the month `now` falls in
pub fn file_period(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

pub fn format_file_code(sequence: i32, office: &str, now: DateTime<Utc>) -> String {
    format!(
        "BEO-{:03}/{}/{:02}/{:04}",
        sequence,
        office,
        now.month(),
        now.year()
    )
}

fn month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    match (
        start.and_then(|d| d.and_hms_opt(0, 0, 0)),
        end.and_then(|d| d.and_hms_opt(0, 0, 0)),
    ) {
        (Some(s), Some(e)) => Ok((s.and_utc(), e.and_utc())),
        _ => Err(ServiceError::InternalError(format!(
            "Cannot compute month bounds for {}",
            now
        ))),
    }
}

/// Allocates the next file code for the month of `now`.
///
/// The per-month counter row is seeded, on first use, from the number of
/// file rows already created that month, then incremented on every call.
#[instrument(skip(db))]
pub async fn generate_file_code<C: ConnectionTrait>(
    db: &C,
    office: &str,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let period = file_period(now);

    let next = match beo_file_sequence::Entity::find_by_id(period.clone())
        .one(db)
        .await?
    {
        Some(row) => {
            let next = row.last_value + 1;
            let mut active: beo_file_sequence::ActiveModel = row.into();
            active.last_value = Set(next);
            active.update(db).await?;
            next
        }
        None => {
            let (start, end) = month_bounds(now)?;
            let issued = beo_file::Entity::find()
                .filter(beo_file::Column::CreatedAt.gte(start))
                .filter(beo_file::Column::CreatedAt.lt(end))
                .count(db)
                .await?;
            let next = i32::try_from(issued)
                .map_err(|_| ServiceError::InternalError("File sequence overflow".into()))?
                + 1;
            beo_file_sequence::ActiveModel {
                period: Set(period.clone()),
                last_value: Set(next),
            }
            .insert(db)
            .await?;
            next
        }
    };

    Ok(format_file_code(next, office, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn known_event_types_map_case_insensitively() {
        assert_eq!(event_code_for("conference"), "CNF");
        assert_eq!(event_code_for("  Conference "), "CNF");
        assert_eq!(event_code_for("GALA DINNER"), "GLD");
        assert_eq!(event_code_for("wedding"), "WED");
    }

    #[test]
    fn unknown_event_types_default_to_evt() {
        assert_eq!(event_code_for("birthday party"), "EVT");
        assert_eq!(event_code_for(""), "EVT");
    }

    #[test]
    fn parse_sequence_rejects_malformed_codes() {
        assert_eq!(parse_sequence("CNF00042", "CNF"), Some(42));
        assert_eq!(parse_sequence("CNF00000", "CNF"), None);
        assert_eq!(parse_sequence("CNF", "CNF"), None);
        assert_eq!(parse_sequence("CNF12A45", "CNF"), None);
        assert_eq!(parse_sequence("CNF-0001", "CNF"), None);
        assert_eq!(parse_sequence("WED00001", "CNF"), None);
        assert_eq!(parse_sequence("CNF+0001", "CNF"), None);
    }

    #[test]
    fn next_sequence_fills_first_gap() {
        assert_eq!(next_sequence(vec![]), 1);
        assert_eq!(next_sequence(vec![1, 2, 3]), 4);
        assert_eq!(next_sequence(vec![2, 3]), 1);
        assert_eq!(next_sequence(vec![1, 2, 4, 5]), 3);
        assert_eq!(next_sequence(vec![5, 1, 3, 2]), 4);
        assert_eq!(next_sequence(vec![1, 1, 2, 2]), 3);
    }

    #[test]
    fn custom_code_is_five_digit_padded() {
        assert_eq!(format_custom_code("CNF", 1), "CNF00001");
        assert_eq!(format_custom_code("EVT", 12345), "EVT12345");
    }

    #[test]
    fn file_code_embeds_month_and_year() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();
        assert_eq!(
            format_file_code(7, "PPKGBK/JICC", now),
            "BEO-007/PPKGBK/JICC/03/2025"
        );
        assert_eq!(file_period(now), "2025-03");
    }

    #[test]
    fn december_bounds_roll_into_next_year() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_bounds(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    proptest! {
        #[test]
        fn next_sequence_is_smallest_free_number(taken in proptest::collection::vec(1u32..64, 0..40)) {
            let next = next_sequence(taken.clone());
            prop_assert!(next >= 1);
            prop_assert!(!taken.contains(&next));
            for n in 1..next {
                prop_assert!(taken.contains(&n));
            }
        }
    }
}

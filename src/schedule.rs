use std::env;

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc,
};
use serde::Serialize;

pub const OPEN_HOUR: i64 = 8;
pub const CLOSE_HOUR: i64 = 18;
pub const SLOT_INTERVAL_MINUTES: i64 = 30;
// A prospective booking is assumed to take an hour when filtering slots.
pub const PROSPECTIVE_BOOKING_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    Global,
    PerDog,
}

impl ConflictScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "global" => Some(Self::Global),
            "per-dog" | "per_dog" => Some(Self::PerDog),
            _ => None,
        }
    }

    pub fn conflict_note(self) -> &'static str {
        match self {
            Self::Global => "Time slot overlaps with another appointment",
            Self::PerDog => "Time slot overlaps with another appointment for this dog",
        }
    }
}

#[derive(Clone)]
pub struct SchedulePolicy {
    pub scope: ConflictScope,
    pub offset: FixedOffset,
}

impl SchedulePolicy {
    pub fn from_env() -> Self {
        let scope = match env::var("CONFLICT_SCOPE") {
            Ok(value) => match ConflictScope::parse(&value) {
                Some(scope) => scope,
                None => {
                    log::warn!("Unknown CONFLICT_SCOPE '{value}'. Falling back to global.");
                    ConflictScope::Global
                }
            },
            Err(_) => ConflictScope::Global,
        };

        let minutes: i32 = env::var("BUSINESS_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        let offset = FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| {
            log::warn!("BUSINESS_UTC_OFFSET_MINUTES {minutes} out of range. Using UTC.");
            Utc.fix()
        });

        Self { scope, offset }
    }
}

// Half-open intervals: an appointment ending at 11:00 does not collide
// with one starting at 11:00.
pub fn overlaps(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_a < end_b && start_b < end_a
}

#[derive(Debug, Clone)]
pub struct BookedInterval {
    pub id: String,
    pub dog_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl BookedInterval {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(self.duration_minutes)
    }
}

pub fn find_conflict<'a>(
    starts_at: DateTime<Utc>,
    duration_minutes: i64,
    dog_id: &str,
    others: &'a [BookedInterval],
    scope: ConflictScope,
) -> Option<&'a BookedInterval> {
    let ends_at = starts_at + Duration::minutes(duration_minutes);
    others.iter().find(|other| {
        if scope == ConflictScope::PerDog && other.dog_id != dog_id {
            return false;
        }
        overlaps(starts_at, ends_at, other.starts_at, other.ends_at())
    })
}

#[derive(Debug, Clone)]
pub struct ConflictAnnotation {
    pub flag: bool,
    pub note: Option<&'static str>,
}

// Advisory only: a detected overlap marks the record, it never blocks the write.
pub fn annotate(
    starts_at: DateTime<Utc>,
    duration_minutes: i64,
    dog_id: &str,
    others: &[BookedInterval],
    scope: ConflictScope,
) -> ConflictAnnotation {
    match find_conflict(starts_at, duration_minutes, dog_id, others, scope) {
        Some(other) => {
            log::debug!("Booking at {starts_at} overlaps appointment {}", other.id);
            ConflictAnnotation {
                flag: true,
                note: Some(scope.conflict_note()),
            }
        }
        None => ConflictAnnotation {
            flag: false,
            note: None,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub starts_at: String,
    pub time: String,
    pub display: String,
}

pub fn available_slots(
    date: NaiveDate,
    booked: &[BookedInterval],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<TimeSlot> {
    let open = date.and_time(NaiveTime::MIN) + Duration::hours(OPEN_HOUR);
    let close = date.and_time(NaiveTime::MIN) + Duration::hours(CLOSE_HOUR);

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor < close {
        let local = match offset.from_local_datetime(&cursor).single() {
            Some(local) => local,
            None => {
                cursor += Duration::minutes(SLOT_INTERVAL_MINUTES);
                continue;
            }
        };
        let start = local.with_timezone(&Utc);
        let end = start + Duration::minutes(PROSPECTIVE_BOOKING_MINUTES);

        let in_past = start <= now;
        let taken = booked
            .iter()
            .any(|other| overlaps(start, end, other.starts_at, other.ends_at()));
        if !in_past && !taken {
            slots.push(TimeSlot {
                starts_at: format_timestamp(start),
                time: local.format("%H:%M").to_string(),
                display: local.format("%-I:%M %p").to_string(),
            });
        }

        cursor += Duration::minutes(SLOT_INTERVAL_MINUTES);
    }
    slots
}

pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (String, String) {
    let midnight = date.and_time(NaiveTime::MIN);
    let start = offset
        .from_local_datetime(&midnight)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
    let end = start + Duration::days(1);
    (format_timestamp(start), format_timestamp(end))
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

//! Attendance maps: composite keys, normalization, counts, optimistic writes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{AttendancePayload, AttendanceRecord, ScheduleEntry};

pub const NO_SCHEDULE: &str = "no-schedule";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    /// Late.
    Retard,
    /// Pending, `en_attente` on the wire.
    Att,
}

impl AttendanceStatus {
    /// Accepts the backend spelling as well as the short forms the screens
    /// use, in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "retard" => Some(AttendanceStatus::Retard),
            "att" | "en_attente" | "pending" => Some(AttendanceStatus::Att),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Retard => "retard",
            AttendanceStatus::Att => "en_attente",
        }
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AttendanceStatus::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown attendance status {:?}", raw)))
    }
}

/// `(date, subject, schedule)`; rendered as `{date}-{subject}-{schedule|no-schedule}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttendanceKey {
    pub date: NaiveDate,
    pub subject_id: i64,
    pub schedule_id: Option<i64>,
}

impl AttendanceKey {
    pub fn new(date: NaiveDate, subject_id: i64, schedule_id: Option<i64>) -> Self {
        Self {
            date,
            subject_id,
            schedule_id,
        }
    }
}

impl fmt::Display for AttendanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-", self.date.format("%Y-%m-%d"), self.subject_id)?;
        match self.schedule_id {
            Some(id) => write!(f, "{}", id),
            None => f.write_str(NO_SCHEDULE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid attendance key: {0}")]
pub struct ParseKeyError(pub String);

impl FromStr for AttendanceKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseKeyError(s.to_string());
        // The date itself contains two dashes.
        let date = s.get(..10).ok_or_else(err)?;
        let rest = s.get(10..).and_then(|r| r.strip_prefix('-')).ok_or_else(err)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| err())?;
        let (subject, schedule) = rest.split_once('-').ok_or_else(err)?;
        let subject_id = subject.parse().map_err(|_| err())?;
        let schedule_id = match schedule {
            NO_SCHEDULE => None,
            other => Some(other.parse().map_err(|_| err())?),
        };
        Ok(Self::new(date, subject_id, schedule_id))
    }
}

impl Serialize for AttendanceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttendanceKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub type AttendanceMap = BTreeMap<AttendanceKey, AttendanceStatus>;

/// Subject taught in each schedule entry. Student listings and pushes only
/// name the schedule, so the subject half of the key comes from here.
pub type SubjectIndex = HashMap<i64, i64>;

pub fn subject_index(entries: &[ScheduleEntry]) -> SubjectIndex {
    entries
        .iter()
        .filter_map(|e| e.subject.id().map(|subject| (e.id, subject)))
        .collect()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Key and status of one flat row, or `None` when a required field is
/// missing or unrecognised. A row without a subject borrows it from its
/// schedule.
pub fn normalize_record(
    record: &AttendanceRecord,
    subjects: &SubjectIndex,
) -> Option<(AttendanceKey, AttendanceStatus)> {
    let date = parse_date(record.date.as_deref()?)?;
    let schedule_id = record.schedule.id();
    let subject_id = record
        .subject
        .id()
        .or_else(|| schedule_id.and_then(|id| subjects.get(&id).copied()))?;
    let status = AttendanceStatus::parse(record.status.as_deref()?)?;
    Some((AttendanceKey::new(date, subject_id, schedule_id), status))
}

/// Reads a listing key. Teacher listings use the full
/// `{date}-{subject}-{schedule}` form; student listings use
/// `{date}-{schedule}` and need the index for the subject.
pub fn parse_listing_key(raw: &str, subjects: &SubjectIndex) -> Option<AttendanceKey> {
    if let Ok(key) = raw.parse::<AttendanceKey>() {
        return Some(key);
    }
    let date = parse_date(raw.get(..10)?)?;
    let schedule_id: i64 = raw.get(10..)?.strip_prefix('-')?.parse().ok()?;
    let subject_id = *subjects.get(&schedule_id)?;
    Some(AttendanceKey::new(date, subject_id, Some(schedule_id)))
}

/// Builds the keyed map from either listing shape. Bad rows are skipped;
/// duplicate keys keep the last row.
pub fn normalize_records(payload: &AttendancePayload, subjects: &SubjectIndex) -> AttendanceMap {
    let mut map = AttendanceMap::new();
    match payload {
        AttendancePayload::List(records) => {
            for record in records {
                match normalize_record(record, subjects) {
                    Some((key, status)) => {
                        map.insert(key, status);
                    }
                    None => debug!("skipping malformed attendance record {:?}", record.id),
                }
            }
        }
        AttendancePayload::Keyed(entries) => {
            for (key, status) in entries {
                match (parse_listing_key(key, subjects), AttendanceStatus::parse(status)) {
                    (Some(key), Some(status)) => {
                        map.insert(key, status);
                    }
                    _ => debug!("skipping malformed attendance entry {}", key),
                }
            }
        }
    }
    map
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub retard: usize,
    pub att: usize,
    pub total: usize,
    pub percentage: u32,
}

pub fn summarize<'a, I>(statuses: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a AttendanceStatus>,
{
    let mut summary = AttendanceSummary::default();
    for status in statuses {
        match status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Retard => summary.retard += 1,
            AttendanceStatus::Att => summary.att += 1,
        }
        summary.total += 1;
    }
    summary.percentage = percentage(summary.present, summary.total);
    summary
}

pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

/// Handle for a speculative write, used to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: AttendanceKey,
    pub previous: Option<AttendanceStatus>,
    pub written: AttendanceStatus,
}

/// One attendee's statuses. All mutation goes through upserts by key, and
/// the summary is always recomputed from the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceBook {
    records: AttendanceMap,
}

impl AttendanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &AttendanceMap {
        &self.records
    }

    pub fn status(&self, key: &AttendanceKey) -> Option<AttendanceStatus> {
        self.records.get(key).copied()
    }

    pub fn contains(&self, key: &AttendanceKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn upsert(&mut self, key: AttendanceKey, status: AttendanceStatus) -> Option<AttendanceStatus> {
        self.records.insert(key, status)
    }

    pub fn remove(&mut self, key: &AttendanceKey) -> Option<AttendanceStatus> {
        self.records.remove(key)
    }

    pub fn replace_all(&mut self, records: AttendanceMap) {
        self.records = records;
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn summary(&self) -> AttendanceSummary {
        summarize(self.records.values())
    }

    pub fn apply_speculative(&mut self, key: AttendanceKey, status: AttendanceStatus) -> PendingWrite {
        let previous = self.upsert(key, status);
        PendingWrite {
            key,
            previous,
            written: status,
        }
    }

    /// Puts back whatever the key held before `pending` was applied. A key
    /// that has since been overwritten by someone else is left alone.
    pub fn rollback(&mut self, pending: &PendingWrite) -> bool {
        if self.status(&pending.key) != Some(pending.written) {
            return false;
        }
        match pending.previous {
            Some(prior) => {
                self.records.insert(pending.key, prior);
            }
            None => {
                self.records.remove(&pending.key);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(day: u32) -> AttendanceKey {
        AttendanceKey::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), 5, Some(3))
    }

    #[test]
    fn key_round_trips_through_text() {
        let k = key(9);
        assert_eq!(k.to_string(), "2024-01-09-5-3");
        assert_eq!("2024-01-09-5-3".parse::<AttendanceKey>(), Ok(k));

        let bare = AttendanceKey::new(k.date, 5, None);
        assert_eq!("2024-01-09-5-no-schedule".parse::<AttendanceKey>(), Ok(bare));
        assert!("2024-01-09".parse::<AttendanceKey>().is_err());
        assert!("2024-13-09-5-3".parse::<AttendanceKey>().is_err());
    }

    #[test]
    fn status_accepts_backend_spellings() {
        assert_eq!(AttendanceStatus::parse("en_attente"), Some(AttendanceStatus::Att));
        assert_eq!(AttendanceStatus::parse("att"), Some(AttendanceStatus::Att));
        assert_eq!(AttendanceStatus::parse("excused"), None);
        assert_eq!(AttendanceStatus::Att.as_wire(), "en_attente");
    }

    #[test]
    fn status_deserializes_through_parse() {
        for raw in ["\"pending\"", "\"en_attente\"", "\"att\"", "\"ATT\""] {
            let status: AttendanceStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, AttendanceStatus::Att, "{raw}");
        }
        let late: AttendanceStatus = serde_json::from_str("\"RETARD\"").unwrap();
        assert_eq!(late, AttendanceStatus::Retard);
        assert!(serde_json::from_str::<AttendanceStatus>("\"excused\"").is_err());
    }

    #[test]
    fn key_error_names_the_input() {
        let err = "nope".parse::<AttendanceKey>().unwrap_err();
        assert_eq!(err.to_string(), "invalid attendance key: nope");
    }

    #[test]
    fn student_listing_keys_borrow_the_subject() {
        let subjects = SubjectIndex::from([(9, 5)]);
        let key = parse_listing_key("2024-01-01-9", &subjects).expect("known schedule");
        assert_eq!(key.to_string(), "2024-01-01-5-9");
        assert_eq!(parse_listing_key("2024-01-01-4", &subjects), None);
        assert_eq!(
            parse_listing_key("2024-01-01-5-no-schedule", &subjects).map(|k| k.subject_id),
            Some(5)
        );
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn rollback_skips_keys_overwritten_since() {
        let mut book = AttendanceBook::new();
        let pending = book.apply_speculative(key(1), AttendanceStatus::Present);
        book.upsert(key(1), AttendanceStatus::Retard);

        assert!(!book.rollback(&pending));
        assert_eq!(book.status(&key(1)), Some(AttendanceStatus::Retard));
    }
}

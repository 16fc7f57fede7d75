use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::attendance::{AttendanceKey, AttendanceStatus};
use crate::models::{AttendancePayload, AttendanceRecord, Attendee};

/// Body for creating or updating one attendance row.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceWrite {
    pub attendee: Attendee,
    pub key: AttendanceKey,
    pub status: AttendanceStatus,
}

impl AttendanceWrite {
    pub fn to_body(&self) -> Value {
        let date = self.key.date.format("%Y-%m-%d").to_string();
        match self.attendee {
            Attendee::Teacher(id) => serde_json::json!({
                "teacher": id,
                "subject": self.key.subject_id,
                "schedule": self.key.schedule_id,
                "date": date,
                "status": self.status.as_wire(),
            }),
            // The student endpoint upserts on (student, schedule, date).
            Attendee::Student(id) => serde_json::json!({
                "student_id": id,
                "schedule_id": self.key.schedule_id,
                "date": date,
                "status": self.status.as_wire(),
            }),
        }
    }
}

/// Id of the listed row stored at `key`, if there is one.
pub fn matching_record_id(rows: &[AttendanceRecord], key: &AttendanceKey) -> Option<i64> {
    let date = key.date.format("%Y-%m-%d").to_string();
    rows.iter()
        .find(|row| {
            row.subject.id() == Some(key.subject_id)
                && row.schedule.id() == key.schedule_id
                && row.date.as_deref().map(str::trim) == Some(date.as_str())
        })
        .and_then(|row| row.id)
}

/// Parses every element of a JSON array on its own, dropping the ones that
/// do not fit. Anything other than an array is treated as an empty list.
pub fn parse_list<T: DeserializeOwned>(what: &str, body: Value) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            warn!("expected a list of {} but got {}", what, kind_of(&other));
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Failed to parse {}: {}", what, e);
                None
            }
        })
        .collect()
}

/// Attendance listings may be rows or a `key -> status` object.
pub fn parse_attendance(body: Value) -> AttendancePayload {
    match body {
        Value::Object(entries) => AttendancePayload::Keyed(
            entries
                .into_iter()
                .filter_map(|(key, status)| match status {
                    Value::String(status) => Some((key, status)),
                    _ => None,
                })
                .collect(),
        ),
        other => AttendancePayload::List(parse_list::<AttendanceRecord>("attendance record", other)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleEntry;
    use chrono::NaiveDate;

    #[test]
    fn write_body_names_the_attendee() {
        let write = AttendanceWrite {
            attendee: Attendee::Teacher(4),
            key: AttendanceKey::new(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(), 3, None),
            status: AttendanceStatus::Att,
        };
        let body = write.to_body();
        assert_eq!(body["teacher"], 4);
        assert_eq!(body["schedule"], Value::Null);
        assert_eq!(body["date"], "2024-02-05");
        assert_eq!(body["status"], "en_attente");
        assert!(body.get("student_id").is_none());
    }

    #[test]
    fn student_body_uses_the_add_route_fields() {
        let write = AttendanceWrite {
            attendee: Attendee::Student(8),
            key: AttendanceKey::new(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(), 3, Some(9)),
            status: AttendanceStatus::Absent,
        };
        let body = write.to_body();
        assert_eq!(
            body,
            serde_json::json!({
                "student_id": 8,
                "schedule_id": 9,
                "date": "2024-02-05",
                "status": "absent",
            })
        );
    }

    #[test]
    fn record_id_needs_every_key_part() {
        let rows: Vec<AttendanceRecord> = serde_json::from_value(serde_json::json!([
            {"id": 1, "date": "2024-02-05", "subject": 3, "schedule": 9, "status": "present"},
            {"id": 2, "date": "2024-02-05", "subject": 3, "schedule": null, "status": "absent"},
        ]))
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        assert_eq!(matching_record_id(&rows, &AttendanceKey::new(date, 3, Some(9))), Some(1));
        assert_eq!(matching_record_id(&rows, &AttendanceKey::new(date, 3, None)), Some(2));
        assert_eq!(matching_record_id(&rows, &AttendanceKey::new(date, 4, None)), None);
    }

    #[test]
    fn list_parsing_drops_bad_rows() {
        let body = serde_json::json!([
            {"id": 1, "day": "MON", "start_time": "08:00", "end_time": "10:00"},
            {"day": "TUE"},
        ]);
        let entries: Vec<ScheduleEntry> = parse_list("schedule", body);
        assert_eq!(entries.len(), 1);

        let none: Vec<ScheduleEntry> = parse_list("schedule", serde_json::json!({"detail": "x"}));
        assert!(none.is_empty());
    }

    #[test]
    fn keyed_attendance_is_recognised() {
        let payload = parse_attendance(serde_json::json!({"2024-01-01-5-no-schedule": "present"}));
        match payload {
            AttendancePayload::Keyed(map) => assert_eq!(map.len(), 1),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}

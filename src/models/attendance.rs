use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Ref;

/// A flat attendance row as listed by the backend.
///
/// Every field is optional on the wire; rows that are missing what the
/// composite key needs are dropped during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub subject: Ref,
    #[serde(default)]
    pub schedule: Ref,
    #[serde(default)]
    pub status: Option<String>,
}

/// Attendance listings come back either as rows or as an already keyed map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttendancePayload {
    List(Vec<AttendanceRecord>),
    Keyed(HashMap<String, String>),
}

impl Default for AttendancePayload {
    fn default() -> Self {
        AttendancePayload::List(Vec::new())
    }
}

/// Whose attendance is being tracked. Teachers and students live behind
/// different backend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Attendee {
    Teacher(i64),
    Student(i64),
}

impl Attendee {
    pub fn id(&self) -> i64 {
        match self {
            Attendee::Teacher(id) | Attendee::Student(id) => *id,
        }
    }
}

/// Filters for looking up existing attendance rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceQuery {
    pub date: Option<chrono::NaiveDate>,
    pub subject: Option<i64>,
    pub schedule: Option<i64>,
}

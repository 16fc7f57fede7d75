use serde::{Deserialize, Serialize};

use super::Ref;

/// One row of a timetable as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub subject: Ref,
    /// Student-side listings spell this `Teacher`.
    #[serde(default, alias = "Teacher")]
    pub teacher: Ref,
    #[serde(default)]
    pub classe: Ref,
    #[serde(default)]
    pub level: Ref,
    #[serde(default)]
    pub room: Ref,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduleRequest {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub subject: i64,
    pub teacher: i64,
    pub classe: Option<i64>,
    pub level: Option<i64>,
    pub room: Option<i64>,
    pub notes: Option<String>,
}

/// Whose timetable to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ScheduleScope {
    Level(i64),
    Teacher(i64),
    Student(i64),
}

impl ScheduleScope {
    pub fn parse(scope: &str, id: i64) -> Option<Self> {
        match scope {
            "level" | "levels" => Some(ScheduleScope::Level(id)),
            "teacher" | "teachers" => Some(ScheduleScope::Teacher(id)),
            "student" | "students" => Some(ScheduleScope::Student(id)),
            _ => None,
        }
    }
}

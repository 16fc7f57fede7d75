//! Attendance push updates.
//!
//! Frames arrive as JSON text on a channel; whatever carries them (a socket
//! relay, the `/attendance/push` route) only forwards the text.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::attendance::{AttendanceStatus, NO_SCHEDULE};
use crate::board::AttendanceBoard;
use crate::models::{Attendee, Ref};

const UPDATE_TYPE: &str = "attendance_update";

/// One pushed status. Teacher frames name the subject; student frames only
/// name the schedule, and the board fills the subject in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceUpdate {
    pub attendee: Attendee,
    pub date: NaiveDate,
    pub subject_id: Option<i64>,
    /// `None` only for the explicit `no-schedule` sentinel.
    pub schedule_id: Option<i64>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PushFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    teacher_id: Ref,
    student_id: Ref,
    subject_id: Ref,
    schedule_id: Option<Ref>,
    date: Option<String>,
    status: Option<String>,
}

impl AttendanceUpdate {
    /// `None` for anything that is not a complete attendance update.
    pub fn parse(text: &str) -> Option<Self> {
        let frame: PushFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("dropping unparsable push frame: {}", e);
                return None;
            }
        };

        if frame.kind.as_deref() != Some(UPDATE_TYPE) {
            debug!("ignoring push frame of type {:?}", frame.kind);
            return None;
        }

        let attendee = match (frame.teacher_id.id(), frame.student_id.id()) {
            (Some(id), _) => Attendee::Teacher(id),
            (None, Some(id)) => Attendee::Student(id),
            (None, None) => {
                debug!("dropping push frame without an attendee");
                return None;
            }
        };

        let schedule_id = match &frame.schedule_id {
            Some(Ref::Text(text)) if text.trim() == NO_SCHEDULE => None,
            Some(reference) => match reference.id() {
                Some(id) => Some(id),
                None => {
                    debug!("dropping push frame with a bad schedule");
                    return None;
                }
            },
            None => {
                debug!("dropping push frame without a schedule");
                return None;
            }
        };
        let subject_id = frame.subject_id.id();
        if subject_id.is_none() && schedule_id.is_none() {
            debug!("dropping push frame with neither subject nor schedule");
            return None;
        }
        let Some(date) = frame
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        else {
            debug!("dropping push frame with a missing or bad date");
            return None;
        };
        let Some(status) = frame.status.as_deref().and_then(AttendanceStatus::parse) else {
            debug!("dropping push frame with a missing or unknown status");
            return None;
        };

        Some(Self {
            attendee,
            date,
            subject_id,
            schedule_id,
            status,
        })
    }
}

pub struct PushListener {
    board: Arc<Mutex<AttendanceBoard>>,
}

impl PushListener {
    pub fn new(board: Arc<Mutex<AttendanceBoard>>) -> Self {
        Self { board }
    }

    /// Applies one frame. Returns whether the board changed.
    pub async fn handle_frame(&self, text: &str) -> bool {
        match AttendanceUpdate::parse(text) {
            Some(update) => self.board.lock().await.apply_push(&update),
            None => false,
        }
    }

    pub async fn run(self, mut frames: mpsc::Receiver<String>) {
        info!("Listening for attendance push updates");
        while let Some(frame) = frames.recv().await {
            if self.handle_frame(&frame).await {
                debug!("applied attendance push update");
            }
        }
        info!("Attendance push channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_teacher_update() {
        let update = AttendanceUpdate::parse(
            r#"{"type":"attendance_update","teacherId":3,"subjectId":5,"scheduleId":9,"date":"2024-01-01","status":"retard"}"#,
        )
        .expect("valid frame");
        assert_eq!(update.attendee, Attendee::Teacher(3));
        assert_eq!(update.subject_id, Some(5));
        assert_eq!(update.schedule_id, Some(9));
        assert_eq!(update.status, AttendanceStatus::Retard);
    }

    #[test]
    fn parses_the_student_frame_the_backend_sends() {
        let update = AttendanceUpdate::parse(
            r#"{"type": "attendance_update", "studentId": 12, "scheduleId": 9, "date": "2024-01-01", "status": "present"}"#,
        )
        .expect("valid frame");
        assert_eq!(update.attendee, Attendee::Student(12));
        assert_eq!(update.subject_id, None);
        assert_eq!(update.schedule_id, Some(9));
        assert_eq!(update.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(update.status, AttendanceStatus::Present);
    }

    #[test]
    fn sentinel_schedule_means_none() {
        let update = AttendanceUpdate::parse(
            r#"{"type":"attendance_update","teacherId":"12","subjectId":{"id":5},"scheduleId":"no-schedule","date":"2024-01-01","status":"present"}"#,
        )
        .expect("valid frame");
        assert_eq!(update.attendee, Attendee::Teacher(12));
        assert_eq!(update.subject_id, Some(5));
        assert_eq!(update.schedule_id, None);
    }

    #[test]
    fn drops_incomplete_frames() {
        for text in [
            "not json",
            r#"{"type":"ping"}"#,
            r#"{"type":"attendance_update","subjectId":5,"scheduleId":9,"date":"2024-01-01","status":"present"}"#,
            r#"{"type":"attendance_update","teacherId":3,"subjectId":5,"date":"2024-01-01","status":"present"}"#,
            r#"{"type":"attendance_update","studentId":3,"scheduleId":"no-schedule","date":"2024-01-01","status":"present"}"#,
            r#"{"type":"attendance_update","teacherId":3,"subjectId":5,"scheduleId":9,"status":"present"}"#,
            r#"{"type":"attendance_update","teacherId":3,"subjectId":5,"scheduleId":9,"date":"2024-01-01","status":"gone"}"#,
        ] {
            assert_eq!(AttendanceUpdate::parse(text), None, "{text}");
        }
    }
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use schoolboard::board::AttendanceBoard;
use schoolboard::error::AppError;
use schoolboard::attendance::AttendanceKey;
use schoolboard::models::{
    AttendancePayload, AttendanceRecord, Attendee, GradeRecord, GradeValue, NewGradeRequest,
    NewScheduleRequest, Person, Ref, ScheduleEntry, ScheduleScope,
};
use schoolboard::preferences::MemoryPreferenceStore;
use schoolboard::schedule::SlotGrid;
use schoolboard::school_api::dto::matching_record_id;
use schoolboard::school_api::{AttendanceWrite, SchoolApi};
use schoolboard::services::AttendanceService;
use schoolboard::state::AppState;

/// In-memory stand-in for the school backend.
#[derive(Default)]
pub struct FakeSchoolApi {
    pub schedules: Mutex<Vec<ScheduleEntry>>,
    pub attendance: Mutex<Vec<(Attendee, AttendanceRecord)>>,
    pub grades: Mutex<Vec<GradeRecord>>,
    pub teachers: Mutex<Vec<Person>>,
    pub students: Mutex<Vec<Person>>,
    pub fail_writes: AtomicBool,
    /// Serve student listings the way the student backend does, as a
    /// `{date}-{schedule}` keyed map.
    pub keyed_student_listing: AtomicBool,
    pub fetch_delays: Mutex<HashMap<Attendee, Duration>>,
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl FakeSchoolApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.next_id.store(1000, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_fetch(&self, attendee: Attendee, delay: Duration) {
        self.fetch_delays.lock().unwrap().insert(attendee, delay);
    }

    pub fn seed_attendance(&self, attendee: Attendee, id: i64, date: &str, subject: i64, schedule: Option<i64>, status: &str) {
        self.attendance.lock().unwrap().push((
            attendee,
            AttendanceRecord {
                id: Some(id),
                date: Some(date.to_string()),
                subject: Ref::Id(subject),
                schedule: schedule.into(),
                status: Some(status.to_string()),
            },
        ));
    }

    pub fn seed_grade(&self, id: i64, student: i64, subject: i64, grade: f64) {
        self.grades.lock().unwrap().push(GradeRecord {
            id,
            student: Ref::Id(student),
            subject: Ref::Id(subject),
            grade: GradeValue::new(grade).expect("grade in range"),
            grade_type: None,
            date_g: None,
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(AppError::upstream(500, ""))
        } else {
            Ok(())
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn rows_of(&self, attendee: Attendee) -> Vec<AttendanceRecord> {
        self.attendance
            .lock()
            .unwrap()
            .iter()
            .filter(|(who, _)| *who == attendee)
            .map(|(_, row)| row.clone())
            .collect()
    }

    fn listing(&self, attendee: Attendee) -> AttendancePayload {
        let rows = self.rows_of(attendee);
        if matches!(attendee, Attendee::Student(_)) && self.keyed_student_listing.load(Ordering::SeqCst) {
            let keyed = rows
                .iter()
                .filter_map(|row| {
                    let key = format!("{}-{}", row.date.as_deref()?, row.schedule.id()?);
                    Some((key, row.status.clone()?))
                })
                .collect();
            AttendancePayload::Keyed(keyed)
        } else {
            AttendancePayload::List(rows)
        }
    }

    fn record_id_at(&self, attendee: Attendee, key: &AttendanceKey) -> Option<i64> {
        matching_record_id(&self.rows_of(attendee), key)
    }
}

fn belongs_to(entry: &ScheduleEntry, scope: ScheduleScope) -> bool {
    match scope {
        ScheduleScope::Level(id) => entry.level.id() == Some(id),
        ScheduleScope::Teacher(id) => entry.teacher.id() == Some(id),
        ScheduleScope::Student(_) => true,
    }
}

#[async_trait]
impl SchoolApi for FakeSchoolApi {
    async fn fetch_teachers(&self) -> Result<Vec<Person>, AppError> {
        Ok(self.teachers.lock().unwrap().clone())
    }

    async fn fetch_students(&self) -> Result<Vec<Person>, AppError> {
        Ok(self.students.lock().unwrap().clone())
    }

    async fn fetch_schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, AppError> {
        Ok(self
            .schedules
            .lock()
            .unwrap()
            .iter()
            .filter(|e| belongs_to(e, scope))
            .cloned()
            .collect())
    }

    async fn create_schedule(&self, req: &NewScheduleRequest) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("create_schedule {} {}", req.day, req.start_time));
        let entry = ScheduleEntry {
            id: self.next_id(),
            day: req.day.clone(),
            start_time: req.start_time.clone(),
            end_time: req.end_time.clone(),
            subject: Ref::Id(req.subject),
            teacher: Ref::Id(req.teacher),
            classe: req.classe.into(),
            level: req.level.into(),
            room: req.room.into(),
            notes: req.notes.clone(),
        };
        self.schedules.lock().unwrap().push(entry);
        Ok(())
    }

    async fn update_schedule(&self, id: i64, req: &NewScheduleRequest) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("update_schedule {}", id));
        let mut schedules = self.schedules.lock().unwrap();
        let entry = schedules.iter_mut().find(|e| e.id == id).ok_or(AppError::NotFound)?;
        entry.day = req.day.clone();
        entry.start_time = req.start_time.clone();
        entry.end_time = req.end_time.clone();
        Ok(())
    }

    async fn delete_schedule(&self, id: i64) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("delete_schedule {}", id));
        self.schedules.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }

    async fn fetch_attendance(&self, attendee: Attendee) -> Result<AttendancePayload, AppError> {
        let delay = self.fetch_delays.lock().unwrap().get(&attendee).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.listing(attendee))
    }

    async fn save_attendance(&self, write: &AttendanceWrite) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("save_attendance {}", write.key));
        match self.record_id_at(write.attendee, &write.key) {
            Some(record_id) => {
                let mut rows = self.attendance.lock().unwrap();
                if let Some((_, row)) = rows.iter_mut().find(|(_, row)| row.id == Some(record_id)) {
                    row.status = Some(write.status.as_wire().to_string());
                }
            }
            None => {
                let id = self.next_id();
                self.seed_attendance(
                    write.attendee,
                    id,
                    &write.key.date.format("%Y-%m-%d").to_string(),
                    write.key.subject_id,
                    write.key.schedule_id,
                    write.status.as_wire(),
                );
            }
        }
        Ok(())
    }

    async fn delete_attendance(&self, attendee: Attendee, key: &AttendanceKey) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("delete_attendance {:?} {}", attendee, key));
        let record_id = self.record_id_at(attendee, key).ok_or(AppError::NotFound)?;
        self.attendance
            .lock()
            .unwrap()
            .retain(|(_, row)| row.id != Some(record_id));
        Ok(())
    }

    async fn fetch_grades(&self, student_id: i64, subject_id: Option<i64>) -> Result<Vec<GradeRecord>, AppError> {
        Ok(self
            .grades
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.student.id() == Some(student_id))
            .filter(|g| subject_id.is_none() || g.subject.id() == subject_id)
            .cloned()
            .collect())
    }

    async fn create_grade(&self, req: &NewGradeRequest) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("create_grade {}", req.grade));
        let id = self.next_id();
        self.seed_grade(id, req.student, req.subject, req.grade);
        Ok(())
    }

    async fn update_grade(&self, id: i64, req: &NewGradeRequest) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("update_grade {}", id));
        let mut grades = self.grades.lock().unwrap();
        let grade = grades.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        grade.grade = GradeValue::new(req.grade).ok_or_else(|| AppError::upstream(400, ""))?;
        Ok(())
    }

    async fn delete_grade(&self, id: i64) -> Result<(), AppError> {
        self.check_write()?;
        self.record(format!("delete_grade {}", id));
        self.grades.lock().unwrap().retain(|g| g.id != id);
        Ok(())
    }
}

pub fn attendance_service(api: Arc<FakeSchoolApi>) -> (AttendanceService, Arc<MemoryPreferenceStore>) {
    let prefs = Arc::new(MemoryPreferenceStore::default());
    let board = Arc::new(tokio::sync::Mutex::new(AttendanceBoard::new()));
    (AttendanceService::new(api, board, prefs.clone()), prefs)
}

pub async fn app_state(api: Arc<dyn SchoolApi>) -> (AppState, tokio::sync::mpsc::Receiver<String>) {
    app_state_with_push_capacity(api, 16).await
}

pub async fn app_state_with_push_capacity(
    api: Arc<dyn SchoolApi>,
    capacity: usize,
) -> (AppState, tokio::sync::mpsc::Receiver<String>) {
    let pool = schoolboard::db::connect_in_memory()
        .await
        .expect("Failed to create database");
    let (push_tx, push_rx) = tokio::sync::mpsc::channel(capacity);
    let state = AppState {
        db: pool,
        school: api,
        preferences: Arc::new(MemoryPreferenceStore::default()),
        board: Arc::new(tokio::sync::Mutex::new(AttendanceBoard::new())),
        grid: SlotGrid::default(),
        push_tx,
    };
    (state, push_rx)
}

pub fn entry(id: i64, day: &str, start: &str, end: &str) -> ScheduleEntry {
    ScheduleEntry {
        id,
        day: day.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        subject: Ref::Id(5),
        teacher: Ref::Id(1),
        classe: Ref::Missing,
        level: Ref::Id(2),
        room: Ref::Missing,
        notes: None,
    }
}

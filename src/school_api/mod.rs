pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::attendance::AttendanceKey;
use crate::error::AppError;
use crate::models::{
    AttendancePayload, AttendanceQuery, AttendanceRecord, Attendee, GradeRecord, NewGradeRequest,
    NewScheduleRequest, Person, ScheduleEntry, ScheduleScope,
};

pub use dto::AttendanceWrite;

#[derive(Clone, Debug)]
pub struct SchoolApiConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl SchoolApiConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("SCHOOL_API_URL")
            .map_err(|_| AppError::Config("SCHOOL_API_URL is not set".to_string()))?;
        let api_token = env::var("SCHOOL_API_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

/// The remote school backend.
#[async_trait]
pub trait SchoolApi: Send + Sync {
    async fn fetch_teachers(&self) -> Result<Vec<Person>, AppError>;
    async fn fetch_students(&self) -> Result<Vec<Person>, AppError>;

    async fn fetch_schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, AppError>;
    async fn create_schedule(&self, req: &NewScheduleRequest) -> Result<(), AppError>;
    async fn update_schedule(&self, id: i64, req: &NewScheduleRequest) -> Result<(), AppError>;
    async fn delete_schedule(&self, id: i64) -> Result<(), AppError>;

    async fn fetch_attendance(&self, attendee: Attendee) -> Result<AttendancePayload, AppError>;
    /// Creates the status at `write.key`, or updates the one already there.
    async fn save_attendance(&self, write: &AttendanceWrite) -> Result<(), AppError>;
    /// `NotFound` when there is no status at `key`.
    async fn delete_attendance(&self, attendee: Attendee, key: &AttendanceKey) -> Result<(), AppError>;

    async fn fetch_grades(
        &self,
        student_id: i64,
        subject_id: Option<i64>,
    ) -> Result<Vec<GradeRecord>, AppError>;
    async fn create_grade(&self, req: &NewGradeRequest) -> Result<(), AppError>;
    async fn update_grade(&self, id: i64, req: &NewGradeRequest) -> Result<(), AppError>;
    async fn delete_grade(&self, id: i64) -> Result<(), AppError>;
}

pub struct SchoolHttpClient {
    client: Client,
    config: SchoolApiConfig,
}

const TEACHER_ATTENDANCE: &str = "/api/attendance-t";

/// Teacher rows live behind a filterable list with per-record ids.
fn teacher_attendance_path(teacher_id: i64, query: &AttendanceQuery) -> String {
    let mut path = format!("{}/list/?teacher={}", TEACHER_ATTENDANCE, teacher_id);
    if let Some(date) = query.date {
        path.push_str(&format!("&date={}", date.format("%Y-%m-%d")));
    }
    if let Some(subject) = query.subject {
        path.push_str(&format!("&subject={}", subject));
    }
    if let Some(schedule) = query.schedule {
        path.push_str(&format!("&schedule={}", schedule));
    }
    path
}

/// Student statuses are addressed by student, schedule and date; there are
/// no record ids.
fn student_attendance_path(student_id: i64) -> String {
    format!("/api/attendance/{}/", student_id)
}

fn student_attendance_delete_path(student_id: i64, schedule_id: i64, key: &AttendanceKey) -> String {
    format!(
        "/api/attendance/delete/{}/{}/{}/",
        student_id,
        schedule_id,
        key.date.format("%Y-%m-%d")
    )
}

fn schedule_list_path(scope: ScheduleScope) -> Option<String> {
    match scope {
        ScheduleScope::Level(id) => Some(format!("/api/schedules/level/{}/", id)),
        ScheduleScope::Teacher(id) => Some(format!("/api/schedules/teacher/{}/", id)),
        // Resolved through the student's level.
        ScheduleScope::Student(_) => None,
    }
}

fn key_query(key: &AttendanceKey) -> AttendanceQuery {
    AttendanceQuery {
        date: Some(key.date),
        subject: Some(key.subject_id),
        schedule: key.schedule_id,
    }
}

fn require_schedule(key: &AttendanceKey) -> Result<i64, AppError> {
    key.schedule_id
        .ok_or_else(|| AppError::BadRequest("Student attendance needs a schedule.".to_string()))
}

impl SchoolHttpClient {
    pub fn new(config: SchoolApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let builder = self.client.request(method, url);
        match &self.config.api_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<String, AppError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("request to {} failed: {}", path, e);
            AppError::Upstream {
                status: 0,
                message: "Could not reach the school server.".to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!("reading response from {} failed: {}", path, e);
            AppError::Upstream {
                status: status.as_u16(),
                message: "The school server sent an unreadable response.".to_string(),
            }
        })?;
        debug!("{} -> {}", path, status);

        if !status.is_success() {
            return Err(AppError::upstream(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn get_json(&self, path: &str) -> Result<Value, AppError> {
        let body = self.send(self.request(Method::GET, path), path).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse: {}", e);
            AppError::BadRequest(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    async fn send_json<B: serde::Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), AppError> {
        self.send(self.request(method, path).json(body), path).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.send(self.request(Method::DELETE, path), path).await?;
        Ok(())
    }

    async fn teacher_rows(&self, teacher_id: i64, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>, AppError> {
        let body = self.get_json(&teacher_attendance_path(teacher_id, query)).await?;
        Ok(dto::parse_list("attendance record", body))
    }

    async fn teacher_record_id(&self, teacher_id: i64, key: &AttendanceKey) -> Result<Option<i64>, AppError> {
        let rows = self.teacher_rows(teacher_id, &key_query(key)).await?;
        Ok(dto::matching_record_id(&rows, key))
    }

    async fn student_schedules(&self, student_id: i64) -> Result<Vec<ScheduleEntry>, AppError> {
        let students = self.fetch_students().await?;
        let level = students
            .iter()
            .find(|s| s.id == student_id)
            .and_then(|s| s.level.id());
        match level {
            Some(level) => self.fetch_schedules(ScheduleScope::Level(level)).await,
            None => {
                debug!("student {} has no level, so no schedules", student_id);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl SchoolApi for SchoolHttpClient {
    async fn fetch_teachers(&self) -> Result<Vec<Person>, AppError> {
        let body = self.get_json("/api/teachers/list/").await?;
        Ok(dto::parse_list("teacher", body))
    }

    async fn fetch_students(&self) -> Result<Vec<Person>, AppError> {
        let body = self.get_json("/api/students/list/").await?;
        Ok(dto::parse_list("student", body))
    }

    async fn fetch_schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, AppError> {
        match (scope, schedule_list_path(scope)) {
            (_, Some(path)) => {
                let body = self.get_json(&path).await?;
                Ok(dto::parse_list("schedule entry", body))
            }
            (ScheduleScope::Student(id), None) => self.student_schedules(id).await,
            (_, None) => Ok(Vec::new()),
        }
    }

    async fn create_schedule(&self, req: &NewScheduleRequest) -> Result<(), AppError> {
        self.send_json(Method::POST, "/api/schedules/add/", req).await
    }

    async fn update_schedule(&self, id: i64, req: &NewScheduleRequest) -> Result<(), AppError> {
        let path = format!("/api/schedules/update/{}/", id);
        self.send_json(Method::PUT, &path, req).await
    }

    async fn delete_schedule(&self, id: i64) -> Result<(), AppError> {
        self.delete(&format!("/api/schedules/delete/{}/", id)).await
    }

    async fn fetch_attendance(&self, attendee: Attendee) -> Result<AttendancePayload, AppError> {
        let path = match attendee {
            Attendee::Teacher(id) => teacher_attendance_path(id, &AttendanceQuery::default()),
            Attendee::Student(id) => student_attendance_path(id),
        };
        let body = self.get_json(&path).await?;
        Ok(dto::parse_attendance(body))
    }

    async fn save_attendance(&self, write: &AttendanceWrite) -> Result<(), AppError> {
        match write.attendee {
            Attendee::Teacher(id) => match self.teacher_record_id(id, &write.key).await? {
                Some(record_id) => {
                    let path = format!("{}/{}/update/", TEACHER_ATTENDANCE, record_id);
                    self.send_json(Method::PUT, &path, &write.to_body()).await
                }
                None => {
                    let path = format!("{}/create/", TEACHER_ATTENDANCE);
                    self.send_json(Method::POST, &path, &write.to_body()).await
                }
            },
            Attendee::Student(_) => {
                require_schedule(&write.key)?;
                self.send_json(Method::POST, "/api/attendance/add/", &write.to_body())
                    .await
            }
        }
    }

    async fn delete_attendance(&self, attendee: Attendee, key: &AttendanceKey) -> Result<(), AppError> {
        match attendee {
            Attendee::Teacher(id) => {
                let record_id = self.teacher_record_id(id, key).await?.ok_or(AppError::NotFound)?;
                self.delete(&format!("{}/{}/delete/", TEACHER_ATTENDANCE, record_id))
                    .await
            }
            Attendee::Student(id) => {
                let schedule_id = require_schedule(key)?;
                match self.delete(&student_attendance_delete_path(id, schedule_id, key)).await {
                    Err(AppError::Upstream { status: 404, .. }) => Err(AppError::NotFound),
                    other => other,
                }
            }
        }
    }

    async fn fetch_grades(
        &self,
        student_id: i64,
        subject_id: Option<i64>,
    ) -> Result<Vec<GradeRecord>, AppError> {
        let mut path = format!("/api/grades/list/?student={}", student_id);
        if let Some(subject) = subject_id {
            path.push_str(&format!("&subject={}", subject));
        }
        let body = self.get_json(&path).await?;
        Ok(dto::parse_list("grade", body))
    }

    async fn create_grade(&self, req: &NewGradeRequest) -> Result<(), AppError> {
        self.send_json(Method::POST, "/api/grades/add/", req).await
    }

    async fn update_grade(&self, id: i64, req: &NewGradeRequest) -> Result<(), AppError> {
        let path = format!("/api/grades/edit/{}/", id);
        self.send_json(Method::PUT, &path, req).await
    }

    async fn delete_grade(&self, id: i64) -> Result<(), AppError> {
        self.delete(&format!("/api/grades/delete/{}/", id)).await
    }
}

/// Accepts every write and lists nothing.
pub struct NoopSchoolApi;

#[async_trait]
impl SchoolApi for NoopSchoolApi {
    async fn fetch_teachers(&self) -> Result<Vec<Person>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_students(&self) -> Result<Vec<Person>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_schedules(&self, _scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, AppError> {
        Ok(Vec::new())
    }

    async fn create_schedule(&self, _req: &NewScheduleRequest) -> Result<(), AppError> {
        Ok(())
    }

    async fn update_schedule(&self, _id: i64, _req: &NewScheduleRequest) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_schedule(&self, _id: i64) -> Result<(), AppError> {
        Ok(())
    }

    async fn fetch_attendance(&self, _attendee: Attendee) -> Result<AttendancePayload, AppError> {
        Ok(AttendancePayload::default())
    }

    async fn save_attendance(&self, _write: &AttendanceWrite) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_attendance(&self, _attendee: Attendee, _key: &AttendanceKey) -> Result<(), AppError> {
        Err(AppError::NotFound)
    }

    async fn fetch_grades(
        &self,
        _student_id: i64,
        _subject_id: Option<i64>,
    ) -> Result<Vec<GradeRecord>, AppError> {
        Ok(Vec::new())
    }

    async fn create_grade(&self, _req: &NewGradeRequest) -> Result<(), AppError> {
        Ok(())
    }

    async fn update_grade(&self, _id: i64, _req: &NewGradeRequest) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_grade(&self, _id: i64) -> Result<(), AppError> {
        Ok(())
    }
}

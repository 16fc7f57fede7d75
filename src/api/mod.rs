use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::attendance::{AttendanceKey, AttendanceStatus, AttendanceSummary};
use crate::board::BoardSnapshot;
use crate::error::AppError;
use crate::grades::GradeSummary;
use crate::models::*;
use crate::preferences::Preferences;
use crate::schedule::WeekGrid;
use crate::search::{filter_people, parse_level_filter};
use crate::state::AppState;

#[derive(Deserialize)]
struct SelectRequest {
    attendee: Attendee,
}

#[derive(Deserialize)]
struct SetAttendanceRequest {
    attendee: Attendee,
    key: AttendanceKey,
    status: AttendanceStatus,
}

#[derive(Deserialize)]
struct DeleteAttendanceRequest {
    attendee: Attendee,
    key: AttendanceKey,
}

#[derive(Deserialize)]
struct GridQueryParams {
    #[serde(default)]
    week: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct GradeQueryParams {
    #[serde(default)]
    subject: Option<i64>,
}

#[derive(Deserialize)]
struct DeleteGradeParams {
    student: i64,
    #[serde(default)]
    subject: Option<i64>,
}

#[derive(Deserialize)]
struct PeopleQueryParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    level: Option<String>,
}

#[derive(Serialize)]
struct PushAccepted {
    queued: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedules", post(create_schedule))
        .route("/schedules/{id}", put(update_schedule).delete(delete_schedule))
        .route("/grids/{scope}/{id}", get(schedule_grid))
        .route(
            "/attendance",
            get(current_attendance).put(set_attendance).delete(delete_attendance),
        )
        .route("/attendance/select", post(select_attendee))
        .route("/attendance/push", post(push_attendance))
        .route("/students/{id}/grades", get(student_grades))
        .route("/grades", post(create_grade))
        .route("/grades/{id}", put(update_grade).delete(delete_grade))
        .route("/people/{kind}", get(list_people))
        .route("/preferences", get(get_preferences))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn schedule_grid(
    State(state): State<AppState>,
    Path((scope, id)): Path<(String, i64)>,
    Query(params): Query<GridQueryParams>,
) -> Result<Json<WeekGrid>, AppError> {
    let scope = ScheduleScope::parse(&scope, id)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown schedule scope: {}", scope)))?;
    let week_of = params.week.unwrap_or_else(|| Local::now().date_naive());
    let grid = state.schedule_service().week_grid(scope, week_of).await?;
    Ok(Json(grid))
}

async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<NewScheduleRequest>,
) -> Result<Json<WeekGrid>, AppError> {
    let grid = state.schedule_service().create(req).await?;
    Ok(Json(grid))
}

async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewScheduleRequest>,
) -> Result<Json<WeekGrid>, AppError> {
    let grid = state.schedule_service().update(id, req).await?;
    Ok(Json(grid))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.schedule_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_attendance(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.attendance_service().snapshot().await)
}

async fn select_attendee(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<BoardSnapshot>, AppError> {
    let snapshot = state.attendance_service().select(req.attendee).await?;
    Ok(Json(snapshot))
}

async fn set_attendance(
    State(state): State<AppState>,
    Json(req): Json<SetAttendanceRequest>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let summary = state
        .attendance_service()
        .set_status(req.attendee, req.key, req.status)
        .await?;
    Ok(Json(summary))
}

async fn delete_attendance(
    State(state): State<AppState>,
    Json(req): Json<DeleteAttendanceRequest>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let summary = state.attendance_service().delete(req.attendee, req.key).await?;
    Ok(Json(summary))
}

async fn push_attendance(
    State(state): State<AppState>,
    frame: String,
) -> Result<(StatusCode, Json<PushAccepted>), AppError> {
    state.push_tx.try_send(frame).map_err(|e| {
        tracing::warn!("push channel rejected frame: {}", e);
        AppError::Unavailable("push channel is unavailable".to_string())
    })?;
    Ok((StatusCode::ACCEPTED, Json(PushAccepted { queued: true })))
}

async fn student_grades(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<GradeQueryParams>,
) -> Result<Json<GradeSummary>, AppError> {
    let summary = state.grade_service().summary(id, params.subject).await?;
    Ok(Json(summary))
}

async fn create_grade(
    State(state): State<AppState>,
    Json(req): Json<NewGradeRequest>,
) -> Result<Json<GradeSummary>, AppError> {
    let summary = state.grade_service().add(req).await?;
    Ok(Json(summary))
}

async fn update_grade(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewGradeRequest>,
) -> Result<Json<GradeSummary>, AppError> {
    let summary = state.grade_service().edit(id, req).await?;
    Ok(Json(summary))
}

async fn delete_grade(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteGradeParams>,
) -> Result<Json<GradeSummary>, AppError> {
    let summary = state
        .grade_service()
        .delete(id, params.student, params.subject)
        .await?;
    Ok(Json(summary))
}

async fn list_people(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<PeopleQueryParams>,
) -> Result<Json<Vec<Person>>, AppError> {
    let people = match kind.as_str() {
        "teachers" => state.school.fetch_teachers().await?,
        "students" => state.school.fetch_students().await?,
        other => return Err(AppError::BadRequest(format!("Unknown people list: {}", other))),
    };
    let level = parse_level_filter(params.level.as_deref()).map_err(|_| {
        AppError::BadRequest(format!(
            "Unknown level filter: {}",
            params.level.as_deref().unwrap_or_default()
        ))
    })?;
    let filtered = filter_people(&people, &params.q, level)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(filtered))
}

async fn get_preferences(State(state): State<AppState>) -> Result<Json<Preferences>, AppError> {
    let prefs = state.preferences.load().await?;
    Ok(Json(prefs))
}

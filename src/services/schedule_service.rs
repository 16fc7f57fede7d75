use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use tracing::info;

use crate::error::AppError;
use crate::models::{NewScheduleRequest, ScheduleScope};
use crate::schedule::{Day, SlotGrid, WeekGrid, build_week_grid, find_conflict, parse_time_of_day};
use crate::school_api::SchoolApi;

#[derive(Clone)]
pub struct ScheduleService {
    school: Arc<dyn SchoolApi>,
    grid: SlotGrid,
}

struct Slot {
    day: Day,
    start: NaiveTime,
    end: NaiveTime,
}

impl ScheduleService {
    pub fn new(school: Arc<dyn SchoolApi>, grid: SlotGrid) -> Self {
        Self { school, grid }
    }

    /// The grid for the week containing `week_of`.
    pub async fn week_grid(&self, scope: ScheduleScope, week_of: NaiveDate) -> Result<WeekGrid, AppError> {
        let entries = self.school.fetch_schedules(scope).await?;
        Ok(build_week_grid(&entries, &self.grid, week_of))
    }

    pub async fn create(&self, req: NewScheduleRequest) -> Result<WeekGrid, AppError> {
        self.check_free(&req, None).await?;
        self.school.create_schedule(&req).await?;
        info!("Created {} {}-{} for teacher {}", req.day, req.start_time, req.end_time, req.teacher);
        self.week_grid(ScheduleScope::Teacher(req.teacher), today()).await
    }

    pub async fn update(&self, id: i64, req: NewScheduleRequest) -> Result<WeekGrid, AppError> {
        self.check_free(&req, Some(id)).await?;
        self.school.update_schedule(id, &req).await?;
        info!("Updated schedule {}", id);
        self.week_grid(ScheduleScope::Teacher(req.teacher), today()).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.school.delete_schedule(id).await?;
        info!("Deleted schedule {}", id);
        Ok(())
    }

    /// Rejects malformed times and anything overlapping the teacher's other
    /// entries on the same day.
    async fn check_free(&self, req: &NewScheduleRequest, exclude_id: Option<i64>) -> Result<(), AppError> {
        let slot = parse_slot(req)?;
        let existing = self.school.fetch_schedules(ScheduleScope::Teacher(req.teacher)).await?;
        match find_conflict(&existing, slot.day, slot.start, slot.end, exclude_id) {
            Some(other) => Err(AppError::Conflict(format!(
                "{} {}-{} overlaps schedule {} ({}-{})",
                slot.day.code(),
                req.start_time,
                req.end_time,
                other.id,
                other.start_time,
                other.end_time
            ))),
            None => Ok(()),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_slot(req: &NewScheduleRequest) -> Result<Slot, AppError> {
    let day = Day::parse(&req.day)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown day: {}", req.day)))?;
    let start = parse_time_of_day(&req.start_time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid start time: {}", req.start_time)))?;
    let end = parse_time_of_day(&req.end_time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid end time: {}", req.end_time)))?;
    if end <= start {
        return Err(AppError::BadRequest("End time must be after start time.".to_string()));
    }
    Ok(Slot { day, start, end })
}

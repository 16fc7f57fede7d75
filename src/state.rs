use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{Mutex, mpsc};

use crate::board::AttendanceBoard;
use crate::preferences::PreferenceStore;
use crate::schedule::SlotGrid;
use crate::school_api::SchoolApi;
use crate::services::{AttendanceService, GradeService, ScheduleService};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub school: Arc<dyn SchoolApi>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub board: Arc<Mutex<AttendanceBoard>>,
    pub grid: SlotGrid,
    pub push_tx: mpsc::Sender<String>,
}

impl AppState {
    pub fn attendance_service(&self) -> AttendanceService {
        AttendanceService::new(self.school.clone(), self.board.clone(), self.preferences.clone())
    }

    pub fn grade_service(&self) -> GradeService {
        GradeService::new(self.school.clone())
    }

    pub fn schedule_service(&self) -> ScheduleService {
        ScheduleService::new(self.school.clone(), self.grid.clone())
    }
}

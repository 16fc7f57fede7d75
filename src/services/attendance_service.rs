use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::attendance::{
    AttendanceKey, AttendanceStatus, AttendanceSummary, normalize_records, subject_index,
};
use crate::board::{AttendanceBoard, BoardSnapshot, Ticket};
use crate::error::AppError;
use crate::models::{Attendee, ScheduleScope};
use crate::preferences::PreferenceStore;
use crate::school_api::{AttendanceWrite, SchoolApi};

/// Reads and writes the selected attendee's attendance. The board lock is
/// never held across a call to the school API.
#[derive(Clone)]
pub struct AttendanceService {
    school: Arc<dyn SchoolApi>,
    board: Arc<Mutex<AttendanceBoard>>,
    preferences: Arc<dyn PreferenceStore>,
}

impl AttendanceService {
    pub fn new(
        school: Arc<dyn SchoolApi>,
        board: Arc<Mutex<AttendanceBoard>>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            school,
            board,
            preferences,
        }
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.board.lock().await.snapshot()
    }

    /// Makes `attendee` the current selection and loads their records.
    pub async fn select(&self, attendee: Attendee) -> Result<BoardSnapshot, AppError> {
        let ticket = self.board.lock().await.select(attendee);
        info!("Selected {:?} (generation {})", attendee, ticket.generation);

        if let Err(e) = self.remember(attendee).await {
            warn!("Failed to save preferences: {}", e);
        }

        self.refresh(&ticket).await?;
        Ok(self.snapshot().await)
    }

    /// Reselects whoever the saved preferences name, if anyone.
    pub async fn restore_selection(&self) -> Result<Option<BoardSnapshot>, AppError> {
        let prefs = self.preferences.load().await?;
        match prefs.default_attendee() {
            Some(attendee) => self.select(attendee).await.map(Some),
            None => Ok(None),
        }
    }

    async fn remember(&self, attendee: Attendee) -> Result<(), AppError> {
        let mut prefs = self.preferences.load().await?;
        prefs.remember(attendee);
        self.preferences.save(&prefs).await
    }

    /// Refetches the records for `ticket`. Returns false when a newer
    /// selection made the result stale.
    pub async fn refresh(&self, ticket: &Ticket) -> Result<bool, AppError> {
        let payload = self.school.fetch_attendance(ticket.attendee).await?;
        let schedules = self.school.fetch_schedules(schedule_scope(ticket.attendee)).await?;
        let subjects = subject_index(&schedules);
        let records = normalize_records(&payload, &subjects);
        let count = records.len();

        let installed = self.board.lock().await.install(ticket, records, subjects);
        if installed {
            debug!("Loaded {} attendance records for {:?}", count, ticket.attendee);
        } else {
            debug!("Dropping stale attendance fetch for {:?}", ticket.attendee);
        }
        Ok(installed)
    }

    /// Refetches whatever is currently selected.
    pub async fn refresh_current(&self) -> Result<bool, AppError> {
        let ticket = self.board.lock().await.current_ticket();
        match ticket {
            Some(ticket) => self.refresh(&ticket).await,
            None => Ok(false),
        }
    }

    async fn ticket_for(&self, attendee: Attendee) -> Result<Ticket, AppError> {
        self.board.lock().await.ticket_for(attendee).ok_or_else(|| {
            AppError::BadRequest(format!("{:?} is not the current selection", attendee))
        })
    }

    /// Shows `status` immediately, then writes it to the backend. On failure
    /// the key goes back to what it held before.
    pub async fn set_status(
        &self,
        attendee: Attendee,
        key: AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<AttendanceSummary, AppError> {
        if matches!(attendee, Attendee::Student(_)) && key.schedule_id.is_none() {
            return Err(AppError::BadRequest(
                "Student attendance needs a schedule.".to_string(),
            ));
        }
        let ticket = self.ticket_for(attendee).await?;
        let pending = self
            .board
            .lock()
            .await
            .apply_speculative(&ticket, key, status)
            .ok_or_else(|| AppError::Conflict("selection changed".to_string()))?;

        let write = AttendanceWrite {
            attendee,
            key,
            status,
        };

        if let Err(e) = self.school.save_attendance(&write).await {
            warn!("Attendance write for {} failed, rolling back: {}", key, e);
            self.board.lock().await.rollback(&ticket, &pending);
            return Err(e);
        }

        if let Err(e) = self.refresh(&ticket).await {
            warn!("Attendance saved but refetch failed: {}", e);
        }
        Ok(self.board.lock().await.summary())
    }

    /// Removes one status both remotely and locally.
    pub async fn delete(&self, attendee: Attendee, key: AttendanceKey) -> Result<AttendanceSummary, AppError> {
        let ticket = self.ticket_for(attendee).await?;
        self.school.delete_attendance(attendee, &key).await?;

        self.board.lock().await.remove(&ticket, &key);
        if let Err(e) = self.refresh(&ticket).await {
            warn!("Attendance deleted but refetch failed: {}", e);
        }
        Ok(self.board.lock().await.summary())
    }
}

fn schedule_scope(attendee: Attendee) -> ScheduleScope {
    match attendee {
        Attendee::Teacher(id) => ScheduleScope::Teacher(id),
        Attendee::Student(id) => ScheduleScope::Student(id),
    }
}

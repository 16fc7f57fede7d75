use std::time::Duration;
use tracing::info;

use crate::services::attendance_service::AttendanceService;

/// Periodic refresh scheduler.
/// Refetches the current selection so pushes missed while disconnected
/// still show up.
pub struct RefreshScheduler {
    attendance: AttendanceService,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(attendance: AttendanceService, interval_secs: u64) -> Self {
        Self {
            attendance,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the refresh forever.
    pub async fn start(self) {
        info!("Starting refresh scheduler (interval: {:?})", self.interval);

        loop {
            // Wait first; selecting already fetched once.
            tokio::time::sleep(self.interval).await;

            match self.attendance.refresh_current().await {
                Ok(true) => info!("Attendance refresh completed"),
                Ok(false) => tracing::debug!("Nothing selected or selection changed; refresh skipped"),
                Err(e) => {
                    tracing::warn!("Attendance refresh failed: {:?}", e);
                    // Keep looping on errors
                }
            }
        }
    }
}

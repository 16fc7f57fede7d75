pub mod attendance_service;
pub mod grade_service;
pub mod schedule_service;
pub mod scheduler;

pub use attendance_service::AttendanceService;
pub use grade_service::GradeService;
pub use schedule_service::ScheduleService;
pub use scheduler::RefreshScheduler;
